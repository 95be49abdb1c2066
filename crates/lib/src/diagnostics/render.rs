//! Human readable rendering of diagnostics.

use std::collections::BTreeMap;
use std::io::{self, Write};

use owo_colors::{OwoColorize, Style};

use super::{Diagnostic, Diagnostics, Severity, SourceRange};

/// Contents of loaded configuration files, keyed by file name.
///
/// Used to print the offending source line under a diagnostic.
pub type Files = BTreeMap<String, String>;

/// Wrapping width used when none is configured.
pub const DEFAULT_WIDTH: usize = 78;

/// Writes diagnostics as wrapped, optionally colored text.
pub struct DiagnosticWriter<'a, W> {
  out: W,
  files: &'a Files,
  width: usize,
  color: bool,
}

impl<'a, W: Write> DiagnosticWriter<'a, W> {
  pub fn new(out: W, files: &'a Files) -> Self {
    Self {
      out,
      files,
      width: DEFAULT_WIDTH,
      color: false,
    }
  }

  pub fn width(mut self, width: usize) -> Self {
    self.width = width.max(1);
    self
  }

  pub fn color(mut self, color: bool) -> Self {
    self.color = color;
    self
  }

  pub fn write_diagnostics(&mut self, diagnostics: &Diagnostics) -> io::Result<()> {
    for diagnostic in diagnostics {
      self.write_diagnostic(diagnostic)?;
    }
    self.out.flush()
  }

  pub fn write_diagnostic(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
    let label_style = match diagnostic.severity {
      Severity::Error => Style::new().red().bold(),
      Severity::Warning => Style::new().yellow().bold(),
    };
    let label = self.paint(&diagnostic.severity.to_string(), label_style);
    let summary = self.paint(&diagnostic.summary, Style::new().bold());
    writeln!(self.out, "{}: {}", label, summary)?;
    writeln!(self.out)?;

    if let Some(subject) = &diagnostic.subject {
      self.write_subject(subject)?;
    }

    if !diagnostic.detail.is_empty() {
      for line in wrap(&diagnostic.detail, self.width) {
        writeln!(self.out, "{}", line)?;
      }
      writeln!(self.out)?;
    }

    Ok(())
  }

  fn write_subject(&mut self, subject: &SourceRange) -> io::Result<()> {
    let Some(pos) = subject.start else {
      writeln!(self.out, "  on {}:", subject.filename)?;
      writeln!(self.out)?;
      return Ok(());
    };

    writeln!(self.out, "  on {} line {}:", subject.filename, pos.line)?;

    let source_line = self
      .files
      .get(&subject.filename)
      .and_then(|content| content.lines().nth(pos.line.saturating_sub(1)));

    if let Some(text) = source_line {
      let number = self.paint(&format!("{:>5}", pos.line), Style::new().dimmed());
      writeln!(self.out, "{}: {}", number, text)?;
      if pos.column > 0 {
        writeln!(self.out, "{}{}", " ".repeat(6 + pos.column), self.paint("^", Style::new().red()))?;
      }
    }
    writeln!(self.out)
  }

  fn paint(&self, text: &str, style: Style) -> String {
    if self.color {
      text.style(style).to_string()
    } else {
      text.to_string()
    }
  }
}

/// Greedy word wrap. Existing line breaks are kept; words longer than
/// `width` are left on their own line unbroken.
fn wrap(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();
  for paragraph in text.lines() {
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
      if !current.is_empty() && current.len() + 1 + word.len() > width {
        lines.push(std::mem::take(&mut current));
      }
      if !current.is_empty() {
        current.push(' ');
      }
      current.push_str(word);
    }
    lines.push(current);
  }
  lines
}
