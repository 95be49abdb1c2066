//! Artifact declarations: the tree model, loading and source resolution.

mod flatten;
mod load;
mod types;

pub use flatten::{FlattenError, flatten};
pub use load::{LoadError, Loaded, Loader, load};
pub use types::*;
