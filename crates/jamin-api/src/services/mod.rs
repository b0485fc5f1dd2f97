pub mod layer;

pub use layer::{LayerService, NewLayer};
