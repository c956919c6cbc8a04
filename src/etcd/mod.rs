mod cleanup;
mod relocate;
mod restore;
mod start;

pub use cleanup::cleanup;
pub use restore::restore_snapshot;
pub use start::{start, StartOptions};
