mod types;

pub use types::SessionConfig;
