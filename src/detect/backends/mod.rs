pub mod synthetic;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use synthetic::{synthetic_hand, SyntheticBackend};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
