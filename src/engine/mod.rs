pub mod code;
pub mod lifecycle;

pub use lifecycle::{LifecycleEngine, NewPickup};
