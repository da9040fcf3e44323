//! The acquisition → analysis → display loop and the pieces it talks to.
pub mod cancel;
pub mod display;
pub mod state;

pub use display::{FfplayDisplay, NullDisplay};
pub use state::{DetectionLoop, RunSummary, TerminationReason};
