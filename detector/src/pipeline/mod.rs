//! Per-sample image processing, in pipeline order:
//! prepare → diff → dilate → extract → annotate.
pub mod annotate;
pub mod diff;
pub mod noise;
pub mod preprocess;
pub mod regions;

pub use annotate::annotate;
pub use diff::DiffEngine;
pub use noise::dilate;
pub use preprocess::{mirror, prepare};
pub use regions::extract;
