//! Feature extraction orchestrator.
//!
//! This module wires together image loading from a view store, bounded
//! rescaling, extractor dispatch, descriptor caching and viewport assembly.

mod error;
mod extractor;
mod options;
mod pipeline;
mod progress;

pub use error::FeaturesError;
pub use extractor::{build_extractor, FeatureExtractor};
pub use options::{FeatureType, FeaturesOptions};
pub use pipeline::Features;
pub use progress::{FeatureEvent, ProgressFn};
