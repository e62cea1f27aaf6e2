use std::sync::Arc;

use crate::scene::ViewId;

/// Per-view progress notification.
///
/// Events of one view are emitted in order from the worker handling it;
/// events of different views interleave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeatureEvent {
    /// The source image was loaded.
    Started {
        view_id: ViewId,
        width: usize,
        height: usize,
    },
    /// The image was halved `levels` times to fit the pixel budget.
    Rescaled {
        view_id: ViewId,
        width: usize,
        height: usize,
        levels: u32,
    },
    /// Descriptors were taken from the feature embedding.
    LoadedFromCache { view_id: ViewId, count: usize },
    /// Descriptors were computed by the extractor.
    Extracted { view_id: ViewId, count: usize },
    /// The view is done.
    Finished { view_id: ViewId, count: usize },
}

impl FeatureEvent {
    pub fn view_id(&self) -> ViewId {
        match *self {
            FeatureEvent::Started { view_id, .. }
            | FeatureEvent::Rescaled { view_id, .. }
            | FeatureEvent::LoadedFromCache { view_id, .. }
            | FeatureEvent::Extracted { view_id, .. }
            | FeatureEvent::Finished { view_id, .. } => view_id,
        }
    }
}

/// Progress callback shared by all workers.
pub type ProgressFn = Arc<dyn Fn(&FeatureEvent) + Send + Sync>;
