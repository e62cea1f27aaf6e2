//! In-memory view store.

use std::collections::HashMap;

use sfm_features_core::ByteImage;

use crate::scene::{Scene, StoreError, View, ViewId};

/// View whose images and embeddings live in memory.
///
/// `save` only counts invocations, which makes the store handy for checking
/// cache behavior.
#[derive(Clone, Debug, Default)]
pub struct MemoryView {
    id: ViewId,
    images: HashMap<String, ByteImage>,
    data: HashMap<String, Vec<u8>>,
    saves: usize,
    cleanups: usize,
}

impl MemoryView {
    pub fn new(id: ViewId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_image(mut self, name: impl Into<String>, image: ByteImage) -> Self {
        self.set_image(name, image);
        self
    }

    pub fn with_data(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.data.insert(name.into(), data);
        self
    }

    pub fn set_image(&mut self, name: impl Into<String>, image: ByteImage) {
        self.images.insert(name.into(), image);
    }

    /// Read a data embedding without going through [`View::data`].
    pub fn data_embedding(&self, name: &str) -> Option<&[u8]> {
        self.data.get(name).map(Vec::as_slice)
    }

    /// Number of completed [`View::save`] calls.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Number of [`View::cache_cleanup`] calls.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups
    }
}

impl View for MemoryView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn has_data_embedding(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    fn data(&mut self, name: &str) -> Result<&[u8], StoreError> {
        self.data
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::MissingEmbedding {
                view_id: self.id,
                name: name.to_string(),
            })
    }

    fn set_data(&mut self, name: &str, data: Vec<u8>) {
        self.data.insert(name.to_string(), data);
    }

    fn byte_image(&mut self, name: &str) -> Result<ByteImage, StoreError> {
        if self.data.contains_key(name) {
            return Err(StoreError::NotAnImage {
                view_id: self.id,
                name: name.to_string(),
            });
        }
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::MissingEmbedding {
                view_id: self.id,
                name: name.to_string(),
            })
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }

    fn cache_cleanup(&mut self) {
        self.cleanups += 1;
    }
}

/// Scene backed by a vector of optional [`MemoryView`]s.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    views: Vec<Option<MemoryView>>,
}

impl MemoryScene {
    pub fn new(views: Vec<Option<MemoryView>>) -> Self {
        Self { views }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// View at index `id`, if present.
    pub fn view(&self, id: ViewId) -> Option<&MemoryView> {
        self.views.get(id).and_then(Option::as_ref)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut MemoryView> {
        self.views.get_mut(id).and_then(Option::as_mut)
    }
}

impl Scene for MemoryScene {
    type View = MemoryView;

    fn views(&self) -> &[Option<MemoryView>] {
        &self.views
    }

    fn views_mut(&mut self) -> &mut [Option<MemoryView>] {
        &mut self.views
    }
}
