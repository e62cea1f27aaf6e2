//! Scene persisted as a directory tree.
//!
//! ```text
//! <root>/views/<view dir>/meta.json           {"id": 0, "name": "IMG_0001"}
//! <root>/views/<view dir>/<embedding>.png     color images (.jpg/.jpeg also read)
//! <root>/views/<view dir>/<embedding>.bin     data embeddings
//! ```
//!
//! View directories are discovered through their `meta.json`. A view is placed
//! at index `id`; ids without a directory become absent views.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use image::{ColorType, ImageFormat};
use serde::{Deserialize, Serialize};
use sfm_features_bundler::{Scene, StoreError, View, ViewId};
use sfm_features_core::{ByteImage, ImageError};

const VIEWS_DIR: &str = "views";
const META_FILE: &str = "meta.json";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(thiserror::Error, Debug)]
pub enum DirectoryStoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Buffer(#[from] ImageError),
    #[error("views {first:?} and {second:?} share id {id}")]
    DuplicateViewId {
        id: ViewId,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("cannot store an image with {0} channels")]
    UnsupportedChannels(usize),
}

impl From<DirectoryStoreError> for StoreError {
    fn from(err: DirectoryStoreError) -> Self {
        match err {
            DirectoryStoreError::Io(e) => StoreError::Io(e),
            DirectoryStoreError::Buffer(e) => StoreError::Image(e),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

/// Contents of `meta.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    pub id: ViewId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug)]
struct DataBuffer {
    bytes: Vec<u8>,
    dirty: bool,
}

/// A view backed by one directory.
///
/// Images are decoded lazily and data embeddings are read on first access.
/// [`View::set_data`] only updates memory; [`View::save`] writes every pending
/// embedding through a temporary file and a rename.
#[derive(Debug)]
pub struct DirectoryView {
    meta: ViewMeta,
    dir: PathBuf,
    images: HashMap<String, ByteImage>,
    data: HashMap<String, DataBuffer>,
}

impl DirectoryView {
    /// Load the view stored in `dir`.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, DirectoryStoreError> {
        let dir = dir.into();
        let raw = fs::read_to_string(dir.join(META_FILE))?;
        let meta: ViewMeta = serde_json::from_str(&raw)?;
        Ok(Self {
            meta,
            dir,
            images: HashMap::new(),
            data: HashMap::new(),
        })
    }

    fn create(dir: PathBuf, meta: ViewMeta) -> Result<Self, DirectoryStoreError> {
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(&meta)?;
        write_atomic(&dir, META_FILE, json.as_bytes())?;
        Ok(Self {
            meta,
            dir,
            images: HashMap::new(),
            data: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether [`View::set_data`] changes are waiting for [`View::save`].
    pub fn has_pending_changes(&self) -> bool {
        self.data.values().any(|b| b.dirty)
    }

    /// Store `image` as `<name>.png` and keep it decoded.
    pub fn set_image(&mut self, name: &str, image: &ByteImage) -> Result<(), DirectoryStoreError> {
        write_png(&self.dir, &format!("{name}.png"), image)?;
        self.images.insert(name.to_string(), image.clone());
        Ok(())
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bin"))
    }

    fn image_path(&self, name: &str) -> Option<PathBuf> {
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }

    fn missing(&self, name: &str) -> StoreError {
        StoreError::MissingEmbedding {
            view_id: self.meta.id,
            name: name.to_string(),
        }
    }
}

impl View for DirectoryView {
    fn id(&self) -> ViewId {
        self.meta.id
    }

    fn has_data_embedding(&self, name: &str) -> bool {
        self.data.contains_key(name) || self.data_path(name).is_file()
    }

    fn data(&mut self, name: &str) -> Result<&[u8], StoreError> {
        if !self.data.contains_key(name) {
            let bytes = match fs::read(self.data_path(name)) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(self.missing(name)),
                Err(e) => return Err(e.into()),
            };
            self.data.insert(
                name.to_string(),
                DataBuffer {
                    bytes,
                    dirty: false,
                },
            );
        }
        self.data
            .get(name)
            .map(|b| b.bytes.as_slice())
            .ok_or_else(|| self.missing(name))
    }

    fn set_data(&mut self, name: &str, data: Vec<u8>) {
        self.data.insert(
            name.to_string(),
            DataBuffer {
                bytes: data,
                dirty: true,
            },
        );
    }

    fn byte_image(&mut self, name: &str) -> Result<ByteImage, StoreError> {
        if let Some(image) = self.images.get(name) {
            return Ok(image.clone());
        }
        let Some(path) = self.image_path(name) else {
            if self.has_data_embedding(name) {
                return Err(StoreError::NotAnImage {
                    view_id: self.meta.id,
                    name: name.to_string(),
                });
            }
            return Err(self.missing(name));
        };
        let image = read_byte_image(&path)?;
        self.images.insert(name.to_string(), image.clone());
        Ok(image)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        for (name, buffer) in self.data.iter_mut().filter(|(_, b)| b.dirty) {
            write_atomic(&self.dir, &format!("{name}.bin"), &buffer.bytes)?;
            buffer.dirty = false;
        }
        Ok(())
    }

    fn cache_cleanup(&mut self) {
        self.images.clear();
        self.data.retain(|_, b| b.dirty);
    }
}

/// Scene whose views live under `<root>/views`.
#[derive(Debug)]
pub struct DirectoryScene {
    root: PathBuf,
    views: Vec<Option<DirectoryView>>,
}

impl DirectoryScene {
    /// Create the directory layout (if needed) and open it.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, DirectoryStoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(VIEWS_DIR))?;
        Self::open(root)
    }

    /// Open an existing scene.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DirectoryStoreError> {
        let root = root.into();
        let mut dirs = fs::read_dir(root.join(VIEWS_DIR))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        dirs.retain(|d| d.join(META_FILE).is_file());
        dirs.sort();

        let mut views: Vec<Option<DirectoryView>> = Vec::new();
        for dir in dirs {
            let view = DirectoryView::load(dir)?;
            let id = view.id();
            if id >= views.len() {
                views.resize_with(id + 1, || None);
            }
            if let Some(existing) = &views[id] {
                return Err(DirectoryStoreError::DuplicateViewId {
                    id,
                    first: existing.dir.clone(),
                    second: view.dir,
                });
            }
            views[id] = Some(view);
        }
        log::debug!("opened scene {:?} with {} views", root, views.len());
        Ok(Self { root, views })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view(&self, id: ViewId) -> Option<&DirectoryView> {
        self.views.get(id).and_then(Option::as_ref)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut DirectoryView> {
        self.views.get_mut(id).and_then(Option::as_mut)
    }

    /// Append a view holding `image` as its `image_embedding`.
    pub fn add_view(
        &mut self,
        name: &str,
        image_embedding: &str,
        image: &ByteImage,
    ) -> Result<ViewId, DirectoryStoreError> {
        let id = self.views.len();
        let dir = self.root.join(VIEWS_DIR).join(format!("view_{id:04}"));
        let meta = ViewMeta {
            id,
            name: name.to_string(),
        };
        let mut view = DirectoryView::create(dir, meta)?;
        view.set_image(image_embedding, image)?;
        self.views.push(Some(view));
        Ok(id)
    }
}

impl Scene for DirectoryScene {
    type View = DirectoryView;

    fn views(&self) -> &[Option<DirectoryView>] {
        &self.views
    }

    fn views_mut(&mut self) -> &mut [Option<DirectoryView>] {
        &mut self.views
    }
}

/// Decode an image file into an RGB [`ByteImage`].
pub fn read_byte_image(path: impl AsRef<Path>) -> Result<ByteImage, DirectoryStoreError> {
    let rgb = image::open(path)?.to_rgb8();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    Ok(ByteImage::from_raw(w, h, 3, rgb.into_raw())?)
}

fn write_png(dir: &Path, file_name: &str, image: &ByteImage) -> Result<(), DirectoryStoreError> {
    let color = match image.channels() {
        1 => ColorType::L8,
        2 => ColorType::La8,
        3 => ColorType::Rgb8,
        4 => ColorType::Rgba8,
        other => return Err(DirectoryStoreError::UnsupportedChannels(other)),
    };
    let tmp = dir.join(format!(".{file_name}.tmp"));
    image::save_buffer_with_format(
        &tmp,
        image.as_raw(),
        image.width() as u32,
        image.height() as u32,
        color,
        ImageFormat::Png,
    )?;
    fs::rename(tmp, dir.join(file_name))?;
    Ok(())
}

fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<()> {
    let tmp = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(tmp, dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(w: usize, h: usize) -> ByteImage {
        let raw = (0..w * h).map(|i| (i % 251) as u8).collect();
        ByteImage::from_raw(w, h, 1, raw).unwrap()
    }

    #[test]
    fn cleanup_keeps_unsaved_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = DirectoryScene::create(dir.path()).unwrap();
        scene.add_view("a", "original", &gray(8, 6)).unwrap();
        let view = scene.view_mut(0).unwrap();

        view.set_data("features", vec![1, 2, 3]);
        view.cache_cleanup();
        assert!(view.has_pending_changes());
        assert!(!view.data_path("features").exists());

        view.save().unwrap();
        assert!(!view.has_pending_changes());
        assert_eq!(fs::read(view.data_path("features")).unwrap(), vec![1, 2, 3]);

        view.cache_cleanup();
        assert!(view.data.is_empty() && view.images.is_empty());
        assert!(view.has_data_embedding("features"));
        assert_eq!(view.data("features").unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn gray_images_are_read_back_as_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = DirectoryScene::create(dir.path()).unwrap();
        let image = gray(5, 4);
        scene.add_view("g", "original", &image).unwrap();

        let mut reopened = DirectoryScene::open(dir.path()).unwrap();
        let view = reopened.view_mut(0).unwrap();
        let rgb = view.byte_image("original").unwrap();
        assert_eq!((rgb.width(), rgb.height(), rgb.channels()), (5, 4, 3));
        assert_eq!(rgb.color_at(3.0, 2.0), [13, 13, 13]);
    }

    #[test]
    fn data_embedding_is_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = DirectoryScene::create(dir.path()).unwrap();
        scene.add_view("a", "original", &gray(4, 4)).unwrap();
        let view = scene.view_mut(0).unwrap();
        view.set_data("features", vec![0]);

        assert!(matches!(
            view.byte_image("features"),
            Err(StoreError::NotAnImage { view_id: 0, .. })
        ));
        assert!(matches!(
            view.byte_image("depth"),
            Err(StoreError::MissingEmbedding { view_id: 0, .. })
        ));
    }
}
