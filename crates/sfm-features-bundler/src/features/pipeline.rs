use std::{fmt, sync::Arc};

use log::{debug, info};
use rayon::prelude::*;
use sfm_features_core::{rescale_down_to, rescale_to_max_area, ByteImage, Descriptors};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{
    build_extractor, FeatureEvent, FeatureExtractor, FeatureType, FeaturesError, FeaturesOptions,
    ProgressFn,
};
use crate::embedding::{self, DecodedDescriptors};
use crate::scene::{Scene, View, ViewId};
use crate::viewport::{Viewport, ViewportList};

/// Parallel per-view feature extraction with descriptor caching.
#[derive(Clone)]
pub struct Features {
    options: FeaturesOptions,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Features")
            .field("options", &self.options)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Features {
    pub fn new(options: FeaturesOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    /// Report per-view progress to `callback`. It is invoked from worker
    /// threads.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FeatureEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    #[inline]
    pub fn options(&self) -> &FeaturesOptions {
        &self.options
    }

    /// [`Features::compute`] with the configured [`FeaturesOptions::feature_type`].
    pub fn compute_configured<S: Scene>(
        &self,
        scene: &mut S,
        viewports: Option<&mut ViewportList>,
    ) -> Result<(), FeaturesError> {
        self.compute(scene, self.options.feature_type, viewports)
    }

    /// Extract `feature_type` features for every view of `scene`.
    ///
    /// When `viewports` is given it is resized to the number of views and
    /// slot `i` receives the features of view `i`; absent views leave their
    /// slot empty. When a feature embedding is configured, descriptors are
    /// cached in it and reused on later calls unless `force_recompute` is set.
    ///
    /// Any per-view failure aborts the call and clears `viewports`. Feature
    /// embeddings already written for other views are kept.
    pub fn compute<S: Scene>(
        &self,
        scene: &mut S,
        feature_type: FeatureType,
        viewports: Option<&mut ViewportList>,
    ) -> Result<(), FeaturesError> {
        if viewports.is_none() && !self.options.caching_enabled() {
            return Err(FeaturesError::NoOutputRequested);
        }
        let extractor = build_extractor(feature_type, &self.options);
        info!(
            "computing {feature_type} features for {} views",
            scene.views().len()
        );
        self.compute_with(scene, extractor.as_ref(), viewports)
    }

    /// [`Features::compute`] with a caller-provided extractor.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(views = scene.views().len()))
    )]
    pub fn compute_with<S: Scene>(
        &self,
        scene: &mut S,
        extractor: &dyn FeatureExtractor,
        viewports: Option<&mut ViewportList>,
    ) -> Result<(), FeaturesError> {
        if viewports.is_none() && !self.options.caching_enabled() {
            return Err(FeaturesError::NoOutputRequested);
        }
        let views = scene.views_mut();
        match viewports {
            Some(out) => {
                out.clear();
                out.resize_with(views.len(), Viewport::default);
                let result = self.run(views, Some(out.as_mut_slice()), extractor);
                if result.is_err() {
                    out.clear();
                }
                result
            }
            None => self.run(views, None, extractor),
        }
    }

    fn run<V: View>(
        &self,
        views: &mut [Option<V>],
        viewports: Option<&mut [Viewport]>,
        extractor: &dyn FeatureExtractor,
    ) -> Result<(), FeaturesError> {
        let work = || match viewports {
            Some(slots) => views
                .par_iter_mut()
                .zip(slots.par_iter_mut())
                .with_max_len(1)
                .try_for_each(|(view, slot)| self.visit(view.as_mut(), Some(slot), extractor)),
            None => views
                .par_iter_mut()
                .with_max_len(1)
                .try_for_each(|view| self.visit(view.as_mut(), None, extractor)),
        };

        match self.options.num_threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(work),
            None => work(),
        }
    }

    fn visit<V: View>(
        &self,
        view: Option<&mut V>,
        viewport: Option<&mut Viewport>,
        extractor: &dyn FeatureExtractor,
    ) -> Result<(), FeaturesError> {
        let Some(view) = view else {
            return Ok(());
        };
        let result = self.compute_view(view, viewport, extractor);
        view.cache_cleanup();
        result
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(view_id = view.id()))
    )]
    fn compute_view<V: View>(
        &self,
        view: &mut V,
        viewport: Option<&mut Viewport>,
        extractor: &dyn FeatureExtractor,
    ) -> Result<(), FeaturesError> {
        let opts = &self.options;
        let view_id = view.id();
        let descriptor_length = extractor.descriptor_length();
        let store_err = |source| FeaturesError::Store { view_id, source };
        let embedding_err = |source| FeaturesError::Embedding { view_id, source };

        let cached = if opts.caching_enabled()
            && !opts.force_recompute
            && view.has_data_embedding(&opts.feature_embedding)
        {
            if viewport.is_none() {
                debug!("view {view_id}: features already cached");
                return Ok(());
            }
            let bytes = view.data(&opts.feature_embedding).map_err(store_err)?;
            let decoded = embedding::decode(bytes, descriptor_length).map_err(embedding_err)?;
            Some(decoded).filter(|d| !d.descriptors.is_empty())
        } else {
            None
        };

        let source = view.byte_image(&opts.image_embedding).map_err(store_err)?;
        self.emit(&FeatureEvent::Started {
            view_id,
            width: source.width(),
            height: source.height(),
        });

        let (image, descriptors) = match cached {
            Some(cached) => self.restore(view_id, source, cached)?,
            None => self.extract(view_id, source, extractor)?,
        };

        if opts.caching_enabled() {
            let bytes = embedding::encode(
                &descriptors,
                descriptor_length,
                image.width(),
                image.height(),
            )
            .map_err(embedding_err)?;
            view.set_data(&opts.feature_embedding, bytes);
            if !opts.skip_saving_views {
                view.save().map_err(store_err)?;
            }
        }

        if let Some(slot) = viewport {
            *slot = Viewport::from_descriptors(&image, &descriptors, descriptor_length);
        }

        debug!("view {view_id}: {} features", descriptors.len());
        self.emit(&FeatureEvent::Finished {
            view_id,
            count: descriptors.len(),
        });
        Ok(())
    }

    fn extract(
        &self,
        view_id: ViewId,
        source: ByteImage,
        extractor: &dyn FeatureExtractor,
    ) -> Result<(ByteImage, Descriptors), FeaturesError> {
        info!(
            "computing features for view {view_id} ({}x{})",
            source.width(),
            source.height()
        );
        let (image, levels) = rescale_to_max_area(source, self.options.max_image_size);
        if levels > 0 {
            info!(
                "view {view_id}: rescaled to {}x{}",
                image.width(),
                image.height()
            );
            self.emit(&FeatureEvent::Rescaled {
                view_id,
                width: image.width(),
                height: image.height(),
                levels,
            });
        }

        let descriptors = extractor.process(&image);
        let expected = extractor.descriptor_length();
        if let Some(bad) = descriptors.iter().find(|d| d.data.len() != expected) {
            return Err(FeaturesError::DescriptorLength {
                view_id,
                expected,
                found: bad.data.len(),
            });
        }

        self.emit(&FeatureEvent::Extracted {
            view_id,
            count: descriptors.len(),
        });
        Ok((image, descriptors))
    }

    fn restore(
        &self,
        view_id: ViewId,
        source: ByteImage,
        cached: DecodedDescriptors,
    ) -> Result<(ByteImage, Descriptors), FeaturesError> {
        let image = rescale_down_to(source, cached.width, cached.height);
        if image.width() != cached.width || image.height() != cached.height {
            return Err(FeaturesError::RescaleMismatch {
                view_id,
                cached: (cached.width, cached.height),
                actual: (image.width(), image.height()),
            });
        }

        debug!(
            "view {view_id}: loaded {} cached features",
            cached.descriptors.len()
        );
        self.emit(&FeatureEvent::LoadedFromCache {
            view_id,
            count: cached.descriptors.len(),
        });
        Ok((image, cached.descriptors))
    }

    #[inline]
    fn emit(&self, event: &FeatureEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}
