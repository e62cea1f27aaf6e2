use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use clap::{Parser, Subcommand};
use serde::Serialize;
use sfm_features::directory::{read_byte_image, DirectoryScene};
use sfm_features::{FeatureEvent, FeatureType, Features, FeaturesOptions, ViewportList};

#[cfg(not(feature = "tracing"))]
use log::{info, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sfm-features", version, about = "Per-view feature extraction for SfM scenes")]
struct Cli {
    /// Log level used when the `tracing` feature is disabled.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or extend) a scene directory from image files.
    Import {
        scene: PathBuf,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Embedding name the images are stored under.
        #[arg(long, default_value = "original")]
        image_embedding: String,
    },
    /// Compute features for every view of a scene.
    Extract {
        scene: PathBuf,
        /// JSON options file; command line flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,
        /// `sift` or `surf`.
        #[arg(long = "type")]
        feature_type: Option<FeatureType>,
        #[arg(long)]
        feature_embedding: Option<String>,
        #[arg(long)]
        image_embedding: Option<String>,
        #[arg(long)]
        max_image_size: Option<usize>,
        #[arg(long)]
        threads: Option<usize>,
        /// Ignore cached descriptors.
        #[arg(long)]
        force: bool,
        /// Do not persist updated feature embeddings.
        #[arg(long)]
        no_save: bool,
        /// Write a JSON summary of the per-view results.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct ViewReport {
    id: usize,
    name: String,
    width: usize,
    height: usize,
    features: usize,
}

#[derive(Debug, Serialize)]
struct ExtractReport {
    feature_type: FeatureType,
    extracted: usize,
    loaded_from_cache: usize,
    views: Vec<ViewReport>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    sfm_features::core::init_with_level(cli.log_level.parse().unwrap_or(LevelFilter::Info))?;

    #[cfg(feature = "tracing")]
    sfm_features::core::init_tracing(false);

    match cli.command {
        Command::Import {
            scene,
            images,
            image_embedding,
        } => import(&scene, &images, &image_embedding),
        Command::Extract {
            scene,
            config,
            feature_type,
            feature_embedding,
            image_embedding,
            max_image_size,
            threads,
            force,
            no_save,
            report,
        } => {
            let mut options = match config {
                Some(path) => FeaturesOptions::load_json(path)?,
                None => FeaturesOptions::default(),
            };
            if let Some(kind) = feature_type {
                options.feature_type = kind;
            }
            if let Some(name) = feature_embedding {
                options.feature_embedding = name;
            }
            if let Some(name) = image_embedding {
                options.image_embedding = name;
            }
            if let Some(max) = max_image_size {
                options.max_image_size = max;
            }
            if threads.is_some() {
                options.num_threads = threads;
            }
            options.force_recompute |= force;
            options.skip_saving_views |= no_save;
            extract(&scene, options, report.as_deref())
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(images)))]
fn import(
    scene: &Path,
    images: &[PathBuf],
    image_embedding: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = DirectoryScene::create(scene)?;
    for path in images {
        let image = read_byte_image(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = scene.add_view(&name, image_embedding, &image)?;
        info!(
            "view {id}: {name} ({}x{})",
            image.width(),
            image.height()
        );
    }
    println!("{} views in {}", scene.len(), scene.root().display());
    Ok(())
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(options)))]
fn extract(
    scene_dir: &Path,
    options: FeaturesOptions,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = DirectoryScene::open(scene_dir)?;
    let feature_type = options.feature_type;

    let extracted = Arc::new(AtomicUsize::new(0));
    let loaded = Arc::new(AtomicUsize::new(0));
    let (e, l) = (Arc::clone(&extracted), Arc::clone(&loaded));
    let features = Features::new(options).with_progress(move |event| match event {
        FeatureEvent::Extracted { .. } => {
            e.fetch_add(1, Ordering::Relaxed);
        }
        FeatureEvent::LoadedFromCache { .. } => {
            l.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    });

    let mut viewports = ViewportList::new();
    features.compute_configured(&mut scene, Some(&mut viewports))?;

    let views: Vec<ViewReport> = viewports
        .iter()
        .enumerate()
        .filter_map(|(id, vp)| {
            scene.view(id).map(|view| ViewReport {
                id,
                name: view.name().to_string(),
                width: vp.width,
                height: vp.height,
                features: vp.len(),
            })
        })
        .collect();
    let report = ExtractReport {
        feature_type,
        extracted: extracted.load(Ordering::Relaxed),
        loaded_from_cache: loaded.load(Ordering::Relaxed),
        views,
    };

    for view in &report.views {
        println!(
            "view {:>4} {:<24} {:>5}x{:<5} {:>6} {} features",
            view.id, view.name, view.width, view.height, view.features, report.feature_type
        );
    }
    info!(
        "extracted {} views, loaded {} from cache",
        report.extracted, report.loaded_from_cache
    );

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}
