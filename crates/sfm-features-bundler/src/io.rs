//! JSON helpers for [`FeaturesOptions`].

use std::{fs, path::Path};

use crate::FeaturesOptions;

#[derive(thiserror::Error, Debug)]
pub enum FeaturesIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FeaturesOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FeaturesIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write these options to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FeaturesIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureType;

    #[test]
    fn options_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("features.json");

        let mut options = FeaturesOptions {
            feature_embedding: "original-sift".into(),
            max_image_size: 1_000_000,
            num_threads: Some(2),
            ..FeaturesOptions::default()
        };
        options.sift.contrast_threshold = Some(0.01);
        options.write_json(&path).expect("write");

        assert_eq!(FeaturesOptions::load_json(&path).expect("load"), options);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "feature_type": "surf", "skip_saving_views": true }"#)
            .expect("write");

        let options = FeaturesOptions::load_json(&path).expect("load");
        assert_eq!(options.feature_type, FeatureType::Surf);
        assert!(options.skip_saving_views);
        assert_eq!(options.image_embedding, "original");
        assert_eq!(options.max_image_size, 6_000_000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            FeaturesOptions::load_json(dir.path().join("absent.json")),
            Err(FeaturesIoError::Io(_))
        ));
    }
}
