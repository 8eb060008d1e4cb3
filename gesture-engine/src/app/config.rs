//! Configuration Management

use crate::classifier::model::TrainingParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture settings
    pub capture: CaptureConfig,
    /// Path feature settings
    pub features: FeatureConfig,
    /// Training hyperparameters
    pub training: TrainingConfig,
    /// Detection settings
    pub detection: DetectionConfig,
    /// Where gestures and models are stored
    pub storage: StorageConfig,
    /// Classifiers created on first start
    pub classifiers: ClassifiersConfig,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples a capture needs to become an example
    pub min_samples: usize,
    /// Pose ring buffer size
    pub ring_buffer_size: usize,
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Points per resampled path
    pub resample_points: usize,
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    pub weight_decay: f32,
    /// Early stop threshold on mean cross-entropy
    pub target_loss: f32,
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum probability for a match
    pub confidence_floor: f32,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Classifier registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifiersConfig {
    pub default_names: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            ring_buffer_size: 1024,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            resample_points: crate::analysis::DEFAULT_RESAMPLE_POINTS,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let params = TrainingParams::default();
        Self {
            epochs: params.epochs,
            learning_rate: params.learning_rate,
            weight_decay: params.weight_decay,
            target_loss: params.target_loss,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.6,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: Config::base_dir().join("data"),
        }
    }
}

impl Default for ClassifiersConfig {
    fn default() -> Self {
        Self {
            default_names: vec!["net1".to_string()],
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let size = self.capture.ring_buffer_size;
        if size == 0 || !size.is_power_of_two() {
            return Err(crate::Error::Config(format!(
                "ring_buffer_size must be a power of 2, got {}",
                size
            )));
        }
        if self.capture.min_samples < crate::analysis::MIN_PATH_SAMPLES {
            return Err(crate::Error::Config(format!(
                "min_samples must be at least {}, got {}",
                crate::analysis::MIN_PATH_SAMPLES,
                self.capture.min_samples
            )));
        }
        let range = crate::analysis::RESAMPLE_POINTS_RANGE;
        if !range.contains(&self.features.resample_points) {
            return Err(crate::Error::Config(format!(
                "resample_points must be in [{}, {}], got {}",
                range.start(),
                range.end(),
                self.features.resample_points
            )));
        }
        if self.training.epochs == 0 {
            return Err(crate::Error::Config("epochs must be > 0".to_string()));
        }
        if !(self.training.learning_rate > 0.0 && self.training.learning_rate <= 10.0) {
            return Err(crate::Error::Config(format!(
                "learning_rate must be in (0, 10], got {}",
                self.training.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.training.weight_decay) {
            return Err(crate::Error::Config(format!(
                "weight_decay must be in [0, 1), got {}",
                self.training.weight_decay
            )));
        }
        if !(self.training.target_loss >= 0.0) {
            return Err(crate::Error::Config(format!(
                "target_loss must be >= 0, got {}",
                self.training.target_loss
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.confidence_floor) {
            return Err(crate::Error::Config(format!(
                "confidence_floor must be in [0, 1], got {}",
                self.detection.confidence_floor
            )));
        }
        if let Some(name) = self
            .classifiers
            .default_names
            .iter()
            .find(|n| n.trim().is_empty())
        {
            return Err(crate::Error::Config(format!(
                "classifier names must not be empty, got {:?}",
                name
            )));
        }
        Ok(())
    }

    /// Hyperparameters for a training run
    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            epochs: self.training.epochs,
            learning_rate: self.training.learning_rate,
            weight_decay: self.training.weight_decay,
            target_loss: self.training.target_loss,
            resample_points: self.features.resample_points,
        }
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Directory holding config and data
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".gesture_engine"))
            .unwrap_or_else(|| PathBuf::from(".gesture_engine"))
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capture.min_samples, 10);
        assert_eq!(config.capture.ring_buffer_size, 1024);
        assert_eq!(config.features.resample_points, 11);
        assert_eq!(config.detection.confidence_floor, 0.6);
        assert_eq!(config.classifiers.default_names, vec!["net1".to_string()]);
    }

    #[test]
    fn test_training_defaults_match_params() {
        let config = Config::default();
        assert_eq!(config.training_params(), TrainingParams::default());
    }

    #[test]
    fn test_config_serialization() {
        let toml = Config::default().to_toml().unwrap();
        for section in ["[capture]", "[features]", "[training]", "[detection]", "[storage]", "[classifiers]"] {
            assert!(toml.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.ends_with(".gesture_engine/config.toml"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.capture.min_samples = 25;
        original.training.epochs = 50;
        original.detection.confidence_floor = 0.75;
        original.storage.data_dir = temp_dir.path().join("data");

        original.save(&config_path).expect("Failed to save config");
        let loaded = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded.capture.min_samples, 25);
        assert_eq!(loaded.training.epochs, 50);
        assert_eq!(loaded.detection.confidence_floor, 0.75);
        assert_eq!(loaded.storage.data_dir, temp_dir.path().join("data"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[detection]
confidence_floor = 0.9
"#,
        )
        .expect("Partial config should deserialize");

        assert_eq!(config.detection.confidence_floor, 0.9);
        assert_eq!(config.capture.min_samples, 10);
        assert_eq!(config.training.epochs, 400);
        assert_eq!(config.classifiers.default_names, vec!["net1".to_string()]);
    }

    #[test]
    fn test_invalid_toml_parsing() {
        let result: Result<Config, _> = toml::from_str("this is not valid toml {{{}}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_ring_buffer_not_power_of_two() {
        let mut config = Config::default();
        config.capture.ring_buffer_size = 1000;
        assert!(config.validate().is_err());
        config.capture.ring_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_min_samples() {
        let mut config = Config::default();
        config.capture.min_samples = 1;
        assert!(config.validate().is_err());
        config.capture.min_samples = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_training_values() {
        let mut config = Config::default();
        config.training.epochs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.weight_decay = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.target_loss = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_confidence_floor_boundaries() {
        let mut config = Config::default();
        config.detection.confidence_floor = 0.0;
        assert!(config.validate().is_ok());
        config.detection.confidence_floor = 1.0;
        assert!(config.validate().is_ok());
        config.detection.confidence_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_classifier_name() {
        let mut config = Config::default();
        config.classifiers.default_names.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_values() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("bad_config.toml");
        std::fs::write(
            &config_path,
            r#"
[features]
resample_points = 1
"#,
        )
        .expect("Failed to write config");
        assert!(matches!(Config::load(&config_path), Err(crate::Error::Config(_))));
    }
}
