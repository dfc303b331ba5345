use anyhow::{Context, Result};
use directories::ProjectDirs;
use facefit_vision::{FramingParams, SearchParams};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config location at runtime.
pub const CONFIG_ENV: &str = "FACEFIT_CONFIG";

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("FACEFIT_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("", "", "facefit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/facefit/config.toml"))
});

/// Config file in effect: `FACEFIT_CONFIG` if set, else [`CONFIG_PATH`].
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => CONFIG_PATH.clone(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub detector: DetectorConfig,
    pub framing: FramingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub outer_frame_ratio: f64,
    pub base_growth: f64,
    pub shrink_delta: f64,
    pub shrink_min_delta: f64,
    pub center_steps: usize,
    pub size_steps: usize,
    pub size_min_ratio: f64,
    pub size_max_ratio: f64,
    pub tolerance_ratio: f64,
    pub min_face_factor: f64,
    pub accept_unstable_size: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let p = SearchParams::default();
        Self {
            outer_frame_ratio: p.outer_frame_ratio,
            base_growth: p.base_growth,
            shrink_delta: p.shrink_delta,
            shrink_min_delta: p.shrink_min_delta,
            center_steps: p.center_steps,
            size_steps: p.size_steps,
            size_min_ratio: p.size_min_ratio,
            size_max_ratio: p.size_max_ratio,
            tolerance_ratio: p.tolerance_ratio,
            min_face_factor: p.min_face_factor,
            accept_unstable_size: p.accept_unstable_size,
        }
    }
}

impl SearchConfig {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            outer_frame_ratio: self.outer_frame_ratio,
            base_growth: self.base_growth,
            shrink_delta: self.shrink_delta,
            shrink_min_delta: self.shrink_min_delta,
            center_steps: self.center_steps,
            size_steps: self.size_steps,
            size_min_ratio: self.size_min_ratio,
            size_max_ratio: self.size_max_ratio,
            tolerance_ratio: self.tolerance_ratio,
            min_face_factor: self.min_face_factor,
            accept_unstable_size: self.accept_unstable_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// YuNet ONNX model file.
    pub model: PathBuf,
    /// Integer factor each probe is shrunk by before detection.
    pub downsample: u32,
    pub score_threshold: f32,
    pub nms_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/face_detection_yunet_2023mar.onnx"),
            downsample: 2,
            score_threshold: 0.6,
            nms_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    pub face_crop_ratio: f64,
    pub min_crop_width: i32,
    pub min_face_fraction: f64,
    pub tolerance_fraction: f64,
    /// Images are downscaled to fit these bounds (transposed for portrait
    /// images) before searching.
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        let p = FramingParams::default();
        Self {
            face_crop_ratio: p.face_crop_ratio,
            min_crop_width: p.min_crop_width,
            min_face_fraction: p.min_face_fraction,
            tolerance_fraction: p.tolerance_fraction,
            max_width: facefit_vision::framing::STANDARD_WIDTH,
            max_height: facefit_vision::framing::STANDARD_HEIGHT,
        }
    }
}

impl FramingConfig {
    pub fn params(&self) -> FramingParams {
        FramingParams {
            face_crop_ratio: self.face_crop_ratio,
            min_crop_width: self.min_crop_width,
            min_face_fraction: self.min_face_fraction,
            tolerance_fraction: self.tolerance_fraction,
        }
    }
}

impl Config {
    /// Model file, with relative paths resolved against the directory of
    /// `config_file`.
    pub fn model_path(&self, config_file: &Path) -> PathBuf {
        if self.detector.model.is_absolute() {
            return self.detector.model.clone();
        }
        config_file
            .parent()
            .map(|dir| dir.join(&self.detector.model))
            .unwrap_or_else(|| self.detector.model.clone())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let default_path = config_path();
    let path = path.unwrap_or(default_path.as_path());
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let default_path = config_path();
    let path = path.unwrap_or(default_path.as_path());
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}
