//! Configuration persistence for pixlens settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{SelectionMode, sanitize_percentage};

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl OverlayColor {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to 8-bit RGBA (0-255), clamping out-of-range channels
    pub fn to_rgba_u8(self) -> [u8; 4] {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b), c(self.a)]
    }
}

/// Neon green used for active and confirmed selections
pub const ACCENT: OverlayColor = OverlayColor::rgba(57.0 / 255.0, 1.0, 20.0 / 255.0, 1.0);
/// Muted white used for the previous-crop ghost
pub const HISTORY: OverlayColor = OverlayColor::rgba(1.0, 1.0, 1.0, 0.7);

/// Viewer configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Stroke color of the active or confirmed selection
    pub accent_color: OverlayColor,
    /// Stroke color of the previous-crop ghost
    pub history_color: OverlayColor,
    /// Selection outline width in logical pixels
    pub stroke_width: f32,
    /// Dash pattern (on, off, ...) for the active selection outline
    pub dash: Vec<f32>,
    /// TrueType/OpenType font for overlay labels; no font draws only the label box
    pub label_font: Option<PathBuf>,
    /// Label font size in logical pixels
    pub label_font_size: f32,
    /// Zoom factor per wheel notch
    pub wheel_zoom_step: f64,
    /// Zoom factor for the zoom-in/zoom-out controls
    pub button_zoom_step: f64,
    /// Free-drag selections thinner than this (either axis) are discarded
    pub min_selection_size: f64,
    /// Duration of the confirmation pulse in milliseconds
    pub confirm_duration_ms: u64,
    /// Start in fixed-box selection mode
    pub use_fixed_selection_box: bool,
    /// Fixed box size as a fraction of the image size, in (0, 1]
    pub fixed_selection_size_percentage: f64,
    /// Physical pixels per logical pixel of the canvas
    pub device_pixel_ratio: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            accent_color: ACCENT,
            history_color: HISTORY,
            stroke_width: 2.0,
            dash: vec![5.0, 5.0],
            label_font: None,
            label_font_size: 10.0,
            wheel_zoom_step: 1.1,
            button_zoom_step: 1.2,
            min_selection_size: 10.0,
            confirm_duration_ms: 400,
            use_fixed_selection_box: false,
            fixed_selection_size_percentage: 0.2,
            device_pixel_ratio: 1.0,
        }
    }
}

impl ViewerConfig {
    /// Directory name under the user config dir
    pub const ID: &'static str = "pixlens";

    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            log::error!("No config directory available, not saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    /// Read and sanitize a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Replace out-of-range values with usable ones
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.fixed_selection_size_percentage =
            sanitize_percentage(self.fixed_selection_size_percentage);
        if !(self.wheel_zoom_step.is_finite() && self.wheel_zoom_step > 1.0) {
            self.wheel_zoom_step = defaults.wheel_zoom_step;
        }
        if !(self.button_zoom_step.is_finite() && self.button_zoom_step > 1.0) {
            self.button_zoom_step = defaults.button_zoom_step;
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            self.device_pixel_ratio = defaults.device_pixel_ratio;
        }
        if !(self.stroke_width.is_finite() && self.stroke_width > 0.0) {
            self.stroke_width = defaults.stroke_width;
        }
        if !(self.label_font_size.is_finite() && self.label_font_size > 0.0) {
            self.label_font_size = defaults.label_font_size;
        }
        if !self.min_selection_size.is_finite() || self.min_selection_size < 0.0 {
            self.min_selection_size = defaults.min_selection_size;
        }
        self
    }

    /// Selection mode implied by the fixed-box flag and percentage
    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_flags(
            self.use_fixed_selection_box,
            self.fixed_selection_size_percentage,
        )
    }
}
