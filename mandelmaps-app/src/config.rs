use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use mandelmaps_render::{ColorMapper, RenderSettings, Spiral};

/// Colour scheme applied to every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    /// Each family's own cosine ramp.
    #[default]
    Cosine,
    Spiral,
}

impl ColorScheme {
    /// Override to install on the coordinator; `None` keeps the family defaults.
    pub fn mapper(self) -> Option<Arc<dyn ColorMapper>> {
        match self {
            Self::Cosine => None,
            Self::Spiral => Some(Arc::new(Spiral)),
        }
    }
}

/// Settings of the headless driver, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Multiplier on the zoom-scaled iteration budget. 1.0 is neutral.
    #[serde(default = "default_contrast")]
    pub contrast: f64,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    /// Pixel of the dragged Mandelbrot view whose plane point seeds the Julia render.
    #[serde(default = "default_julia_pick_x")]
    pub julia_pick_x: f64,
    #[serde(default = "default_julia_pick_y")]
    pub julia_pick_y: f64,
    /// Drag applied between the first and second Mandelbrot renders.
    #[serde(default = "default_pan_dx")]
    pub pan_dx: i32,
    #[serde(default = "default_pan_dy")]
    pub pan_dy: i32,
    /// Zoom factor of the final close-up, anchored at the Julia pick pixel.
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f64,
    #[serde(default)]
    pub render: RenderSettings,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_contrast() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_julia_pick_x() -> f64 {
    500.0
}
fn default_julia_pick_y() -> f64 {
    135.0
}
fn default_pan_dx() -> i32 {
    40
}
fn default_pan_dy() -> i32 {
    -25
}
fn default_zoom_factor() -> f64 {
    16.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            contrast: default_contrast(),
            color_scheme: ColorScheme::default(),
            show_progress: true,
            julia_pick_x: default_julia_pick_x(),
            julia_pick_y: default_julia_pick_y(),
            pan_dx: default_pan_dx(),
            pan_dy: default_pan_dy(),
            zoom_factor: default_zoom_factor(),
            render: RenderSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load the config at `path`, falling back to defaults when it is
    /// missing or unreadable. A missing file is created with the defaults so
    /// there is something to edit.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        error!("Failed to parse config: {e}");
                    }
                },
                Err(e) => {
                    error!("Failed to read config file: {e}");
                }
            }
        } else {
            debug!("No config file at {}; writing defaults", path.display());
            Self::default().save(path);
        }
        Self::default()
    }

    /// Persist the config to `path`.
    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write config: {e}");
                } else {
                    debug!("Saved config to {}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize config: {e}"),
        }
    }
}
