use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use eframe::egui;
use serde::{Deserialize, Serialize};

/// The rounded-rectangle frame the photo is cropped against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilConfig {
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    pub stroke_color: [u8; 4],
    pub stroke_width: f32,
    pub fill: [u8; 4],
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 400.0,
            corner_radius: 30.0,
            stroke_color: [0xcc, 0xcc, 0xcc, 0xff],
            stroke_width: 2.0,
            fill: [0, 0, 0, 0],
        }
    }
}

impl StencilConfig {
    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.width, self.height)
    }

    pub fn stroke(&self) -> egui::Stroke {
        egui::Stroke::new(self.stroke_width, color(self.stroke_color))
    }

    pub fn fill_color(&self) -> egui::Color32 {
        color(self.fill)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub background: [u8; 4],
    /// Upper bound for the drawing surface width, in logical pixels.
    pub max_width: f32,
    /// Height as a fraction of width.
    pub aspect_ratio: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            background: [0xee, 0xee, 0xee, 0xff],
            max_width: 800.0,
            aspect_ratio: 0.75,
        }
    }
}

impl CanvasConfig {
    pub fn background_color(&self) -> egui::Color32 {
        color(self.background)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub button_in: f32,
    pub button_out: f32,
    pub wheel_in: f32,
    pub wheel_out: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            button_in: 1.1,
            button_out: 0.9,
            wheel_in: 1.01,
            wheel_out: 0.99,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub stencil: StencilConfig,
    pub canvas: CanvasConfig,
    pub zoom: ZoomConfig,
}

impl EditorConfig {
    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "stencil-editor", "stencil-editor")?;
        Some(dirs.config_dir().join("config.json"))
    }

    /// Reads the config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::file_path() else {
            log::debug!("no config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("ignoring config at {}: {err:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("invalid config json")?;
        Ok(config.validated())
    }

    /// Replaces sections holding unusable values with their defaults.
    pub fn validated(mut self) -> Self {
        let stencil = &self.stencil;
        if !(stencil.width > 0.0 && stencil.height > 0.0) || stencil.corner_radius < 0.0 {
            log::warn!(
                "stencil {}x{} r{} is not usable, using defaults",
                stencil.width,
                stencil.height,
                stencil.corner_radius
            );
            self.stencil = StencilConfig::default();
        }

        let canvas = &self.canvas;
        if !(canvas.max_width > 0.0 && canvas.aspect_ratio > 0.0) {
            log::warn!("canvas config is not usable, using defaults");
            self.canvas = CanvasConfig::default();
        }

        let zoom = &self.zoom;
        let factors = [zoom.button_in, zoom.button_out, zoom.wheel_in, zoom.wheel_out];
        if factors.iter().any(|factor| !(*factor > 0.0)) {
            log::warn!("zoom factors must be positive, using defaults");
            self.zoom = ZoomConfig::default();
        }
        self
    }
}

fn color(rgba: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}
