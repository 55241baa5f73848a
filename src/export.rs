use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use eframe::egui;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::geometry::Placement;

/// Cuts the part of `image` under `stencil` at the image's own resolution.
/// Pixels outside the rounded corners become transparent.
pub fn render_crop(
    image: &DynamicImage,
    placement: Placement,
    stencil: egui::Rect,
    corner_radius: f32,
) -> Result<RgbaImage> {
    ensure!(placement.scale > 0.0, "scale must be positive");
    ensure!(
        image.width() > 0 && image.height() > 0,
        "image has no pixels"
    );

    let natural = egui::vec2(image.width() as f32, image.height() as f32);
    let bounds = placement.bounds(natural);
    let min = (stencil.min - bounds.min) / placement.scale;
    let size = stencil.size() / placement.scale;

    let x = (min.x.round().max(0.0) as u32).min(image.width() - 1);
    let y = (min.y.round().max(0.0) as u32).min(image.height() - 1);
    let width = (size.x.round().max(1.0) as u32).min(image.width() - x);
    let height = (size.y.round().max(1.0) as u32).min(image.height() - y);

    let mut cropped = image.crop_imm(x, y, width, height).to_rgba8();
    round_corners(&mut cropped, corner_radius / placement.scale);
    Ok(cropped)
}

/// Scales alpha by how much of each pixel lies inside a rounded rectangle
/// spanning the whole buffer.
fn round_corners(buffer: &mut RgbaImage, radius: f32) {
    let (width, height) = (buffer.width() as f32, buffer.height() as f32);
    let radius = radius.min(width * 0.5).min(height * 0.5);
    if radius <= 0.0 {
        return;
    }

    for (px, py, pixel) in buffer.enumerate_pixels_mut() {
        let x = px as f32 + 0.5;
        let y = py as f32 + 0.5;
        let cx = x.clamp(radius, width - radius);
        let cy = y.clamp(radius, height - radius);
        let distance = egui::pos2(x, y).distance(egui::pos2(cx, cy));
        let coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
        if coverage < 1.0 {
            pixel[3] = (pixel[3] as f32 * coverage).round() as u8;
        }
    }
}

pub fn pick_save_path(suggested_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Save cropped image")
        .set_file_name(suggested_name)
        .add_filter("PNG", &["png"])
        .save_file()
}

pub fn save_png(buffer: &RgbaImage, path: &Path) -> Result<()> {
    buffer
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("cannot save png to {}", path.display()))
}

/// `holiday.jpg` becomes `holiday-cropped.png`.
pub fn suggested_file_name(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("image");
    format!("{stem}-cropped.png")
}
