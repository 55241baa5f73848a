use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::{Context, Result, bail};
use eframe::egui;
use image::DynamicImage;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Raw encoded bytes of a picked or dropped file, plus a display name.
#[derive(Clone)]
pub struct ImageSource {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageSource {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    /// Dropped files carry a path on native targets and bytes on the web.
    pub fn from_dropped(file: &egui::DroppedFile) -> Result<Self> {
        if let Some(path) = &file.path {
            return Self::read(path);
        }
        if let Some(bytes) = &file.bytes {
            return Ok(Self::from_bytes(file.name.clone(), bytes.clone()));
        }
        bail!("dropped file {:?} has neither a path nor contents", file.name)
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.bytes)
            .with_context(|| format!("cannot decode {}", self.name))
    }
}

pub fn pick_image_file() -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Image", IMAGE_EXTENSIONS)
        .pick_file()
}

pub fn to_texture(ctx: &egui::Context, image: &DynamicImage) -> egui::TextureHandle {
    let size = [image.width() as _, image.height() as _];
    let image_buffer = image.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    ctx.load_texture("photo", color_image, egui::TextureOptions::LINEAR)
}

pub struct Decoded {
    pub generation: u64,
    pub result: Result<DynamicImage>,
}

/// Decodes sources off the UI thread. Only the most recent request is
/// tracked; replacing it drops the receiver so older results are discarded.
#[derive(Default)]
pub struct ImageLoader {
    pending: Option<(u64, Receiver<Decoded>)>,
}

impl ImageLoader {
    pub fn start(&mut self, ctx: &egui::Context, source: ImageSource, generation: u64) {
        let (tx, rx) = mpsc::channel();
        let ctx = ctx.clone();
        log::info!("loading image {} ({} bytes)", source.name, source.bytes.len());
        std::thread::spawn(move || {
            let result = source.decode();
            // receiver is gone when a newer image was requested
            let _ = tx.send(Decoded { generation, result });
            ctx.request_repaint();
        });
        self.pending = Some((generation, rx));
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self) -> Option<Decoded> {
        let (generation, rx) = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(decoded) => {
                self.pending = None;
                Some(decoded)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                let generation = *generation;
                self.pending = None;
                Some(Decoded {
                    generation,
                    result: Err(anyhow::anyhow!("image decoder stopped unexpectedly")),
                })
            }
        }
    }
}
