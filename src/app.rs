use anyhow::{Context as _, Result};
use eframe::egui;
use image::DynamicImage;

use crate::config::EditorConfig;
use crate::export;
use crate::loader::{self, ImageLoader, ImageSource};
use crate::store::{Action, EditorStore};
use crate::surface::{DrawingSurface, SYNC_TOLERANCE};

const PADDING: f32 = 15.0;

/// Decoded pixels of the current source and their GPU texture.
struct Photo {
    image: DynamicImage,
    texture: egui::TextureHandle,
}

struct Status {
    text: String,
    is_error: bool,
}

pub struct StencilEditorApp {
    config: EditorConfig,
    store: EditorStore,
    surface: DrawingSurface,
    loader: ImageLoader,
    photo: Option<Photo>,
    /// Source generation the surface and loader currently follow.
    shown_generation: u64,
    status: Option<Status>,
}

impl StencilEditorApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: EditorConfig) -> Self {
        log::info!("initializing drawing surface");
        Self {
            store: EditorStore::new(config.stencil.clone()),
            surface: DrawingSurface::new(config.stencil.clone()),
            loader: ImageLoader::default(),
            photo: None,
            shown_generation: 0,
            status: None,
            config,
        }
    }

    fn set_error(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.status = Some(Status {
            text: format!("{err:#}"),
            is_error: true,
        });
    }

    fn set_info(&mut self, text: String) {
        self.status = Some(Status {
            text,
            is_error: false,
        });
    }

    fn upload(&mut self, source: ImageSource) {
        log::info!("selected {}", source.name);
        self.status = None;
        self.store.dispatch(Action::SetImageSource(source));
    }

    fn open_image(&mut self) {
        let Some(path) = loader::pick_image_file() else {
            return;
        };
        match ImageSource::read(&path) {
            Ok(source) => self.upload(source),
            Err(err) => self.set_error(err),
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped_files.first() {
            match ImageSource::from_dropped(file) {
                Ok(source) => self.upload(source),
                Err(err) => self.set_error(err),
            }
        }
    }

    /// Starts decoding whenever the store holds a source the surface has not
    /// seen yet, and drops the previous image right away.
    fn follow_image_source(&mut self, ctx: &egui::Context) {
        let state = self.store.state();
        if state.source_generation == self.shown_generation {
            return;
        }
        self.shown_generation = state.source_generation;
        let source = state.image_source.clone();

        self.surface.clear_image();
        self.photo = None;
        if let Some(source) = source {
            self.loader.start(ctx, source, self.shown_generation);
        }
    }

    fn receive_decoded(&mut self, ctx: &egui::Context) {
        let Some(decoded) = self.loader.poll() else {
            return;
        };
        if decoded.generation != self.shown_generation {
            log::debug!("dropping stale image generation {}", decoded.generation);
            return;
        }
        match decoded.result {
            Ok(image) => {
                log::info!("image loaded: {}x{}", image.width(), image.height());
                let texture = loader::to_texture(ctx, &image);
                self.photo = Some(Photo { image, texture });
            }
            Err(err) => self.set_error(err),
        }
    }

    /// Puts a freshly decoded photo on the surface once the stencil exists.
    fn place_pending_photo(&mut self) {
        let Some(photo) = &self.photo else {
            return;
        };
        if self.surface.image().is_some() {
            return;
        }
        let natural = photo.texture.size_vec2();
        if let Some(initial) = self.surface.place_image(natural) {
            self.store.dispatch(Action::SetInitialPlacement(initial));
        }
    }

    fn zoom(&mut self, factor: f32) {
        if let Some(placement) = self.surface.zoom_by(factor) {
            self.store.dispatch(Action::SetPlacement(placement));
        }
    }

    fn reset(&mut self) {
        log::info!("reset requested");
        self.store.dispatch(Action::Reset);
    }

    fn save_crop(&mut self) -> Result<()> {
        let (Some(photo), Some(image), Some(stencil)) = (
            &self.photo,
            self.surface.image(),
            self.surface.stencil_rect(),
        ) else {
            return Ok(());
        };
        let crop = export::render_crop(
            &photo.image,
            image.placement,
            stencil,
            self.store.state().stencil.corner_radius,
        )
        .context("cannot crop image")?;

        let name = self
            .store
            .state()
            .image_source
            .as_ref()
            .map(|source| export::suggested_file_name(&source.name))
            .unwrap_or_else(|| export::suggested_file_name(""));
        let Some(path) = export::pick_save_path(&name) else {
            return Ok(());
        };
        export::save_png(&crop, &path)?;
        log::info!("saved {}x{} crop to {}", crop.width(), crop.height(), path.display());
        self.set_info(format!("Saved {}", path.display()));
        Ok(())
    }

    fn canvas_size(&self, available_width: f32) -> egui::Vec2 {
        let canvas = &self.config.canvas;
        let width = available_width.min(canvas.max_width).max(0.0).floor();
        egui::vec2(width, (width * canvas.aspect_ratio).floor())
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let size = self.canvas_size(ui.available_width() - PADDING * 2.0);
        let x_offset = ((ui.available_width() - size.x) / 2.0).max(0.0);
        let start_pos = ui.cursor().min + egui::vec2(x_offset, 0.0);
        let target_rect = egui::Rect::from_min_size(start_pos, size);
        let response = ui.allocate_rect(target_rect, egui::Sense::click_and_drag());
        let origin = target_rect.min.to_vec2();

        if let Some(placement) = self.surface.resize(size) {
            let center = self.surface.center();
            self.store.dispatch(Action::SetPlacement(placement));
            self.store.dispatch(Action::Recenter {
                left: center.x,
                top: center.y,
            });
        }
        self.place_pending_photo();

        if response.drag_started() {
            if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
                self.surface.begin_drag(pos - origin);
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.surface.drag_to(pos - origin);
            }
        }
        if response.drag_stopped() {
            if let Some(placement) = self.surface.end_drag() {
                log::debug!("image moved to {placement:?}");
                self.store.dispatch(Action::SetPlacement(placement));
            }
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.surface.begin_drag(pos - origin);
                self.surface.end_drag();
            }
        }

        if let Some(pos) = response.hover_pos() {
            let notches: Vec<f32> = ui.input(|i| {
                i.raw
                    .events
                    .iter()
                    .filter_map(|event| match event {
                        egui::Event::MouseWheel { delta, .. } => Some(delta.y),
                        _ => None,
                    })
                    .collect()
            });
            if let Some(placement) =
                self.surface
                    .wheel_events(pos - origin, &notches, &self.config.zoom)
            {
                self.store.dispatch(Action::SetScale(placement.scale));
                self.store.dispatch(Action::SetPosition {
                    left: placement.left,
                    top: placement.top,
                });
            }
            if self.surface.is_dragging() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
            } else if self.surface.hit_test(pos - origin) {
                ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
            }
        }

        if let Some(clamped) = self.surface.sync_from(self.store.state().placement) {
            self.store.dispatch(Action::SetPlacement(clamped));
        }

        let painter = ui.painter_at(target_rect);
        self.surface.paint(
            &painter,
            target_rect,
            self.config.canvas.background_color(),
            self.photo.as_ref().map(|photo| photo.texture.id()),
        );
        painter.rect_stroke(
            target_rect,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::from_gray(0xaa)),
        );
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        let has_image = self.store.state().has_image();
        let zoom = self.config.zoom.clone();

        ui.horizontal_wrapped(|ui| {
            if ui.button("Upload Image").clicked() {
                self.open_image();
            }
            if ui
                .add_enabled(has_image, egui::Button::new("Zoom In (+)"))
                .clicked()
            {
                self.zoom(zoom.button_in);
            }
            if ui
                .add_enabled(has_image, egui::Button::new("Zoom Out (-)"))
                .clicked()
            {
                self.zoom(zoom.button_out);
            }
            if ui
                .add_enabled(has_image, egui::Button::new("Reset Image"))
                .clicked()
            {
                self.reset();
            }
            let can_save = self.photo.is_some() && self.surface.image().is_some();
            if ui
                .add_enabled(can_save, egui::Button::new("Save Crop"))
                .clicked()
            {
                if let Err(err) = self.save_crop() {
                    self.set_error(err);
                }
            }
            if self.loader.is_loading() {
                ui.spinner();
            }
        });

        if let Some(status) = &self.status {
            let text = egui::RichText::new(&status.text);
            if status.is_error {
                ui.label(text.color(ui.visuals().error_fg_color));
            } else {
                ui.label(text);
            }
        }
    }
}

impl eframe::App for StencilEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.follow_image_source(ctx);
        self.receive_decoded(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Stencil Editor");
            ui.add_space(PADDING);
            self.show_canvas(ui);
            ui.add_space(PADDING);
            self.show_controls(ui);
        });

        // a reset or upload dispatched by the controls shows up next frame
        self.follow_image_source(ctx);
        let placement = self.store.state().placement;
        if self
            .surface
            .image()
            .is_some_and(|image| image.placement.differs_from(&placement, SYNC_TOLERANCE))
        {
            ctx.request_repaint();
        }
    }
}
