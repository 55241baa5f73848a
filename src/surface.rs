use eframe::egui;

use crate::config::{StencilConfig, ZoomConfig};
use crate::geometry::{self, Placement};

/// Store placements closer than this are treated as already applied.
pub const SYNC_TOLERANCE: f32 = 0.001;

const SELECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(178, 204, 255);

/// The user's photo as it sits on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageObject {
    pub natural_size: egui::Vec2,
    pub placement: Placement,
}

impl ImageObject {
    pub fn bounds(&self) -> egui::Rect {
        self.placement.bounds(self.natural_size)
    }
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    start_pointer: egui::Pos2,
    start_center: egui::Pos2,
}

/// Interactive drawing surface: a centered stencil and at most one image.
///
/// All coordinates are relative to the surface's top-left corner. Input
/// handlers return the placement the store should record, or `None` when
/// nothing changed or there is nothing to act on.
pub struct DrawingSurface {
    size: egui::Vec2,
    stencil_config: StencilConfig,
    stencil: Option<egui::Rect>,
    image: Option<ImageObject>,
    drag: Option<DragState>,
    /// The image shows its selection outline while active.
    active: bool,
}

impl DrawingSurface {
    pub fn new(stencil_config: StencilConfig) -> Self {
        Self {
            size: egui::Vec2::ZERO,
            stencil_config,
            stencil: None,
            image: None,
            drag: None,
            active: false,
        }
    }

    pub fn stencil_rect(&self) -> Option<egui::Rect> {
        self.stencil
    }

    pub fn image(&self) -> Option<&ImageObject> {
        self.image.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn center(&self) -> egui::Pos2 {
        (self.size * 0.5).to_pos2()
    }

    /// Follows the container size. Creates the stencil on the first non-empty
    /// size and recenters it afterwards; an existing image is recentered on
    /// the stencil and re-clamped.
    pub fn resize(&mut self, size: egui::Vec2) -> Option<Placement> {
        // a collapsed container keeps the last usable size and stencil
        if size == self.size || size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }
        self.size = size;

        let center = self.center();
        let stencil = egui::Rect::from_center_size(center, self.stencil_config.size());
        if self.stencil.is_none() {
            log::debug!("creating stencil {:?} on {}x{} surface", stencil, size.x, size.y);
        } else {
            log::debug!("resized surface to {}x{}, recentering stencil", size.x, size.y);
        }
        self.stencil = Some(stencil);

        let image = self.image.as_mut()?;
        let centered = Placement {
            left: center.x,
            top: center.y,
            ..image.placement
        };
        image.placement = geometry::constrain(centered, image.natural_size, stencil);
        Some(image.placement)
    }

    /// Replaces any current image with one of `natural_size`, cover-fitted
    /// and centered on the stencil. Returns the initial placement.
    pub fn place_image(&mut self, natural_size: egui::Vec2) -> Option<Placement> {
        let stencil = self.stencil?;
        let placement = geometry::cover_fit(stencil, natural_size);
        log::info!(
            "placing {}x{} image at scale {:.4}",
            natural_size.x,
            natural_size.y,
            placement.scale
        );
        self.image = Some(ImageObject {
            natural_size,
            placement,
        });
        self.drag = None;
        self.active = true;
        Some(placement)
    }

    pub fn clear_image(&mut self) {
        self.image = None;
        self.drag = None;
        self.active = false;
    }

    /// True when `pos` falls on the image. The stencil never takes input.
    pub fn hit_test(&self, pos: egui::Pos2) -> bool {
        self.image.is_some_and(|image| image.bounds().contains(pos))
    }

    /// Pointer pressed. Grabs the image when it is under the pointer,
    /// otherwise deselects it.
    pub fn begin_drag(&mut self, pointer: egui::Pos2) -> bool {
        match self.image {
            Some(image) if self.hit_test(pointer) => {
                self.drag = Some(DragState {
                    start_pointer: pointer,
                    start_center: image.placement.center(),
                });
                self.active = true;
                true
            }
            _ => {
                self.drag = None;
                self.active = false;
                false
            }
        }
    }

    /// The image follows the pointer relative to where the drag started,
    /// clamped so the stencil stays covered.
    pub fn drag_to(&mut self, pointer: egui::Pos2) {
        let (Some(drag), Some(stencil), Some(image)) =
            (self.drag, self.stencil, self.image.as_mut())
        else {
            return;
        };
        let candidate = drag.start_center + (pointer - drag.start_pointer);
        let center = geometry::clamp_center(
            candidate,
            image.natural_size * image.placement.scale,
            stencil,
        );
        image.placement.left = center.x;
        image.placement.top = center.y;
    }

    /// Pointer released. Returns the final placement of a drag.
    pub fn end_drag(&mut self) -> Option<Placement> {
        self.drag.take()?;
        self.image.map(|image| image.placement)
    }

    /// Multiplies the scale, clamping to the cover floor and re-clamping
    /// the position.
    pub fn zoom_by(&mut self, factor: f32) -> Option<Placement> {
        let stencil = self.stencil?;
        let image = self.image.as_mut()?;
        image.placement = geometry::zoom(image.placement, factor, image.natural_size, stencil);
        Some(image.placement)
    }

    /// Wheel input. Only zooms while the pointer is over the image; a
    /// positive `scroll_y` (wheel away from the user) zooms in.
    pub fn wheel(
        &mut self,
        pointer: egui::Pos2,
        scroll_y: f32,
        zoom: &ZoomConfig,
    ) -> Option<Placement> {
        if scroll_y == 0.0 || !self.hit_test(pointer) {
            return None;
        }
        let factor = if scroll_y > 0.0 {
            zoom.wheel_in
        } else {
            zoom.wheel_out
        };
        self.zoom_by(factor)
    }

    /// Applies one zoom step per wheel event delivered in a frame. Returns
    /// the placement after the last step that was applied.
    pub fn wheel_events(
        &mut self,
        pointer: egui::Pos2,
        scroll_ys: &[f32],
        zoom: &ZoomConfig,
    ) -> Option<Placement> {
        let mut latest = None;
        for &scroll_y in scroll_ys {
            if let Some(placement) = self.wheel(pointer, scroll_y, zoom) {
                latest = Some(placement);
            }
        }
        latest
    }

    /// Adopts a placement coming from the store when it differs from what
    /// the surface shows, then re-applies the pan constraint. Returns the
    /// clamped placement when clamping moved it away from `placement`.
    ///
    /// Ignored mid-drag: the store only learns the position on release.
    pub fn sync_from(&mut self, placement: Placement) -> Option<Placement> {
        if self.drag.is_some() {
            return None;
        }
        let stencil = self.stencil?;
        let image = self.image.as_mut()?;
        if !image.placement.differs_from(&placement, SYNC_TOLERANCE) {
            return None;
        }
        log::debug!("applying store placement {placement:?}");
        image.placement = geometry::constrain(placement, image.natural_size, stencil);
        image
            .placement
            .differs_from(&placement, SYNC_TOLERANCE)
            .then_some(image.placement)
    }

    /// Paints the surface at `screen_rect`. `texture` is the image's pixels;
    /// without it only the background and stencil are drawn.
    pub fn paint(
        &self,
        painter: &egui::Painter,
        screen_rect: egui::Rect,
        background: egui::Color32,
        texture: Option<egui::TextureId>,
    ) {
        let offset = screen_rect.min.to_vec2();
        painter.rect_filled(screen_rect, 0.0, background);

        let Some(stencil) = self.stencil else {
            return;
        };
        let stencil_screen = stencil.translate(offset);
        let rounding = egui::Rounding::same(self.stencil_config.corner_radius);

        // stacked below the image, so the image hides the inner half of the stroke
        painter.rect(
            stencil_screen,
            rounding,
            self.stencil_config.fill_color(),
            self.stencil_config.stroke(),
        );

        let (Some(image), Some(texture)) = (self.image, texture) else {
            return;
        };
        let bounds = image.bounds();
        let mut clipped =
            egui::epaint::RectShape::filled(stencil_screen, rounding, egui::Color32::WHITE);
        clipped.fill_texture_id = texture;
        clipped.uv = stencil_uv(stencil, bounds);
        painter.add(clipped);

        if self.active {
            painter.rect_stroke(
                bounds.translate(offset),
                0.0,
                egui::Stroke::new(1.0, SELECTION_COLOR),
            );
        }
    }
}

/// Texture coordinates of the part of the image under the stencil.
fn stencil_uv(stencil: egui::Rect, image_bounds: egui::Rect) -> egui::Rect {
    let size = image_bounds.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::Rect::from_min_max(egui::Pos2::ZERO, egui::pos2(1.0, 1.0));
    }
    let to_uv = |pos: egui::Pos2| ((pos - image_bounds.min) / size).to_pos2();
    egui::Rect::from_min_max(to_uv(stencil.min), to_uv(stencil.max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ImageSource;
    use crate::store::{Action, EditorStore};

    const PHOTO: egui::Vec2 = egui::vec2(800.0, 600.0);

    fn surface_with_photo() -> DrawingSurface {
        let mut surface = DrawingSurface::new(StencilConfig::default());
        surface.resize(egui::vec2(800.0, 600.0));
        surface.place_image(PHOTO).unwrap();
        surface
    }

    fn covers(surface: &DrawingSurface) -> bool {
        let stencil = surface.stencil_rect().unwrap();
        let bounds = surface.image().unwrap().bounds();
        let tol = 1e-3;
        bounds.min.x <= stencil.min.x + tol
            && bounds.min.y <= stencil.min.y + tol
            && bounds.max.x >= stencil.max.x - tol
            && bounds.max.y >= stencil.max.y - tol
    }

    #[test]
    fn stencil_appears_on_first_real_size() {
        let mut surface = DrawingSurface::new(StencilConfig::default());
        assert!(surface.resize(egui::vec2(0.0, 0.0)).is_none());
        assert!(surface.stencil_rect().is_none());

        surface.resize(egui::vec2(800.0, 600.0));
        let stencil = surface.stencil_rect().unwrap();
        assert_eq!(stencil.center(), egui::pos2(400.0, 300.0));
        assert_eq!(stencil.size(), egui::vec2(300.0, 400.0));
    }

    #[test]
    fn image_needs_a_stencil() {
        let mut surface = DrawingSurface::new(StencilConfig::default());
        assert!(surface.place_image(PHOTO).is_none());
        assert!(surface.image().is_none());
    }

    #[test]
    fn placed_image_is_cover_fit_and_centered() {
        let surface = surface_with_photo();
        let image = surface.image().unwrap();
        assert!((image.placement.scale - 400.0 / 600.0).abs() < 1e-6);
        assert_eq!(image.placement.center(), egui::pos2(400.0, 300.0));
        assert!(covers(&surface));
    }

    #[test]
    fn drag_is_clamped_and_follows_pointer_back() {
        let mut surface = surface_with_photo();
        // scaled photo is ~533 wide over a 300 wide stencil: 116.67 of slack each way
        assert!(surface.begin_drag(egui::pos2(400.0, 300.0)));
        surface.drag_to(egui::pos2(1400.0, 300.0));
        let left = surface.image().unwrap().placement.left;
        assert!((left - (250.0 + 800.0 / 3.0)).abs() < 1e-3);
        assert!(covers(&surface));

        // coming back inside the slack moves the image right away
        surface.drag_to(egui::pos2(410.0, 300.0));
        assert!((surface.image().unwrap().placement.left - 410.0).abs() < 1e-3);

        let placement = surface.end_drag().unwrap();
        assert!((placement.left - 410.0).abs() < 1e-3);
        assert_eq!(placement.top, 300.0);
        assert!(surface.end_drag().is_none());
    }

    #[test]
    fn vertical_drag_is_locked_when_height_is_tight() {
        let mut surface = surface_with_photo();
        surface.begin_drag(egui::pos2(400.0, 300.0));
        surface.drag_to(egui::pos2(400.0, 100.0));
        assert!((surface.image().unwrap().placement.top - 300.0).abs() < 1e-3);
    }

    #[test]
    fn pressing_outside_the_image_does_not_drag() {
        let mut surface = surface_with_photo();
        assert!(!surface.begin_drag(egui::pos2(5.0, 5.0)));
        surface.drag_to(egui::pos2(100.0, 100.0));
        assert!(surface.end_drag().is_none());
        assert_eq!(surface.image().unwrap().placement.center(), egui::pos2(400.0, 300.0));
    }

    #[test]
    fn wheel_only_acts_over_the_image() {
        let mut surface = surface_with_photo();
        let zoom = ZoomConfig::default();
        assert!(surface.wheel(egui::pos2(2.0, 2.0), 1.0, &zoom).is_none());
        assert!(surface.wheel(egui::pos2(400.0, 300.0), 0.0, &zoom).is_none());

        let before = surface.image().unwrap().placement.scale;
        let zoomed = surface.wheel(egui::pos2(400.0, 300.0), 3.0, &zoom).unwrap();
        assert!((zoomed.scale - before * 1.01).abs() < 1e-6);
    }

    #[test]
    fn wheel_out_stops_at_cover_floor() {
        let mut surface = surface_with_photo();
        let zoom = ZoomConfig::default();
        let floor = surface.image().unwrap().placement.scale;
        for _ in 0..50 {
            surface.wheel(egui::pos2(400.0, 300.0), -1.0, &zoom);
        }
        assert_eq!(surface.image().unwrap().placement.scale, floor);
        assert!(covers(&surface));
    }

    #[test]
    fn zoom_out_after_pan_keeps_cover() {
        let mut surface = surface_with_photo();
        surface.zoom_by(1.1);
        surface.zoom_by(1.1);
        surface.begin_drag(egui::pos2(400.0, 300.0));
        surface.drag_to(egui::pos2(-600.0, -600.0));
        surface.end_drag();
        surface.zoom_by(0.9);
        surface.zoom_by(0.9);
        assert!(covers(&surface));
    }

    #[test]
    fn handlers_without_image_are_no_ops() {
        let mut surface = DrawingSurface::new(StencilConfig::default());
        surface.resize(egui::vec2(800.0, 600.0));
        let zoom = ZoomConfig::default();
        assert!(surface.zoom_by(1.1).is_none());
        assert!(surface.wheel(egui::pos2(400.0, 300.0), 1.0, &zoom).is_none());
        assert!(surface.sync_from(Placement::default()).is_none());
        assert!(!surface.begin_drag(egui::pos2(400.0, 300.0)));
    }

    #[test]
    fn sync_ignores_tiny_differences() {
        let mut surface = surface_with_photo();
        let current = surface.image().unwrap().placement;
        let nudged = Placement {
            left: current.left + 0.0005,
            ..current
        };
        assert!(surface.sync_from(nudged).is_none());
        assert_eq!(surface.image().unwrap().placement, current);
    }

    #[test]
    fn sync_adopts_and_clamps_store_placement() {
        let mut surface = surface_with_photo();
        let current = surface.image().unwrap().placement;

        let inside = Placement {
            left: current.left + 50.0,
            ..current
        };
        assert!(surface.sync_from(inside).is_none());
        assert_eq!(surface.image().unwrap().placement, inside);

        // the default placement is far too small and off-center
        let clamped = surface.sync_from(Placement::default()).unwrap();
        assert_eq!(clamped.scale, 1.0);
        assert!(covers(&surface));
    }

    #[test]
    fn resize_recenters_stencil_and_image() {
        let mut surface = surface_with_photo();
        surface.begin_drag(egui::pos2(400.0, 300.0));
        surface.drag_to(egui::pos2(450.0, 300.0));
        surface.end_drag();

        let placement = surface.resize(egui::vec2(600.0, 450.0)).unwrap();
        assert_eq!(surface.stencil_rect().unwrap().center(), egui::pos2(300.0, 225.0));
        assert!(placement.center().distance(egui::pos2(300.0, 225.0)) < 1e-3);
        assert!(covers(&surface));
        assert!(surface.resize(egui::vec2(600.0, 450.0)).is_none());
    }

    #[test]
    fn new_image_replaces_old_one() {
        let mut surface = surface_with_photo();
        surface.zoom_by(2.0);
        let placement = surface.place_image(egui::vec2(100.0, 100.0)).unwrap();
        assert_eq!(placement.scale, 4.0);
        assert_eq!(surface.image().unwrap().natural_size, egui::vec2(100.0, 100.0));
    }

    #[test]
    fn reset_after_edits_restores_initial_placement() {
        let mut store = EditorStore::new(StencilConfig::default());
        let mut surface = DrawingSurface::new(StencilConfig::default());
        surface.resize(egui::vec2(800.0, 600.0));
        store.dispatch(Action::SetImageSource(ImageSource::from_bytes("a.png", vec![0])));
        let initial = surface.place_image(PHOTO).unwrap();
        store.dispatch(Action::SetInitialPlacement(initial));

        let zoom = ZoomConfig::default();
        for placement in [
            surface.zoom_by(1.1),
            surface.wheel(egui::pos2(400.0, 300.0), 1.0, &zoom),
            surface.zoom_by(1.1),
        ]
        .into_iter()
        .flatten()
        {
            store.dispatch(Action::SetPlacement(placement));
        }
        surface.begin_drag(egui::pos2(400.0, 300.0));
        surface.drag_to(egui::pos2(330.0, 260.0));
        store.dispatch(Action::SetPlacement(surface.end_drag().unwrap()));
        if let Some(placement) = surface.zoom_by(0.9) {
            store.dispatch(Action::SetPlacement(placement));
        }

        store.dispatch(Action::Reset);
        assert_eq!(store.state().placement, initial);
        assert!(surface.sync_from(store.state().placement).is_none());
        assert!(
            !surface
                .image()
                .unwrap()
                .placement
                .differs_from(&initial, SYNC_TOLERANCE)
        );
    }

    #[test]
    fn drag_survives_store_sync_between_frames() {
        let mut store = EditorStore::new(StencilConfig::default());
        let mut surface = DrawingSurface::new(StencilConfig::default());
        surface.resize(egui::vec2(800.0, 600.0));
        store.dispatch(Action::SetImageSource(ImageSource::from_bytes("a.png", vec![0])));
        let initial = surface.place_image(PHOTO).unwrap();
        store.dispatch(Action::SetInitialPlacement(initial));

        assert!(surface.begin_drag(egui::pos2(400.0, 300.0)));
        for x in [420.0, 440.0, 450.0] {
            // one frame: input, then store sync, then what gets painted
            surface.drag_to(egui::pos2(x, 300.0));
            assert!(surface.sync_from(store.state().placement).is_none());
            assert!((surface.image().unwrap().placement.left - x).abs() < 1e-3);
        }

        // release frame: no drag_to, pointer is already up
        let placement = surface.end_drag().unwrap();
        store.dispatch(Action::SetPlacement(placement));
        assert!(surface.sync_from(store.state().placement).is_none());
        assert!((store.state().placement.left - 450.0).abs() < 1e-3);
        assert!((surface.image().unwrap().placement.left - 450.0).abs() < 1e-3);
    }

    #[test]
    fn every_wheel_notch_in_a_frame_zooms() {
        let mut surface = surface_with_photo();
        let zoom = ZoomConfig::default();
        let before = surface.image().unwrap().placement.scale;
        let placement = surface
            .wheel_events(egui::pos2(400.0, 300.0), &[1.0, 1.0, 1.0], &zoom)
            .unwrap();
        assert!((placement.scale - before * 1.01 * 1.01 * 1.01).abs() < 1e-5);

        assert!(surface.wheel_events(egui::pos2(2.0, 2.0), &[1.0, 1.0], &zoom).is_none());
        assert!(surface.wheel_events(egui::pos2(400.0, 300.0), &[], &zoom).is_none());
    }

    #[test]
    fn collapsed_container_keeps_stencil_and_center() {
        let mut surface = surface_with_photo();
        assert!(surface.resize(egui::vec2(0.0, 0.0)).is_none());
        assert_eq!(surface.center(), surface.stencil_rect().unwrap().center());

        // growing back to the previous size changes nothing
        assert!(surface.resize(egui::vec2(800.0, 600.0)).is_none());
        let placement = surface.resize(egui::vec2(600.0, 450.0)).unwrap();
        assert!(placement.center().distance(egui::pos2(300.0, 225.0)) < 1e-3);
    }

    #[test]
    fn uv_covers_stencil_window_of_texture() {
        let stencil = egui::Rect::from_min_max(egui::pos2(25.0, 0.0), egui::pos2(75.0, 100.0));
        let image = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(100.0, 100.0));
        let uv = stencil_uv(stencil, image);
        assert_eq!(uv, egui::Rect::from_min_max(egui::pos2(0.25, 0.0), egui::pos2(0.75, 1.0)));
    }
}
