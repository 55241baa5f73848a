use eframe::egui;

/// Uniform scale and center point of the photo, in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub left: f32,
    pub top: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            left: 0.0,
            top: 0.0,
        }
    }
}

impl Placement {
    pub fn center(&self) -> egui::Pos2 {
        egui::pos2(self.left, self.top)
    }

    /// Axis-aligned bounds of an image with `natural_size` at this placement.
    pub fn bounds(&self, natural_size: egui::Vec2) -> egui::Rect {
        egui::Rect::from_center_size(self.center(), natural_size * self.scale)
    }

    /// True when any field differs from `other` by more than `tolerance`.
    pub fn differs_from(&self, other: &Placement, tolerance: f32) -> bool {
        (self.scale - other.scale).abs() > tolerance
            || (self.left - other.left).abs() > tolerance
            || (self.top - other.top).abs() > tolerance
    }
}

/// Smallest uniform scale at which `image_size` covers `stencil_size`.
///
/// A zero-length image axis contributes a factor of 1.
pub fn min_cover_scale(stencil_size: egui::Vec2, image_size: egui::Vec2) -> f32 {
    let scale_x = if image_size.x > 0.0 {
        stencil_size.x / image_size.x
    } else {
        1.0
    };
    let scale_y = if image_size.y > 0.0 {
        stencil_size.y / image_size.y
    } else {
        1.0
    };
    scale_x.max(scale_y)
}

/// Cover-fit placement: smallest covering scale, centered on the stencil.
pub fn cover_fit(stencil: egui::Rect, image_size: egui::Vec2) -> Placement {
    let center = stencil.center();
    Placement {
        scale: min_cover_scale(stencil.size(), image_size),
        left: center.x,
        top: center.y,
    }
}

/// Clamps a candidate center so an image of `scaled_size` leaves no gap
/// inside `stencil`. Each axis is handled on its own; when the image is
/// narrower than the stencil the far edge wins.
pub fn clamp_center(
    candidate: egui::Pos2,
    scaled_size: egui::Vec2,
    stencil: egui::Rect,
) -> egui::Pos2 {
    let half = scaled_size * 0.5;
    egui::pos2(
        clamp_axis(candidate.x, half.x, stencil.min.x, stencil.max.x),
        clamp_axis(candidate.y, half.y, stencil.min.y, stencil.max.y),
    )
}

fn clamp_axis(center: f32, half_extent: f32, stencil_min: f32, stencil_max: f32) -> f32 {
    let mut center = center;
    if center - half_extent > stencil_min {
        center = stencil_min + half_extent;
    }
    if center + half_extent < stencil_max {
        center = stencil_max - half_extent;
    }
    center
}

/// Re-applies the pan constraint to a whole placement.
pub fn constrain(placement: Placement, natural_size: egui::Vec2, stencil: egui::Rect) -> Placement {
    let center = clamp_center(placement.center(), natural_size * placement.scale, stencil);
    Placement {
        scale: placement.scale,
        left: center.x,
        top: center.y,
    }
}

/// Multiplies `placement.scale` by `factor`, never going below the
/// minimum-cover scale, then re-clamps the position for the new bounds.
pub fn zoom(
    placement: Placement,
    factor: f32,
    natural_size: egui::Vec2,
    stencil: egui::Rect,
) -> Placement {
    let floor = min_cover_scale(stencil.size(), natural_size);
    let scale = (placement.scale * factor).max(floor);
    constrain(Placement { scale, ..placement }, natural_size, stencil)
}
