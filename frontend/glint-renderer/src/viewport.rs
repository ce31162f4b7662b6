//! Aspect-preserving placement of the output quad inside the display surface

use glint_common::frontend::FrameSize;

/// Display aspect ratio the output is locked to when aspect locking is enabled.
pub const TARGET_ASPECT_RATIO: f32 = (4.0_f64 / 3.0) as f32;

/// Column-major 4x4 matrix.
pub type Mat4 = [[f32; 4]; 4];

/// Orthographic projection mapping the unit square onto clip space, equivalent to
/// `ortho(left=0, right=1, bottom=0, top=1, near=-1, far=1)`.
pub const UNIT_ORTHO_PROJECTION: Mat4 =
    [[2.0, 0.0, 0.0, 0.0], [0.0, 2.0, 0.0, 0.0], [0.0, 0.0, -1.0, 0.0], [-1.0, -1.0, 0.0, 1.0]];

/// Rectangle within the display surface that the output quad is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn full(surface: FrameSize) -> Self {
        Self { x: 0, y: 0, width: surface.width, height: surface.height }
    }

    #[must_use]
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Compute the viewport for a display surface.
///
/// Aspect ratios are compared at 3 decimal places so that surfaces which are 4:3 up to
/// floating-point noise are drawn full-bleed. Wider surfaces are pillarboxed and narrower
/// surfaces are letterboxed, in both cases centered.
#[must_use]
pub fn compute_viewport(surface: FrameSize, force_aspect: bool) -> Viewport {
    if !force_aspect || surface.is_empty() {
        return Viewport::full(surface);
    }

    let FrameSize { width, height } = surface;
    let device_aspect = width as f32 / height as f32;

    let device_millis = (device_aspect * 1000.0) as i32;
    let target_millis = (TARGET_ASPECT_RATIO * 1000.0) as i32;

    if device_millis > target_millis {
        let delta = centered_fraction(TARGET_ASPECT_RATIO / device_aspect);
        Viewport {
            x: (f64::from(width) * (0.5 - delta)) as u32,
            y: 0,
            width: (2.0 * f64::from(width) * delta) as u32,
            height,
        }
    } else if device_millis < target_millis {
        let delta = centered_fraction(device_aspect / TARGET_ASPECT_RATIO);
        Viewport {
            x: 0,
            y: (f64::from(height) * (0.5 - delta)) as u32,
            width,
            height: (2.0 * f64::from(height) * delta) as u32,
        }
    } else {
        Viewport::full(surface)
    }
}

// Half of the visible fraction along the shrunk axis, measured from the surface center
fn centered_fraction(ratio: f32) -> f64 {
    let delta = ((f64::from(ratio) - 1.0) / 2.0 + 0.5) as f32;
    f64::from(delta)
}
