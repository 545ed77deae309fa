//! Zoom and canvas-fit mathematics.
//!
//! Canvas coordinates are pixels on the fitted canvas before zoom. The view
//! transform maps them to screen pixels as `screen = (canvas + pan) * zoom`.

use crate::constants::zoom;
use crate::geometry::{CanvasSize, Point, ScreenRect};

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Transform {
    /// Create a new transform with the given zoom and pan.
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Apply one wheel notch. Positive `delta_y` (scroll down) zooms out.
    pub fn wheel(&self, delta_y: f64, min_zoom: f64, max_zoom: f64) -> Transform {
        let factor = if delta_y > 0.0 {
            zoom::WHEEL_OUT
        } else {
            zoom::WHEEL_IN
        };
        Transform {
            zoom: (self.zoom * factor).clamp(min_zoom, max_zoom),
            ..*self
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Transform {
        Transform {
            zoom: self.zoom,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }

    /// Zoom in by a factor (e.g., 1.2 for 20% zoom in).
    pub fn zoom_in(&self, factor: f64, max_zoom: f64) -> Transform {
        Transform {
            zoom: (self.zoom * factor).min(max_zoom),
            ..*self
        }
    }

    /// Zoom out by a factor (e.g., 1.2 for 20% zoom out).
    pub fn zoom_out(&self, factor: f64, min_zoom: f64) -> Transform {
        Transform {
            zoom: (self.zoom / factor).max(min_zoom),
            ..*self
        }
    }

    /// Map a canvas point to screen pixels.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        ((x + self.pan_x) * self.zoom, (y + self.pan_y) * self.zoom)
    }

    /// Map a canvas rectangle to screen pixels.
    pub fn apply_rect(&self, rect: &ScreenRect) -> ScreenRect {
        let (x, y) = self.apply(rect.x, rect.y);
        ScreenRect::new(x, y, rect.w * self.zoom, rect.h * self.zoom)
    }

    /// Map a screen point back to canvas pixels.
    pub fn invert(&self, x: f64, y: f64) -> Point {
        Point::new(x / self.zoom - self.pan_x, y / self.zoom - self.pan_y)
    }

    /// Zoom level as a rounded percentage, as shown in the status bar.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Fit an image into a container, keeping its aspect ratio.
///
/// `margin` is subtracted from both container dimensions first. Returns
/// `None` if either the image or the usable container area is empty.
pub fn fit_canvas(
    image_width: f64,
    image_height: f64,
    container_width: f64,
    container_height: f64,
    margin: f64,
) -> Option<CanvasSize> {
    let max_width = container_width - margin;
    let max_height = container_height - margin;
    if image_width <= 0.0 || image_height <= 0.0 || max_width <= 0.0 || max_height <= 0.0 {
        return None;
    }

    let image_ratio = image_width / image_height;
    let container_ratio = max_width / max_height;
    let size = if image_ratio > container_ratio {
        CanvasSize::new(max_width, max_width / image_ratio)
    } else {
        CanvasSize::new(max_height * image_ratio, max_height)
    };
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.0001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        assert_eq!(t.zoom, 1.0);
        assert_eq!(t.pan_x, 0.0);
        assert_eq!(t.pan_y, 0.0);
        assert_eq!(t.zoom_percent(), 100);
    }

    #[test]
    fn test_wheel_direction() {
        let t = Transform::identity();
        assert!(approx_eq(t.wheel(100.0, 0.5, 5.0).zoom, 0.9));
        assert!(approx_eq(t.wheel(-100.0, 0.5, 5.0).zoom, 1.1));
        // Zero delta counts as "up".
        assert!(approx_eq(t.wheel(0.0, 0.5, 5.0).zoom, 1.1));
    }

    #[test]
    fn test_wheel_clamps() {
        let mut t = Transform::identity();
        for _ in 0..100 {
            t = t.wheel(-1.0, 0.5, 5.0);
        }
        assert_eq!(t.zoom, 5.0);
        for _ in 0..100 {
            t = t.wheel(1.0, 0.5, 5.0);
        }
        assert_eq!(t.zoom, 0.5);
    }

    #[test]
    fn test_pan_by() {
        let t = Transform::new(1.0, 10.0, 20.0);
        let new_t = t.pan_by(5.0, -10.0);

        assert_eq!(new_t.zoom, 1.0);
        assert_eq!(new_t.pan_x, 15.0);
        assert_eq!(new_t.pan_y, 10.0);
    }

    #[test]
    fn test_zoom_in_with_max() {
        let t = Transform::new(4.5, 0.0, 0.0);
        let new_t = t.zoom_in(1.2, 5.0);

        // 4.5 * 1.2 = 5.4, but max is 5.0
        assert_eq!(new_t.zoom, 5.0);
    }

    #[test]
    fn test_zoom_out_normal() {
        let t = Transform::new(1.0, 0.0, 0.0);
        let new_t = t.zoom_out(1.2, 0.5);

        assert!(approx_eq(new_t.zoom, 1.0 / 1.2));
    }

    #[test]
    fn test_apply_and_invert() {
        let t = Transform::new(2.0, 10.0, -5.0);
        let (sx, sy) = t.apply(40.0, 30.0);
        assert!(approx_eq(sx, 100.0));
        assert!(approx_eq(sy, 50.0));
        let back = t.invert(sx, sy);
        assert!(approx_eq(back.x, 40.0));
        assert!(approx_eq(back.y, 30.0));
    }

    #[test]
    fn test_apply_rect_scales_extent() {
        let t = Transform::new(1.5, 0.0, 0.0);
        let rect = t.apply_rect(&ScreenRect::new(10.0, 20.0, 100.0, 50.0));
        assert_eq!(rect, ScreenRect::new(15.0, 30.0, 150.0, 75.0));
    }

    #[test]
    fn test_fit_wide_image() {
        let size = fit_canvas(2000.0, 1000.0, 1040.0, 1040.0, 40.0).expect("fits");
        assert!(approx_eq(size.width, 1000.0));
        assert!(approx_eq(size.height, 500.0));
    }

    #[test]
    fn test_fit_tall_image() {
        let size = fit_canvas(500.0, 1000.0, 1040.0, 640.0, 40.0).expect("fits");
        assert!(approx_eq(size.height, 600.0));
        assert!(approx_eq(size.width, 300.0));
    }

    #[test]
    fn test_fit_rejects_empty() {
        assert!(fit_canvas(0.0, 100.0, 800.0, 600.0, 40.0).is_none());
        assert!(fit_canvas(100.0, 100.0, 30.0, 600.0, 40.0).is_none());
    }
}
