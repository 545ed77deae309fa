//! Box geometry and hit-testing.
//!
//! Boxes are stored as normalized center + extent relative to the image's
//! natural size, so they survive canvas resizes and zoom changes. Screen
//! rectangles only exist transiently while rendering.

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point. Normalized unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the drawing surface in pixels (before zoom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are usable as divisors.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Convert a canvas pixel position to normalized space.
    pub fn normalize(&self, x: f64, y: f64) -> Point {
        Point::new(x / self.width, y / self.height)
    }
}

/// A box in normalized center + extent form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// The rectangle spanning two points, in either order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x_center: (a.x + b.x) / 2.0,
            y_center: (a.y + b.y) / 2.0,
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Rebuild center + extent from an edge set.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            x_center: (left + right) / 2.0,
            y_center: (top + bottom) / 2.0,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn left(&self) -> f64 {
        self.x_center - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x_center + self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y_center - self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y_center + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x_center, self.y_center)
    }

    /// Whether the box is large enough to be kept after drawing.
    pub fn meets_min_size(&self, min_size: f64) -> bool {
        self.width > min_size && self.height > min_size
    }

    /// Inclusive point-in-box test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Position of a handle on this box. `Move` maps to the center.
    pub fn handle_position(&self, handle: Handle) -> Point {
        let (l, r, t, b) = (self.left(), self.right(), self.top(), self.bottom());
        let (cx, cy) = (self.x_center, self.y_center);
        match handle {
            Handle::Move => Point::new(cx, cy),
            Handle::NorthWest => Point::new(l, t),
            Handle::NorthEast => Point::new(r, t),
            Handle::SouthWest => Point::new(l, b),
            Handle::SouthEast => Point::new(r, b),
            Handle::North => Point::new(cx, t),
            Handle::South => Point::new(cx, b),
            Handle::West => Point::new(l, cy),
            Handle::East => Point::new(r, cy),
        }
    }

    /// Apply an incremental drag of `handle` by `(dx, dy)`.
    ///
    /// `Move` translates the center. Corner and edge handles move only the
    /// edges they touch; the opposite edges stay pinned. A moving edge stops
    /// `min_size` short of the opposite edge, so the extent stays positive.
    pub fn apply_handle_drag(&self, handle: Handle, dx: f64, dy: f64, min_size: f64) -> Self {
        let (left, right, top, bottom) = (self.left(), self.right(), self.top(), self.bottom());
        let min_size = min_size.max(0.0);
        let new_left = (left + dx).min(right - min_size);
        let new_right = (right + dx).max(left + min_size);
        let new_top = (top + dy).min(bottom - min_size);
        let new_bottom = (bottom + dy).max(top + min_size);
        match handle {
            Handle::Move => Self {
                x_center: self.x_center + dx,
                y_center: self.y_center + dy,
                ..*self
            },
            Handle::NorthWest => Self::from_edges(new_left, new_top, right, bottom),
            Handle::NorthEast => Self::from_edges(left, new_top, new_right, bottom),
            Handle::SouthWest => Self::from_edges(new_left, top, right, new_bottom),
            Handle::SouthEast => Self::from_edges(left, top, new_right, new_bottom),
            Handle::North => Self::from_edges(left, new_top, right, bottom),
            Handle::South => Self::from_edges(left, top, right, new_bottom),
            Handle::West => Self::from_edges(new_left, top, right, bottom),
            Handle::East => Self::from_edges(left, top, new_right, bottom),
        }
    }
}

/// An axis-aligned rectangle in canvas pixels, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// A square of side `size` centred on a point.
    pub fn centered_square(x: f64, y: f64, size: f64) -> Self {
        Self::new(x - size / 2.0, y - size / 2.0, size, size)
    }
}

/// Map a normalized box to canvas pixels.
pub fn to_screen(geometry: &BoxGeometry, canvas: CanvasSize) -> ScreenRect {
    ScreenRect {
        x: geometry.left() * canvas.width,
        y: geometry.top() * canvas.height,
        w: geometry.width * canvas.width,
        h: geometry.height * canvas.height,
    }
}

/// Inverse of [`to_screen`].
pub fn to_normalized(rect: &ScreenRect, canvas: CanvasSize) -> BoxGeometry {
    let width = rect.w / canvas.width;
    let height = rect.h / canvas.height;
    BoxGeometry {
        x_center: rect.x / canvas.width + width / 2.0,
        y_center: rect.y / canvas.height + height / 2.0,
        width,
        height,
    }
}

// ============================================================================
// Handles
// ============================================================================

/// One of the nine interactive control points of a selected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Move,
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "se")]
    SouthEast,
    #[serde(rename = "n")]
    North,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "e")]
    East,
    #[serde(rename = "w")]
    West,
}

impl Handle {
    /// Corner handles, tested before edges so corners win near a corner.
    pub const CORNERS: [Handle; 4] = [
        Handle::NorthWest,
        Handle::NorthEast,
        Handle::SouthWest,
        Handle::SouthEast,
    ];

    /// Edge midpoint handles, in hit-test order.
    pub const EDGES: [Handle; 4] = [Handle::North, Handle::South, Handle::West, Handle::East];

    /// The eight resize handles drawn on a selected box.
    pub fn resize_handles() -> impl Iterator<Item = Handle> {
        Self::CORNERS.into_iter().chain(Self::EDGES)
    }

    /// Short name (`nw`, `se`, `move`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Handle::Move => "move",
            Handle::NorthWest => "nw",
            Handle::NorthEast => "ne",
            Handle::SouthWest => "sw",
            Handle::SouthEast => "se",
            Handle::North => "n",
            Handle::South => "s",
            Handle::East => "e",
            Handle::West => "w",
        }
    }

    /// CSS cursor shown while hovering this handle.
    pub fn cursor(&self) -> &'static str {
        match self {
            Handle::Move => "move",
            Handle::NorthWest => "nw-resize",
            Handle::NorthEast => "ne-resize",
            Handle::SouthWest => "sw-resize",
            Handle::SouthEast => "se-resize",
            Handle::North => "n-resize",
            Handle::South => "s-resize",
            Handle::East => "e-resize",
            Handle::West => "w-resize",
        }
    }
}

/// Point-in-box test in normalized space.
pub fn hit_test_box(point: Point, geometry: &BoxGeometry) -> bool {
    geometry.contains(point)
}

/// Find the handle under `point`: corners, then edges, then the interior.
pub fn hit_test_handle(point: Point, geometry: &BoxGeometry, radius: f64) -> Option<Handle> {
    let near = |handle: Handle| {
        let p = geometry.handle_position(handle);
        (point.x - p.x).abs() < radius && (point.y - p.y).abs() < radius
    };

    Handle::resize_handles()
        .find(|&handle| near(handle))
        .or_else(|| geometry.contains(point).then_some(Handle::Move))
}

// ============================================================================
// Tests
// ============================================================================
