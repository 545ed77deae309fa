//! Global constants for the boxlab editor.
//!
//! Geometry constants are in normalized image space (fractions of the
//! image extent). Drawing constants are in canvas pixels.

/// Boxes narrower or shorter than this (normalized) are discarded at creation.
pub const MIN_BOX_SIZE: f64 = 0.01;

/// Tolerance for grabbing a resize handle (normalized, 1.5% of the canvas).
pub const HANDLE_HIT_RADIUS: f64 = 0.015;

/// Confidence assigned to hand-drawn boxes.
pub const MANUAL_CONFIDENCE: f64 = 1.0;

/// Default label-assist confidence threshold.
pub const DEFAULT_ASSIST_CONFIDENCE: f64 = 0.5;

/// Zoom behaviour.
pub mod zoom {
    /// Wheel-up multiplier.
    pub const WHEEL_IN: f64 = 1.1;
    /// Wheel-down multiplier.
    pub const WHEEL_OUT: f64 = 0.9;
    /// Zoom button factor.
    pub const BUTTON_FACTOR: f64 = 1.2;
    /// Minimum zoom level.
    pub const MIN: f64 = 0.5;
    /// Maximum zoom level.
    pub const MAX: f64 = 5.0;
}

/// Canvas sizing.
pub mod canvas {
    /// Space kept free around the canvas inside its container.
    pub const CONTAINER_MARGIN: f64 = 40.0;
    /// Container size used until the front end reports one.
    pub const DEFAULT_CONTAINER: (f64, f64) = (1280.0, 800.0);
}

/// Stroke and overlay sizes for the render pipeline.
pub mod draw {
    /// Box outline width.
    pub const STROKE: f64 = 2.0;
    /// Box outline width when selected.
    pub const STROKE_SELECTED: f64 = 3.0;
    /// Side of a handle square.
    pub const HANDLE_SIZE: f64 = 8.0;
    /// Height of the class label chip.
    pub const LABEL_HEIGHT: f64 = 24.0;
    /// Horizontal padding inside the label chip.
    pub const LABEL_PADDING: f64 = 6.0;
    /// Distance from the chip bottom to the text baseline.
    pub const LABEL_BASELINE: f64 = 6.0;
    /// Estimated glyph advance used to size label chips.
    pub const LABEL_CHAR_WIDTH: f64 = 8.0;
    /// Label font size.
    pub const LABEL_FONT_SIZE: f64 = 14.0;
}
