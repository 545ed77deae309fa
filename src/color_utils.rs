//! Color utility functions for the render pipeline.
//!
//! Class colors arrive from the backend as CSS-style hex strings.

use serde::{Deserialize, Serialize};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Fallback for class colors that cannot be parsed.
    pub const DEFAULT_RED: Rgba = Rgba::rgb(255, 0, 0);

    /// Label text color.
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse `#RRGGBB` or `#RGB`. Returns `None` for anything else.
pub fn parse_hex_color(input: &str) -> Option<Rgba> {
    let hex = input.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgba::rgb(r, g, b))
        }
        3 => {
            // Each digit doubles: #f80 == #ff8800
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Rgba::rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

/// Parse a class color, falling back to red.
pub fn class_color(input: &str) -> Rgba {
    parse_hex_color(input).unwrap_or_else(|| {
        log::debug!("Unparsable class color '{}', using red", input);
        Rgba::DEFAULT_RED
    })
}
