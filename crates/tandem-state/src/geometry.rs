//! Viewport geometry and coordinate clamping.
//!
//! A cursor is drawn as a `cursor_size`-pixel square, so its top-left
//! corner must stay within `[0, extent - cursor_size]` on each axis for the
//! whole square to remain visible. The clamp is applied by the producer
//! before sending and again by every receiver before storing and drawing,
//! since viewports differ between participants.

use serde::{Deserialize, Serialize};

/// Side length of a rendered cursor, in pixels.
pub const DEFAULT_CURSOR_SIZE: u32 = 10;

/// A cursor coordinate in viewport pixels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The visible area of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_cursor_size")]
    pub cursor_size: u32,
}

fn default_cursor_size() -> u32 {
    DEFAULT_CURSOR_SIZE
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl Viewport {
    /// A viewport with the default cursor size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor_size: DEFAULT_CURSOR_SIZE,
        }
    }

    /// Overrides the cursor size.
    pub fn with_cursor_size(mut self, cursor_size: u32) -> Self {
        self.cursor_size = cursor_size;
        self
    }

    /// Largest allowed `x`. Zero when the viewport is narrower than a cursor.
    pub fn max_x(&self) -> u32 {
        self.width.saturating_sub(self.cursor_size)
    }

    /// Largest allowed `y`. Zero when the viewport is shorter than a cursor.
    pub fn max_y(&self) -> u32 {
        self.height.saturating_sub(self.cursor_size)
    }

    /// Clamps a raw pointer coordinate (which may be negative or far
    /// outside the window) into the drawable range.
    pub fn clamp(&self, x: i64, y: i64) -> Position {
        Position {
            x: clamp_axis(x, self.max_x()),
            y: clamp_axis(y, self.max_y()),
        }
    }

    /// Clamps an already non-negative position, e.g. one received from a
    /// participant with a larger window.
    pub fn clamp_position(&self, pos: Position) -> Position {
        Position {
            x: pos.x.min(self.max_x()),
            y: pos.y.min(self.max_y()),
        }
    }

    /// Whether `pos` is already inside the drawable range.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x <= self.max_x() && pos.y <= self.max_y()
    }
}

fn clamp_axis(value: i64, max: u32) -> u32 {
    // `max` fits in i64, and the clamped value fits back into u32.
    value.clamp(0, i64::from(max)) as u32
}
