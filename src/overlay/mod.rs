//! # Text Overlay Model
//!
//! Holds the editable text lines drawn on top of the base image: content,
//! normalized position (percent of image width/height) and rotation. Style is
//! global and lives in [`style`].
//!
//! Positions are percentages so they survive the difference between the
//! on-screen preview size and the natural size of the exported image.

pub mod style;

use serde::{Deserialize, Serialize};

use crate::error::MemeError;

pub use style::{Color, FontFamily, StyleSettings, StyleUpdate};

/// Number of lines used for uploaded and remote images.
pub const DEFAULT_LINE_COUNT: usize = 2;

/// Drag positions are clamped to this range on both axes.
pub const MIN_POSITION: f32 = 5.0;
pub const MAX_POSITION: f32 = 95.0;

/// Rotation bounds in degrees.
pub const MAX_ROTATION: f32 = 45.0;

/// Longest text a single line accepts, in characters.
pub const MAX_LINE_CHARS: usize = 200;

/// Position of a line's center, in percent of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPosition {
    pub x: f32,
    pub y: f32,
}

impl TextPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Default layout: first line at the top, last near the bottom,
    /// anything in between stepped down from 30%.
    pub fn default_for(index: usize, count: usize) -> Self {
        let y = if index == 0 {
            10.0
        } else if index + 1 == count {
            85.0
        } else {
            30.0 + index as f32 * 20.0
        };
        Self::new(50.0, y)
    }

    /// Scale into pixel coordinates for an image of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x / 100.0 * width as f32, self.y / 100.0 * height as f32)
    }
}

/// One overlay text slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub position: TextPosition,
    pub rotation: f32,
}

impl TextLine {
    fn empty(index: usize, count: usize) -> Self {
        Self {
            text: String::new(),
            position: TextPosition::default_for(index, count),
            rotation: 0.0,
        }
    }

    /// Lines with only whitespace are not rendered.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Bounding box of the preview surface in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Ordered text lines plus the drag-in-progress index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayModel {
    lines: Vec<TextLine>,
    dragging: Option<usize>,
}

impl Default for OverlayModel {
    fn default() -> Self {
        Self::with_lines(DEFAULT_LINE_COUNT)
    }
}

impl OverlayModel {
    pub fn with_lines(count: usize) -> Self {
        Self {
            lines: (0..count).map(|i| TextLine::empty(i, count)).collect(),
            dragging: None,
        }
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Clear all text and restore the default layout for `count` lines.
    pub fn reset(&mut self, count: usize) {
        *self = Self::with_lines(count);
    }

    /// True if at least one line would be rendered.
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.is_blank())
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut TextLine, MemeError> {
        let count = self.lines.len();
        self.lines.get_mut(index).ok_or_else(|| {
            MemeError::validation(format!(
                "Line {} does not exist (this image has {} lines)",
                index + 1,
                count
            ))
        })
    }

    /// Replace a line's text. Text over [`MAX_LINE_CHARS`] is refused and the
    /// line keeps its previous value.
    pub fn update_text(&mut self, index: usize, value: impl Into<String>) -> Result<(), MemeError> {
        let value = value.into();
        let line = self.line_mut(index)?;
        if value.chars().count() > MAX_LINE_CHARS {
            return Err(MemeError::validation(format!(
                "Text lines are limited to {} characters",
                MAX_LINE_CHARS
            )));
        }
        line.text = value;
        Ok(())
    }

    /// Set a line's rotation; returns the stored (clamped) value.
    pub fn set_rotation(&mut self, index: usize, degrees: f32) -> Result<f32, MemeError> {
        let degrees = if degrees.is_finite() {
            degrees.clamp(-MAX_ROTATION, MAX_ROTATION)
        } else {
            0.0
        };
        self.line_mut(index)?.rotation = degrees;
        Ok(degrees)
    }

    /// Start dragging a line. Any drag already in progress is replaced.
    pub fn begin_drag(&mut self, index: usize) -> Result<(), MemeError> {
        self.line_mut(index)?;
        self.dragging = Some(index);
        Ok(())
    }

    /// Move the dragged line to the pointer. Returns the new position, or
    /// `None` when no drag is active.
    pub fn pointer_move(&mut self, client_x: f32, client_y: f32, rect: PreviewRect) -> Option<TextPosition> {
        let index = self.dragging?;
        let position = clamp_to_frame(client_x, client_y, rect);
        if let Some(line) = self.lines.get_mut(index) {
            line.position = position;
        }
        Some(position)
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }
}

/// Convert pointer coordinates to percent of the preview box, kept inside
/// the visible frame.
pub fn clamp_to_frame(client_x: f32, client_y: f32, rect: PreviewRect) -> TextPosition {
    let percent = |offset: f32, extent: f32| {
        let p = if extent > 0.0 { offset / extent * 100.0 } else { 50.0 };
        if p.is_finite() {
            p.clamp(MIN_POSITION, MAX_POSITION)
        } else {
            50.0
        }
    };
    TextPosition::new(
        percent(client_x - rect.left, rect.width),
        percent(client_y - rect.top, rect.height),
    )
}
