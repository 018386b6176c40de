// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Palette, styles, and layout metrics.
//!
//! All flat-colored parts sample one shared palette texture: a single row
//! of solid color strips, one per [`PaletteColor`], addressed purely
//! through texture coordinates. That keeps every filled and outlined
//! rectangle in the scene batch-compatible per (mode, z) pair regardless of
//! its color.

use crate::error::SceneError;
use crate::props::{DrawMode, RenderProps, TextureId, UvQuad};

/// The shared palette texture (one strip per [`PaletteColor`]).
pub const TEXTURE_PALETTE: TextureId = TextureId(0);

/// The glyph atlas texture (one strip per character in
/// [`ATLAS_CHARACTERS`](super::text::ATLAS_CHARACTERS)).
pub const TEXTURE_GLYPHS: TextureId = TextureId(1);

/// The connection line texture.
pub const TEXTURE_CONNECTIONS: TextureId = TextureId(2);

/// Inset applied to strip texture coordinates, against color bleed from
/// neighboring strips under linear filtering.
pub const UV_EPSILON: f32 = 0.005;

/// The palette strips, in texture order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteColor {
    /// Deep red accent.
    Wine,
    /// Fully transparent.
    Transparent,
    /// Translucent black, used to shade method rows.
    Darken,
    /// Pure white.
    White,
    /// Pure black.
    Black,
    /// Near-white body fill.
    Light,
    /// Mid grey.
    Grey,
    /// Near-black background.
    Dark,
    /// Pure red.
    Red,
    /// Orange.
    Orange,
    /// Yellow.
    Yellow,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Very dark blue.
    DarkBlue,
    /// Light blue.
    LightBlue,
    /// Secondary blue.
    SecondaryBlue,
    /// Purple.
    Purple,
    /// Pink.
    Pink,
}

impl PaletteColor {
    /// Number of strips in the palette texture.
    pub const COUNT: usize = 18;

    /// This color's strip index in the palette texture.
    #[must_use]
    pub const fn strip_index(self) -> usize {
        self as usize
    }

    /// Texture coordinates of this color's strip.
    #[must_use]
    pub fn uv(self) -> UvQuad {
        UvQuad::from_strip(self.strip_index(), Self::COUNT, UV_EPSILON)
    }
}

/// Semantic kind of a container, selecting its accent color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerType {
    /// An ordinary class.
    Class,
    /// An abstract class.
    Abstract,
    /// An enumeration.
    Enum,
    /// The program entry point.
    Main,
}

impl ContainerType {
    /// The accent color used for this container's outline and title bar.
    #[must_use]
    pub const fn accent(self) -> PaletteColor {
        match self {
            Self::Class => PaletteColor::Blue,
            Self::Abstract => PaletteColor::Purple,
            Self::Enum => PaletteColor::Yellow,
            Self::Main => PaletteColor::Red,
        }
    }
}

/// Fill properties in a palette color.
///
/// # Errors
///
/// Propagates [`SceneError::ZOutOfRange`] for out-of-range biases.
pub fn fill(color: PaletteColor, z_bias: i16) -> Result<RenderProps, SceneError> {
    RenderProps::new(DrawMode::Fill, TEXTURE_PALETTE, color.uv(), z_bias)
}

/// Outline properties in a palette color.
///
/// # Errors
///
/// Propagates [`SceneError::ZOutOfRange`] for out-of-range biases.
pub fn outline(color: PaletteColor, z_bias: i16) -> Result<RenderProps, SceneError> {
    RenderProps::new(DrawMode::Outline, TEXTURE_PALETTE, color.uv(), z_bias)
}

// -- Styles --

/// Body fill of every container.
pub const STYLE_BODY: PaletteColor = PaletteColor::Light;
/// Resize handle fill.
pub const STYLE_RESIZE_FILL: PaletteColor = PaletteColor::SecondaryBlue;
/// Resize handle outline.
pub const STYLE_RESIZE_OUTLINE: PaletteColor = PaletteColor::LightBlue;
/// Visibility handle fill.
pub const STYLE_VISIBILITY_FILL: PaletteColor = PaletteColor::DarkBlue;
/// Socket fill.
pub const STYLE_SOCKET_FILL: PaletteColor = PaletteColor::Light;
/// Socket outline.
pub const STYLE_SOCKET_OUTLINE: PaletteColor = PaletteColor::Pink;
/// Shading behind method rows (variable rows stay transparent).
pub const STYLE_METHOD_ROW: PaletteColor = PaletteColor::Darken;

// -- Layout metrics --

/// Default width of a freshly created container.
pub const CONTAINER_WIDTH: f64 = 390.0;
/// Default height of a freshly created container (title bar only).
pub const CONTAINER_HEIGHT: f64 = 30.0;
/// Fixed height of the title bar, independent of body stretching.
pub const TITLE_HEIGHT: f64 = 30.0;
/// Side length of the square corner resize handles.
pub const RESIZE_HANDLE_SIZE: f64 = 10.0;
/// Side length of the square visibility handle.
pub const VISIBILITY_HANDLE_SIZE: f64 = 20.0;
/// Side length of the square in/out sockets.
pub const SOCKET_SIZE: f64 = 10.0;
/// Left text margin inside a property row.
pub const BODY_MARGIN_LEFT: f64 = 20.0;
/// Right text margin inside a property row.
pub const BODY_MARGIN_RIGHT: f64 = 20.0;
/// Height of one glyph quad (and of one property row).
pub const GLYPH_HEIGHT: f64 = 30.0;
/// Width of one glyph quad. Glyphs are rendered at a fixed advance derived
/// from the atlas aspect ratio.
pub const GLYPH_WIDTH: f64 = GLYPH_HEIGHT * 0.5 / 1.05;
