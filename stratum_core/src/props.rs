// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render properties: the visual attributes of one drawable primitive.
//!
//! Every renderable node carries an ordered, non-empty list of
//! [`RenderProps`]. Two properties are *batch-equivalent* — drawn together
//! in one instanced call — iff their (draw mode, texture, z-index) triples
//! are equal; texture coordinates may differ between equivalent instances.

use core::fmt;

use crate::error::SceneError;

/// Lowest assignable z-index (inclusive).
pub const Z_MIN: i16 = 0;

/// Highest assignable z-index (exclusive). Batches are indexed by
/// `[Z_MIN, Z_MAX)`, so properties outside this range are rejected.
pub const Z_MAX: i16 = 100;

/// Offset added to the caller-supplied z bias, so small negative biases
/// (e.g. connector lines behind boxes) stay inside the valid range.
pub const Z_DEFAULT: i16 = 10;

/// How a quad's vertices are assembled by the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawMode {
    /// Two triangles covering the quad.
    Fill,
    /// Four edges as a line loop.
    Outline,
    /// A single segment between two endpoint matrices (connections).
    Line,
}

/// An opaque reference to a texture.
///
/// Textures are created and managed externally (by an atlas provider and
/// the GPU backend). The core passes the identity through without
/// interpreting it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

impl fmt::Debug for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureId({})", self.0)
    }
}

/// Texture coordinates for the four corners of a quad, 8 `f32`s in
/// top-left, top-right, bottom-right, bottom-left order — the exact
/// per-instance payload layout of the UV buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvQuad(pub [f32; 8]);

impl UvQuad {
    /// The whole texture.
    pub const FULL: Self = Self([0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);

    /// Coordinates for one vertical strip of a texture divided into `count`
    /// equal strips, inset by `epsilon` on each side against bleed from the
    /// neighboring strips.
    #[must_use]
    pub fn from_strip(index: usize, count: usize, epsilon: f32) -> Self {
        let (i, n) = (index as f32, count as f32);
        let x_min = i / n + epsilon;
        let x_max = (i + 1.0) / n - epsilon;
        Self([x_min, 0.0, x_max, 0.0, x_max, 1.0, x_min, 1.0])
    }
}

/// The visual attributes of one drawable primitive: draw mode, texture
/// identity, texture-coordinate quad, and z-index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderProps {
    /// How the quad's vertices are assembled.
    pub mode: DrawMode,
    /// Which texture the instance samples.
    pub texture: TextureId,
    /// Per-corner texture coordinates.
    pub uv: UvQuad,
    /// Paint-order index in `[Z_MIN, Z_MAX)`.
    pub z: i16,
}

impl RenderProps {
    /// Creates render properties at `Z_DEFAULT + z_bias`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ZOutOfRange`] if the resulting z-index falls
    /// outside `[Z_MIN, Z_MAX)`.
    pub fn new(
        mode: DrawMode,
        texture: TextureId,
        uv: UvQuad,
        z_bias: i16,
    ) -> Result<Self, SceneError> {
        let z = Z_DEFAULT + z_bias;
        if z < Z_MIN || z >= Z_MAX {
            return Err(SceneError::ZOutOfRange(z));
        }
        Ok(Self {
            mode,
            texture,
            uv,
            z,
        })
    }

    /// Whether two properties land in the same batch.
    ///
    /// Texture coordinates are deliberately excluded: equivalent instances
    /// may sample different regions of the shared texture.
    #[must_use]
    pub fn batch_equivalent(&self, other: &Self) -> bool {
        self.mode == other.mode && self.texture == other.texture && self.z == other.z
    }
}

#[cfg(test)]
mod tests {
    #[cfg(not(feature = "std"))]
    use kurbo::common::FloatFuncs as _;

    use super::*;

    #[test]
    fn new_applies_default_offset() {
        let rp = RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 0).unwrap();
        assert_eq!(rp.z, Z_DEFAULT);

        let rp = RenderProps::new(DrawMode::Line, TextureId(2), UvQuad::FULL, -1).unwrap();
        assert_eq!(rp.z, Z_DEFAULT - 1);
    }

    #[test]
    fn z_range_is_enforced() {
        assert_eq!(
            RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, -11),
            Err(SceneError::ZOutOfRange(-1))
        );
        assert_eq!(
            RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 90),
            Err(SceneError::ZOutOfRange(100))
        );
        // The extremes of the valid range are fine.
        assert!(RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, -10).is_ok());
        assert!(RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 89).is_ok());
    }

    #[test]
    fn batch_equivalence_ignores_uv() {
        let a = RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 0).unwrap();
        let b = RenderProps::new(
            DrawMode::Fill,
            TextureId(0),
            UvQuad::from_strip(3, 16, 0.005),
            0,
        )
        .unwrap();
        assert!(a.batch_equivalent(&b));

        let c = RenderProps::new(DrawMode::Outline, TextureId(0), UvQuad::FULL, 0).unwrap();
        assert!(!a.batch_equivalent(&c));

        let d = RenderProps::new(DrawMode::Fill, TextureId(1), UvQuad::FULL, 0).unwrap();
        assert!(!a.batch_equivalent(&d));

        let e = RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 1).unwrap();
        assert!(!a.batch_equivalent(&e));
    }

    #[test]
    fn strip_coordinates_are_inset() {
        let uv = UvQuad::from_strip(0, 4, 0.005);
        let [x0, y0, x1, _, x2, y2, x3, _] = uv.0;
        assert!((x0 - 0.005).abs() < 1e-6);
        assert!((x1 - 0.245).abs() < 1e-6);
        assert_eq!(x0, x3);
        assert_eq!(x1, x2);
        assert_eq!(y0, 0.0);
        assert_eq!(y2, 1.0);
    }
}
