// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 3×3 transform.
//!
//! This type covers the subset of 2-D affine transforms that `stratum_core`
//! actually needs (identity, multiply, translation and scale access) without
//! pulling in a full linear-algebra crate. The column-major `[[f64; 3]; 3]`
//! layout matches the 9-float per-instance matrix attribute uploaded to the
//! GPU, so [`to_f32_array`](Transform2d::to_f32_array) is a plain cast.

use core::ops::Mul;

use kurbo::{Point, Vec2};

/// A column-major 3×3 homogeneous affine transform stored as `[[f64; 3]; 3]`.
///
/// Each inner array is one *column* of the matrix. The third column carries
/// the translation; the diagonal of the upper-left 2×2 carries the axis
/// scales. The scene graph never introduces rotation or shear, which is what
/// makes the per-axis scale surgery in
/// [`with_scale`](Self::with_scale) sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2d {
    /// Three columns, each a 3-element array `[x, y, w]`.
    pub cols: [[f64; 3]; 3],
}

impl Transform2d {
    /// The 3×3 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 3]; 3]) -> Self {
        Self { cols }
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64) -> Self {
        Self {
            cols: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [x, y, 1.0]],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64) -> Self {
        Self {
            cols: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Creates a scale-then-translate transform (the usual node layout:
    /// a unit quad scaled to its dimensions and moved to its center).
    #[inline]
    #[must_use]
    pub const fn from_translation_scale(x: f64, y: f64, sx: f64, sy: f64) -> Self {
        Self {
            cols: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [x, y, 1.0]],
        }
    }

    /// Returns the translation component.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> Point {
        Point::new(self.cols[2][0], self.cols[2][1])
    }

    /// Overwrites the translation component in place.
    #[inline]
    pub const fn set_translation(&mut self, x: f64, y: f64) {
        self.cols[2][0] = x;
        self.cols[2][1] = y;
    }

    /// Returns the X-axis scale component.
    #[inline]
    #[must_use]
    pub const fn scale_x(&self) -> f64 {
        self.cols[0][0]
    }

    /// Returns the Y-axis scale component.
    #[inline]
    #[must_use]
    pub const fn scale_y(&self) -> f64 {
        self.cols[1][1]
    }

    /// Returns both axis scales as a vector.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> Vec2 {
        Vec2::new(self.cols[0][0], self.cols[1][1])
    }

    /// Overwrites the diagonal scale components in place.
    #[inline]
    pub const fn set_scale(&mut self, sx: f64, sy: f64) {
        self.cols[0][0] = sx;
        self.cols[1][1] = sy;
    }

    /// Returns a copy with the diagonal scale components replaced.
    ///
    /// This is the mechanism behind the scale-inheritance policies: a parent
    /// world matrix has one or both axis scales forced to 1 before a child's
    /// local matrix is composed onto it.
    #[inline]
    #[must_use]
    pub const fn with_scale(&self, sx: f64, sy: f64) -> Self {
        let mut out = *self;
        out.cols[0][0] = sx;
        out.cols[1][1] = sy;
        out
    }

    /// Applies this transform to a point.
    #[inline]
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let c = &self.cols;
        Point::new(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1],
        )
    }

    /// Returns the matrix as 9 `f32`s in column-major order — the exact
    /// per-instance payload layout of the matrix buffers.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "f64 -> f32 narrowing is the intended GPU payload precision"
    )]
    pub const fn to_f32_array(&self) -> [f32; 9] {
        let c = &self.cols;
        [
            c[0][0] as f32,
            c[0][1] as f32,
            c[0][2] as f32,
            c[1][0] as f32,
            c[1][1] as f32,
            c[1][2] as f32,
            c[2][0] as f32,
            c[2][1] as f32,
            c[2][2] as f32,
        ]
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_finite()
            && c[0][1].is_finite()
            && c[0][2].is_finite()
            && c[1][0].is_finite()
            && c[1][1].is_finite()
            && c[1][2].is_finite()
            && c[2][0].is_finite()
            && c[2][1].is_finite()
            && c[2][2].is_finite()
    }
}

impl Default for Transform2d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform2d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 3]; 3];
        let mut j = 0;
        while j < 3 {
            let mut i = 0;
            while i < 3 {
                out[j][i] = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform2d::default(), Transform2d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform2d::from_translation(1.0, 2.0);
        assert_eq!(Transform2d::IDENTITY * t, t);
        assert_eq!(t * Transform2d::IDENTITY, t);
    }

    #[test]
    fn translation_composition() {
        let a = Transform2d::from_translation(1.0, 0.0);
        let b = Transform2d::from_translation(0.0, 2.0);
        let c = a * b;
        assert_eq!(c.translation(), Point::new(1.0, 2.0));
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform2d::from_scale(2.0, 2.0);
        let t = Transform2d::from_translation(3.0, 4.0);
        // Scale first, then translate: T * S.
        let combined = t * s;
        assert_eq!(combined.cols[0], [2.0, 0.0, 0.0]);
        assert_eq!(combined.translation(), Point::new(3.0, 4.0));
    }

    #[test]
    fn parent_scale_multiplies_child_translation() {
        // A child offset composed under a scaled parent lands at
        // parent_scale * offset.
        let parent = Transform2d::from_scale(2.0, 3.0);
        let child = Transform2d::from_translation(10.0, 10.0);
        let world = parent * child;
        assert_eq!(world.translation(), Point::new(20.0, 30.0));
    }

    #[test]
    fn with_scale_preserves_translation() {
        let t = Transform2d::from_translation_scale(5.0, -7.0, 4.0, 9.0);
        let forced = t.with_scale(1.0, 1.0);
        assert_eq!(forced.translation(), Point::new(5.0, -7.0));
        assert_eq!(forced.scale(), Vec2::new(1.0, 1.0));
        // Original untouched.
        assert_eq!(t.scale(), Vec2::new(4.0, 9.0));
    }

    #[test]
    fn apply_matches_composition() {
        let t = Transform2d::from_translation_scale(1.0, 2.0, 3.0, 4.0);
        assert_eq!(t.apply(Point::new(0.5, -0.5)), Point::new(2.5, 0.0));
    }

    #[test]
    fn set_translation_and_scale() {
        let mut t = Transform2d::IDENTITY;
        t.set_translation(8.0, 9.0);
        t.set_scale(2.0, 5.0);
        assert_eq!(t, Transform2d::from_translation_scale(8.0, 9.0, 2.0, 5.0));
    }

    #[test]
    fn f32_payload_is_column_major() {
        let t = Transform2d::from_translation_scale(7.0, 8.0, 2.0, 3.0);
        assert_eq!(
            t.to_f32_array(),
            [2.0, 0.0, 0.0, 0.0, 3.0, 0.0, 7.0, 8.0, 1.0]
        );
    }

    #[test]
    fn infinity_detected() {
        let mut t = Transform2d::IDENTITY;
        t.cols[2][0] = f64::INFINITY;
        assert!(!t.is_finite());
        assert!(Transform2d::IDENTITY.is_finite());
    }
}
