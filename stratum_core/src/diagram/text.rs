// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph runs: fixed-metric text as chains of letter quads.
//!
//! The glyph atlas is a single row of character strips; which strip a quad
//! samples is pure texture-coordinate selection, so every glyph in the
//! scene shares one batch. Pixel generation for the atlas is the texture
//! provider's job — this module only owns the character table and the UV
//! math.
//!
//! Each glyph's position is expressed as an anchor chained to its
//! predecessor (one fixed advance apart), with the chain root anchored at
//! the run's starting point in row-local coordinates. Moving the start
//! shifts the whole run.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use crate::anchor::{AnchorBasis, AnchorId, AnchorStore};
use crate::error::SceneError;
use crate::props::{DrawMode, RenderProps, UvQuad};
use crate::scene::{NodeId, NodeKind, ScalePolicy, SceneStore};
use crate::transform::Transform2d;

use super::theme::{GLYPH_HEIGHT, GLYPH_WIDTH, TEXTURE_GLYPHS, UV_EPSILON};

/// Characters present in the glyph atlas, in strip order.
pub const ATLAS_CHARACTERS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 :;_#\"'[]()<>@=+-*/.,";

/// Texture coordinates for one character's strip. Characters missing from
/// the atlas fall back to the space strip.
#[must_use]
pub fn glyph_uv(c: char) -> UvQuad {
    let count = ATLAS_CHARACTERS.chars().count();
    let index = ATLAS_CHARACTERS
        .chars()
        .position(|a| a == c)
        .unwrap_or_else(|| {
            ATLAS_CHARACTERS
                .chars()
                .position(|a| a == ' ')
                .unwrap_or(0)
        });
    UvQuad::from_strip(index, count, UV_EPSILON)
}

/// One text run: glyph nodes plus the anchor chain placing them.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    /// The text this run displays.
    pub text: String,
    /// One glyph node per character, children of the row node.
    pub glyphs: Vec<NodeId>,
    /// The anchor chain: `chain[0]` is the run start,
    /// `chain[i]` hangs one advance after `chain[i - 1]`.
    pub chain: Vec<AnchorId>,
}

impl GlyphRun {
    /// Spawns glyph nodes for `text` under `row`, starting at `start` in
    /// row-local coordinates (the center of the first glyph).
    ///
    /// # Errors
    ///
    /// Propagates node-construction failures.
    pub fn spawn(
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        row: NodeId,
        start: Point,
        text: &str,
    ) -> Result<Self, SceneError> {
        let mut glyphs = Vec::new();
        let mut chain = Vec::new();

        for (i, c) in text.chars().enumerate() {
            let anchor = if i == 0 {
                anchors.anchored(AnchorBasis::Point(start), Vec2::ZERO)
            } else {
                anchors.anchored(AnchorBasis::Anchor(chain[i - 1]), Vec2::new(GLYPH_WIDTH, 0.0))
            };
            chain.push(anchor);

            let glyph = store.create_node(
                NodeKind::Glyph,
                ScalePolicy::IgnoreScale,
                alloc::vec![RenderProps::new(
                    DrawMode::Fill,
                    TEXTURE_GLYPHS,
                    glyph_uv(c),
                    0
                )?],
            )?;
            store.add_child(row, glyph)?;
            let at = anchors.value(store, anchor);
            store.set_transform(
                glyph,
                Transform2d::from_translation_scale(at.x, at.y, GLYPH_WIDTH, GLYPH_HEIGHT),
            );
            glyphs.push(glyph);
        }

        Ok(Self {
            text: String::from(text),
            glyphs,
            chain,
        })
    }

    /// Moves the run start and re-derives every glyph position from the
    /// chain. Used when the owning row is resized.
    pub fn rebase(&self, store: &mut SceneStore, anchors: &mut AnchorStore, start: Point) {
        if let Some(&root) = self.chain.first() {
            anchors.translate(root, start);
        }
        for &anchor in &self.chain {
            anchors.invalidate(anchor);
        }
        for (&glyph, &anchor) in self.glyphs.iter().zip(&self.chain) {
            let at = anchors.value(store, anchor);
            store.set_position(glyph, at.x, at.y);
        }
    }

    /// Width of the run in layout units.
    #[must_use]
    pub fn width(&self) -> f64 {
        label_width(&self.text)
    }
}

/// Width of a label rendered at the fixed glyph advance.
#[must_use]
pub fn label_width(text: &str) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "label lengths are far below f64 precision limits"
    )]
    let len = text.chars().count() as f64;
    len * GLYPH_WIDTH
}
