// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container assembly: a diagram box and its standard parts.
//!
//! A container is one transform subtree:
//!
//! ```text
//!   root (Container, Full)          — unit quad scaled to (w, h), outlined
//!   ├─ title bar   (LockX)          — fixed height, rides the width
//!   ├─ body        (LockX)          — fills below the title
//!   ├─ visibility  (IgnoreScale)    — fixed square, top-right
//!   ├─ resize × 4  (IgnoreScale)    — fixed squares on the corners, hidden
//!   ├─ name row    (LockX)          — centered glyph run + two sockets
//!   └─ property rows (LockX)        — variables first, then methods
//! ```
//!
//! Scale policies do the heavy lifting: stretching the root resizes the
//! title bar and rows horizontally while their heights and every square
//! handle stay fixed. What policies cannot express — absolute offsets that
//! depend on the current (w, h), like corner positions and row baselines —
//! is re-baked by [`Container::resize`] after the dimensions change.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use crate::anchor::{AnchorBasis, AnchorId, AnchorStore};
use crate::error::SceneError;
use crate::scene::{NodeId, NodeKind, ScalePolicy, SceneStore};
use crate::transform::Transform2d;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use super::text::{GlyphRun, label_width};
use super::theme::{
    self, BODY_MARGIN_LEFT, BODY_MARGIN_RIGHT, CONTAINER_WIDTH, ContainerType, GLYPH_HEIGHT,
    GLYPH_WIDTH, RESIZE_HANDLE_SIZE, SOCKET_SIZE, TITLE_HEIGHT, VISIBILITY_HANDLE_SIZE,
};

/// Index of the top-left corner in [`Container::corners`] and
/// [`Container::resize_handles`].
pub const CORNER_TL: usize = 0;
/// Index of the top-right corner.
pub const CORNER_TR: usize = 1;
/// Index of the bottom-right corner.
pub const CORNER_BR: usize = 2;
/// Index of the bottom-left corner.
pub const CORNER_BL: usize = 3;

/// Unit-quad corner offsets, in [`CORNER_TL`]..[`CORNER_BL`] order.
const CORNER_OFFSETS: [(f64, f64); 4] = [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)];

/// One property row: the row rectangle, its in/out sockets, and its text.
#[derive(Clone, Debug)]
pub struct PropertyRow {
    /// The row rectangle (a `LockX` child of the container root).
    pub node: NodeId,
    /// Socket on the row's left edge (connection target).
    pub socket_in: NodeId,
    /// Socket on the row's right edge (connection source).
    pub socket_out: NodeId,
    /// The row's text run.
    pub run: GlyphRun,
    /// Whether the run is centered in the row (name rows) or left-aligned
    /// behind the body margin (property rows).
    centered: bool,
}

impl PropertyRow {
    /// The row's display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.run.text
    }

    fn spawn(
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        root: NodeId,
        width: f64,
        center_y: f64,
        fill: theme::PaletteColor,
        label: &str,
        centered: bool,
    ) -> Result<Self, SceneError> {
        let node = store.create_node(
            NodeKind::Handle,
            ScalePolicy::LockX,
            alloc::vec![theme::fill(fill, 0)?],
        )?;
        store.add_child(root, node)?;
        store.set_transform(
            node,
            Transform2d::from_translation_scale(0.0, center_y, 1.0, GLYPH_HEIGHT),
        );

        let socket_props = alloc::vec![
            theme::fill(theme::STYLE_SOCKET_FILL, 1)?,
            theme::outline(theme::STYLE_SOCKET_OUTLINE, 1)?,
        ];
        let socket_in = store.create_node(
            NodeKind::Handle,
            ScalePolicy::IgnoreScale,
            socket_props.clone(),
        )?;
        store.add_child(node, socket_in)?;
        let socket_out =
            store.create_node(NodeKind::Handle, ScalePolicy::IgnoreScale, socket_props)?;
        store.add_child(node, socket_out)?;

        let run = GlyphRun::spawn(
            store,
            anchors,
            node,
            Self::run_start(width, label, centered),
            label,
        )?;

        let row = Self {
            node,
            socket_in,
            socket_out,
            run,
            centered,
        };
        row.rebake(store, anchors, width, center_y);
        Ok(row)
    }

    /// Center of the first glyph, in row-local coordinates.
    fn run_start(width: f64, label: &str, centered: bool) -> Point {
        let x = if centered {
            -label_width(label) / 2.0 + GLYPH_WIDTH / 2.0
        } else {
            -width / 2.0 + BODY_MARGIN_LEFT + GLYPH_WIDTH / 2.0
        };
        Point::new(x, 0.0)
    }

    /// Re-derives everything that depends on the container dimensions: the
    /// row baseline, the socket x offsets, and the glyph run start.
    fn rebake(&self, store: &mut SceneStore, anchors: &mut AnchorStore, width: f64, center_y: f64) {
        store.set_position(self.node, 0.0, center_y);
        store.set_transform(
            self.socket_in,
            Transform2d::from_translation_scale(-width / 2.0, 0.0, SOCKET_SIZE, SOCKET_SIZE),
        );
        store.set_transform(
            self.socket_out,
            Transform2d::from_translation_scale(width / 2.0, 0.0, SOCKET_SIZE, SOCKET_SIZE),
        );
        self.run.rebase(
            store,
            anchors,
            Self::run_start(width, &self.run.text, self.centered),
        );
    }
}

/// One diagram box: a container root and its parts.
#[derive(Clone, Debug)]
pub struct Container {
    /// Semantic kind, selecting the accent color.
    pub kind: ContainerType,
    /// The subtree root.
    pub root: NodeId,
    /// Title bar.
    pub title: NodeId,
    /// Body fill below the title bar.
    pub body: NodeId,
    /// Visibility toggle handle.
    pub visibility: NodeId,
    /// Corner resize handles in [`CORNER_TL`]..[`CORNER_BL`] order, hidden
    /// until the container is selected.
    pub resize_handles: [NodeId; 4],
    /// Corner anchors in the same order, expressed as the root's world
    /// origin plus a half-unit offset scaled by the dimensions.
    pub corners: [AnchorId; 4],
    /// The title row (centered text plus the container's own sockets).
    pub name_row: PropertyRow,
    /// Variable rows, in insertion order.
    pub variables: Vec<PropertyRow>,
    /// Method rows, in insertion order.
    pub methods: Vec<PropertyRow>,
    /// Widest label seen so far, including body margins. Only ever grows —
    /// removing a property does not shrink the box.
    widest_label: f64,
}

impl Container {
    /// Assembles a container spanning the rectangle with corners `a`, `b`.
    pub(super) fn spawn(
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        name: &str,
        kind: ContainerType,
        a: Point,
        b: Point,
    ) -> Result<Self, SceneError> {
        let w = (b.x - a.x).abs();
        let h = (b.y - a.y).abs();
        let center = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        let accent = kind.accent();

        let root = store.create_node(
            NodeKind::Container,
            ScalePolicy::Full,
            alloc::vec![theme::outline(accent, 1)?],
        )?;
        store.set_transform(
            root,
            Transform2d::from_translation_scale(center.x, center.y, w, h),
        );

        let title = store.create_node(
            NodeKind::Handle,
            ScalePolicy::LockX,
            alloc::vec![theme::fill(accent, 0)?],
        )?;
        store.add_child(root, title)?;

        let body = store.create_node(
            NodeKind::Handle,
            ScalePolicy::LockX,
            alloc::vec![theme::fill(theme::STYLE_BODY, 0)?],
        )?;
        store.add_child(root, body)?;

        let visibility = store.create_node(
            NodeKind::Handle,
            ScalePolicy::IgnoreScale,
            alloc::vec![theme::fill(theme::STYLE_VISIBILITY_FILL, 0)?],
        )?;
        store.add_child(root, visibility)?;

        let handle_props = alloc::vec![
            theme::fill(theme::STYLE_RESIZE_FILL, 1)?,
            theme::outline(theme::STYLE_RESIZE_OUTLINE, 1)?,
        ];
        let mut handle_list = Vec::with_capacity(4);
        let mut corner_list = Vec::with_capacity(4);
        for &(cx, cy) in &CORNER_OFFSETS {
            let handle = store.create_node(
                NodeKind::Handle,
                ScalePolicy::IgnoreScale,
                handle_props.clone(),
            )?;
            store.add_child(root, handle)?;
            store.set_hidden(handle, true);
            handle_list.push(handle);
            corner_list.push(anchors.create(
                AnchorBasis::Node(root),
                Vec2::new(cx, cy),
                Vec2::new(w, h),
            ));
        }
        let resize_handles: [NodeId; 4] = handle_list
            .try_into()
            .expect("one handle per corner offset");
        let corners: [AnchorId; 4] = corner_list
            .try_into()
            .expect("one anchor per corner offset");

        let name_row = PropertyRow::spawn(
            store,
            anchors,
            root,
            w,
            (h - TITLE_HEIGHT) / 2.0,
            theme::PaletteColor::Transparent,
            name,
            true,
        )?;

        let mut container = Self {
            kind,
            root,
            title,
            body,
            visibility,
            resize_handles,
            corners,
            name_row,
            variables: Vec::new(),
            methods: Vec::new(),
            widest_label: CONTAINER_WIDTH,
        };
        container.rebake(store, anchors);
        Ok(container)
    }

    /// Current width, read from the root's local scale.
    #[must_use]
    pub fn width(&self, store: &SceneStore) -> f64 {
        store.local_transform(self.root).scale_x()
    }

    /// Current height, read from the root's local scale.
    #[must_use]
    pub fn height(&self, store: &SceneStore) -> f64 {
        store.local_transform(self.root).scale_y()
    }

    /// Appends a variable row and grows the box to fit it.
    pub(super) fn add_variable(
        &mut self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        label: &str,
    ) -> Result<(), SceneError> {
        let w = self.width(store);
        let h = self.height(store);
        let index = self.variables.len();
        let row = PropertyRow::spawn(
            store,
            anchors,
            self.root,
            w,
            row_center_y(h, index),
            theme::PaletteColor::Transparent,
            label,
            false,
        )?;
        self.variables.push(row);
        self.fit_to_rows(store, anchors, label);
        Ok(())
    }

    /// Appends a method row (below all variable rows) and grows the box to
    /// fit it.
    pub(super) fn add_method(
        &mut self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        label: &str,
    ) -> Result<(), SceneError> {
        let w = self.width(store);
        let h = self.height(store);
        let index = self.variables.len() + self.methods.len();
        let row = PropertyRow::spawn(
            store,
            anchors,
            self.root,
            w,
            row_center_y(h, index),
            theme::STYLE_METHOD_ROW,
            label,
            false,
        )?;
        self.methods.push(row);
        self.fit_to_rows(store, anchors, label);
        Ok(())
    }

    /// Grows the container so the newest label and every row fit, keeping
    /// the top-left corner in place.
    fn fit_to_rows(&mut self, store: &mut SceneStore, anchors: &mut AnchorStore, label: &str) {
        let needed = label_width(label) + BODY_MARGIN_LEFT + BODY_MARGIN_RIGHT;
        if needed > self.widest_label {
            self.widest_label = needed.floor() + 1.0;
        }

        let w = self.width(store).max(self.widest_label);
        #[expect(
            clippy::cast_precision_loss,
            reason = "row counts are far below f64 precision limits"
        )]
        let rows = (self.variables.len() + self.methods.len()) as f64;
        let h = TITLE_HEIGHT + rows * GLYPH_HEIGHT;

        let tl = self.corner_point(store, anchors, CORNER_TL);
        self.resize(store, anchors, tl, Point::new(tl.x + w, tl.y - h));
    }

    /// World position of a corner anchor, forced fresh.
    fn corner_point(
        &self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        corner: usize,
    ) -> Point {
        store.update_world_subtree(self.root);
        anchors.invalidate(self.corners[corner]);
        anchors.value(store, self.corners[corner])
    }

    /// Resizes the container to span the rectangle with corners `a`, `b`,
    /// then re-bakes every dimension-dependent offset.
    pub(super) fn resize(
        &self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        a: Point,
        b: Point,
    ) {
        let w = (b.x - a.x).abs();
        let h = (b.y - a.y).abs();
        store.set_scale(self.root, w, h);
        store.set_position(self.root, (a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        self.rebake(store, anchors);
    }

    /// Moves the container without touching its dimensions. Children ride
    /// along through the transform graph; nothing needs re-baking.
    pub(super) fn move_to(&self, store: &mut SceneStore, position: Point) {
        store.set_position(self.root, position.x, position.y);
    }

    /// Shows or hides the corner resize handles.
    pub(super) fn set_handles_visible(&self, store: &mut SceneStore, visible: bool) {
        for &handle in &self.resize_handles {
            store.set_hidden(handle, !visible);
        }
    }

    /// Re-derives every child offset that depends on the current (w, h).
    fn rebake(&self, store: &mut SceneStore, anchors: &mut AnchorStore) {
        let w = self.width(store);
        let h = self.height(store);

        store.set_transform(
            self.title,
            Transform2d::from_translation_scale(0.0, (h - TITLE_HEIGHT) / 2.0, 1.0, TITLE_HEIGHT),
        );
        store.set_transform(
            self.body,
            Transform2d::from_translation_scale(
                0.0,
                -TITLE_HEIGHT / 2.0,
                1.0,
                (h - TITLE_HEIGHT).max(0.0),
            ),
        );
        store.set_transform(
            self.visibility,
            Transform2d::from_translation_scale(
                w / 2.0 - VISIBILITY_HANDLE_SIZE,
                (h - TITLE_HEIGHT) / 2.0,
                VISIBILITY_HANDLE_SIZE,
                VISIBILITY_HANDLE_SIZE,
            ),
        );

        for (i, &(cx, cy)) in CORNER_OFFSETS.iter().enumerate() {
            store.set_transform(
                self.resize_handles[i],
                Transform2d::from_translation_scale(
                    cx * w,
                    cy * h,
                    RESIZE_HANDLE_SIZE,
                    RESIZE_HANDLE_SIZE,
                ),
            );
            anchors.set_scale(self.corners[i], Vec2::new(w, h));
        }

        self.name_row
            .rebake(store, anchors, w, (h - TITLE_HEIGHT) / 2.0);
        for (i, row) in self.variables.iter().enumerate() {
            row.rebake(store, anchors, w, row_center_y(h, i));
        }
        let offset = self.variables.len();
        for (i, row) in self.methods.iter().enumerate() {
            row.rebake(store, anchors, w, row_center_y(h, offset + i));
        }
    }

    /// Finds the socket for a connection endpoint. `property` of `None`
    /// targets the name row (the container itself); otherwise the first
    /// variable or method row whose label contains the given name wins.
    pub(super) fn socket(
        &self,
        container_name: &str,
        property: Option<&str>,
        inbound: bool,
    ) -> Result<NodeId, SceneError> {
        let row = match property {
            None => &self.name_row,
            Some(target) => self
                .variables
                .iter()
                .chain(self.methods.iter())
                .find(|row| row.label().contains(target))
                .ok_or_else(|| SceneError::UnknownProperty {
                    container: String::from(container_name),
                    property: String::from(target),
                })?,
        };
        Ok(if inbound { row.socket_in } else { row.socket_out })
    }
}

/// Center-line of row `index` (0-based, counted from the body top), in the
/// root's absolute vertical units.
fn row_center_y(h: f64, index: usize) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "row counts are far below f64 precision limits"
    )]
    let i = index as f64;
    h / 2.0 - TITLE_HEIGHT - i * GLYPH_HEIGHT - GLYPH_HEIGHT / 2.0
}
