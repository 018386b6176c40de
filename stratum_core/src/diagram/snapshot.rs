// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene persistence boundary.
//!
//! At export time every container yields its name plus a position and scale
//! pair; at import time the same pair is applied back onto an existing
//! container of that name. The file format wrapping these numbers is the
//! surrounding editor's concern — this module only defines the payload and
//! keeps the round trip exact.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::anchor::AnchorStore;
use crate::error::SceneError;
use crate::scene::SceneStore;

use super::Diagram;

/// One container's persisted placement.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerState {
    /// The container's name (the import key).
    pub name: String,
    /// Center position of the container root.
    pub position: [f64; 2],
    /// Width and height of the container root.
    pub scale: [f64; 2],
}

impl Diagram {
    /// Exports every container's placement, in insertion order.
    #[must_use]
    pub fn export_states(&self, store: &SceneStore) -> Vec<ContainerState> {
        self.containers()
            .iter()
            .map(|c| {
                let local = store.local_transform(c.root);
                let t = local.translation();
                ContainerState {
                    name: String::from(c.name_row.label()),
                    position: [t.x, t.y],
                    scale: [local.scale_x(), local.scale_y()],
                }
            })
            .collect()
    }

    /// Applies exported placements back onto this diagram's containers,
    /// re-baking each container's dimension-dependent offsets.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] on the first state naming a
    /// container that does not exist; states before it are already applied.
    pub fn apply_states(
        &self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        states: &[ContainerState],
    ) -> Result<(), SceneError> {
        for state in states {
            let [x, y] = state.position;
            let [w, h] = state.scale;
            // Route through resize so rows, handles, and corner anchors are
            // re-derived for the restored dimensions.
            self.resize_container(
                store,
                anchors,
                &state.name,
                Point::new(x - w / 2.0, y + h / 2.0),
                Point::new(x + w / 2.0, y - h / 2.0),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::ContainerType;
    use super::super::theme::{CONTAINER_HEIGHT, CONTAINER_WIDTH};
    use super::*;

    fn build(names: &[&str]) -> (SceneStore, AnchorStore, Diagram) {
        let mut store = SceneStore::new();
        let mut anchors = AnchorStore::new();
        let mut diagram = Diagram::new();
        for name in names {
            diagram
                .add_container(
                    &mut store,
                    &mut anchors,
                    name,
                    ContainerType::Class,
                    Point::ZERO,
                    Point::new(CONTAINER_WIDTH, -CONTAINER_HEIGHT),
                )
                .unwrap();
        }
        (store, anchors, diagram)
    }

    #[test]
    fn export_reads_back_applied_placements() {
        let (mut store, mut anchors, mut diagram) = build(&["Shape", "Circle"]);
        diagram
            .add_variable(&mut store, &mut anchors, "Circle", "radius: float")
            .unwrap();
        diagram
            .move_container(&mut store, "Shape", Point::new(120.0, -40.0))
            .unwrap();

        let states = diagram.export_states(&store);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].name, "Shape");
        assert_eq!(states[0].position, [120.0, -40.0]);
        assert_eq!(states[0].scale, [CONTAINER_WIDTH, CONTAINER_HEIGHT]);
    }

    #[test]
    fn round_trip_restores_world_matrices() {
        // Export, rebuild the same structure fresh, reimport: every node's
        // world matrix matches within 1e-6.
        let (mut store, mut anchors, mut diagram) = build(&["Shape", "Circle"]);
        diagram
            .add_variable(&mut store, &mut anchors, "Circle", "radius: float")
            .unwrap();
        diagram
            .add_method(&mut store, &mut anchors, "Circle", "area(): float")
            .unwrap();
        diagram
            .move_container(&mut store, "Shape", Point::new(77.0, 31.5))
            .unwrap();
        diagram
            .resize_container(
                &mut store,
                &mut anchors,
                "Shape",
                Point::new(-10.0, 200.0),
                Point::new(410.0, -100.0),
            )
            .unwrap();
        let _ = store.evaluate();

        let states = diagram.export_states(&store);
        let before: Vec<[[f64; 3]; 3]> = diagram
            .containers()
            .iter()
            .flat_map(|c| store.subtree(c.root))
            .map(|n| store.world_transform(n).cols)
            .collect();

        // A fresh scene with the same logical structure.
        let (mut store2, mut anchors2, mut diagram2) = build(&["Shape", "Circle"]);
        diagram2
            .add_variable(&mut store2, &mut anchors2, "Circle", "radius: float")
            .unwrap();
        diagram2
            .add_method(&mut store2, &mut anchors2, "Circle", "area(): float")
            .unwrap();
        diagram2
            .apply_states(&mut store2, &mut anchors2, &states)
            .unwrap();
        let _ = store2.evaluate();

        let after: Vec<[[f64; 3]; 3]> = diagram2
            .containers()
            .iter()
            .flat_map(|c| store2.subtree(c.root))
            .map(|n| store2.world_transform(n).cols)
            .collect();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            for j in 0..3 {
                for i in 0..3 {
                    assert!(
                        (b[j][i] - a[j][i]).abs() < 1e-6,
                        "world matrices must round-trip"
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_names_are_reported() {
        let (mut store, mut anchors, diagram) = build(&["Shape"]);
        let err = diagram
            .apply_states(
                &mut store,
                &mut anchors,
                &[ContainerState {
                    name: "Ghost".into(),
                    position: [0.0, 0.0],
                    scale: [100.0, 50.0],
                }],
            )
            .unwrap_err();
        assert_eq!(err, SceneError::UnknownContainer("Ghost".into()));
    }
}
