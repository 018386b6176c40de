// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The assembly layer: containers, connections, and the diagram registry.
//!
//! A [`Diagram`] owns the editing-level view of the scene: containers
//! addressed by name, and connections between their sockets. The scene
//! store and anchor store are passed into each operation rather than owned,
//! so the caller keeps a single source of truth for the whole frame
//! pipeline.
//!
//! Containers are created and destroyed here; connections reference two
//! existing sockets and are destroyed independently. Destroying a container
//! leaves dead slots behind in the GPU batches — the caller is expected to
//! trigger a full rebatch afterwards (see
//! [`entities`](Diagram::entities)).

mod container;
mod snapshot;
pub mod text;
pub mod theme;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::Point;

use crate::anchor::AnchorStore;
use crate::error::SceneError;
use crate::scene::{ConnectionId, NodeId, SceneEntity, SceneStore};

pub use container::{CORNER_BL, CORNER_BR, CORNER_TL, CORNER_TR, Container, PropertyRow};
pub use snapshot::ContainerState;
pub use theme::ContainerType;

/// A line between two sockets.
///
/// Connections own no transform subtree: each contributes exactly two
/// endpoint matrices (the sockets' world matrices) to the fixed connection
/// batch, with no render-property iteration.
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    /// The connection's identity in the diagram.
    pub id: ConnectionId,
    /// Socket on the source row's left edge.
    pub a: NodeId,
    /// Socket on the target row's right edge.
    pub b: NodeId,
}

/// The editing-level registry of containers and connections.
#[derive(Clone, Debug, Default)]
pub struct Diagram {
    /// Containers in insertion order (the enumeration order for rebatching).
    containers: Vec<Container>,
    /// Name → index into `containers`.
    names: HashMap<String, usize>,
    connections: Vec<Connection>,
    next_connection: u32,
}

impl Diagram {
    /// Creates an empty diagram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container spanning the rectangle with corners `a`, `b`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateContainer`] if a container with this
    /// name already exists (nothing is created), or propagates node
    /// construction failures.
    pub fn add_container(
        &mut self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        name: &str,
        kind: ContainerType,
        a: Point,
        b: Point,
    ) -> Result<&Container, SceneError> {
        if self.names.contains_key(name) {
            return Err(SceneError::DuplicateContainer(String::from(name)));
        }
        let container = Container::spawn(store, anchors, name, kind, a, b)?;
        self.names.insert(String::from(name), self.containers.len());
        self.containers.push(container);
        Ok(self.containers.last().expect("just pushed"))
    }

    /// Looks up a container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.names.get(name).map(|&i| &self.containers[i])
    }

    /// All containers, in insertion order.
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// All connections, in creation order.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Looks up a connection by id.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Appends a variable row to the named container.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists, or propagates row construction failures.
    pub fn add_variable(
        &mut self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        container: &str,
        label: &str,
    ) -> Result<(), SceneError> {
        let idx = self.find(container)?;
        self.containers[idx].add_variable(store, anchors, label)
    }

    /// Appends a method row to the named container, below all variables.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists, or propagates row construction failures.
    pub fn add_method(
        &mut self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        container: &str,
        label: &str,
    ) -> Result<(), SceneError> {
        let idx = self.find(container)?;
        self.containers[idx].add_method(store, anchors, label)
    }

    /// Creates a connection between two sockets, each addressed as
    /// `(container name, optional property name)`. `None` targets the
    /// container's own name row; a property name matches the first variable
    /// or method row whose label contains it.
    ///
    /// The line runs from the source row's left socket to the target row's
    /// right socket.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] or
    /// [`SceneError::UnknownProperty`] when either endpoint does not
    /// resolve; no connection is created.
    pub fn connect(
        &mut self,
        from: (&str, Option<&str>),
        to: (&str, Option<&str>),
    ) -> Result<ConnectionId, SceneError> {
        let a = self.containers[self.find(from.0)?].socket(from.0, from.1, true)?;
        let b = self.containers[self.find(to.0)?].socket(to.0, to.1, false)?;
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.push(Connection { id, a, b });
        Ok(id)
    }

    /// Removes a connection. Returns `false` if the id was not present.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }

    /// Destroys the named container's entire subtree, along with every
    /// connection attached to one of its sockets.
    ///
    /// The destroyed nodes leave dead slots behind in the GPU batches;
    /// trigger a full rebatch afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists.
    pub fn destroy_container(
        &mut self,
        store: &mut SceneStore,
        name: &str,
    ) -> Result<(), SceneError> {
        let idx = self.find(name)?;
        let container = self.containers.remove(idx);
        self.names.remove(name);
        for index in self.names.values_mut() {
            if *index > idx {
                *index -= 1;
            }
        }

        store.destroy_subtree(container.root);
        self.connections
            .retain(|c| store.is_alive(c.a) && store.is_alive(c.b));
        Ok(())
    }

    /// Moves the named container, keeping its dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists.
    pub fn move_container(
        &self,
        store: &mut SceneStore,
        name: &str,
        position: Point,
    ) -> Result<(), SceneError> {
        self.containers[self.find(name)?].move_to(store, position);
        Ok(())
    }

    /// Resizes the named container to span the rectangle with corners `a`,
    /// `b`, re-baking every dimension-dependent offset.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists.
    pub fn resize_container(
        &self,
        store: &mut SceneStore,
        anchors: &mut AnchorStore,
        name: &str,
        a: Point,
        b: Point,
    ) -> Result<(), SceneError> {
        self.containers[self.find(name)?].resize(store, anchors, a, b);
        Ok(())
    }

    /// Shows or hides the named container's corner resize handles
    /// (selection feedback).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownContainer`] if no such container
    /// exists.
    pub fn set_selected(
        &self,
        store: &mut SceneStore,
        name: &str,
        selected: bool,
    ) -> Result<(), SceneError> {
        self.containers[self.find(name)?].set_handles_visible(store, selected);
        Ok(())
    }

    /// Every live entity, containers first then connections — the
    /// enumeration a full rebatch walks.
    #[must_use]
    pub fn entities(&self) -> Vec<SceneEntity> {
        self.containers
            .iter()
            .map(|c| SceneEntity::Container(c.root))
            .chain(
                self.connections
                    .iter()
                    .map(|c| SceneEntity::Connection(c.id)),
            )
            .collect()
    }

    /// Resolves a connection's endpoint sockets.
    #[must_use]
    pub fn endpoints(&self, id: ConnectionId) -> Option<(NodeId, NodeId)> {
        self.connection(id).map(|c| (c.a, c.b))
    }

    fn find(&self, name: &str) -> Result<usize, SceneError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownContainer(String::from(name)))
    }
}
