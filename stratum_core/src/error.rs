// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for scene construction and editing.
//!
//! All failures in this crate are deterministic and synchronous; there are
//! no transient failure modes. Errors fall into two families:
//!
//! - **Configuration** — invalid static setup ([`Cycle`](SceneError::Cycle),
//!   [`EmptyRenderProps`](SceneError::EmptyRenderProps),
//!   [`ZOutOfRange`](SceneError::ZOutOfRange),
//!   [`DuplicateContainer`](SceneError::DuplicateContainer)). These fail
//!   fast: the offending construction or reparenting is aborted before any
//!   state is mutated, so no partial state ever leaks into the graph.
//! - **Lookup** — a named container or property referenced during connection
//!   creation does not exist
//!   ([`UnknownContainer`](SceneError::UnknownContainer),
//!   [`UnknownProperty`](SceneError::UnknownProperty)). Surfaced to the
//!   editing layer synchronously; never retried.
//!
//! Capacity failures on GPU buffers are reported by the render crate, which
//! owns the buffers.

use alloc::string::String;
use core::fmt;

/// An error raised by scene construction or editing operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneError {
    /// Reparenting would make a node an ancestor of itself.
    Cycle,
    /// A renderable node was constructed with no render properties.
    EmptyRenderProps,
    /// A render property's z-index falls outside `[Z_MIN, Z_MAX)`.
    ZOutOfRange(i16),
    /// A container with the given name already exists in the diagram.
    DuplicateContainer(String),
    /// No container with the given name exists in the diagram.
    UnknownContainer(String),
    /// The named container has no property matching the given name.
    UnknownProperty {
        /// Container that was searched.
        container: String,
        /// Property name that was not found.
        property: String,
    },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle => write!(f, "reparenting would create a cycle"),
            Self::EmptyRenderProps => {
                write!(f, "renderable node constructed with no render properties")
            }
            Self::ZOutOfRange(z) => write!(f, "z-index {z} outside the batchable range"),
            Self::DuplicateContainer(name) => {
                write!(f, "a container named {name:?} already exists")
            }
            Self::UnknownContainer(name) => write!(f, "no container named {name:?}"),
            Self::UnknownProperty {
                container,
                property,
            } => write!(f, "container {container:?} has no property {property:?}"),
        }
    }
}

impl core::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_names_the_offender() {
        let err = SceneError::UnknownContainer("Shape".to_string());
        assert!(err.to_string().contains("Shape"));

        let err = SceneError::UnknownProperty {
            container: "Shape".to_string(),
            property: "area".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Shape") && msg.contains("area"));
    }
}
