//! Core data structures for meshlod
//!
//! This crate provides the mesh description consumed by the LOD generator:
//! vertex buffers, per-submesh index buffers and the error type shared by
//! the workspace.

pub mod point;
pub mod index;
pub mod mesh;
pub mod error;

pub use point::*;
pub use index::*;
pub use mesh::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

/// Common result type for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;
