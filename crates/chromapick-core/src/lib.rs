//! Core abstractions for chromapick.
//!
//! This crate provides colour-based object picking independent of any
//! graphics API:
//! - [`encode`]/[`decode`] between [`ObjectHandle`]s and [`IdentityColor`]s
//! - [`PickResolver`], which renders the identity pass through an
//!   [`IdentityRenderer`], reads one pixel through a [`FramebufferReader`] and
//!   updates the [`SelectionState`]
//! - [`TransformCache`] shared by the visible and identity passes
//! - [`SoftwareTarget`], a CPU implementation of both collaborator traits

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod error;
pub mod options;
pub mod pick;
pub mod raster;
pub mod request;
pub mod resolver;
pub mod selection;
pub mod shader;
pub mod transform;

pub use backend::{
    DrawRange, DrawSpec, FramebufferReader, IdentityRenderer, PickBackend, PrimitiveKind,
};
pub use error::{PickError, Result};
pub use options::{OutOfBoundsPolicy, PickOptions};
pub use pick::{
    decode, decode_checked, encode, IdentityColor, ObjectHandle, BACKGROUND_COLOR,
    MAX_OBJECT_COUNT,
};
pub use raster::SoftwareTarget;
pub use request::PickRequest;
pub use resolver::{PickResolver, CLEAR_DEPTH};
pub use selection::{SelectionState, NO_SELECTION};
pub use shader::ShaderInterface;
pub use transform::TransformCache;

// Re-export glam types for convenience
pub use glam::{Mat4, Vec3, Vec4};
