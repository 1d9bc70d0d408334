//! Rendering backend for chromapick.
//!
//! This crate provides the wgpu-based implementation of the picking
//! collaborators, including:
//! - An offscreen identity target (`Rgba8Unorm` + depth) implementing
//!   [`chromapick_core::IdentityRenderer`] and [`chromapick_core::FramebufferReader`]
//! - The visible scene pass, drawn with the same transforms and depth state
//! - WGSL shader reflection through naga
//! - Camera and frame capture

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod camera;
pub mod capture;
pub mod engine;
pub mod error;
pub mod shader;

pub use camera::Camera;
pub use capture::{encode_png, save_image, CaptureOptions};
pub use engine::{
    FlatColorUniforms, RenderEngine, SceneUniforms, DEPTH_FORMAT, PICK_COLOR_FORMAT,
    SCENE_COLOR_FORMAT,
};
pub use error::{RenderError, RenderResult};
pub use shader::{create_flat_color_module, reflect_interface, FLAT_COLOR_WGSL, SCENE_WGSL};
