//! chromapick: colour-based object picking.
//!
//! Every selectable object is drawn into an offscreen identity buffer in a
//! flat colour that encodes its handle. Reading the single pixel under the
//! cursor and decoding it yields the frontmost object there, because the
//! identity pass uses the same transforms and depth test as the visible pass.
//!
//! # Quick Start
//!
//! ```no_run
//! use chromapick::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut viewer = Viewer::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)?;
//!     if let Some(handle) = viewer.pick(600, 400)? {
//!         println!("picked spiral {handle}");
//!     }
//!     viewer.save_frame("frame.png")?;
//!     Ok(())
//! }
//! ```
//!
//! The core algorithm lives in [`chromapick_core`] and runs against any
//! [`PickBackend`]; [`SoftwareTarget`] is a CPU backend for environments
//! without a GPU.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod scene;
pub mod viewer;

// Re-export core types
pub use chromapick_core::{
    decode, decode_checked, encode, DrawRange, DrawSpec, FramebufferReader, IdentityColor,
    IdentityRenderer, Mat4, ObjectHandle, OutOfBoundsPolicy, PickBackend, PickError,
    PickOptions, PickRequest, PickResolver, PrimitiveKind, Result, SelectionState,
    SoftwareTarget, TransformCache, Vec3, Vec4, BACKGROUND_COLOR, NO_SELECTION,
};

// Re-export render types
pub use chromapick_render::{Camera, CaptureOptions, RenderEngine, RenderError};

pub use scene::{SpiralScene, SPIRAL_COUNT, SPIRAL_STEPS, SPIRAL_VERTEX_COUNT};
pub use viewer::{Viewer, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Initializes the `env_logger` backend for the `log` facade.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
