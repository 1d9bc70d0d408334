//! Identity colour codec.
//!
//! Every selectable object is drawn in the identity pass with a flat colour
//! that encodes its handle. The handle is treated as an unsigned 32-bit
//! integer and split across the four 8-bit channels:
//! - R contains bits 0-7
//! - G contains bits 8-15
//! - B contains bits 16-23
//! - A contains bits 24-31
//!
//! With blending disabled and an 8-bit unorm target, the rasterized value is
//! exactly the encoded value, so decoding the read-back pixel reproduces the
//! handle with zero error.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::{PickError, Result};

/// Identifier of one selectable object among the `N` objects of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    /// Returns the handle as an index into per-object arrays.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ObjectHandle {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An 8-bit RGBA colour as written to and read back from the identity target.
#[repr(C)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
pub struct IdentityColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Clear colour of the identity pass. Decodes to `u32::MAX`, which is never
/// a valid handle.
pub const BACKGROUND_COLOR: IdentityColor = IdentityColor::new(255, 255, 255, 255);

/// Largest object count the codec supports. The value `u32::MAX` itself is
/// reserved for the background.
pub const MAX_OBJECT_COUNT: u32 = u32::MAX;

impl IdentityColor {
    /// Creates a colour from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a colour from an `[r, g, b, a]` array.
    #[must_use]
    pub const fn from_array(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Returns the channels as an `[r, g, b, a]` array.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Reassembles the four channels into the integer they encode.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.to_array())
    }

    /// Returns the colour with each channel mapped to `[0, 1]`, the form a
    /// shader colour uniform expects.
    #[must_use]
    pub fn to_normalized(self) -> Vec4 {
        Vec4::new(
            f32::from(self.r),
            f32::from(self.g),
            f32::from(self.b),
            f32::from(self.a),
        ) / 255.0
    }
}

impl From<[u8; 4]> for IdentityColor {
    fn from(rgba: [u8; 4]) -> Self {
        Self::from_array(rgba)
    }
}

/// Encodes an object handle as its identity colour.
#[must_use]
pub fn encode(handle: ObjectHandle) -> IdentityColor {
    IdentityColor::from_array(handle.0.to_le_bytes())
}

/// Decodes a sampled colour, distinguishing background from mismatches.
///
/// Returns `Ok(None)` for the background colour, `Ok(Some(handle))` for a
/// live object and [`PickError::DecodeMismatch`] when the reconstructed value
/// is not below `object_count`.
pub fn decode_checked(
    color: IdentityColor,
    object_count: u32,
    background: IdentityColor,
) -> Result<Option<ObjectHandle>> {
    if color == background {
        return Ok(None);
    }
    let value = color.to_u32();
    if value >= object_count {
        return Err(PickError::DecodeMismatch {
            value,
            object_count,
        });
    }
    Ok(Some(ObjectHandle(value)))
}

/// Decodes a sampled colour into a handle, or `None` if it does not name one
/// of the `object_count` live objects.
#[must_use]
pub fn decode(color: IdentityColor, object_count: u32) -> Option<ObjectHandle> {
    decode_checked(color, object_count, BACKGROUND_COLOR)
        .ok()
        .flatten()
}
