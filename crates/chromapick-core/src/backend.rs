//! Collaborator traits the resolver renders and reads through.
//!
//! A backend owns the rasterization surface (colour + depth), a flat-colour
//! shader with a transform and a colour uniform, and a bound vertex source.
//! [`crate::raster::SoftwareTarget`] is the CPU reference implementation;
//! `chromapick-render` provides the wgpu one.

use glam::Mat4;

use crate::error::Result;
use crate::pick::IdentityColor;

/// Primitive assembly mode of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveKind {
    /// Each vertex is a point.
    Points,
    /// Each pair of vertices is a line segment.
    Lines,
    /// Consecutive vertices are joined into a polyline.
    LineStrip,
    /// Each triple of vertices is a triangle.
    Triangles,
    /// Each vertex after the second forms a triangle with the two before it.
    #[default]
    TriangleStrip,
}

/// A contiguous range of vertices in the bound vertex source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawRange {
    pub first: u32,
    pub count: u32,
}

impl DrawRange {
    pub fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }

    /// One past the last vertex of the range, or `None` if it overflows `u32`.
    pub fn end(&self) -> Option<u32> {
        self.first.checked_add(self.count)
    }

    /// The range as `first..end`, if it lies within `vertex_count` vertices.
    pub fn within(&self, vertex_count: u32) -> Option<std::ops::Range<u32>> {
        self.end()
            .filter(|&end| end <= vertex_count)
            .map(|end| self.first..end)
    }
}

/// Primitive kind and vertex range of one object's draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawSpec {
    pub kind: PrimitiveKind,
    pub range: DrawRange,
}

impl DrawSpec {
    pub fn new(kind: PrimitiveKind, first: u32, count: u32) -> Self {
        Self {
            kind,
            range: DrawRange::new(first, count),
        }
    }
}

/// Renders the identity pass.
///
/// Implementations must draw with blending disabled and with depth testing
/// (`less`, depth write on) configured exactly as in the visible pass.
pub trait IdentityRenderer {
    /// Clears the colour buffer to `color` and the depth buffer to `depth`.
    fn clear(&mut self, color: IdentityColor, depth: f32) -> Result<()>;

    /// Binds the flat-colour shader.
    ///
    /// Fails with [`crate::PickError::Configuration`] when the shader lacks
    /// the transform or colour uniform.
    fn bind_flat_color_shader(&mut self) -> Result<()>;

    /// Sets the clip-space transform uniform for subsequent draws.
    fn set_transform(&mut self, transform: Mat4) -> Result<()>;

    /// Sets the colour uniform for subsequent draws.
    fn set_color(&mut self, color: IdentityColor) -> Result<()>;

    /// Issues a draw call against the bound vertex source.
    fn draw(&mut self, spec: DrawSpec) -> Result<()>;

    /// Blocks until every issued command has completed.
    fn finish(&mut self) -> Result<()>;
}

/// Reads back pixels from the surface an [`IdentityRenderer`] drew into.
pub trait FramebufferReader {
    /// Returns the `(width, height)` of the readable surface in pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    /// Reads one pixel in framebuffer coordinates (origin at the bottom-left).
    ///
    /// Callers guarantee `x < width` and `y < height`.
    fn read_pixel(&mut self, x: u32, y: u32) -> Result<IdentityColor>;
}

/// A backend that can both render the identity pass and read it back.
pub trait PickBackend: IdentityRenderer + FramebufferReader {}

impl<T: IdentityRenderer + FramebufferReader + ?Sized> PickBackend for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_end_reports_overflow() {
        assert_eq!(DrawRange::new(10, 5).end(), Some(15));
        assert_eq!(DrawRange::new(u32::MAX, 0).end(), Some(u32::MAX));
        assert_eq!(DrawRange::new(u32::MAX, 2).end(), None);
    }

    #[test]
    fn test_range_within_vertex_count() {
        assert_eq!(DrawRange::new(0, 200).within(200), Some(0..200));
        assert_eq!(DrawRange::new(150, 0).within(200), Some(150..150));
        assert_eq!(DrawRange::new(150, 51).within(200), None);
        assert_eq!(DrawRange::new(u32::MAX, 2).within(u32::MAX), None);
    }
}
