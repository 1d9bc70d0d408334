//! CPU reference backend.
//!
//! [`SoftwareTarget`] rasterizes the identity pass in plain Rust with the
//! same fixed-function state the GPU backend uses: depth test `less` with
//! depth write, no blending, colour written verbatim. Rows are stored with
//! the origin at the bottom-left, like a GL framebuffer.
//!
//! Primitives with any vertex behind the camera (`w <= 0`) are dropped
//! rather than clipped.

use glam::{Mat4, Vec3, Vec4Swizzles};

use crate::backend::{DrawSpec, FramebufferReader, IdentityRenderer, PrimitiveKind};
use crate::error::{PickError, Result};
use crate::pick::IdentityColor;
use crate::shader::ShaderInterface;

/// A vertex after projection: window-space x/y in pixels and depth in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
struct WindowVertex {
    x: f32,
    y: f32,
    z: f32,
}

/// An in-memory colour + depth surface implementing both collaborator traits.
#[derive(Debug, Clone)]
pub struct SoftwareTarget {
    width: u32,
    height: u32,
    color: Vec<IdentityColor>,
    depth: Vec<f32>,
    vertices: Vec<Vec3>,
    shader: ShaderInterface,
    shader_bound: bool,
    transform: Mat4,
    draw_color: IdentityColor,
}

impl SoftwareTarget {
    /// Creates a target of `width` x `height` pixels with no vertex source.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![IdentityColor::default(); len],
            depth: vec![1.0; len],
            vertices: Vec::new(),
            shader: ShaderInterface::flat_color(),
            shader_bound: false,
            transform: Mat4::IDENTITY,
            draw_color: IdentityColor::default(),
        }
    }

    /// Replaces the bound vertex source (object-space positions).
    pub fn set_vertices(&mut self, vertices: Vec<Vec3>) {
        self.vertices = vertices;
    }

    /// Replaces the interface of the flat-colour shader.
    pub fn set_shader_interface(&mut self, shader: ShaderInterface) {
        self.shader = shader;
        self.shader_bound = false;
    }

    /// Resizes the surface. Contents are reset.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            vertices: std::mem::take(&mut self.vertices),
            shader: std::mem::take(&mut self.shader),
            ..Self::new(width, height)
        };
    }

    /// Returns the colour buffer, bottom row first.
    pub fn pixels(&self) -> &[IdentityColor] {
        &self.color
    }

    /// Returns the depth stored at a framebuffer pixel.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.index(i64::from(x), i64::from(y)).map(|i| self.depth[i])
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < self.width as usize)?;
        let y = usize::try_from(y).ok().filter(|&y| y < self.height as usize)?;
        Some(y * self.width as usize + x)
    }

    #[allow(clippy::cast_precision_loss)]
    fn project(&self, p: Vec3) -> Option<WindowVertex> {
        let clip = self.transform * p.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(WindowVertex {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (ndc.y + 1.0) * 0.5 * self.height as f32,
            z: ndc.z,
        })
    }

    /// Depth-tested write of the current draw colour.
    fn plot(&mut self, x: i64, y: i64, z: f32) {
        if !(0.0..=1.0).contains(&z) {
            return;
        }
        if let Some(i) = self.index(x, y) {
            if z < self.depth[i] {
                self.depth[i] = z;
                self.color[i] = self.draw_color;
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn fill_triangle(&mut self, a: WindowVertex, b: WindowVertex, c: WindowVertex) {
        let edge = |p: &WindowVertex, q: &WindowVertex, x: f32, y: f32| {
            (q.x - p.x) * (y - p.y) - (q.y - p.y) * (x - p.x)
        };
        let area = edge(&a, &b, c.x, c.y);
        if area.abs() < f32::EPSILON {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as i64;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as i64;
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(i64::from(self.width) - 1);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(i64::from(self.height) - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let (x, y) = (px as f32 + 0.5, py as f32 + 0.5);
                // Barycentric weights, normalized so both windings are accepted.
                let w0 = edge(&b, &c, x, y) / area;
                let w1 = edge(&c, &a, x, y) / area;
                let w2 = edge(&a, &b, x, y) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * a.z + w1 * b.z + w2 * c.z;
                self.plot(px, py, z);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn draw_line(&mut self, a: WindowVertex, b: WindowVertex) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as u32;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            let z = a.z + (b.z - a.z) * t;
            self.plot(x.floor() as i64, y.floor() as i64, z);
        }
    }
}

impl IdentityRenderer for SoftwareTarget {
    fn clear(&mut self, color: IdentityColor, depth: f32) -> Result<()> {
        self.color.fill(color);
        self.depth.fill(depth);
        Ok(())
    }

    fn bind_flat_color_shader(&mut self) -> Result<()> {
        self.shader.require_flat_color()?;
        self.shader_bound = true;
        Ok(())
    }

    fn set_transform(&mut self, transform: Mat4) -> Result<()> {
        self.transform = transform;
        Ok(())
    }

    fn set_color(&mut self, color: IdentityColor) -> Result<()> {
        self.draw_color = color;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw(&mut self, spec: DrawSpec) -> Result<()> {
        if !self.shader_bound {
            return Err(PickError::Render("draw issued with no shader bound".into()));
        }
        let vertex_count = u32::try_from(self.vertices.len()).unwrap_or(u32::MAX);
        let source = spec
            .range
            .within(vertex_count)
            .and_then(|range| self.vertices.get(range.start as usize..range.end as usize));
        let Some(source) = source else {
            return Err(PickError::Render(format!(
                "draw range {:?} exceeds {} vertices",
                spec.range,
                self.vertices.len()
            )));
        };
        let projected: Vec<Option<WindowVertex>> =
            source.iter().map(|&p| self.project(p)).collect();

        match spec.kind {
            PrimitiveKind::Points => {
                for v in projected.iter().flatten() {
                    self.plot(v.x.floor() as i64, v.y.floor() as i64, v.z);
                }
            }
            PrimitiveKind::Lines => {
                for pair in projected.chunks_exact(2) {
                    if let [Some(a), Some(b)] = pair {
                        self.draw_line(*a, *b);
                    }
                }
            }
            PrimitiveKind::LineStrip => {
                for pair in projected.windows(2) {
                    if let [Some(a), Some(b)] = pair {
                        self.draw_line(*a, *b);
                    }
                }
            }
            PrimitiveKind::Triangles => {
                for tri in projected.chunks_exact(3) {
                    if let [Some(a), Some(b), Some(c)] = tri {
                        self.fill_triangle(*a, *b, *c);
                    }
                }
            }
            PrimitiveKind::TriangleStrip => {
                for tri in projected.windows(3) {
                    if let [Some(a), Some(b), Some(c)] = tri {
                        self.fill_triangle(*a, *b, *c);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Rasterization is synchronous; every draw has already landed.
        Ok(())
    }
}

impl FramebufferReader for SoftwareTarget {
    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Result<IdentityColor> {
        self.index(i64::from(x), i64::from(y))
            .map(|i| self.color[i])
            .ok_or_else(|| PickError::OutOfRangeCoordinate {
                x: i64::from(x),
                y: i64::from(y),
                width: self.width,
                height: self.height,
            })
    }
}
