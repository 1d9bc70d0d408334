//! The headless rendering engine.

mod pick;
mod scene;

use std::num::NonZeroU64;

use chromapick_core::PrimitiveKind;
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

pub use pick::FlatColorUniforms;
pub use scene::SceneUniforms;

/// Colour format of the identity target. Unorm so encoded bytes are stored exactly.
pub const PICK_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Colour format of the visible scene target.
pub const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Depth format shared by the visible and identity passes.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Every primitive kind a pipeline is built for.
pub(crate) const PRIMITIVE_KINDS: [PrimitiveKind; 5] = [
    PrimitiveKind::Points,
    PrimitiveKind::Lines,
    PrimitiveKind::LineStrip,
    PrimitiveKind::Triangles,
    PrimitiveKind::TriangleStrip,
];

/// Maps a primitive kind to its wgpu topology.
pub(crate) fn topology(kind: PrimitiveKind) -> wgpu::PrimitiveTopology {
    match kind {
        PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveKind::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveKind::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Depth state used by both passes, so occlusion resolves identically.
pub(crate) fn depth_stencil_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Creates a render-target texture and its default view.
pub(crate) fn create_target_texture(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Bind group layout with a single dynamically offset uniform binding.
pub(crate) fn dynamic_uniform_layout(
    device: &wgpu::Device,
    label: &str,
    item_size: u64,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(item_size),
            },
            count: None,
        }],
    })
}

/// A uniform buffer holding one entry per draw, addressed by dynamic offset.
pub(crate) struct DynamicUniforms {
    label: &'static str,
    item_size: u64,
    stride: u64,
    capacity: usize,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl DynamicUniforms {
    const INITIAL_CAPACITY: usize = 16;

    pub(crate) fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        item_size: u64,
    ) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let stride = item_size.div_ceil(alignment) * alignment;
        let (buffer, bind_group) =
            Self::allocate(device, layout, label, item_size, stride, Self::INITIAL_CAPACITY);
        Self {
            label,
            item_size,
            stride,
            capacity: Self::INITIAL_CAPACITY,
            buffer,
            bind_group,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        item_size: u64,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(item_size),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Writes `items` at consecutive strides, growing the buffer if needed.
    pub(crate) fn upload<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        items: &[T],
    ) {
        if items.is_empty() {
            return;
        }
        if items.len() > self.capacity {
            let capacity = items.len().next_power_of_two();
            log::debug!("growing {} to {capacity} entries", self.label);
            let (buffer, bind_group) = Self::allocate(
                device,
                layout,
                self.label,
                self.item_size,
                self.stride,
                capacity,
            );
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * items.len()];
        for (chunk, item) in bytes.chunks_exact_mut(stride).zip(items) {
            let src = bytemuck::bytes_of(item);
            chunk[..src.len()].copy_from_slice(src);
        }
        queue.write_buffer(&self.buffer, 0, &bytes);
    }

    /// Dynamic offset of entry `index`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// The headless rendering engine backed by wgpu.
///
/// Owns the identity target used for picking and the visible scene target.
/// Both are drawn from the same vertex source and the same depth state.
pub struct RenderEngine {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// Current viewport width.
    pub width: u32,
    /// Current viewport height.
    pub height: u32,
    /// Object-space vertex positions shared by both passes.
    pub(crate) vertex_buffer: Option<wgpu::Buffer>,
    /// Number of vertices in `vertex_buffer`.
    pub(crate) vertex_count: u32,
    pub(crate) pick: pick::PickResources,
    pub(crate) recording: pick::PickRecording,
    pub(crate) scene: scene::ScenePass,
}

impl RenderEngine {
    /// Creates a headless engine rendering into `width` x `height` offscreen targets.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        log::info!("using graphics adapter '{}'", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("chromapick device (headless)"),
                ..Default::default()
            })
            .await?;

        let pick = pick::PickResources::new(&device, width, height)?;
        let scene = scene::ScenePass::new(&device, width, height)?;

        Ok(Self {
            device,
            queue,
            width,
            height,
            vertex_buffer: None,
            vertex_count: 0,
            pick,
            recording: pick::PickRecording::default(),
            scene,
        })
    }

    /// Resizes both targets. Contents are lost.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        log::debug!("resizing targets to {width}x{height}");
        self.pick.resize(&self.device, width, height);
        self.scene.resize(&self.device, width, height);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Replaces the shared vertex source with object-space positions.
    ///
    /// Per-vertex scene colours are dropped, since they no longer match.
    /// An empty source is rejected and the current one is kept.
    pub fn set_vertices(&mut self, positions: &[Vec3]) -> RenderResult<()> {
        if positions.is_empty() {
            return Err(RenderError::InvalidDraw("vertex source is empty".into()));
        }
        let data: Vec<[f32; 3]> = positions.iter().map(|p| p.to_array()).collect();
        self.vertex_buffer = Some(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Positions"),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        self.vertex_count = u32::try_from(positions.len()).unwrap_or(u32::MAX);
        self.scene.clear_colors();
        Ok(())
    }

    /// Returns the number of vertices in the shared vertex source.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Blocks until all submitted work has completed.
    pub(crate) fn wait_idle(&self) -> RenderResult<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| RenderError::PollFailed(e.to_string()))
    }
}
