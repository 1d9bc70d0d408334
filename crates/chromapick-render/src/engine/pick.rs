use chromapick_core::{
    DrawSpec, FramebufferReader, IdentityColor, IdentityRenderer, Mat4, PickError, PrimitiveKind,
    ShaderInterface,
};

use super::{
    create_target_texture, depth_stencil_state, dynamic_uniform_layout, topology, DynamicUniforms,
    RenderEngine, PICK_COLOR_FORMAT, DEPTH_FORMAT, PRIMITIVE_KINDS,
};
use crate::error::{RenderError, RenderResult};
use crate::shader::{create_flat_color_module, reflect_interface, FLAT_COLOR_WGSL};
use crate::shader::{FRAGMENT_ENTRY, VERTEX_ENTRY};

/// Per-draw uniforms of the flat-colour shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FlatColorUniforms {
    /// Clip-space transform.
    pub transform: [[f32; 4]; 4],
    /// Identity colour, normalized to `[0, 1]`.
    pub color: [f32; 4],
}

impl FlatColorUniforms {
    pub fn new(transform: Mat4, color: IdentityColor) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            color: color.to_normalized().to_array(),
        }
    }
}

/// GPU resources of the identity pass.
pub(crate) struct PickResources {
    pub(crate) texture: wgpu::Texture,
    view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
    interface: ShaderInterface,
    bind_group_layout: wgpu::BindGroupLayout,
    pipelines: Vec<(PrimitiveKind, wgpu::RenderPipeline)>,
    uniforms: DynamicUniforms,
}

impl PickResources {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> RenderResult<Self> {
        let item_size = std::mem::size_of::<FlatColorUniforms>() as u64;
        let bind_group_layout =
            dynamic_uniform_layout(device, "Flat Color Bind Group Layout", item_size);
        let uniforms = DynamicUniforms::new(
            device,
            &bind_group_layout,
            "Flat Color Uniform Buffer",
            item_size,
        );

        let interface = reflect_interface(FLAT_COLOR_WGSL)?;
        let shader = create_flat_color_module(device, FLAT_COLOR_WGSL)?;
        let pipelines = create_pipelines(device, &bind_group_layout, &shader);

        let (texture, view, depth_texture, depth_view) = create_targets(device, width, height);

        // Single pixel readback; rows must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Staging Buffer"),
            size: u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            texture,
            view,
            _depth_texture: depth_texture,
            depth_view,
            staging_buffer,
            interface,
            bind_group_layout,
            pipelines,
            uniforms,
        })
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (texture, view, depth_texture, depth_view) = create_targets(device, width, height);
        self.texture = texture;
        self.view = view;
        self._depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    fn pipeline(&self, kind: PrimitiveKind) -> Option<&wgpu::RenderPipeline> {
        self.pipelines
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    }
}

fn create_targets(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Texture, wgpu::TextureView) {
    let (texture, view) = create_target_texture(
        device,
        "Pick Texture",
        PICK_COLOR_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        width,
        height,
    );
    let (depth_texture, depth_view) = create_target_texture(
        device,
        "Pick Depth Texture",
        DEPTH_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT,
        width,
        height,
    );
    (texture, view, depth_texture, depth_view)
}

fn create_pipelines(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader: &wgpu::ShaderModule,
) -> Vec<(PrimitiveKind, wgpu::RenderPipeline)> {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Flat Color Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    PRIMITIVE_KINDS
        .iter()
        .map(|&kind| {
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Flat Color Pick Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: PICK_COLOR_FORMAT,
                        blend: None, // Identity colours must land unmodified
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: topology(kind),
                    strip_index_format: None,
                    cull_mode: None,
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: Some(depth_stencil_state()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            (kind, pipeline)
        })
        .collect()
}

/// Identity-pass commands recorded between `clear` and `finish`.
#[derive(Debug, Default)]
pub(crate) struct PickRecording {
    clear: Option<(IdentityColor, f32)>,
    shader_bound: bool,
    transform: Mat4,
    color: IdentityColor,
    draws: Vec<(DrawSpec, FlatColorUniforms)>,
}

fn wgpu_color(color: IdentityColor) -> wgpu::Color {
    let [r, g, b, a] = color.to_array().map(|c| f64::from(c) / 255.0);
    wgpu::Color { r, g, b, a }
}

impl RenderEngine {
    /// Replaces the flat-colour shader used by the identity pass.
    ///
    /// The source must expose a `position` attribute and `transform` and
    /// `color` uniforms; otherwise the current shader is kept and an error
    /// is returned.
    pub fn set_flat_color_shader(&mut self, source: &str) -> RenderResult<()> {
        let interface = reflect_interface(source)?;
        let shader = create_flat_color_module(&self.device, source)?;
        self.pick.pipelines = create_pipelines(&self.device, &self.pick.bind_group_layout, &shader);
        self.pick.interface = interface;
        self.recording.shader_bound = false;
        Ok(())
    }

    /// Reads the whole identity buffer as tightly packed RGBA rows, top row first.
    pub fn read_pick_buffer(&self) -> RenderResult<Vec<u8>> {
        crate::capture::read_texture_rgba(
            &self.device,
            &self.queue,
            &self.pick.texture,
            self.width,
            self.height,
        )
    }

    fn submit_identity_pass(&mut self) -> RenderResult<()> {
        let clear = self.recording.clear.take();
        let draws = std::mem::take(&mut self.recording.draws);
        if clear.is_none() && draws.is_empty() {
            return self.wait_idle();
        }

        let items: Vec<FlatColorUniforms> = draws.iter().map(|(_, u)| *u).collect();
        self.pick.uniforms.upload(
            &self.device,
            &self.queue,
            &self.pick.bind_group_layout,
            &items,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Render Encoder"),
            });
        {
            let (color_load, depth_load) = match clear {
                Some((color, depth)) => (
                    wgpu::LoadOp::Clear(wgpu_color(color)),
                    wgpu::LoadOp::Clear(depth),
                ),
                None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.pick.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.pick.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(vertex_buffer) = &self.vertex_buffer {
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                for (i, (spec, _)) in draws.iter().enumerate() {
                    let (Some(pipeline), Some(range)) = (
                        self.pick.pipeline(spec.kind),
                        spec.range.within(self.vertex_count),
                    ) else {
                        continue;
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, self.pick.uniforms.bind_group(), &[self
                        .pick
                        .uniforms
                        .offset(i)]);
                    pass.draw(range, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        // Readback must observe every draw of this pass.
        self.wait_idle()
    }
}

impl IdentityRenderer for RenderEngine {
    fn clear(&mut self, color: IdentityColor, depth: f32) -> chromapick_core::Result<()> {
        self.recording.clear = Some((color, depth));
        self.recording.draws.clear();
        Ok(())
    }

    fn bind_flat_color_shader(&mut self) -> chromapick_core::Result<()> {
        self.pick.interface.require_flat_color()?;
        self.recording.shader_bound = true;
        Ok(())
    }

    fn set_transform(&mut self, transform: Mat4) -> chromapick_core::Result<()> {
        self.recording.transform = transform;
        Ok(())
    }

    fn set_color(&mut self, color: IdentityColor) -> chromapick_core::Result<()> {
        self.recording.color = color;
        Ok(())
    }

    fn draw(&mut self, spec: DrawSpec) -> chromapick_core::Result<()> {
        if !self.recording.shader_bound {
            return Err(RenderError::InvalidDraw("no shader bound".into()).into());
        }
        if self.vertex_buffer.is_none() {
            return Err(RenderError::InvalidDraw("no vertex source bound".into()).into());
        }
        if spec.range.within(self.vertex_count).is_none() {
            return Err(RenderError::InvalidDraw(format!(
                "draw range {:?} exceeds {} vertices",
                spec.range, self.vertex_count
            ))
            .into());
        }
        let uniforms = FlatColorUniforms::new(self.recording.transform, self.recording.color);
        self.recording.draws.push((spec, uniforms));
        Ok(())
    }

    fn finish(&mut self) -> chromapick_core::Result<()> {
        self.submit_identity_pass().map_err(PickError::from)
    }
}

impl FramebufferReader for RenderEngine {
    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> chromapick_core::Result<IdentityColor> {
        if x >= self.width || y >= self.height {
            return Err(PickError::OutOfRangeCoordinate {
                x: i64::from(x),
                y: i64::from(y),
                width: self.width,
                height: self.height,
            });
        }
        // Texture rows run top to bottom.
        let row = self.height - 1 - y;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.pick.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y: row, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.pick.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.pick.staging_buffer.slice(..4);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait_idle()?;
        rx.recv()
            .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?
            .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let pixel = IdentityColor::new(data[0], data[1], data[2], data[3]);
        drop(data);
        self.pick.staging_buffer.unmap();

        Ok(pixel)
    }
}
