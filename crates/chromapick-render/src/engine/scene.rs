use chromapick_core::{DrawSpec, ObjectHandle, PrimitiveKind, SelectionState, TransformCache};
use glam::Vec3;
use wgpu::util::DeviceExt;

use super::{
    create_target_texture, depth_stencil_state, dynamic_uniform_layout, topology, DynamicUniforms,
    RenderEngine, DEPTH_FORMAT, PRIMITIVE_KINDS, SCENE_COLOR_FORMAT,
};
use crate::error::{RenderError, RenderResult};
use crate::shader::{reflect_interface, FRAGMENT_ENTRY, SCENE_WGSL, VERTEX_ENTRY};

/// Per-draw uniforms of the scene shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    /// Clip-space transform.
    pub transform: [[f32; 4]; 4],
}

/// GPU resources of the visible pass.
pub(crate) struct ScenePass {
    pub(crate) texture: wgpu::Texture,
    view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    bind_group_layout: wgpu::BindGroupLayout,
    pipelines: Vec<(PrimitiveKind, wgpu::RenderPipeline)>,
    uniforms: DynamicUniforms,
    normal_colors: Option<wgpu::Buffer>,
    selected_colors: Option<wgpu::Buffer>,
}

impl ScenePass {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> RenderResult<Self> {
        reflect_interface(SCENE_WGSL)?;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_WGSL.into()),
        });

        let item_size = std::mem::size_of::<SceneUniforms>() as u64;
        let bind_group_layout = dynamic_uniform_layout(device, "Scene Bind Group Layout", item_size);
        let uniforms =
            DynamicUniforms::new(device, &bind_group_layout, "Scene Uniform Buffer", item_size);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_stride = std::mem::size_of::<[f32; 3]>() as u64;
        let pipelines = PRIMITIVE_KINDS
            .iter()
            .map(|&kind| {
                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Scene Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some(VERTEX_ENTRY),
                        buffers: &[
                            // Positions
                            wgpu::VertexBufferLayout {
                                array_stride: vertex_stride,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                            },
                            // Colours
                            wgpu::VertexBufferLayout {
                                array_stride: vertex_stride,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: &wgpu::vertex_attr_array![1 => Float32x3],
                            },
                        ],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(FRAGMENT_ENTRY),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: SCENE_COLOR_FORMAT,
                            blend: None,
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
            .collect();

        let (texture, view, depth_texture, depth_view) = create_targets(device, width, height);

        Ok(Self {
            texture,
            view,
            _depth_texture: depth_texture,
            depth_view,
            bind_group_layout,
            pipelines,
            uniforms,
            normal_colors: None,
            selected_colors: None,
        })
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (texture, view, depth_texture, depth_view) = create_targets(device, width, height);
        self.texture = texture;
        self.view = view;
        self._depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    pub(crate) fn clear_colors(&mut self) {
        self.normal_colors = None;
        self.selected_colors = None;
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
        "Scene Texture",
        SCENE_COLOR_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        width,
        height,
    );
    let (depth_texture, depth_view) = create_target_texture(
        device,
        "Scene Depth Texture",
        DEPTH_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT,
        width,
        height,
    );
    (texture, view, depth_texture, depth_view)
}

fn color_buffer(device: &wgpu::Device, label: &str, colors: &[Vec3]) -> wgpu::Buffer {
    let data: Vec<[f32; 3]> = colors.iter().map(|c| c.to_array()).collect();
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&data),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

impl RenderEngine {
    /// Sets the per-vertex display colours of the visible pass.
    ///
    /// `selected` replaces `normal` for the vertices of the selected object.
    /// Both must match the vertex source in length.
    pub fn set_vertex_colors(&mut self, normal: &[Vec3], selected: &[Vec3]) -> RenderResult<()> {
        let expected = self.vertex_count as usize;
        if normal.len() != expected || selected.len() != expected {
            return Err(RenderError::InvalidDraw(format!(
                "expected {expected} vertex colours, got {} normal and {} selected",
                normal.len(),
                selected.len()
            )));
        }
        self.scene.normal_colors = Some(color_buffer(&self.device, "Normal Colors", normal));
        self.scene.selected_colors = Some(color_buffer(&self.device, "Selected Colors", selected));
        Ok(())
    }

    /// Renders the visible pass. `draws[i]` is the draw call of object `i`.
    ///
    /// Uses the same cached transforms and depth state as the identity pass,
    /// so the object visible at a pixel is the one the pick resolves to.
    pub fn render_scene(
        &mut self,
        transforms: &TransformCache,
        draws: &[DrawSpec],
        selection: &SelectionState,
    ) -> RenderResult<()> {
        let (Some(vertex_buffer), Some(normal_colors), Some(selected_colors)) = (
            &self.vertex_buffer,
            &self.scene.normal_colors,
            &self.scene.selected_colors,
        ) else {
            return Err(RenderError::InvalidDraw(
                "scene has no vertices or vertex colours".into(),
            ));
        };

        let mut items = Vec::with_capacity(draws.len());
        for (i, spec) in draws.iter().enumerate() {
            let handle = ObjectHandle(u32::try_from(i).unwrap_or(u32::MAX));
            let transform = transforms.get(handle).ok_or_else(|| {
                RenderError::InvalidDraw(format!("no cached transform for object {handle}"))
            })?;
            if spec.range.within(self.vertex_count).is_none() {
                return Err(RenderError::InvalidDraw(format!(
                    "draw range {:?} of object {handle} exceeds {} vertices",
                    spec.range, self.vertex_count
                )));
            }
            items.push(SceneUniforms {
                transform: transform.to_cols_array_2d(),
            });
        }
        self.scene.uniforms.upload(
            &self.device,
            &self.queue,
            &self.scene.bind_group_layout,
            &items,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.scene.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(chromapick_core::CLEAR_DEPTH),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            for (i, spec) in draws.iter().enumerate() {
                let handle = ObjectHandle(u32::try_from(i).unwrap_or(u32::MAX));
                let colors = if selection.is_selected(handle) {
                    selected_colors
                } else {
                    normal_colors
                };
                let (Some(pipeline), Some(range)) = (
                    self.scene.pipeline(spec.kind),
                    spec.range.within(self.vertex_count),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_vertex_buffer(1, colors.slice(..));
                pass.set_bind_group(0, self.scene.uniforms.bind_group(), &[self
                    .scene
                    .uniforms
                    .offset(i)]);
                pass.draw(range, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Reads the visible frame as tightly packed RGBA rows, top row first.
    pub fn read_scene_buffer(&self) -> RenderResult<Vec<u8>> {
        crate::capture::read_texture_rgba(
            &self.device,
            &self.queue,
            &self.scene.texture,
            self.width,
            self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 64);
    }
}
