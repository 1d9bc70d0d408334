//! Shader management and interface reflection.

use chromapick_core::ShaderInterface;

use crate::error::{RenderError, RenderResult};

/// WGSL source of the flat-colour identity shader.
pub const FLAT_COLOR_WGSL: &str = include_str!("shaders/flat_color.wgsl");

/// WGSL source of the visible scene shader.
pub const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");

/// Entry points every chromapick shader provides.
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Parses WGSL and lists the uniform members and vertex attributes it exposes.
///
/// Uniform names are the members of every `var<uniform>` struct; attribute
/// names are the `@location` inputs of the vertex entry point. Fails if either
/// entry point is missing.
pub fn reflect_interface(source: &str) -> RenderResult<ShaderInterface> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| RenderError::ShaderCompilationFailed(e.emit_to_string(source)))?;

    for (entry, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == entry && ep.stage == stage)
        {
            return Err(RenderError::ShaderCompilationFailed(format!(
                "missing entry point '{entry}'"
            )));
        }
    }

    let mut interface = ShaderInterface::default();

    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        if let naga::TypeInner::Struct { members, .. } = &module.types[global.ty].inner {
            interface
                .uniforms
                .extend(members.iter().filter_map(|m| m.name.clone()));
        }
    }

    if let Some(vs) = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == VERTEX_ENTRY)
    {
        for arg in &vs.function.arguments {
            match (&arg.binding, &module.types[arg.ty].inner) {
                (Some(naga::Binding::Location { .. }), _) => {
                    interface.attributes.extend(arg.name.clone());
                }
                (None, naga::TypeInner::Struct { members, .. }) => {
                    interface.attributes.extend(
                        members
                            .iter()
                            .filter(|m| matches!(m.binding, Some(naga::Binding::Location { .. })))
                            .filter_map(|m| m.name.clone()),
                    );
                }
                _ => {}
            }
        }
    }

    Ok(interface)
}

/// Creates a shader module after checking it exposes the flat-colour interface.
pub fn create_flat_color_module(
    device: &wgpu::Device,
    source: &str,
) -> RenderResult<wgpu::ShaderModule> {
    let interface = reflect_interface(source)?;
    interface
        .require_flat_color()
        .map_err(|e| RenderError::ShaderCompilationFailed(e.to_string()))?;
    log::debug!(
        "flat-colour shader exposes uniforms {:?}, attributes {:?}",
        interface.uniforms,
        interface.attributes
    );

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Flat Color Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}
