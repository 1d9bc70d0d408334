//! Interface requirements of the flat-colour identity shader.

use crate::error::{PickError, Result};

/// Uniforms the identity shader must expose.
pub const REQUIRED_UNIFORMS: [&str; 2] = ["transform", "color"];

/// Vertex attributes the identity shader must expose.
pub const REQUIRED_ATTRIBUTES: [&str; 1] = ["position"];

/// Names a shader program exposes to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    pub uniforms: Vec<String>,
    pub attributes: Vec<String>,
}

impl ShaderInterface {
    /// The interface of a correctly built flat-colour shader.
    pub fn flat_color() -> Self {
        Self {
            uniforms: REQUIRED_UNIFORMS.iter().map(ToString::to_string).collect(),
            attributes: REQUIRED_ATTRIBUTES.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| u == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }

    /// Fails with [`PickError::Configuration`] naming the first missing item.
    pub fn require_flat_color(&self) -> Result<()> {
        if let Some(missing) = REQUIRED_ATTRIBUTES.iter().find(|a| !self.has_attribute(a)) {
            return Err(PickError::configuration(format!(
                "unable to find shader location for attribute '{missing}'"
            )));
        }
        if let Some(missing) = REQUIRED_UNIFORMS.iter().find(|u| !self.has_uniform(u)) {
            return Err(PickError::configuration(format!(
                "unable to find shader location for uniform '{missing}'"
            )));
        }
        Ok(())
    }
}
