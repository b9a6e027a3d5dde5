//! Loads and wraps the on-disk vertex/fragment shader pair.
//!
//! Shaders are authored as plain GLSL without any binding boilerplate; the
//! wrapper strips stale declarations and injects a std140 prelude so the same
//! pair compiles unchanged against the sandbox uniform block. The fragment
//! stage writes to `outColor` and both stages may read `uResolution`,
//! `uTime`, `uTimeScale`, and `uMouse`.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use wgpu::naga::ShaderStage;

/// Raw GLSL sources for one shader pair, read from `<base>.vert` and
/// `<base>.frag`.
#[derive(Debug)]
pub(crate) struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderPair {
    /// Reads both halves of the pair from disk.
    pub fn load(base: &Path) -> Result<Self> {
        let vertex_path = base.with_extension("vert");
        let fragment_path = base.with_extension("frag");
        Ok(Self {
            vertex: read_source(&vertex_path)?,
            fragment: read_source(&fragment_path)?,
        })
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read shader at {}", path.display()))
}

/// Compiles the wrapped vertex shader through wgpu's GLSL frontend.
pub(crate) fn compile_vertex_shader(
    device: &wgpu::Device,
    source: &str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sandbox vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrap_vertex(source)),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the wrapped fragment shader through wgpu's GLSL frontend.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sandbox fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrap_fragment(source)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Produces a self-contained vertex shader from sandbox GLSL.
fn wrap_vertex(source: &str) -> String {
    format!("{VERTEX_HEADER}\n#line 1\n{}", sanitize(source))
}

/// Produces a self-contained fragment shader from sandbox GLSL.
pub(crate) fn wrap_fragment(source: &str) -> String {
    format!("{FRAGMENT_HEADER}\n#line 1\n{}", sanitize(source))
}

/// Strips `#version` directives and user declarations of the sandbox uniforms
/// so the injected prelude owns those definitions.
fn sanitize(source: &str) -> String {
    let mut sanitized = String::new();
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        let is_stale_uniform = trimmed.starts_with("uniform ")
            && (trimmed.contains("uResolution")
                || trimmed.contains("uTimeScale")
                || trimmed.contains("uTime")
                || trimmed.contains("uMouse"));
        if is_stale_uniform {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }
    sanitized
}

/// GLSL prologue injected ahead of every vertex shader. The uniform block
/// layout must match `SandboxUniforms` in `uniforms.rs`; the sandbox names
/// are mapped to the UBO fields via macros to avoid name clashes. `uMouse`
/// carries the cursor position in `xy` and the last click position in `zw`,
/// both with a bottom-left origin.
const VERTEX_HEADER: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform SandboxParams {
    vec2 _uResolution;
    float _uTime;
    float _uTimeScale;
    vec4 _uMouse;
} ubo;

#define uResolution ubo._uResolution
#define uTime ubo._uTime
#define uTimeScale ubo._uTimeScale
#define uMouse ubo._uMouse
";

/// GLSL prologue injected ahead of every fragment shader; additionally
/// declares the `outColor` target the shader writes to.
const FRAGMENT_HEADER: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SandboxParams {
    vec2 _uResolution;
    float _uTime;
    float _uTimeScale;
    vec4 _uMouse;
} ubo;

#define uResolution ubo._uResolution
#define uTime ubo._uTime
#define uTimeScale ubo._uTimeScale
#define uMouse ubo._uMouse
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_stale_uniform_declarations() {
        let source = r"
            #version 330
            uniform float uTime;
            uniform vec2 uResolution;
            void main() {
                outColor = vec4(fract(uTime), 0.0, 0.0, 1.0);
            }
        ";

        let wrapped = wrap_fragment(source);
        assert!(!wrapped.contains("uniform float uTime"));
        assert!(!wrapped.contains("uniform vec2 uResolution"));
        assert!(wrapped.contains("#define uTime ubo._uTime"));
        assert_eq!(wrapped.matches("#version").count(), 1);
    }

    #[test]
    fn wrap_preserves_shader_body() {
        let source = "void main() { gl_Position = vec4(0.0); }";
        let wrapped = wrap_vertex(source);
        assert!(wrapped.contains("gl_Position = vec4(0.0);"));
        assert!(wrapped.contains("#line 1"));
    }

    #[test]
    fn load_reports_the_missing_half() {
        let missing = Path::new("/nonexistent/shader");
        let err = ShaderPair::load(missing).unwrap_err();
        assert!(format!("{err:#}").contains("shader.vert"));
    }
}
