use bytemuck::{Pod, Zeroable};

/// CPU-side mirror of the sandbox uniform block.
///
/// The layout matches the GLSL prelude injected by
/// [`crate::compile::wrap_fragment`] and therefore must observe std140
/// alignment rules: `vec2` at offset 0, the two scalars packed behind it, and
/// the `vec4` mouse slot starting at the 16-byte boundary.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct SandboxUniforms {
    resolution: [f32; 2],
    time: f32,
    time_scale: f32,
    mouse: [f32; 4],
}

unsafe impl Zeroable for SandboxUniforms {}
unsafe impl Pod for SandboxUniforms {}

impl SandboxUniforms {
    /// Prepares a uniform block sized to the current surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time: 0.0,
            time_scale: 1.0,
            mouse: [0.0; 4],
        }
    }

    /// Writes the current surface dimensions into `uResolution`.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }

    /// Mirrors the playback clock into `uTime` / `uTimeScale`.
    pub fn set_clock(&mut self, time: f32, time_scale: f32) {
        self.time = time;
        self.time_scale = time_scale;
    }

    /// Writes the four floats backing `uMouse`.
    pub fn set_mouse(&mut self, mouse: [f32; 4]) {
        self.mouse = mouse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    /// Sanity-checks that the CPU mirror of the uniform block matches the
    /// layout baked into the GLSL prelude.
    #[test]
    fn sandbox_uniforms_follow_std140_layout() {
        let uniforms = SandboxUniforms::new(1280, 720);
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<SandboxUniforms>(), 16);
        assert_eq!(size_of::<SandboxUniforms>(), 32);
        assert_eq!((&uniforms.resolution as *const _ as usize) - base, 0);
        assert_eq!((&uniforms.time as *const _ as usize) - base, 8);
        assert_eq!((&uniforms.time_scale as *const _ as usize) - base, 12);
        assert_eq!((&uniforms.mouse as *const _ as usize) - base, 16);
    }
}
