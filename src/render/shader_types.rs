use crevice::std430::AsStd430;
use ultraviolet::{Mat4, Vec3, Vec4};

/// Push constant block shared by the ray generation and closest hit stages.
/// The byte layout is part of the shader contract and locked down by the
/// tests below, the reserved slots keep the light direction vec4 aligned.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TraceParameters {
    pub camera_to_world: Mat4,
    /// Half of the vertical field of view, in radians.
    pub half_fov: f32,
    pub reserved: [f32; 3],
    /// Direction towards the light, w is unused and zero.
    pub light_direction: Vec4,
}

impl TraceParameters {
    pub const SIZE: u32 = std::mem::size_of::<TraceParameters>() as u32;

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self as *const TraceParameters as *const u8,
                std::mem::size_of::<TraceParameters>(),
            )
        }
    }
}

/// One entry of the packed material array. The GPU buffer is addressed with
/// the instance custom index, the host atlas keeps one entry per partition.
#[derive(AsStd430, Clone, Copy)]
pub struct GpuMaterial {
    pub base_color: Vec3,
    /// Slot in the texture array, negative when the material is untextured.
    pub base_color_texture: i32,
    pub emissive: Vec3,
    pub roughness: f32,
    pub metallic: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset_of;

    #[test]
    fn trace_parameters_match_the_shader_byte_layout() {
        assert_eq!(std::mem::size_of::<TraceParameters>(), 96);
        assert_eq!(offset_of!(TraceParameters, camera_to_world), 0);
        assert_eq!(offset_of!(TraceParameters, half_fov), 64);
        assert_eq!(offset_of!(TraceParameters, reserved), 68);
        assert_eq!(offset_of!(TraceParameters, light_direction), 80);
    }

    #[test]
    fn trace_parameters_bytes_cover_the_whole_block() {
        let parameters = TraceParameters {
            camera_to_world: Mat4::identity(),
            half_fov: 0.5,
            reserved: [0.0; 3],
            light_direction: Vec4::new(0.0, 1.0, 0.0, 0.0),
        };
        assert_eq!(parameters.as_bytes().len(), 96);
    }

    #[test]
    fn gpu_material_std430_stride_matches_the_shader_struct() {
        // vec3 + int pack into 16 bytes, vec3 + float + float pad to 32 more
        assert_eq!(std::mem::size_of::<Std430GpuMaterial>(), 48);
    }
}
