//! 常量缓冲区布局
//!
//! 结构体字段顺序和填充与 HLSL `cbuffer` 的打包规则一一对应
//! （每个 16 字节寄存器内不能跨界）。矩阵以列主序存放，
//! 直接来自 nalgebra，上传时无需转置。

use bytemuck::{Pod, Zeroable};

use crate::math::Matrix4;

/// 光源数组长度，必须与着色器中的 `MaxLights` 一致
pub const MAX_LIGHTS: usize = 16;

/// 列主序 4x4 矩阵
pub type GpuMatrix = [[f32; 4]; 4];

/// nalgebra 矩阵转为上传格式
#[inline]
pub fn gpu_matrix(m: &Matrix4) -> GpuMatrix {
    (*m).into()
}

const IDENTITY: GpuMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 彩色立方体的常量 (b0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoxConstants {
    pub world_view_proj: GpuMatrix,
    pub time: f32,
    pub _pad: [f32; 3],
}

impl Default for BoxConstants {
    fn default() -> Self {
        Self {
            world_view_proj: IDENTITY,
            time: 0.0,
            _pad: [0.0; 3],
        }
    }
}

/// 每个物体的常量 (b0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: GpuMatrix,
    pub tex_transform: GpuMatrix,
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: IDENTITY,
            tex_transform: IDENTITY,
        }
    }
}

/// 每个材质的常量 (b2)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    pub mat_transform: GpuMatrix,
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: [1.0; 4],
            fresnel_r0: [0.01; 3],
            roughness: 0.25,
            mat_transform: IDENTITY,
        }
    }
}

/// 光源
///
/// 平行光只用到 `strength` 和 `direction`，其余字段供点光源和聚光灯使用。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub strength: [f32; 3],
    pub falloff_start: f32,
    /// 光线前进的方向
    pub direction: [f32; 3],
    pub falloff_end: f32,
    pub position: [f32; 3],
    pub spot_power: f32,
}

impl Light {
    /// 平行光
    pub fn directional(direction: [f32; 3], strength: [f32; 3]) -> Self {
        Self {
            direction,
            strength,
            ..Self::default()
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: [0.5, 0.5, 0.5],
            falloff_start: 1.0,
            direction: [0.0, -1.0, 0.0],
            falloff_end: 10.0,
            position: [0.0, 0.0, 0.0],
            spot_power: 64.0,
        }
    }
}

/// 每个渲染遍的常量 (b1)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: GpuMatrix,
    pub inv_view: GpuMatrix,
    pub proj: GpuMatrix,
    pub inv_proj: GpuMatrix,
    pub view_proj: GpuMatrix,
    pub inv_view_proj: GpuMatrix,
    pub eye_pos_w: [f32; 3],
    pub _pad1: f32,
    pub render_target_size: [f32; 2],
    pub inv_render_target_size: [f32; 2],
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: [f32; 4],
    pub fog_color: [f32; 4],
    pub fog_start: f32,
    pub fog_range: f32,
    pub _pad2: [f32; 2],
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            inv_view: IDENTITY,
            proj: IDENTITY,
            inv_proj: IDENTITY,
            view_proj: IDENTITY,
            inv_view_proj: IDENTITY,
            eye_pos_w: [0.0; 3],
            _pad1: 0.0,
            render_target_size: [0.0; 2],
            inv_render_target_size: [0.0; 2],
            near_z: 0.0,
            far_z: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: [0.0, 0.0, 0.0, 1.0],
            fog_color: [0.7, 0.7, 0.7, 1.0],
            fog_start: 5.0,
            fog_range: 150.0,
            _pad2: [0.0; 2],
            lights: [Light::default(); MAX_LIGHTS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_sizes_match_hlsl_packing() {
        assert_eq!(size_of::<BoxConstants>(), 80);
        assert_eq!(size_of::<ObjectConstants>(), 128);
        assert_eq!(size_of::<MaterialConstants>(), 96);
        assert_eq!(size_of::<Light>(), 48);
        assert_eq!(size_of::<PassConstants>(), 480 + 48 * MAX_LIGHTS);
    }

    #[test]
    fn test_pass_offsets() {
        assert_eq!(offset_of!(PassConstants, eye_pos_w), 384);
        assert_eq!(offset_of!(PassConstants, render_target_size), 400);
        assert_eq!(offset_of!(PassConstants, near_z), 416);
        assert_eq!(offset_of!(PassConstants, ambient_light), 432);
        assert_eq!(offset_of!(PassConstants, fog_color), 448);
        assert_eq!(offset_of!(PassConstants, fog_start), 464);
        assert_eq!(offset_of!(PassConstants, lights), 480);
    }

    #[test]
    fn test_matrix_upload_is_column_major() {
        let m = crate::math::matrix::translation(1.0, 2.0, 3.0);
        let gpu = gpu_matrix(&m);
        // 平移位于第 4 列
        assert_eq!(gpu[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(gpu_matrix(&Matrix4::identity()), IDENTITY);
    }
}
