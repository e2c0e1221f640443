//! 彩色立方体场景

use crate::core::input::InputSystem;
use crate::geometry::{generator, ColorVertex, MeshGeometry};
use crate::math::{Color, Matrix4};
use crate::renderer::constants::{gpu_matrix, BoxConstants};

use super::camera::{projection, OrbitCamera};

/// 清屏颜色
pub const CLEAR_COLOR: Color = Color::LIGHT_STEEL_BLUE;

#[derive(Debug)]
pub struct BoxScene {
    pub camera: OrbitCamera,
    world: Matrix4,
    proj: Matrix4,
    mesh: MeshGeometry<ColorVertex>,
}

impl BoxScene {
    pub fn new(aspect: f32) -> Self {
        Self {
            camera: OrbitCamera::for_box(),
            world: Matrix4::identity(),
            proj: projection(aspect),
            mesh: generator::colored_cube(),
        }
    }

    pub fn mesh(&self) -> &MeshGeometry<ColorVertex> {
        &self.mesh
    }

    /// 窗口尺寸变化后重新计算投影
    pub fn resize(&mut self, aspect: f32) {
        self.proj = projection(aspect);
    }

    /// 处理输入并生成本帧的常量
    pub fn update(&mut self, input: &mut InputSystem, total_time: f32) -> BoxConstants {
        while let Some(drag) = input.take_drag() {
            self.camera.apply_drag(drag);
        }
        self.constants(total_time)
    }

    pub fn constants(&self, total_time: f32) -> BoxConstants {
        let world_view_proj = self.proj * self.camera.view() * self.world;

        BoxConstants {
            world_view_proj: gpu_matrix(&world_view_proj),
            time: total_time,
            ..BoxConstants::default()
        }
    }
}
