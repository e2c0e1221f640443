//! 轨道相机
//!
//! 相机位于以原点为中心的球面上，始终看向原点。
//! 左键拖动绕原点旋转，右键拖动改变半径。

use winit::event::MouseButton;

use crate::core::input::Drag;
use crate::math::{constants, matrix, utils, Matrix4, Vector3};

/// 垂直视场角
pub const FOV_Y: f32 = 0.25 * constants::PI;
pub const NEAR_Z: f32 = 1.0;
pub const FAR_Z: f32 = 1000.0;

/// 每像素旋转的角度（度）
const ROTATE_DEGREES_PER_PIXEL: f32 = 0.25;
/// phi 与两极保持的距离
const PHI_MARGIN: f32 = 0.1;

/// 两个示例共用的透视投影
pub fn projection(aspect: f32) -> Matrix4 {
    matrix::perspective_fov_lh(FOV_Y, aspect, NEAR_Z, FAR_Z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// 绕 y 轴的方位角
    pub theta: f32,
    /// 与 +y 轴的夹角
    pub phi: f32,
    pub radius: f32,
    /// 右键拖动时每像素改变的半径
    pub zoom_rate: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl OrbitCamera {
    pub fn new(theta: f32, phi: f32, radius: f32) -> Self {
        Self {
            theta,
            phi,
            radius,
            zoom_rate: 0.01,
            min_radius: radius,
            max_radius: radius,
        }
    }

    pub fn with_zoom(mut self, rate: f32, min_radius: f32, max_radius: f32) -> Self {
        self.zoom_rate = rate;
        self.min_radius = min_radius;
        self.max_radius = max_radius;
        self.radius = utils::clamp(self.radius, min_radius, max_radius);
        self
    }

    /// 彩色立方体的初始视角
    pub fn for_box() -> Self {
        Self::new(1.5 * constants::PI, constants::QUARTER_PI, 5.0).with_zoom(0.01, 3.0, 15.0)
    }

    /// 镜面场景的初始视角
    pub fn for_mirror_room() -> Self {
        Self::new(1.24 * constants::PI, 0.42 * constants::PI, 12.0).with_zoom(0.2, 5.0, 150.0)
    }

    /// 按鼠标位移（像素）旋转
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.theta += utils::deg_to_rad(ROTATE_DEGREES_PER_PIXEL * dx);
        self.phi += utils::deg_to_rad(ROTATE_DEGREES_PER_PIXEL * dy);
        self.phi = utils::clamp(self.phi, PHI_MARGIN, constants::PI - PHI_MARGIN);
    }

    /// 按鼠标位移（像素）缩放
    pub fn zoom(&mut self, dx: f32, dy: f32) {
        self.radius += self.zoom_rate * (dx - dy);
        self.radius = utils::clamp(self.radius, self.min_radius, self.max_radius);
    }

    pub fn apply_drag(&mut self, drag: Drag) {
        match drag.button {
            MouseButton::Left => self.rotate(drag.dx, drag.dy),
            MouseButton::Right => self.zoom(drag.dx, drag.dy),
            _ => {}
        }
    }

    pub fn position(&self) -> Vector3 {
        utils::spherical_to_cartesian(self.radius, self.theta, self.phi)
    }

    pub fn view(&self) -> Matrix4 {
        matrix::look_at_lh(&self.position(), &Vector3::zeros(), &Vector3::y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_box_start_position() {
        let camera = OrbitCamera::for_box();
        let p = camera.position();
        let h = 5.0 * constants::QUARTER_PI.sin();
        assert!(approx_eq(p.x, 0.0, 1e-4));
        assert!(approx_eq(p.y, h, 1e-4));
        assert!(approx_eq(p.z, -h, 1e-4));
    }

    #[test]
    fn test_rotate_clamps_phi() {
        let mut camera = OrbitCamera::for_box();
        camera.rotate(0.0, -100_000.0);
        assert!(approx_eq(camera.phi, 0.1, 1e-6));

        camera.rotate(0.0, 100_000.0);
        assert!(approx_eq(camera.phi, constants::PI - 0.1, 1e-6));
    }

    #[test]
    fn test_rotate_quarter_degree_per_pixel() {
        let mut camera = OrbitCamera::for_mirror_room();
        let theta = camera.theta;
        camera.rotate(4.0, 0.0);
        assert!(approx_eq(camera.theta - theta, constants::DEG_TO_RAD, 1e-6));
    }

    #[test]
    fn test_zoom_rates_and_limits() {
        let mut camera = OrbitCamera::for_box();
        camera.zoom(10.0, -10.0);
        assert!(approx_eq(camera.radius, 5.2, 1e-5));
        camera.zoom(10_000.0, 0.0);
        assert_eq!(camera.radius, 15.0);

        let mut camera = OrbitCamera::for_mirror_room();
        camera.zoom(0.0, 10.0);
        assert!(approx_eq(camera.radius, 10.0, 1e-5));
        camera.zoom(0.0, 10_000.0);
        assert_eq!(camera.radius, 5.0);
    }

    #[test]
    fn test_drag_dispatch() {
        let mut camera = OrbitCamera::for_box();
        let start = camera;

        camera.apply_drag(Drag { button: MouseButton::Middle, dx: 50.0, dy: 50.0 });
        assert_eq!(camera, start);

        camera.apply_drag(Drag { button: MouseButton::Right, dx: 50.0, dy: 0.0 });
        assert_eq!(camera.theta, start.theta);
        assert!(camera.radius > start.radius);
    }

    #[test]
    fn test_view_looks_at_origin() {
        let camera = OrbitCamera::for_mirror_room();
        let origin = matrix::transform_point(&camera.view(), &Vector3::zeros());
        assert!(approx_eq(origin.x, 0.0, 1e-4));
        assert!(approx_eq(origin.y, 0.0, 1e-4));
        assert!(approx_eq(origin.z, camera.radius, 1e-4));
    }
}
