//! 统一的数学库模块
//!
//! 基于 `nalgebra`，补充 Direct3D 风格的左手坐标系变换：
//!
//! - **基础类型**：Vector3/4, Matrix4, Color
//! - **常量**：PI, DEG_TO_RAD 等
//! - **矩阵辅助函数**：左手透视投影、左手 Look-At、平面反射、平面阴影
//!
//! # 约定
//!
//! 所有矩阵都按列向量使用（`M * v`），组合顺序从右向左。
//! nalgebra 按列主序存储，与 HLSL 常量缓冲区默认的 `column_major`
//! 打包一致，因此上传时无需转置，着色器中使用 `mul(M, v)`。

pub use nalgebra::{
    Matrix4 as Mat4, Point3, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 替换 alpha
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// 转换为数组（用于顶点、常量缓冲区和清屏颜色）
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    // 预定义颜色（取值与 DirectX::Colors 相同）
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 0.501_960_8, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const LIGHT_STEEL_BLUE: Color = Color::rgb(0.690_196_1, 0.768_627_5, 0.870_588_3);
}

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// π/2
    pub const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

    /// π/4
    pub const QUARTER_PI: f32 = std::f32::consts::FRAC_PI_4;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-5;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 球面坐标转笛卡尔坐标（y 轴向上）
    ///
    /// `theta` 为绕 y 轴的方位角，`phi` 为与 +y 轴的夹角。
    pub fn spherical_to_cartesian(radius: f32, theta: f32, phi: f32) -> Vector3 {
        Vector3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.cos(),
            radius * phi.sin() * theta.sin(),
        )
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 创建缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 创建绕 Y 轴旋转的矩阵（左手系：从 +y 看顺时针为正）
    pub fn rotation_y(angle: f32) -> Matrix4 {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 左手透视投影矩阵，深度范围 [0, 1]
    pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let h = 1.0 / (0.5 * fov_y).tan();
        let w = h / aspect;
        let range = far / (far - near);

        Matrix4::new(
            w, 0.0, 0.0, 0.0,
            0.0, h, 0.0, 0.0,
            0.0, 0.0, range, -range * near,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// 左手 Look-At 视图矩阵
    pub fn look_at_lh(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        let z = (target - eye).normalize();
        let x = up.cross(&z).normalize();
        let y = z.cross(&x);

        Matrix4::new(
            x.x, x.y, x.z, -x.dot(eye),
            y.x, y.y, y.z, -y.dot(eye),
            z.x, z.y, z.z, -z.dot(eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 关于平面 `ax + by + cz + d = 0` 的反射矩阵
    ///
    /// 平面会先被归一化。
    pub fn reflect(plane: &Vector4) -> Matrix4 {
        let p = normalize_plane(plane);
        let (a, b, c, d) = (p.x, p.y, p.z, p.w);

        Matrix4::new(
            1.0 - 2.0 * a * a, -2.0 * a * b, -2.0 * a * c, -2.0 * a * d,
            -2.0 * a * b, 1.0 - 2.0 * b * b, -2.0 * b * c, -2.0 * b * d,
            -2.0 * a * c, -2.0 * b * c, 1.0 - 2.0 * c * c, -2.0 * c * d,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 沿光线方向把几何体压平到平面上的阴影矩阵
    ///
    /// `light.w == 0` 表示平行光，此时 `light.xyz` 为指向光源的方向；
    /// `light.w == 1` 表示点光源位置。平面会先被归一化。
    pub fn shadow(plane: &Vector4, light: &Vector4) -> Matrix4 {
        let p = normalize_plane(plane);
        let d = p.dot(light);

        Matrix4::identity() * d - light * p.transpose()
    }

    /// 用矩阵变换方向向量（忽略平移）
    pub fn transform_normal(m: &Matrix4, v: &Vector3) -> Vector3 {
        (m * v.push(0.0)).xyz()
    }

    /// 用矩阵变换点（含透视除法）
    pub fn transform_point(m: &Matrix4, p: &Vector3) -> Vector3 {
        let r = m * p.push(1.0);
        r.xyz() / r.w
    }

    /// 求逆，不可逆时返回单位矩阵
    pub fn inverse_or_identity(m: &Matrix4) -> Matrix4 {
        m.try_inverse().unwrap_or_else(Matrix4::identity)
    }

    fn normalize_plane(plane: &Vector4) -> Vector4 {
        let len = plane.xyz().norm();
        if len > constants::EPSILON {
            plane / len
        } else {
            *plane
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::approx_eq;

    fn assert_vec_eq(a: Vector3, b: Vector3) {
        assert!((a - b).norm() < 1e-4, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_spherical_to_cartesian() {
        let p = utils::spherical_to_cartesian(5.0, 0.0, constants::HALF_PI);
        assert_vec_eq(p, Vector3::new(5.0, 0.0, 0.0));

        let top = utils::spherical_to_cartesian(2.0, 1.3, 0.0);
        assert_vec_eq(top, Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_look_at_lh_moves_target_onto_positive_z() {
        let eye = Vector3::new(0.0, 0.0, -5.0);
        let view = matrix::look_at_lh(&eye, &Vector3::zeros(), &Vector3::y());

        let origin = matrix::transform_point(&view, &Vector3::zeros());
        assert_vec_eq(origin, Vector3::new(0.0, 0.0, 5.0));

        let right = matrix::transform_point(&view, &Vector3::new(1.0, 0.0, 0.0));
        assert!(right.x > 0.0);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = matrix::perspective_fov_lh(0.25 * constants::PI, 4.0 / 3.0, 1.0, 1000.0);

        let near = matrix::transform_point(&proj, &Vector3::new(0.0, 0.0, 1.0));
        let far = matrix::transform_point(&proj, &Vector3::new(0.0, 0.0, 1000.0));
        assert!(approx_eq(near.z, 0.0, 1e-5));
        assert!(approx_eq(far.z, 1.0, 1e-5));
    }

    #[test]
    fn test_reflect_across_xy_plane() {
        let r = matrix::reflect(&Vector4::new(0.0, 0.0, 1.0, 0.0));
        let p = matrix::transform_point(&r, &Vector3::new(1.0, 2.0, 3.0));
        assert_vec_eq(p, Vector3::new(1.0, 2.0, -3.0));

        // 反射两次回到原处
        assert!((r * r - Matrix4::identity()).norm() < 1e-5);
    }

    #[test]
    fn test_reflect_offset_plane() {
        // 平面 z = 2 写作 2z - 4 = 0，验证归一化
        let r = matrix::reflect(&Vector4::new(0.0, 0.0, 2.0, -4.0));
        let p = matrix::transform_point(&r, &Vector3::new(0.0, 0.0, 5.0));
        assert_vec_eq(p, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_shadow_projects_onto_ground() {
        let to_light = Vector4::new(-1.0, 1.0, -1.0, 0.0).normalize();
        let s = matrix::shadow(&Vector4::new(0.0, 1.0, 0.0, 0.0), &to_light);

        let p = matrix::transform_point(&s, &Vector3::new(0.0, 2.0, 0.0));
        assert_vec_eq(p, Vector3::new(2.0, 0.0, 2.0));

        // 已在平面上的点保持不变
        let q = matrix::transform_point(&s, &Vector3::new(3.0, 0.0, -1.0));
        assert_vec_eq(q, Vector3::new(3.0, 0.0, -1.0));
    }

    #[test]
    fn test_transform_normal_ignores_translation() {
        let m = matrix::translation(5.0, 6.0, 7.0) * matrix::rotation_y(constants::HALF_PI);
        let n = matrix::transform_normal(&m, &Vector3::new(1.0, 0.0, 0.0));
        assert_vec_eq(n, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_color_array() {
        assert_eq!(Color::RED.to_array(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(Color::BLACK.with_alpha(0.5).to_array(), [0.0, 0.0, 0.0, 0.5]);
    }
}
