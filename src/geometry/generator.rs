/// 程序化几何体生成
///
/// 示例不读取任何模型文件，所需网格全部在这里生成：
/// - `colored_cube`：8 个带颜色顶点的立方体
/// - `room`：地板、墙和镜子共享一组缓冲区的房间
/// - `sphere`：代替模型的经纬球
///
/// 所有三角形按顺时针（从正面看）排列，与 Direct3D 默认的正面约定一致。

use super::mesh::{MeshGeometry, SubmeshGeometry};
use super::vertex::{ColorVertex, Vertex};
use crate::core::error::{GraphicsError, Result};
use crate::math::{constants, Color};

/// 立方体子网格名
pub const BOX_SUBMESH: &str = "box";
/// 房间子网格名
pub const FLOOR_SUBMESH: &str = "floor";
pub const WALL_SUBMESH: &str = "wall";
pub const MIRROR_SUBMESH: &str = "mirror";
/// 球子网格名
pub const SPHERE_SUBMESH: &str = "sphere";

/// 边长为 2、以原点为中心的彩色立方体
pub fn colored_cube() -> MeshGeometry<ColorVertex> {
    let vertices = vec![
        ColorVertex::new([-1.0, -1.0, -1.0], Color::WHITE.to_array()),
        ColorVertex::new([-1.0, 1.0, -1.0], Color::BLACK.to_array()),
        ColorVertex::new([1.0, 1.0, -1.0], Color::RED.to_array()),
        ColorVertex::new([1.0, -1.0, -1.0], Color::GREEN.to_array()),
        ColorVertex::new([-1.0, -1.0, 1.0], Color::BLUE.to_array()),
        ColorVertex::new([-1.0, 1.0, 1.0], Color::YELLOW.to_array()),
        ColorVertex::new([1.0, 1.0, 1.0], Color::CYAN.to_array()),
        ColorVertex::new([1.0, -1.0, 1.0], Color::MAGENTA.to_array()),
    ];

    #[rustfmt::skip]
    let indices: Vec<u16> = vec![
        // 前
        0, 1, 2,
        0, 2, 3,
        // 后
        4, 6, 5,
        4, 7, 6,
        // 左
        4, 5, 1,
        4, 1, 0,
        // 右
        3, 2, 6,
        3, 6, 7,
        // 上
        1, 5, 6,
        1, 6, 2,
        // 下
        4, 0, 3,
        4, 3, 7,
    ];

    let submesh = SubmeshGeometry::new(indices.len() as u32, 0, 0);
    MeshGeometry::new("boxGeo", vertices, indices).with_submesh(BOX_SUBMESH, submesh)
}

/// 镜子场景的房间
///
/// 镜子位于 z = 0 平面，x ∈ [-2.5, 2.5]，y ∈ [0, 4]；
/// 墙在镜子两侧和上方，地板向 -z 方向延伸。
pub fn room() -> MeshGeometry<Vertex> {
    let floor_normal = [0.0, 1.0, 0.0];
    let wall_normal = [0.0, 0.0, -1.0];

    #[rustfmt::skip]
    let vertices = vec![
        // 地板，纹理坐标重复 4 次
        Vertex::new([-3.5, 0.0, -10.0], floor_normal, [0.0, 4.0]),
        Vertex::new([-3.5, 0.0, 0.0], floor_normal, [0.0, 0.0]),
        Vertex::new([7.5, 0.0, 0.0], floor_normal, [4.0, 0.0]),
        Vertex::new([7.5, 0.0, -10.0], floor_normal, [4.0, 4.0]),

        // 墙：镜子左侧
        Vertex::new([-3.5, 0.0, 0.0], wall_normal, [0.0, 2.0]),
        Vertex::new([-3.5, 4.0, 0.0], wall_normal, [0.0, 0.0]),
        Vertex::new([-2.5, 4.0, 0.0], wall_normal, [0.5, 0.0]),
        Vertex::new([-2.5, 0.0, 0.0], wall_normal, [0.5, 2.0]),

        // 墙：镜子右侧
        Vertex::new([2.5, 0.0, 0.0], wall_normal, [0.0, 2.0]),
        Vertex::new([2.5, 4.0, 0.0], wall_normal, [0.0, 0.0]),
        Vertex::new([7.5, 4.0, 0.0], wall_normal, [2.0, 0.0]),
        Vertex::new([7.5, 0.0, 0.0], wall_normal, [2.0, 2.0]),

        // 墙：镜子上方
        Vertex::new([-3.5, 4.0, 0.0], wall_normal, [0.0, 1.0]),
        Vertex::new([-3.5, 6.0, 0.0], wall_normal, [0.0, 0.0]),
        Vertex::new([7.5, 6.0, 0.0], wall_normal, [6.0, 0.0]),
        Vertex::new([7.5, 4.0, 0.0], wall_normal, [6.0, 1.0]),

        // 镜子
        Vertex::new([-2.5, 0.0, 0.0], wall_normal, [0.0, 1.0]),
        Vertex::new([-2.5, 4.0, 0.0], wall_normal, [0.0, 0.0]),
        Vertex::new([2.5, 4.0, 0.0], wall_normal, [1.0, 0.0]),
        Vertex::new([2.5, 0.0, 0.0], wall_normal, [1.0, 1.0]),
    ];

    #[rustfmt::skip]
    let indices: Vec<u16> = vec![
        // 地板
        0, 1, 2,
        0, 2, 3,

        // 墙
        4, 5, 6,
        4, 6, 7,

        8, 9, 10,
        8, 10, 11,

        12, 13, 14,
        12, 14, 15,

        // 镜子
        16, 17, 18,
        16, 18, 19,
    ];

    MeshGeometry::new("roomGeo", vertices, indices)
        .with_submesh(FLOOR_SUBMESH, SubmeshGeometry::new(6, 0, 0))
        .with_submesh(WALL_SUBMESH, SubmeshGeometry::new(18, 6, 0))
        .with_submesh(MIRROR_SUBMESH, SubmeshGeometry::new(6, 24, 0))
}

/// 经纬球
///
/// 顶部和底部各一个极点，中间 `stacks - 1` 圈，每圈 `slices + 1` 个顶点
/// （首尾重复以便纹理坐标闭合）。
pub fn sphere(radius: f32, slices: u32, stacks: u32) -> Result<MeshGeometry<Vertex>> {
    if slices < 3 || stacks < 2 {
        return Err(GraphicsError::ResourceCreation(format!(
            "sphere needs at least 3 slices and 2 stacks, got {}x{}",
            slices, stacks
        ))
        .into());
    }

    let ring_vertex_count = slices + 1;
    let vertex_count = 2 + (stacks - 1) as usize * ring_vertex_count as usize;
    if vertex_count > u16::MAX as usize + 1 {
        return Err(GraphicsError::OutOfBounds {
            index: vertex_count,
            count: u16::MAX as usize + 1,
        }
        .into());
    }

    let phi_step = constants::PI / stacks as f32;
    let theta_step = 2.0 * constants::PI / slices as f32;

    let mut vertices = Vec::with_capacity(vertex_count);
    vertices.push(Vertex::new([0.0, radius, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]));

    for i in 1..stacks {
        let phi = i as f32 * phi_step;
        let (sin_phi, cos_phi) = phi.sin_cos();

        for j in 0..=slices {
            let theta = j as f32 * theta_step;
            let (sin_theta, cos_theta) = theta.sin_cos();

            let normal = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
            let position = [radius * normal[0], radius * normal[1], radius * normal[2]];
            let uv = [theta / (2.0 * constants::PI), phi / constants::PI];

            vertices.push(Vertex::new(position, normal, uv));
        }
    }

    vertices.push(Vertex::new([0.0, -radius, 0.0], [0.0, -1.0, 0.0], [0.0, 1.0]));

    let mut indices: Vec<u16> = Vec::with_capacity(6 * (slices * (stacks - 1)) as usize);

    // 顶部
    for i in 1..=slices {
        indices.extend_from_slice(&[0, (i + 1) as u16, i as u16]);
    }

    // 中间各圈，顶点从 1 开始
    let base = 1;
    for i in 0..stacks - 2 {
        for j in 0..slices {
            let a = base + i * ring_vertex_count + j;
            let b = base + (i + 1) * ring_vertex_count + j;
            indices.extend_from_slice(&[a as u16, (a + 1) as u16, b as u16]);
            indices.extend_from_slice(&[b as u16, (a + 1) as u16, (b + 1) as u16]);
        }
    }

    // 底部
    let south = (vertices.len() - 1) as u32;
    let last_ring = south - ring_vertex_count;
    for i in 0..slices {
        indices.extend_from_slice(&[south as u16, (last_ring + i) as u16, (last_ring + i + 1) as u16]);
    }

    let submesh = SubmeshGeometry::new(indices.len() as u32, 0, 0);
    Ok(MeshGeometry::new("sphereGeo", vertices, indices).with_submesh(SPHERE_SUBMESH, submesh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    /// 按顺时针约定计算的面法线
    fn face_normal(p0: [f32; 3], p1: [f32; 3], p2: [f32; 3]) -> Vector3 {
        let p0 = Vector3::from(p0);
        let e0 = Vector3::from(p1) - p0;
        let e1 = Vector3::from(p2) - p0;
        e0.cross(&e1)
    }

    #[test]
    fn test_colored_cube() {
        let cube = colored_cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.submesh(BOX_SUBMESH).unwrap().index_count, 36);
        assert!(cube.validate().is_ok());

        // 每个三角形都朝外
        for tri in cube.indices.chunks(3) {
            let p: Vec<[f32; 3]> = tri.iter().map(|&i| cube.vertices[i as usize].position).collect();
            let n = face_normal(p[0], p[1], p[2]);
            let center = (Vector3::from(p[0]) + Vector3::from(p[1]) + Vector3::from(p[2])) / 3.0;
            assert!(n.dot(&center) > 0.0, "inward face {:?}", tri);
        }
    }

    #[test]
    fn test_room_submeshes() {
        let room = room();
        assert_eq!(room.vertices.len(), 20);
        assert_eq!(room.indices.len(), 30);
        assert!(room.validate().is_ok());

        assert_eq!(room.submesh(FLOOR_SUBMESH).unwrap(), SubmeshGeometry::new(6, 0, 0));
        assert_eq!(room.submesh(WALL_SUBMESH).unwrap(), SubmeshGeometry::new(18, 6, 0));
        assert_eq!(room.submesh(MIRROR_SUBMESH).unwrap(), SubmeshGeometry::new(6, 24, 0));
    }

    #[test]
    fn test_room_winding_matches_normals() {
        let room = room();
        for tri in room.indices.chunks(3) {
            let v: Vec<&Vertex> = tri.iter().map(|&i| &room.vertices[i as usize]).collect();
            let n = face_normal(v[0].position, v[1].position, v[2].position);
            assert!(n.dot(&Vector3::from(v[0].normal)) > 0.0, "winding {:?}", tri);
        }
    }

    #[test]
    fn test_mirror_lies_in_z_plane() {
        let room = room();
        let mirror = room.submesh(MIRROR_SUBMESH).unwrap();
        let start = mirror.start_index as usize;
        for &i in &room.indices[start..start + mirror.index_count as usize] {
            assert_eq!(room.vertices[i as usize].position[2], 0.0);
        }
    }

    #[test]
    fn test_sphere_counts_and_radius() {
        let sphere = sphere(0.5, 20, 20).unwrap();
        assert_eq!(sphere.vertices.len(), 2 + 19 * 21);
        assert_eq!(sphere.indices.len(), 6 * 20 * 19);
        assert!(sphere.validate().is_ok());

        for v in &sphere.vertices {
            let p = Vector3::from(v.position);
            assert!((p.norm() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_faces_point_outward() {
        let sphere = sphere(1.0, 8, 6).unwrap();
        for tri in sphere.indices.chunks(3) {
            let p: Vec<[f32; 3]> = tri.iter().map(|&i| sphere.vertices[i as usize].position).collect();
            let n = face_normal(p[0], p[1], p[2]);
            let center = (Vector3::from(p[0]) + Vector3::from(p[1]) + Vector3::from(p[2])) / 3.0;
            assert!(n.dot(&center) > 0.0, "inward face {:?}", tri);
        }
    }

    #[test]
    fn test_sphere_rejects_degenerate_tessellation() {
        assert!(sphere(1.0, 2, 10).is_err());
        assert!(sphere(1.0, 10, 1).is_err());
    }
}
