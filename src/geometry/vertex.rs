/// 顶点定义模块
///
/// 两个示例各用一种顶点格式：
/// - `ColorVertex`：位置 + 颜色，用于彩色立方体
/// - `Vertex`：位置 + 法线 + UV，用于带光照的镜面场景
///
/// 每种格式都通过 `VertexLayout` 描述输入布局，
/// 由图形后端翻译为具体 API 的输入元素描述。

use bytemuck::{Pod, Zeroable};

/// 顶点属性语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position,
    Normal,
    TexCoord,
    Color,
}

/// 顶点属性格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    Float2,
    Float3,
    Float4,
}

impl AttributeFormat {
    /// 属性大小（字节）
    pub const fn size(self) -> u32 {
        match self {
            AttributeFormat::Float2 => 8,
            AttributeFormat::Float3 => 12,
            AttributeFormat::Float4 => 16,
        }
    }
}

/// 单个顶点属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub format: AttributeFormat,
    /// 相对顶点起始处的字节偏移
    pub offset: u32,
}

/// 顶点输入布局
pub trait VertexLayout: Pod {
    const ATTRIBUTES: &'static [VertexAttribute];

    /// 顶点步长（字节）
    fn stride() -> u32 {
        std::mem::size_of::<Self>() as u32
    }
}

/// 带颜色的顶点
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)
/// - color: 16 bytes (4 * f32)
/// - **总计**: 28 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    #[inline]
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

impl VertexLayout for ColorVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute { semantic: Semantic::Position, format: AttributeFormat::Float3, offset: 0 },
        VertexAttribute { semantic: Semantic::Color, format: AttributeFormat::Float4, offset: 12 },
    ];
}

/// 带光照信息的顶点
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)
/// - normal: 12 bytes (3 * f32)
/// - tex_coord: 8 bytes (2 * f32)
/// - **总计**: 32 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 法线向量，应该是归一化的单位向量
    pub normal: [f32; 3],

    /// 纹理坐标 (u, v)
    pub tex_coord: [f32; 2],
}

impl Vertex {
    #[inline]
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

impl VertexLayout for Vertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute { semantic: Semantic::Position, format: AttributeFormat::Float3, offset: 0 },
        VertexAttribute { semantic: Semantic::Normal, format: AttributeFormat::Float3, offset: 12 },
        VertexAttribute { semantic: Semantic::TexCoord, format: AttributeFormat::Float2, offset: 24 },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn assert_layout_packed<V: VertexLayout>() {
        let mut expected_offset = 0;
        for attribute in V::ATTRIBUTES {
            assert_eq!(attribute.offset, expected_offset);
            expected_offset += attribute.format.size();
        }
        assert_eq!(expected_offset, V::stride());
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(size_of::<ColorVertex>(), 28);
        assert_eq!(size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_layouts_match_structs() {
        assert_layout_packed::<ColorVertex>();
        assert_layout_packed::<Vertex>();
    }
}
