/// 网格数据结构模块
///
/// CPU 侧的网格容器：一个顶点/索引缓冲区对，加上若干按名字查找的子网格。
/// 多个物体可以共用同一组缓冲区，每个物体只记录自己的绘制参数。

use std::collections::HashMap;

use super::vertex::VertexLayout;
use crate::core::error::{GraphicsError, Result};

/// 子网格绘制参数
///
/// 对应一次 `DrawIndexedInstanced` 调用所需的范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmeshGeometry {
    /// 索引数量
    pub index_count: u32,
    /// 在索引缓冲区中的起始位置
    pub start_index: u32,
    /// 读取顶点前加到每个索引上的偏移
    pub base_vertex: i32,
}

impl SubmeshGeometry {
    #[inline]
    pub fn new(index_count: u32, start_index: u32, base_vertex: i32) -> Self {
        Self {
            index_count,
            start_index,
            base_vertex,
        }
    }
}

/// CPU侧网格数据
#[derive(Debug, Clone)]
pub struct MeshGeometry<V> {
    /// 名称（调试用）
    pub name: String,
    /// 顶点数组
    pub vertices: Vec<V>,
    /// 16 位索引数组
    pub indices: Vec<u16>,
    /// 子网格，按名字查找
    pub draw_args: HashMap<String, SubmeshGeometry>,
}

impl<V: VertexLayout> MeshGeometry<V> {
    pub fn new(name: impl Into<String>, vertices: Vec<V>, indices: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            draw_args: HashMap::new(),
        }
    }

    /// 添加子网格
    pub fn with_submesh(mut self, name: impl Into<String>, submesh: SubmeshGeometry) -> Self {
        self.draw_args.insert(name.into(), submesh);
        self
    }

    /// 按名字查找子网格
    pub fn submesh(&self, name: &str) -> Result<SubmeshGeometry> {
        self.draw_args
            .get(name)
            .copied()
            .ok_or_else(|| GraphicsError::MissingSubmesh(format!("{}/{}", self.name, name)).into())
    }

    /// 顶点步长（字节）
    pub fn vertex_byte_stride(&self) -> u32 {
        V::stride()
    }

    /// 顶点缓冲区大小（字节）
    pub fn vertex_buffer_byte_size(&self) -> u32 {
        (self.vertices.len() as u32) * V::stride()
    }

    /// 索引缓冲区大小（字节）
    pub fn index_buffer_byte_size(&self) -> u32 {
        (self.indices.len() * std::mem::size_of::<u16>()) as u32
    }

    /// 顶点数据的字节视图
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// 索引数据的字节视图
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// 检查所有子网格都落在索引缓冲区内，且索引不越过顶点数组
    pub fn validate(&self) -> Result<()> {
        for (name, submesh) in &self.draw_args {
            let start = submesh.start_index as usize;
            let end = start + submesh.index_count as usize;
            if end > self.indices.len() {
                return Err(GraphicsError::OutOfBounds { index: end, count: self.indices.len() }.into());
            }

            let range = &self.indices[start..end];
            for &index in range {
                let vertex = index as i64 + submesh.base_vertex as i64;
                if vertex < 0 || vertex as usize >= self.vertices.len() {
                    return Err(GraphicsError::ResourceCreation(format!(
                        "submesh '{}' references vertex {} of {}",
                        name,
                        vertex,
                        self.vertices.len()
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }
}
