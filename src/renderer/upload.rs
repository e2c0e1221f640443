//! 上传缓冲区
//!
//! 上传堆上的缓冲区在创建后一直保持映射，CPU 每帧直接写入，
//! GPU 通过虚拟地址读取。常量缓冲区的每个元素必须按 256 字节对齐，
//! 这里负责计算偏移，具体的映射内存由 `MappedMemory` 提供。

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::core::error::{GraphicsError, Result};

/// 常量缓冲区视图的对齐要求（字节）
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 把常量缓冲区大小向上取整到 256 的倍数
#[inline]
pub const fn constant_buffer_byte_size(byte_size: u64) -> u64 {
    (byte_size + (CONSTANT_BUFFER_ALIGNMENT - 1)) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// 缓冲区用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// 常量缓冲区，元素按 256 字节对齐
    Constant,
    /// 普通缓冲区，元素紧密排列
    Plain,
}

/// 一段 CPU 可写、GPU 可读的映射内存
pub trait MappedMemory {
    fn as_bytes(&self) -> &[u8];

    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// 起始处的 GPU 虚拟地址
    fn gpu_address(&self) -> u64;
}

/// 普通堆内存，用于测试和离线计算
#[derive(Debug, Clone)]
pub struct HostMemory {
    bytes: Vec<u8>,
    base_address: u64,
}

impl HostMemory {
    pub fn new(size: u64) -> Self {
        Self::with_address(size, 0)
    }

    /// 指定一个模拟的 GPU 起始地址
    pub fn with_address(size: u64, base_address: u64) -> Self {
        Self {
            bytes: vec![0; size as usize],
            base_address,
        }
    }
}

impl MappedMemory for HostMemory {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn gpu_address(&self) -> u64 {
        self.base_address
    }
}

/// 类型化的上传缓冲区
///
/// # 示例
///
/// ```
/// use d3d_demos::renderer::upload::{BufferUsage, HostMemory, UploadBuffer};
///
/// let size = UploadBuffer::<[f32; 4], HostMemory>::required_size(3, BufferUsage::Constant);
/// let mut buffer = UploadBuffer::<[f32; 4], _>::new(HostMemory::new(size), 3, BufferUsage::Constant)?;
/// buffer.copy_data(2, &[1.0, 2.0, 3.0, 4.0])?;
/// assert_eq!(buffer.element_size(), 256);
/// # Ok::<(), d3d_demos::core::DemoError>(())
/// ```
#[derive(Debug)]
pub struct UploadBuffer<T, M> {
    memory: M,
    element_count: usize,
    element_size: u64,
    _marker: PhantomData<T>,
}

impl<T: Pod, M: MappedMemory> UploadBuffer<T, M> {
    /// 每个元素占用的字节数
    pub fn element_stride(usage: BufferUsage) -> u64 {
        let size = std::mem::size_of::<T>() as u64;
        match usage {
            BufferUsage::Constant => constant_buffer_byte_size(size),
            BufferUsage::Plain => size,
        }
    }

    /// 存放 `element_count` 个元素所需的映射内存大小
    pub fn required_size(element_count: usize, usage: BufferUsage) -> u64 {
        Self::element_stride(usage) * element_count as u64
    }

    pub fn new(memory: M, element_count: usize, usage: BufferUsage) -> Result<Self> {
        let element_size = Self::element_stride(usage);
        let required = element_size * element_count as u64;
        let available = memory.as_bytes().len() as u64;

        if available < required {
            return Err(GraphicsError::ResourceCreation(format!(
                "upload buffer needs {} bytes for {} elements, mapped memory has {}",
                required, element_count, available
            ))
            .into());
        }

        Ok(Self {
            memory,
            element_count,
            element_size,
            _marker: PhantomData,
        })
    }

    /// 写入第 `index` 个元素
    pub fn copy_data(&mut self, index: usize, data: &T) -> Result<()> {
        let offset = self.offset_of(index)? as usize;
        let src = bytemuck::bytes_of(data);
        self.memory.as_bytes_mut()[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// 读回第 `index` 个元素
    pub fn read(&self, index: usize) -> Result<T> {
        let offset = self.offset_of(index)? as usize;
        let size = std::mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(&self.memory.as_bytes()[offset..offset + size]))
    }

    /// 第 `index` 个元素的 GPU 虚拟地址
    pub fn element_gpu_address(&self, index: usize) -> Result<u64> {
        Ok(self.memory.gpu_address() + self.offset_of(index)?)
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 每个元素的大小（对齐后）
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    fn offset_of(&self, index: usize) -> Result<u64> {
        if index >= self.element_count {
            return Err(GraphicsError::OutOfBounds {
                index,
                count: self.element_count,
            }
            .into());
        }
        Ok(self.element_size * index as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_buffer_alignment() {
        assert_eq!(constant_buffer_byte_size(0), 0);
        assert_eq!(constant_buffer_byte_size(1), 256);
        assert_eq!(constant_buffer_byte_size(80), 256);
        assert_eq!(constant_buffer_byte_size(256), 256);
        assert_eq!(constant_buffer_byte_size(300), 512);
    }

    #[test]
    fn test_constant_elements_are_aligned() {
        let size = UploadBuffer::<[f32; 4], HostMemory>::required_size(3, BufferUsage::Constant);
        assert_eq!(size, 768);

        let buffer =
            UploadBuffer::<[f32; 4], _>::new(HostMemory::with_address(size, 0x1000), 3, BufferUsage::Constant)
                .unwrap();
        assert_eq!(buffer.element_gpu_address(0).unwrap(), 0x1000);
        assert_eq!(buffer.element_gpu_address(2).unwrap(), 0x1000 + 512);
    }

    #[test]
    fn test_plain_elements_are_packed() {
        let size = UploadBuffer::<[f32; 3], HostMemory>::required_size(4, BufferUsage::Plain);
        assert_eq!(size, 48);
    }

    #[test]
    fn test_copy_data_lands_at_offset() {
        let size = UploadBuffer::<u32, HostMemory>::required_size(2, BufferUsage::Constant);
        let mut buffer = UploadBuffer::<u32, _>::new(HostMemory::new(size), 2, BufferUsage::Constant).unwrap();

        buffer.copy_data(1, &0xDEAD_BEEF).unwrap();
        assert_eq!(buffer.read(1).unwrap(), 0xDEAD_BEEF);
        assert_eq!(buffer.read(0).unwrap(), 0);
        assert_eq!(&buffer.memory().as_bytes()[256..260], &0xDEAD_BEEFu32.to_ne_bytes());
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let mut buffer = UploadBuffer::<u32, _>::new(HostMemory::new(256), 1, BufferUsage::Constant).unwrap();
        assert!(buffer.copy_data(1, &7).is_err());
        assert!(buffer.element_gpu_address(1).is_err());
    }

    #[test]
    fn test_memory_too_small() {
        assert!(UploadBuffer::<u32, _>::new(HostMemory::new(255), 1, BufferUsage::Constant).is_err());
    }
}
