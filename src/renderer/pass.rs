//! 渲染层与镜面场景的绘制顺序
//!
//! 模板缓冲区在每帧开始时清零。镜子先把自己覆盖的像素标记为 1，
//! 反射物体只画在这些像素里；之后恢复主渲染遍常量和参考值 0，
//! 再画半透明镜面与阴影。

use super::pipeline::PipelineKind;
use super::upload::constant_buffer_byte_size;

/// 渲染层，每个渲染项属于一个或多个层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    Opaque = 0,
    Mirrors,
    Reflected,
    Transparent,
    Shadow,
}

impl RenderLayer {
    pub const COUNT: usize = 5;

    pub const ALL: [RenderLayer; Self::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::Mirrors,
        RenderLayer::Reflected,
        RenderLayer::Transparent,
        RenderLayer::Shadow,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 渲染遍常量缓冲区中的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassSlot {
    Main = 0,
    Reflected = 1,
}

impl PassSlot {
    pub const COUNT: usize = 2;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 某个槽位相对渲染遍常量缓冲区起点的字节偏移
pub const fn pass_cb_offset(slot: PassSlot, pass_constants_size: u64) -> u64 {
    slot as u64 * constant_buffer_byte_size(pass_constants_size)
}

/// 一次按层绘制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawStep {
    pub layer: RenderLayer,
    pub pipeline: PipelineKind,
    pub stencil_ref: u32,
    pub pass: PassSlot,
}

impl DrawStep {
    const fn new(layer: RenderLayer, pipeline: PipelineKind, stencil_ref: u32, pass: PassSlot) -> Self {
        Self {
            layer,
            pipeline,
            stencil_ref,
            pass,
        }
    }
}

/// 镜面场景每帧的绘制序列
pub const MIRROR_FRAME: [DrawStep; 5] = [
    DrawStep::new(RenderLayer::Opaque, PipelineKind::Opaque, 0, PassSlot::Main),
    DrawStep::new(RenderLayer::Mirrors, PipelineKind::MarkStencilMirrors, 1, PassSlot::Main),
    DrawStep::new(RenderLayer::Reflected, PipelineKind::DrawStencilReflections, 1, PassSlot::Reflected),
    DrawStep::new(RenderLayer::Transparent, PipelineKind::Transparent, 0, PassSlot::Main),
    DrawStep::new(RenderLayer::Shadow, PipelineKind::Shadow, 0, PassSlot::Main),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::constants::PassConstants;
    use crate::renderer::pipeline::{ComparisonFunc, StencilOp};

    #[test]
    fn test_pass_offsets() {
        let size = std::mem::size_of::<PassConstants>() as u64;
        assert_eq!(pass_cb_offset(PassSlot::Main, size), 0);
        assert_eq!(pass_cb_offset(PassSlot::Reflected, size), 1280);
        assert_eq!(pass_cb_offset(PassSlot::Reflected, 80), 256);
    }

    #[test]
    fn test_mirror_is_marked_before_reflections() {
        let mark = MIRROR_FRAME
            .iter()
            .position(|s| s.pipeline == PipelineKind::MarkStencilMirrors)
            .unwrap();
        let reflect = MIRROR_FRAME
            .iter()
            .position(|s| s.pipeline == PipelineKind::DrawStencilReflections)
            .unwrap();
        assert!(mark < reflect);

        // 标记写入的值就是反射测试的值
        assert_eq!(MIRROR_FRAME[mark].stencil_ref, MIRROR_FRAME[reflect].stencil_ref);
        assert_eq!(MIRROR_FRAME[reflect].pass, PassSlot::Reflected);
    }

    #[test]
    fn test_main_pass_restored_after_reflections() {
        let reflect = MIRROR_FRAME
            .iter()
            .position(|s| s.pass == PassSlot::Reflected)
            .unwrap();
        for step in &MIRROR_FRAME[reflect + 1..] {
            assert_eq!(step.pass, PassSlot::Main);
            assert_eq!(step.stencil_ref, 0);
        }
    }

    #[test]
    fn test_shadow_is_drawn_last_on_unmarked_pixels() {
        let last = MIRROR_FRAME[MIRROR_FRAME.len() - 1];
        assert_eq!(last.layer, RenderLayer::Shadow);

        // 参考值 0 且 EQUAL → INCR：第二次覆盖同一像素时测试失败
        let state = last.pipeline.state();
        assert_eq!(state.depth_stencil.front_face.func, ComparisonFunc::Equal);
        assert_eq!(state.depth_stencil.front_face.pass_op, StencilOp::Incr);
        assert_eq!(last.stencil_ref, 0);
    }

    #[test]
    fn test_layer_indices() {
        for (i, layer) in RenderLayer::ALL.iter().enumerate() {
            assert_eq!(layer.index(), i);
        }
    }
}
