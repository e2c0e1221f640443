//! 管线状态描述
//!
//! 与具体图形 API 无关地描述两个示例用到的全部管线状态，
//! 后端只负责把这些描述翻译成 PSO。默认值与 D3D12 的
//! `CD3DX12_*_DESC(D3D12_DEFAULT)` 相同。

/// 着色器程序（HLSL 文件 + 对应的顶点格式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// `color.hlsl`，顶点为 `ColorVertex`
    Color,
    /// `default.hlsl`，顶点为 `Vertex`，带光照和雾
    Lit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
}

/// 颜色写入掩码（RGBA 四位）
pub const COLOR_WRITE_ALL: u8 = 0b1111;
pub const COLOR_WRITE_NONE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    /// 逆时针为正面
    pub front_counter_clockwise: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_counter_clockwise: false,
        }
    }
}

/// 单个渲染目标的混合状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dest: BlendFactor,
    pub op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dest_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub write_mask: u8,
}

impl BlendState {
    /// `src.a * src + (1 - src.a) * dest`
    pub fn alpha_blend() -> Self {
        Self {
            enabled: true,
            src: BlendFactor::SrcAlpha,
            dest: BlendFactor::InvSrcAlpha,
            ..Self::default()
        }
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            src: BlendFactor::One,
            dest: BlendFactor::Zero,
            op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dest_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            write_mask: COLOR_WRITE_ALL,
        }
    }
}

/// 单面的模板测试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFace {
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub func: ComparisonFunc,
}

impl StencilFace {
    /// 只有测试通过时才执行 `pass_op`
    pub fn on_pass(func: ComparisonFunc, pass_op: StencilOp) -> Self {
        Self {
            func,
            pass_op,
            ..Self::default()
        }
    }
}

impl Default for StencilFace {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            func: ComparisonFunc::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub depth_func: ComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilFace,
    pub back_face: StencilFace,
}

impl DepthStencilState {
    /// 正反面使用相同的模板测试
    pub fn with_stencil(mut self, face: StencilFace) -> Self {
        self.stencil_enable = true;
        self.front_face = face;
        self.back_face = face;
        self
    }
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: true,
            depth_func: ComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            front_face: StencilFace::default(),
            back_face: StencilFace::default(),
        }
    }
}

/// 完整的管线状态描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub shader: ShaderProgram,
    pub rasterizer: RasterizerState,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
}

impl PipelineState {
    fn new(shader: ShaderProgram) -> Self {
        Self {
            shader,
            rasterizer: RasterizerState::default(),
            blend: BlendState::default(),
            depth_stencil: DepthStencilState::default(),
        }
    }
}

/// 示例中用到的管线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// 彩色立方体
    Color,
    /// 不透明物体
    Opaque,
    /// 半透明物体（镜面）
    Transparent,
    /// 把镜子所覆盖的像素写入模板缓冲区
    MarkStencilMirrors,
    /// 只在模板标记过的像素内绘制反射物体
    DrawStencilReflections,
    /// 平面阴影，每个像素最多混合一次
    Shadow,
}

impl PipelineKind {
    /// 镜子场景用到的全部管线
    pub const MIRROR_SCENE: [PipelineKind; 5] = [
        PipelineKind::Opaque,
        PipelineKind::Transparent,
        PipelineKind::MarkStencilMirrors,
        PipelineKind::DrawStencilReflections,
        PipelineKind::Shadow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::Color => "color",
            PipelineKind::Opaque => "opaque",
            PipelineKind::Transparent => "transparent",
            PipelineKind::MarkStencilMirrors => "markStencilMirrors",
            PipelineKind::DrawStencilReflections => "drawStencilReflections",
            PipelineKind::Shadow => "shadow",
        }
    }

    pub fn state(self) -> PipelineState {
        match self {
            PipelineKind::Color => {
                let mut state = PipelineState::new(ShaderProgram::Color);
                // 剔除朝外的面，从外面看到的是立方体内壁
                state.rasterizer.cull_mode = CullMode::Front;
                state
            }

            PipelineKind::Opaque => PipelineState::new(ShaderProgram::Lit),

            PipelineKind::Transparent => PipelineState {
                blend: BlendState::alpha_blend(),
                ..PipelineState::new(ShaderProgram::Lit)
            },

            PipelineKind::MarkStencilMirrors => {
                let mut state = PipelineState::new(ShaderProgram::Lit);
                state.blend.write_mask = COLOR_WRITE_NONE;
                state.depth_stencil.depth_write = false;
                state.depth_stencil = state
                    .depth_stencil
                    .with_stencil(StencilFace::on_pass(ComparisonFunc::Always, StencilOp::Replace));
                state
            }

            PipelineKind::DrawStencilReflections => {
                let mut state = PipelineState::new(ShaderProgram::Lit);
                state.depth_stencil = state
                    .depth_stencil
                    .with_stencil(StencilFace::on_pass(ComparisonFunc::Equal, StencilOp::Keep));
                // 反射矩阵会翻转三角形的环绕方向
                state.rasterizer.front_counter_clockwise = true;
                state
            }

            PipelineKind::Shadow => {
                let mut state = PipelineState::new(ShaderProgram::Lit);
                state.blend = BlendState::alpha_blend();
                state.depth_stencil = state
                    .depth_stencil
                    .with_stencil(StencilFace::on_pass(ComparisonFunc::Equal, StencilOp::Incr));
                state
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_is_d3d_default() {
        let state = PipelineKind::Opaque.state();
        assert_eq!(state.rasterizer.cull_mode, CullMode::Back);
        assert!(!state.rasterizer.front_counter_clockwise);
        assert!(!state.blend.enabled);
        assert!(state.depth_stencil.depth_enable);
        assert!(state.depth_stencil.depth_write);
        assert_eq!(state.depth_stencil.depth_func, ComparisonFunc::Less);
        assert!(!state.depth_stencil.stencil_enable);
    }

    #[test]
    fn test_mark_mirrors_writes_only_stencil() {
        let state = PipelineKind::MarkStencilMirrors.state();
        assert_eq!(state.blend.write_mask, COLOR_WRITE_NONE);
        assert!(state.depth_stencil.depth_enable);
        assert!(!state.depth_stencil.depth_write);
        assert!(state.depth_stencil.stencil_enable);
        assert_eq!(state.depth_stencil.front_face.func, ComparisonFunc::Always);
        assert_eq!(state.depth_stencil.front_face.pass_op, StencilOp::Replace);
        // 被遮挡的镜面像素不标记
        assert_eq!(state.depth_stencil.front_face.depth_fail_op, StencilOp::Keep);
    }

    #[test]
    fn test_reflections_flip_winding_and_test_equal() {
        let state = PipelineKind::DrawStencilReflections.state();
        assert!(state.rasterizer.front_counter_clockwise);
        assert_eq!(state.depth_stencil.front_face.func, ComparisonFunc::Equal);
        assert_eq!(state.depth_stencil.front_face.pass_op, StencilOp::Keep);
        assert_eq!(state.depth_stencil.back_face, state.depth_stencil.front_face);
    }

    #[test]
    fn test_shadow_blends_once_per_pixel() {
        let state = PipelineKind::Shadow.state();
        assert!(state.blend.enabled);
        assert_eq!(state.blend.src, BlendFactor::SrcAlpha);
        assert_eq!(state.blend.dest, BlendFactor::InvSrcAlpha);
        assert_eq!(state.depth_stencil.front_face.func, ComparisonFunc::Equal);
        assert_eq!(state.depth_stencil.front_face.pass_op, StencilOp::Incr);
    }

    #[test]
    fn test_transparent_has_no_stencil() {
        let state = PipelineKind::Transparent.state();
        assert!(state.blend.enabled);
        assert!(!state.depth_stencil.stencil_enable);
        assert_eq!(state.shader, ShaderProgram::Lit);
        assert_eq!(PipelineKind::Color.state().shader, ShaderProgram::Color);
    }

    #[test]
    fn test_color_culls_front_faces() {
        let state = PipelineKind::Color.state();
        assert_eq!(state.rasterizer.cull_mode, CullMode::Front);
        assert!(!state.rasterizer.front_counter_clockwise);
        assert!(!state.blend.enabled);
        assert!(!state.depth_stencil.stencil_enable);
    }
}
