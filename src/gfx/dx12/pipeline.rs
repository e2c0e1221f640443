//! 着色器编译、根签名和 PSO
//!
//! 把 `renderer::pipeline` 中与 API 无关的管线描述翻译为
//! `D3D12_GRAPHICS_PIPELINE_STATE_DESC`。

use std::fs;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

use tracing::debug;
use windows::core::{s, PCSTR};
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::vertex::{AttributeFormat, Semantic, VertexLayout};
use crate::renderer::pipeline::{
    BlendFactor, BlendOp, BlendState, CullMode, ComparisonFunc, DepthStencilState, FillMode, PipelineState,
    RasterizerState, ShaderProgram, StencilFace, StencilOp,
};

use super::context::{BACK_BUFFER_FORMAT, DEPTH_STENCIL_FORMAT};

/// 编译好的顶点/像素着色器
pub struct ShaderSet {
    pub vs: ID3DBlob,
    pub ps: ID3DBlob,
}

fn shader_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src/gfx/dx12/shaders")
}

pub fn shader_path(program: ShaderProgram) -> PathBuf {
    let file = match program {
        ShaderProgram::Color => "color.hlsl",
        ShaderProgram::Lit => "default.hlsl",
    };
    shader_dir().join(file)
}

/// 编译着色器程序的 `VS` 和 `PS` 入口
pub fn compile_program(program: ShaderProgram) -> Result<ShaderSet> {
    let path = shader_path(program);
    let source = fs::read_to_string(&path).map_err(|e| {
        GraphicsError::ShaderCompilation(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let vs = compile(&source, &path, s!("VS"), s!("vs_5_0"))?;
    let ps = compile(&source, &path, s!("PS"), s!("ps_5_0"))?;
    debug!(shader = %path.display(), "Shader program compiled");
    Ok(ShaderSet { vs, ps })
}

fn compile(source: &str, path: &Path, entry: PCSTR, target: PCSTR) -> Result<ID3DBlob> {
    let flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        0
    };

    let mut code = None;
    let mut errors = None;
    let result = unsafe {
        D3DCompile(
            source.as_ptr() as _,
            source.len(),
            None,
            None,
            None,
            entry,
            target,
            flags,
            0,
            &mut code,
            Some(&mut errors),
        )
    };

    if let Err(e) = result {
        let message = errors
            .map(|blob| blob_to_string(&blob))
            .unwrap_or_else(|| e.to_string());
        let entry = unsafe { entry.to_string() }.unwrap_or_default();
        return Err(GraphicsError::ShaderCompilation(format!(
            "{} ({}): {}",
            path.display(),
            entry,
            message
        ))
        .into());
    }

    code.ok_or_else(|| GraphicsError::ShaderCompilation(format!("{}: no bytecode produced", path.display())).into())
}

fn blob_to_string(blob: &ID3DBlob) -> String {
    unsafe {
        let bytes = std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
        String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
    }
}

fn bytecode(blob: &ID3DBlob) -> D3D12_SHADER_BYTECODE {
    unsafe {
        D3D12_SHADER_BYTECODE {
            pShaderBytecode: blob.GetBufferPointer(),
            BytecodeLength: blob.GetBufferSize(),
        }
    }
}

/// 顶点格式对应的输入布局
pub fn input_layout<V: VertexLayout>() -> Vec<D3D12_INPUT_ELEMENT_DESC> {
    V::ATTRIBUTES
        .iter()
        .map(|attribute| D3D12_INPUT_ELEMENT_DESC {
            SemanticName: match attribute.semantic {
                Semantic::Position => s!("POSITION"),
                Semantic::Normal => s!("NORMAL"),
                Semantic::TexCoord => s!("TEXCOORD"),
                Semantic::Color => s!("COLOR"),
            },
            SemanticIndex: 0,
            Format: match attribute.format {
                AttributeFormat::Float2 => DXGI_FORMAT_R32G32_FLOAT,
                AttributeFormat::Float3 => DXGI_FORMAT_R32G32B32_FLOAT,
                AttributeFormat::Float4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
            },
            InputSlot: 0,
            AlignedByteOffset: attribute.offset,
            InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
            InstanceDataStepRate: 0,
        })
        .collect()
}

/// 根常量缓冲区视图参数
pub fn root_cbv(register: u32) -> D3D12_ROOT_PARAMETER {
    D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_CBV,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            Descriptor: D3D12_ROOT_DESCRIPTOR {
                ShaderRegister: register,
                RegisterSpace: 0,
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
    }
}

/// 描述符表参数，`ranges` 必须存活到根签名创建完毕
pub fn root_descriptor_table(ranges: &[D3D12_DESCRIPTOR_RANGE]) -> D3D12_ROOT_PARAMETER {
    D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                NumDescriptorRanges: ranges.len() as u32,
                pDescriptorRanges: ranges.as_ptr(),
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
    }
}

/// 序列化并创建根签名
pub fn create_root_signature(
    device: &ID3D12Device,
    parameters: &[D3D12_ROOT_PARAMETER],
) -> Result<ID3D12RootSignature> {
    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: parameters.as_ptr(),
        NumStaticSamplers: 0,
        pStaticSamplers: std::ptr::null(),
        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
    };

    unsafe {
        let mut signature = None;
        let mut errors = None;
        if let Err(e) =
            D3D12SerializeRootSignature(&desc, D3D_ROOT_SIGNATURE_VERSION_1, &mut signature, Some(&mut errors))
        {
            let message = errors.map(|blob| blob_to_string(&blob)).unwrap_or_else(|| e.to_string());
            return Err(GraphicsError::ResourceCreation(format!(
                "Failed to serialize root signature: {}",
                message
            ))
            .into());
        }
        let signature = signature.ok_or_else(|| {
            GraphicsError::ResourceCreation("Root signature serialization produced no blob".to_string())
        })?;

        let root_signature: ID3D12RootSignature = device
            .CreateRootSignature(
                0,
                std::slice::from_raw_parts(signature.GetBufferPointer() as _, signature.GetBufferSize()),
            )
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create root signature: {}", e)))?;
        Ok(root_signature)
    }
}

fn fill_mode(mode: FillMode) -> D3D12_FILL_MODE {
    match mode {
        FillMode::Solid => D3D12_FILL_MODE_SOLID,
        FillMode::Wireframe => D3D12_FILL_MODE_WIREFRAME,
    }
}

fn cull_mode(mode: CullMode) -> D3D12_CULL_MODE {
    match mode {
        CullMode::None => D3D12_CULL_MODE_NONE,
        CullMode::Front => D3D12_CULL_MODE_FRONT,
        CullMode::Back => D3D12_CULL_MODE_BACK,
    }
}

fn comparison_func(func: ComparisonFunc) -> D3D12_COMPARISON_FUNC {
    match func {
        ComparisonFunc::Never => D3D12_COMPARISON_FUNC_NEVER,
        ComparisonFunc::Less => D3D12_COMPARISON_FUNC_LESS,
        ComparisonFunc::Equal => D3D12_COMPARISON_FUNC_EQUAL,
        ComparisonFunc::LessEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
        ComparisonFunc::Greater => D3D12_COMPARISON_FUNC_GREATER,
        ComparisonFunc::NotEqual => D3D12_COMPARISON_FUNC_NOT_EQUAL,
        ComparisonFunc::GreaterEqual => D3D12_COMPARISON_FUNC_GREATER_EQUAL,
        ComparisonFunc::Always => D3D12_COMPARISON_FUNC_ALWAYS,
    }
}

fn stencil_op(op: StencilOp) -> D3D12_STENCIL_OP {
    match op {
        StencilOp::Keep => D3D12_STENCIL_OP_KEEP,
        StencilOp::Zero => D3D12_STENCIL_OP_ZERO,
        StencilOp::Replace => D3D12_STENCIL_OP_REPLACE,
        StencilOp::IncrSat => D3D12_STENCIL_OP_INCR_SAT,
        StencilOp::DecrSat => D3D12_STENCIL_OP_DECR_SAT,
        StencilOp::Invert => D3D12_STENCIL_OP_INVERT,
        StencilOp::Incr => D3D12_STENCIL_OP_INCR,
        StencilOp::Decr => D3D12_STENCIL_OP_DECR,
    }
}

fn blend_factor(factor: BlendFactor) -> D3D12_BLEND {
    match factor {
        BlendFactor::Zero => D3D12_BLEND_ZERO,
        BlendFactor::One => D3D12_BLEND_ONE,
        BlendFactor::SrcAlpha => D3D12_BLEND_SRC_ALPHA,
        BlendFactor::InvSrcAlpha => D3D12_BLEND_INV_SRC_ALPHA,
    }
}

fn blend_op(op: BlendOp) -> D3D12_BLEND_OP {
    match op {
        BlendOp::Add => D3D12_BLEND_OP_ADD,
        BlendOp::Subtract => D3D12_BLEND_OP_SUBTRACT,
    }
}

fn rasterizer_desc(state: &RasterizerState) -> D3D12_RASTERIZER_DESC {
    D3D12_RASTERIZER_DESC {
        FillMode: fill_mode(state.fill_mode),
        CullMode: cull_mode(state.cull_mode),
        FrontCounterClockwise: state.front_counter_clockwise.into(),
        DepthClipEnable: true.into(),
        ..Default::default()
    }
}

fn blend_desc(state: &BlendState) -> D3D12_BLEND_DESC {
    let target = D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: state.enabled.into(),
        LogicOpEnable: false.into(),
        SrcBlend: blend_factor(state.src),
        DestBlend: blend_factor(state.dest),
        BlendOp: blend_op(state.op),
        SrcBlendAlpha: blend_factor(state.src_alpha),
        DestBlendAlpha: blend_factor(state.dest_alpha),
        BlendOpAlpha: blend_op(state.alpha_op),
        LogicOp: D3D12_LOGIC_OP_NOOP,
        RenderTargetWriteMask: state.write_mask,
    };

    let mut desc = D3D12_BLEND_DESC {
        AlphaToCoverageEnable: false.into(),
        IndependentBlendEnable: false.into(),
        ..Default::default()
    };
    desc.RenderTarget[0] = target;
    desc
}

fn stencil_face(face: &StencilFace) -> D3D12_DEPTH_STENCILOP_DESC {
    D3D12_DEPTH_STENCILOP_DESC {
        StencilFailOp: stencil_op(face.fail_op),
        StencilDepthFailOp: stencil_op(face.depth_fail_op),
        StencilPassOp: stencil_op(face.pass_op),
        StencilFunc: comparison_func(face.func),
    }
}

fn depth_stencil_desc(state: &DepthStencilState) -> D3D12_DEPTH_STENCIL_DESC {
    D3D12_DEPTH_STENCIL_DESC {
        DepthEnable: state.depth_enable.into(),
        DepthWriteMask: if state.depth_write {
            D3D12_DEPTH_WRITE_MASK_ALL
        } else {
            D3D12_DEPTH_WRITE_MASK_ZERO
        },
        DepthFunc: comparison_func(state.depth_func),
        StencilEnable: state.stencil_enable.into(),
        StencilReadMask: state.stencil_read_mask,
        StencilWriteMask: state.stencil_write_mask,
        FrontFace: stencil_face(&state.front_face),
        BackFace: stencil_face(&state.back_face),
    }
}

/// 按管线描述创建 PSO
pub fn create_pipeline_state(
    device: &ID3D12Device,
    root_signature: &ID3D12RootSignature,
    shaders: &ShaderSet,
    input_layout: &[D3D12_INPUT_ELEMENT_DESC],
    state: &PipelineState,
) -> Result<ID3D12PipelineState> {
    let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC::default();
    pso_desc.pRootSignature = ManuallyDrop::new(Some(root_signature.clone()));
    pso_desc.VS = bytecode(&shaders.vs);
    pso_desc.PS = bytecode(&shaders.ps);
    pso_desc.BlendState = blend_desc(&state.blend);
    pso_desc.RasterizerState = rasterizer_desc(&state.rasterizer);
    pso_desc.DepthStencilState = depth_stencil_desc(&state.depth_stencil);
    pso_desc.SampleMask = u32::MAX;
    pso_desc.InputLayout = D3D12_INPUT_LAYOUT_DESC {
        pInputElementDescs: input_layout.as_ptr(),
        NumElements: input_layout.len() as u32,
    };
    pso_desc.PrimitiveTopologyType = D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE;
    pso_desc.NumRenderTargets = 1;
    pso_desc.RTVFormats[0] = BACK_BUFFER_FORMAT;
    pso_desc.DSVFormat = DEPTH_STENCIL_FORMAT;
    pso_desc.SampleDesc.Count = 1;

    let result = unsafe { device.CreateGraphicsPipelineState(&pso_desc) };
    // 描述结构里的根签名引用需要手动释放
    drop(ManuallyDrop::into_inner(pso_desc.pRootSignature));

    result.map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create PSO: {}", e)).into())
}
