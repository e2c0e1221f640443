/// Build script for d3d_demos
///
/// HLSL shaders are compiled at runtime via D3DCompile; this only makes
/// cargo rebuild when they change.
fn main() {
    println!("cargo:rerun-if-changed=src/gfx/dx12/shaders/color.hlsl");
    println!("cargo:rerun-if-changed=src/gfx/dx12/shaders/default.hlsl");
}
