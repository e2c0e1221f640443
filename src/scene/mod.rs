//! 场景模块
//!
//! 两个示例的 CPU 侧状态：相机、物体、材质和每帧的常量数据。
//! 这里不涉及任何图形 API 调用。

pub mod camera;
pub mod box_scene;
pub mod mirror_scene;

pub use box_scene::BoxScene;
pub use camera::OrbitCamera;
pub use mirror_scene::{MirrorScene, RenderItem};
