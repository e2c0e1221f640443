/// 几何体模块
///
/// 顶点格式、CPU 侧网格数据和程序化生成器。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构及其输入布局
/// - `mesh`: 网格数据和命名子网格
/// - `generator`: 立方体、房间、球
///
/// # 数据流
///
/// ```text
/// generator (CPU 侧生成)
///     ↓
/// MeshGeometry<V>
///     ↓
/// 图形后端（上传到默认堆）
/// ```

pub mod vertex;
pub mod mesh;
pub mod generator;

// 重新导出常用类型
pub use vertex::{ColorVertex, Vertex, VertexLayout};
pub use mesh::{MeshGeometry, SubmeshGeometry};
