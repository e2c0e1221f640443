//! 镜面场景
//!
//! 房间里有一面位于 z = 0 平面的镜子，地板在 y = 0 平面。
//! 可移动的物体会在镜中留下反射，并在地板上投下平面阴影：
//!
//! - 反射物体 = reflect(z = 0) · world
//! - 阴影物体 = translate(0, 0.001, 0) · shadow(y = 0, 指向主光源的方向) · world
//!
//! 反射渲染遍使用同一组光源经镜面反射后的方向，保证镜中光照一致。

use tracing::debug;
use winit::keyboard::KeyCode;

use crate::core::error::{DemoError, Result};
use crate::core::input::InputSystem;
use crate::core::timer::GameTimer;
use crate::geometry::{generator, MeshGeometry, SubmeshGeometry, Vertex};
use crate::math::{constants, matrix, Color, Matrix4, Vector3, Vector4};
use crate::renderer::constants::{gpu_matrix, Light, MaterialConstants, ObjectConstants, PassConstants};
use crate::renderer::frame::DirtyFrames;
use crate::renderer::pass::{PassSlot, RenderLayer};
use crate::renderer::upload::{MappedMemory, UploadBuffer};

use super::camera::{projection, OrbitCamera, FAR_Z, NEAR_Z};

/// 雾的颜色，同时用作清屏颜色
pub const FOG_COLOR: Color = Color::new(0.7, 0.7, 0.7, 1.0);
const FOG_START: f32 = 5.0;
const FOG_RANGE: f32 = 150.0;
const AMBIENT_LIGHT: [f32; 4] = [0.25, 0.25, 0.35, 1.0];

/// 镜子所在平面 z = 0
const MIRROR_PLANE: Vector4 = Vector4::new(0.0, 0.0, 1.0, 0.0);
/// 地板所在平面 y = 0
const SHADOW_PLANE: Vector4 = Vector4::new(0.0, 1.0, 0.0, 0.0);
/// 阴影抬高一点，避免与地板深度冲突
const SHADOW_OFFSET_Y: f32 = 0.001;

/// 物体移动速度（单位/秒）
const SUBJECT_SPEED: f32 = 1.75;
const SUBJECT_START: Vector3 = Vector3::new(0.0, 1.0, -5.0);
const SUBJECT_SCALE: f32 = 0.4;

/// 物体网格的细分程度
const SUBJECT_RADIUS: f32 = 2.0;
const SUBJECT_SLICES: u32 = 24;
const SUBJECT_STACKS: u32 = 16;

/// 场景中所有常量缓冲区的数量
pub const OBJECT_COUNT: usize = 6;
pub const MATERIAL_COUNT: usize = 5;

/// 渲染项使用的网格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshId {
    Room,
    Subject,
}

/// 材质
#[derive(Debug, Clone)]
pub struct Material {
    pub name: &'static str,
    /// 在材质常量缓冲区中的索引
    pub cb_index: usize,
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    pub transform: Matrix4,
    pub dirty: DirtyFrames,
}

impl Material {
    fn new(name: &'static str, cb_index: usize, albedo: Color, fresnel_r0: f32, roughness: f32) -> Self {
        Self {
            name,
            cb_index,
            diffuse_albedo: albedo.to_array(),
            fresnel_r0: [fresnel_r0; 3],
            roughness,
            transform: Matrix4::identity(),
            dirty: DirtyFrames::default(),
        }
    }

    pub fn constants(&self) -> MaterialConstants {
        MaterialConstants {
            diffuse_albedo: self.diffuse_albedo,
            fresnel_r0: self.fresnel_r0,
            roughness: self.roughness,
            mat_transform: gpu_matrix(&self.transform),
        }
    }
}

/// 一次绘制所需的全部信息
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub name: &'static str,
    pub world: Matrix4,
    pub tex_transform: Matrix4,
    /// 在物体常量缓冲区中的索引
    pub obj_cb_index: usize,
    /// 材质在 `MirrorScene::materials` 中的位置
    pub material: usize,
    pub mesh: MeshId,
    pub submesh: SubmeshGeometry,
    pub dirty: DirtyFrames,
}

impl RenderItem {
    pub fn constants(&self) -> ObjectConstants {
        ObjectConstants {
            world: gpu_matrix(&self.world),
            tex_transform: gpu_matrix(&self.tex_transform),
        }
    }
}

/// 本帧按下的移动键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveKeys {
    /// A/D 左右，W/S 上下
    pub fn from_input(input: &InputSystem) -> Self {
        Self {
            left: input.is_key_pressed(KeyCode::KeyA),
            right: input.is_key_pressed(KeyCode::KeyD),
            up: input.is_key_pressed(KeyCode::KeyW),
            down: input.is_key_pressed(KeyCode::KeyS),
        }
    }

    pub fn any(&self) -> bool {
        self.left || self.right || self.up || self.down
    }
}

#[derive(Debug)]
pub struct MirrorScene {
    pub camera: OrbitCamera,
    proj: Matrix4,
    frame_count: usize,

    room: MeshGeometry<Vertex>,
    subject_mesh: MeshGeometry<Vertex>,

    materials: Vec<Material>,
    items: Vec<RenderItem>,
    layers: [Vec<usize>; RenderLayer::COUNT],

    subject: usize,
    reflected_subject: usize,
    shadowed_subject: usize,
    subject_translation: Vector3,

    lights: [Light; 3],
    main_pass: PassConstants,
    reflected_pass: PassConstants,
}

impl MirrorScene {
    /// `frame_count` 为帧资源数量，决定脏标记的初值
    pub fn new(aspect: f32, frame_count: usize) -> Result<Self> {
        let room = generator::room();
        let subject_mesh = generator::sphere(SUBJECT_RADIUS, SUBJECT_SLICES, SUBJECT_STACKS)?;
        room.validate()?;
        subject_mesh.validate()?;

        let materials = build_materials(frame_count);
        let (items, layers) = build_render_items(&room, &subject_mesh, frame_count)?;

        let find = |name: &str| {
            items
                .iter()
                .position(|item| item.name == name)
                .ok_or_else(|| DemoError::Initialization(format!("missing render item '{}'", name)))
        };
        let subject = find("subject")?;
        let reflected_subject = find("reflectedSubject")?;
        let shadowed_subject = find("shadowedSubject")?;

        let mut scene = Self {
            camera: OrbitCamera::for_mirror_room(),
            proj: projection(aspect),
            frame_count,
            room,
            subject_mesh,
            materials,
            items,
            layers,
            subject,
            reflected_subject,
            shadowed_subject,
            subject_translation: SUBJECT_START,
            lights: [
                Light::directional([0.577_35, -0.577_35, 0.577_35], [0.6, 0.6, 0.6]),
                Light::directional([-0.577_35, -0.577_35, 0.577_35], [0.3, 0.3, 0.3]),
                Light::directional([0.0, -0.707, -0.707], [0.15, 0.15, 0.15]),
            ],
            main_pass: PassConstants::default(),
            reflected_pass: PassConstants::default(),
        };
        scene.update_subject_transforms();

        debug!(
            items = scene.items.len(),
            materials = scene.materials.len(),
            frames = frame_count,
            "mirror scene built"
        );
        Ok(scene)
    }

    pub fn room(&self) -> &MeshGeometry<Vertex> {
        &self.room
    }

    pub fn subject_mesh(&self) -> &MeshGeometry<Vertex> {
        &self.subject_mesh
    }

    pub fn mesh(&self, id: MeshId) -> &MeshGeometry<Vertex> {
        match id {
            MeshId::Room => &self.room,
            MeshId::Subject => &self.subject_mesh,
        }
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn item(&self, name: &str) -> Option<&RenderItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// 某一层的全部渲染项
    pub fn layer(&self, layer: RenderLayer) -> impl Iterator<Item = &RenderItem> {
        self.layers[layer.index()].iter().map(move |&i| &self.items[i])
    }

    pub fn subject_translation(&self) -> Vector3 {
        self.subject_translation
    }

    pub fn main_pass(&self) -> &PassConstants {
        &self.main_pass
    }

    pub fn reflected_pass(&self) -> &PassConstants {
        &self.reflected_pass
    }

    pub fn resize(&mut self, aspect: f32) {
        self.proj = projection(aspect);
    }

    /// 处理本帧的输入：拖动相机、移动物体
    pub fn handle_input(&mut self, input: &mut InputSystem, dt: f32) {
        while let Some(drag) = input.take_drag() {
            self.camera.apply_drag(drag);
        }

        let keys = MoveKeys::from_input(input);
        if keys.any() {
            self.move_subject(keys, dt);
        }
    }

    /// 移动物体，物体不会穿到地板下面
    pub fn move_subject(&mut self, keys: MoveKeys, dt: f32) {
        let step = SUBJECT_SPEED * dt;
        if keys.left {
            self.subject_translation.x -= step;
        }
        if keys.right {
            self.subject_translation.x += step;
        }
        if keys.up {
            self.subject_translation.y += step;
        }
        if keys.down {
            self.subject_translation.y -= step;
        }
        self.subject_translation.y = self.subject_translation.y.max(0.0);

        self.update_subject_transforms();
    }

    /// 重新计算物体、反射物体和阴影的世界矩阵
    fn update_subject_transforms(&mut self) {
        let t = self.subject_translation;
        let world = matrix::translation(t.x, t.y, t.z)
            * matrix::scaling(SUBJECT_SCALE, SUBJECT_SCALE, SUBJECT_SCALE)
            * matrix::rotation_y(constants::HALF_PI);

        let reflected = matrix::reflect(&MIRROR_PLANE) * world;

        let to_main_light = -Vector3::from(self.lights[0].direction);
        let shadow = matrix::translation(0.0, SHADOW_OFFSET_Y, 0.0)
            * matrix::shadow(&SHADOW_PLANE, &to_main_light.push(0.0))
            * world;

        let frame_count = self.frame_count;
        for (index, transform) in [
            (self.subject, world),
            (self.reflected_subject, reflected),
            (self.shadowed_subject, shadow),
        ] {
            let item = &mut self.items[index];
            item.world = transform;
            item.dirty.mark(frame_count);
        }
    }

    /// 把脏的物体常量写入当前帧资源，返回写入的数量
    pub fn update_object_constants<M: MappedMemory>(
        &mut self,
        buffer: &mut UploadBuffer<ObjectConstants, M>,
    ) -> Result<usize> {
        let mut written = 0;
        for item in &mut self.items {
            if item.dirty.consume() {
                buffer.copy_data(item.obj_cb_index, &item.constants())?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// 把脏的材质常量写入当前帧资源，返回写入的数量
    pub fn update_material_constants<M: MappedMemory>(
        &mut self,
        buffer: &mut UploadBuffer<MaterialConstants, M>,
    ) -> Result<usize> {
        let mut written = 0;
        for material in &mut self.materials {
            if material.dirty.consume() {
                buffer.copy_data(material.cb_index, &material.constants())?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// 计算主渲染遍和反射渲染遍的常量
    pub fn update_pass_constants(&mut self, client_size: (u32, u32), timer: &GameTimer) {
        let view = self.camera.view();
        let proj = self.proj;
        let view_proj = proj * view;

        let (width, height) = (client_size.0.max(1) as f32, client_size.1.max(1) as f32);

        let mut pass = PassConstants {
            view: gpu_matrix(&view),
            inv_view: gpu_matrix(&matrix::inverse_or_identity(&view)),
            proj: gpu_matrix(&proj),
            inv_proj: gpu_matrix(&matrix::inverse_or_identity(&proj)),
            view_proj: gpu_matrix(&view_proj),
            inv_view_proj: gpu_matrix(&matrix::inverse_or_identity(&view_proj)),
            eye_pos_w: self.camera.position().into(),
            render_target_size: [width, height],
            inv_render_target_size: [1.0 / width, 1.0 / height],
            near_z: NEAR_Z,
            far_z: FAR_Z,
            total_time: timer.total_time(),
            delta_time: timer.delta_time(),
            ambient_light: AMBIENT_LIGHT,
            fog_color: FOG_COLOR.to_array(),
            fog_start: FOG_START,
            fog_range: FOG_RANGE,
            ..PassConstants::default()
        };
        pass.lights[..self.lights.len()].copy_from_slice(&self.lights);
        self.main_pass = pass;

        // 反射遍：光源方向同样关于镜面反射
        let reflect = matrix::reflect(&MIRROR_PLANE);
        let mut reflected = pass;
        for (dst, src) in reflected.lights.iter_mut().zip(&self.lights) {
            let dir = matrix::transform_normal(&reflect, &Vector3::from(src.direction));
            dst.direction = dir.into();
        }
        self.reflected_pass = reflected;
    }

    /// 把两个渲染遍的常量写入当前帧资源
    pub fn write_pass_constants<M: MappedMemory>(
        &self,
        buffer: &mut UploadBuffer<PassConstants, M>,
    ) -> Result<()> {
        buffer.copy_data(PassSlot::Main.index(), &self.main_pass)?;
        buffer.copy_data(PassSlot::Reflected.index(), &self.reflected_pass)?;
        Ok(())
    }
}

fn build_materials(frame_count: usize) -> Vec<Material> {
    let mut materials = vec![
        Material::new("bricks", 0, Color::rgb(0.66, 0.33, 0.26), 0.05, 0.25),
        Material::new("checkertile", 1, Color::rgb(0.82, 0.82, 0.8), 0.07, 0.3),
        Material::new("icemirror", 2, Color::rgb(0.85, 0.92, 1.0).with_alpha(0.3), 0.1, 0.5),
        Material::new("subject", 3, Color::WHITE, 0.05, 0.3),
        Material::new("shadow", 4, Color::BLACK.with_alpha(0.5), 0.001, 0.0),
    ];
    for material in &mut materials {
        material.dirty.mark(frame_count);
    }
    materials
}

type Layers = [Vec<usize>; RenderLayer::COUNT];

fn build_render_items(
    room: &MeshGeometry<Vertex>,
    subject: &MeshGeometry<Vertex>,
    frame_count: usize,
) -> Result<(Vec<RenderItem>, Layers)> {
    let floor = room.submesh(generator::FLOOR_SUBMESH)?;
    let wall = room.submesh(generator::WALL_SUBMESH)?;
    let mirror = room.submesh(generator::MIRROR_SUBMESH)?;
    let sphere = subject.submesh(generator::SPHERE_SUBMESH)?;

    let item = |name, obj_cb_index, material, mesh, submesh| RenderItem {
        name,
        world: Matrix4::identity(),
        tex_transform: Matrix4::identity(),
        obj_cb_index,
        material,
        mesh,
        submesh,
        dirty: DirtyFrames::new(frame_count),
    };

    // 材质索引见 build_materials
    let items = vec![
        item("floor", 0, 1, MeshId::Room, floor),
        item("walls", 1, 0, MeshId::Room, wall),
        item("subject", 2, 3, MeshId::Subject, sphere),
        item("reflectedSubject", 3, 3, MeshId::Subject, sphere),
        item("shadowedSubject", 4, 4, MeshId::Subject, sphere),
        item("mirror", 5, 2, MeshId::Room, mirror),
    ];

    let mut layers: Layers = Default::default();
    layers[RenderLayer::Opaque.index()] = vec![0, 1, 2];
    layers[RenderLayer::Reflected.index()] = vec![3];
    layers[RenderLayer::Shadow.index()] = vec![4];
    // 镜子既要写模板，又要半透明地画出来
    layers[RenderLayer::Mirrors.index()] = vec![5];
    layers[RenderLayer::Transparent.index()] = vec![5];

    Ok((items, layers))
}
