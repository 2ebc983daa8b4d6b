use super::*;
use crate::display::character::ShapeDef;
use crate::display::cxform::ColorTransform;
use crate::foundation::core::{Affine, BezPath, CharacterId};
use crate::render::device::{DeviceCall, Program, RecordingDevice};
use crate::vm::object::HostHandle;

fn renderer(capacity: u32) -> AcceleratedRenderer<RecordingDevice> {
    AcceleratedRenderer::new(
        RecordingDevice::new(),
        VertexPoolOpts {
            capacity_vertices: capacity,
        },
        RenderOpts::default(),
    )
}

fn square() -> ShapeDef {
    ShapeDef::filled(
        BezPath::from_svg("M0,0 L10,0 L10,10 L0,10 Z").unwrap(),
        Rgba8::BLACK,
    )
}

fn draw<'a>(key: MeshKey, revision: u64, shape: &'a ShapeDef) -> DrawShape<'a> {
    DrawShape {
        key,
        revision,
        shape,
        transform: Affine::IDENTITY,
        cxform: ColorTransform::IDENTITY,
    }
}

const KEY: MeshKey = MeshKey::Character {
    movie: 1,
    id: CharacterId(1),
};

#[test]
fn meshes_are_cached_per_key() {
    let mut r = renderer(1024);
    let shape = square();
    r.begin_frame(Rgba8::WHITE, Rect::new(0.0, 0.0, 100.0, 100.0));
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.end_frame();

    let stats = r.stats();
    assert_eq!(stats.mesh_builds, 1);
    assert_eq!(stats.mesh_uploads, 1);
    assert_eq!(stats.draws, 2);
    assert_eq!(r.mesh_count(), 1);
    assert_eq!(r.device().stats().draw_calls, 2);
}

#[test]
fn revision_change_rebuilds_in_place() {
    let mut r = renderer(1024);
    let shape = square();
    let key = MeshKey::Instance(InstanceId::from_host(HostHandle(0)));
    r.draw_shape(&draw(key, 1, &shape)).unwrap();
    let in_use = r.pool().stats().in_use;
    r.draw_shape(&draw(key, 2, &shape)).unwrap();
    assert_eq!(r.stats().mesh_builds, 2);
    assert_eq!(r.pool().stats().in_use, in_use);
    assert_eq!(r.mesh(&key).map(|m| m.revision()), Some(2));
}

#[test]
fn stencil_level_follows_mask_passes() {
    let mut r = renderer(1024);
    let shape = square();
    r.begin_frame(Rgba8::WHITE, Rect::ZERO);
    r.begin_mask_write();
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.end_mask_write();
    assert_eq!(r.mask_level(), 1);
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.begin_mask_clear();
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.end_mask_clear();
    assert_eq!(r.mask_level(), 0);

    let seen: Vec<_> = r
        .device()
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::StencilTest(l) => Some(*l),
            DeviceCall::Program(p) => Some(100 + *p as u32),
            _ => None,
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            0,
            100 + Program::MaskIncrement as u32,
            1,
            100 + Program::Solid as u32,
            1,
            100 + Program::MaskDecrement as u32,
        ]
    );
}

#[test]
fn failed_upload_is_counted_and_reported() {
    let mut r = renderer(4);
    let shape = square();
    let err = r.draw_shape(&draw(KEY, 0, &shape)).unwrap_err();
    assert!(matches!(err, RenderError::VertexPoolExhausted { .. }));
    assert_eq!(r.stats().failed_draws, 1);
    assert_eq!(r.device().stats().draw_calls, 0);
}

#[test]
fn releasing_an_instance_frees_its_mesh() {
    let mut r = renderer(1024);
    let shape = square();
    let id = InstanceId::from_host(HostHandle((1 << 32) | 3));
    r.draw_shape(&draw(MeshKey::Instance(id), 0, &shape))
        .unwrap();
    r.draw_shape(&draw(KEY, 0, &shape)).unwrap();
    r.release_instance(id);
    assert_eq!(r.mesh_count(), 1);
    assert_eq!(r.stats().meshes_released, 1);
    assert_eq!(r.pool().stats().in_use, 6);
}
