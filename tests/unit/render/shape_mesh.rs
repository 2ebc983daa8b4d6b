use super::*;
use crate::display::character::{GradientStop, LineStyle, ShapePath};
use crate::foundation::core::BezPath;
use crate::render::device::{DeviceCall, RecordingDevice};
use crate::render::texture_cache::{HandleTextureCache, TextureCacheOpts};
use crate::render::vertex_pool::VertexPoolOpts;

const TRIANGLE: &str = "M0,0 L10,0 L0,10 Z";

fn pool(capacity: u32) -> VertexPool {
    VertexPool::new(VertexPoolOpts {
        capacity_vertices: capacity,
    })
}

fn textures() -> HandleTextureCache {
    HandleTextureCache::new(TextureCacheOpts::default())
}

fn triangle(color: Rgba8) -> ShapeDef {
    ShapeDef::filled(BezPath::from_svg(TRIANGLE).unwrap(), color)
}

#[test]
fn filled_triangle_uploads_one_batch() {
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut tex = textures();
    let red = Rgba8::new(255, 0, 0, 255);
    let mut mesh = ShapeMesh::create_tessellation(&triangle(red), 0.25, 0);

    assert!(mesh.update_renderable(&mut device, &mut pool, &mut tex).unwrap());
    assert_eq!(
        mesh.batches(),
        &[Batch {
            primitive: Primitive::Triangles,
            texture: None,
            offset: 0,
            count: 3,
        }]
    );
    assert!(device.vertices(0, 3).iter().all(|v| v.color == [255, 0, 0, 255]));
    assert_eq!(pool.stats().in_use, 3);
}

#[test]
fn stroke_uploads_six_vertices() {
    let shape = ShapeDef {
        fill_styles: Vec::new(),
        line_styles: vec![LineStyle {
            width: 2.0,
            color: Rgba8::BLACK,
        }],
        paths: vec![ShapePath {
            fill: None,
            line: Some(0),
            path: BezPath::from_svg("M0,0 L10,0").unwrap(),
        }],
    };
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut mesh = ShapeMesh::create_tessellation(&shape, 0.25, 0);
    mesh.update_renderable(&mut device, &mut pool, &mut textures())
        .unwrap();
    assert_eq!(mesh.batches().len(), 1);
    assert_eq!(mesh.batches()[0].count, 6);
    assert_eq!(mesh.batches()[0].primitive, Primitive::Triangles);
}

#[test]
fn clean_mesh_does_not_reupload() {
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut tex = textures();
    let mut mesh = ShapeMesh::create_tessellation(&triangle(Rgba8::BLACK), 0.25, 0);
    assert!(mesh.update_renderable(&mut device, &mut pool, &mut tex).unwrap());
    assert!(!mesh.update_renderable(&mut device, &mut pool, &mut tex).unwrap());
    assert_eq!(pool.stats().allocations, 1);
    assert_eq!(device.stats().uploads, 1);
}

#[test]
fn texture_change_starts_a_new_batch() {
    let path = BezPath::from_svg(TRIANGLE).unwrap();
    let shape = ShapeDef {
        fill_styles: vec![
            FillStyle::Solid {
                color: Rgba8::BLACK,
            },
            FillStyle::LinearGradient {
                stops: vec![
                    GradientStop {
                        ratio: 0.0,
                        color: Rgba8::BLACK,
                    },
                    GradientStop {
                        ratio: 1.0,
                        color: Rgba8::WHITE,
                    },
                ],
                matrix: Affine::IDENTITY,
            },
        ],
        line_styles: Vec::new(),
        paths: vec![
            ShapePath {
                fill: Some(0),
                line: None,
                path: path.clone(),
            },
            ShapePath {
                fill: Some(1),
                line: None,
                path,
            },
        ],
    };
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut mesh = ShapeMesh::create_tessellation(&shape, 0.25, 0);
    mesh.update_renderable(&mut device, &mut pool, &mut textures())
        .unwrap();

    let batches = mesh.batches();
    assert_eq!(batches.len(), 2);
    assert!(batches[0].texture.is_none());
    assert!(batches[1].texture.is_some());
    assert_eq!(batches[1].offset, 3);
    // Textured fills modulate with white.
    assert_eq!(device.vertices(3, 1)[0].color, [255, 255, 255, 255]);

    device.take_calls();
    mesh.render(
        &mut device,
        Affine::IDENTITY,
        ColorTransform::IDENTITY,
        DrawMode::Color,
    );
    let programs: Vec<_> = device
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::Program(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(programs, vec![Program::Solid, Program::Textured]);
}

#[test]
fn mask_modes_select_stencil_programs() {
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut mesh = ShapeMesh::create_tessellation(&triangle(Rgba8::BLACK), 0.25, 0);
    mesh.update_renderable(&mut device, &mut pool, &mut textures())
        .unwrap();
    device.take_calls();

    mesh.render(
        &mut device,
        Affine::IDENTITY,
        ColorTransform::IDENTITY,
        DrawMode::MaskWrite,
    );
    mesh.render(
        &mut device,
        Affine::IDENTITY,
        ColorTransform::IDENTITY,
        DrawMode::MaskClear,
    );
    let calls = device.calls();
    assert!(calls.contains(&DeviceCall::Program(Program::MaskIncrement)));
    assert!(calls.contains(&DeviceCall::Program(Program::MaskDecrement)));
    assert!(!calls.contains(&DeviceCall::Program(Program::Solid)));
}

#[test]
fn exhausted_pool_reports_request_and_keeps_mesh_dirty() {
    let mut device = RecordingDevice::new();
    let mut pool = pool(2);
    let mut mesh = ShapeMesh::create_tessellation(&triangle(Rgba8::BLACK), 0.25, 0);
    let err = mesh
        .update_renderable(&mut device, &mut pool, &mut textures())
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::VertexPoolExhausted {
            requested: 3,
            available: 2,
        }
    );
    assert!(mesh.is_dirty());
    assert!(mesh.batches().is_empty());
}

#[test]
fn destroy_returns_the_lease() {
    let mut device = RecordingDevice::new();
    let mut pool = pool(64);
    let mut mesh = ShapeMesh::create_tessellation(&triangle(Rgba8::BLACK), 0.25, 0);
    mesh.update_renderable(&mut device, &mut pool, &mut textures())
        .unwrap();
    mesh.destroy(&mut pool);
    assert_eq!(pool.available(), 64);
    assert!(mesh.lease().is_none());
    assert!(mesh.is_dirty());
}
