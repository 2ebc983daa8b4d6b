use crate::display::cxform::ColorTransform;
use crate::foundation::core::Affine;

/// Interleaved position and straight-alpha color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [u8; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Shader variant selected per draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    Solid,
    Textured,
    /// Stencil-only: increments coverage while writing a mask.
    MaskIncrement,
    /// Stencil-only: decrements coverage while clearing a mask.
    MaskDecrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Per-draw constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uniforms {
    pub transform: Affine,
    pub cxform: ColorTransform,
    /// Maps shape space into texture space for textured programs.
    pub tex_transform: Affine,
}

/// Abstract GPU capability. The renderer only batches against this; it makes no hardware calls.
pub trait GpuDevice {
    /// Map `count` vertices at `offset` for writing. Must be paired with `unlock_vertices`.
    fn lock_vertices(&mut self, offset: u32, count: u32) -> &mut [Vertex];

    fn unlock_vertices(&mut self);

    fn bind_program(&mut self, program: Program);

    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    fn set_uniforms(&mut self, uniforms: &Uniforms);

    /// Only pixels whose stencil value equals `level` pass; 0 disables the test.
    fn set_stencil_test(&mut self, level: u32);

    fn draw(&mut self, primitive: Primitive, offset: u32, count: u32);
}

/// One call observed by a [`RecordingDevice`].
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCall {
    Upload { offset: u32, count: u32 },
    Program(Program),
    Texture(Option<TextureHandle>),
    Uniforms(Uniforms),
    StencilTest(u32),
    Draw {
        primitive: Primitive,
        offset: u32,
        count: u32,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub uploads: u64,
    pub draw_calls: u64,
    pub vertices_drawn: u64,
}

/// Headless device that keeps the vertex buffer in memory and logs every call.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    vertices: Vec<Vertex>,
    calls: Vec<DeviceCall>,
    stats: DeviceStats,
    record: bool,
}

impl RecordingDevice {
    /// Device that logs calls as well as counting them.
    pub fn new() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Device that only counts, for long headless runs.
    pub fn counting() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn vertices(&self, offset: u32, count: u32) -> &[Vertex] {
        let start = (offset as usize).min(self.vertices.len());
        let end = (offset as usize + count as usize).min(self.vertices.len());
        &self.vertices[start..end]
    }

    fn log(&mut self, call: DeviceCall) {
        if self.record {
            self.calls.push(call);
        }
    }
}

impl GpuDevice for RecordingDevice {
    fn lock_vertices(&mut self, offset: u32, count: u32) -> &mut [Vertex] {
        let end = offset as usize + count as usize;
        if self.vertices.len() < end {
            self.vertices.resize(end, Vertex::default());
        }
        self.stats.uploads += 1;
        self.log(DeviceCall::Upload { offset, count });
        &mut self.vertices[offset as usize..end]
    }

    fn unlock_vertices(&mut self) {}

    fn bind_program(&mut self, program: Program) {
        self.log(DeviceCall::Program(program));
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.log(DeviceCall::Texture(texture));
    }

    fn set_uniforms(&mut self, uniforms: &Uniforms) {
        self.log(DeviceCall::Uniforms(*uniforms));
    }

    fn set_stencil_test(&mut self, level: u32) {
        self.log(DeviceCall::StencilTest(level));
    }

    fn draw(&mut self, primitive: Primitive, offset: u32, count: u32) {
        self.stats.draw_calls += 1;
        self.stats.vertices_drawn += u64::from(count);
        self.log(DeviceCall::Draw {
            primitive,
            offset,
            count,
        });
    }
}
