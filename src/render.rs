//! Movie renderer and the accelerated shape renderer behind it.
//!
//! [`MovieRenderer`] walks display lists and drives any [`Renderer`]; [`AcceleratedRenderer`]
//! turns shapes into pooled vertex batches for a [`GpuDevice`].

pub mod accelerated;
pub mod device;
pub mod error;
pub mod movie_renderer;
pub mod renderer;
pub mod shape_mesh;
pub mod tessellate;
pub mod texture_cache;
pub mod vertex_pool;

pub use accelerated::{AcceleratedRenderer, AcceleratedStats};
pub use device::{
    DeviceCall, DeviceStats, GpuDevice, Primitive, Program, RecordingDevice, TextureHandle,
    Uniforms, Vertex,
};
pub use error::RenderError;
pub use movie_renderer::{GlyphPlacement, MovieRenderer, RenderStats, layout_edit_text};
pub use renderer::{DrawShape, MeshKey, RenderOpts, Renderer};
pub use shape_mesh::{Batch, DrawMode, ShapeMesh};
pub use tessellate::{StyleGeometry, StyleRef, Tessellation, tessellate};
pub use texture_cache::{
    HandleTextureCache, TextureBinding, TextureCache, TextureCacheOpts, TextureCacheStats,
};
pub use vertex_pool::{VertexPool, VertexPoolOpts, VertexPoolStats, VertexRange};
