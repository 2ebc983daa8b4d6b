use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::display::instance::InstanceId;
use crate::foundation::core::{Rect, Rgba8};
use crate::render::device::GpuDevice;
use crate::render::error::RenderError;
use crate::render::renderer::{DrawShape, MeshKey, RenderOpts, Renderer};
use crate::render::shape_mesh::{DrawMode, ShapeMesh};
use crate::render::texture_cache::{HandleTextureCache, TextureCache, TextureCacheOpts};
use crate::render::vertex_pool::{VertexPool, VertexPoolOpts};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcceleratedStats {
    pub frames: u64,
    pub mesh_builds: u64,
    pub mesh_uploads: u64,
    pub draws: u64,
    pub failed_draws: u64,
    pub meshes_released: u64,
}

/// Caches one [`ShapeMesh`] per [`MeshKey`] and replays its batches through a [`GpuDevice`].
///
/// Stencil state is a nesting level: each completed mask write raises it by one and each
/// completed clear lowers it.
#[derive(Debug)]
pub struct AcceleratedRenderer<D: GpuDevice, T: TextureCache = HandleTextureCache> {
    device: D,
    textures: T,
    pool: VertexPool,
    meshes: HashMap<MeshKey, ShapeMesh>,
    opts: RenderOpts,
    mask_level: u32,
    mode: DrawMode,
    stats: AcceleratedStats,
}

impl<D: GpuDevice> AcceleratedRenderer<D, HandleTextureCache> {
    pub fn new(device: D, pool: VertexPoolOpts, opts: RenderOpts) -> Self {
        Self::with_textures(
            device,
            HandleTextureCache::new(TextureCacheOpts::default()),
            pool,
            opts,
        )
    }
}

impl<D: GpuDevice, T: TextureCache> AcceleratedRenderer<D, T> {
    pub fn with_textures(device: D, textures: T, pool: VertexPoolOpts, opts: RenderOpts) -> Self {
        Self {
            device,
            textures,
            pool: VertexPool::new(pool),
            meshes: HashMap::new(),
            opts,
            mask_level: 0,
            mode: DrawMode::Color,
            stats: AcceleratedStats::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn textures(&self) -> &T {
        &self.textures
    }

    pub fn pool(&self) -> &VertexPool {
        &self.pool
    }

    pub fn stats(&self) -> AcceleratedStats {
        self.stats
    }

    pub fn mask_level(&self) -> u32 {
        self.mask_level
    }

    pub fn mesh(&self, key: &MeshKey) -> Option<&ShapeMesh> {
        self.meshes.get(key)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Release every cached mesh and its vertex lease.
    pub fn clear_meshes(&mut self) {
        for (_, mut mesh) in self.meshes.drain() {
            mesh.destroy(&mut self.pool);
            self.stats.meshes_released += 1;
        }
    }

    /// Build or rebuild the mesh for `draw.key` and upload it if dirty.
    fn prepare(&mut self, draw: &DrawShape<'_>) -> Result<(), RenderError> {
        let tolerance = self.opts.curve_tolerance;
        let mesh = match self.meshes.entry(draw.key) {
            Entry::Occupied(slot) => {
                let mesh = slot.into_mut();
                if mesh.revision() != draw.revision {
                    mesh.retessellate(draw.shape, tolerance, draw.revision, &mut self.pool);
                    self.stats.mesh_builds += 1;
                }
                mesh
            }
            Entry::Vacant(slot) => {
                self.stats.mesh_builds += 1;
                slot.insert(ShapeMesh::create_tessellation(
                    draw.shape,
                    tolerance,
                    draw.revision,
                ))
            }
        };
        if mesh.update_renderable(&mut self.device, &mut self.pool, &mut self.textures)? {
            self.stats.mesh_uploads += 1;
        }
        Ok(())
    }
}

impl<D: GpuDevice, T: TextureCache> Renderer for AcceleratedRenderer<D, T> {
    fn begin_frame(&mut self, _background: Rgba8, _stage: Rect) {
        self.mask_level = 0;
        self.mode = DrawMode::Color;
        self.stats.frames += 1;
    }

    fn end_frame(&mut self) {
        if self.mask_level != 0 {
            tracing::warn!(level = self.mask_level, "unbalanced mask passes at end of frame");
            self.mask_level = 0;
        }
    }

    fn begin_mask_write(&mut self) {
        self.mode = DrawMode::MaskWrite;
    }

    fn end_mask_write(&mut self) {
        self.mask_level += 1;
        self.mode = DrawMode::Color;
    }

    fn begin_mask_clear(&mut self) {
        self.mode = DrawMode::MaskClear;
    }

    fn end_mask_clear(&mut self) {
        self.mask_level = self.mask_level.saturating_sub(1);
        self.mode = DrawMode::Color;
    }

    fn draw_shape(&mut self, draw: &DrawShape<'_>) -> Result<(), RenderError> {
        if let Err(err) = self.prepare(draw) {
            self.stats.failed_draws += 1;
            return Err(err);
        }
        let Some(mesh) = self.meshes.get(&draw.key) else {
            return Ok(());
        };
        self.device.set_stencil_test(self.mask_level);
        mesh.render(&mut self.device, draw.transform, draw.cxform, self.mode);
        self.stats.draws += 1;
        Ok(())
    }

    fn release_instance(&mut self, instance: InstanceId) {
        if let Some(mut mesh) = self.meshes.remove(&MeshKey::Instance(instance)) {
            mesh.destroy(&mut self.pool);
            self.stats.meshes_released += 1;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/accelerated.rs"]
mod tests;
