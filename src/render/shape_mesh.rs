use smallvec::SmallVec;

use crate::display::character::{FillStyle, ShapeDef};
use crate::display::cxform::ColorTransform;
use crate::foundation::core::{Affine, Rect, Rgba8};
use crate::render::device::{GpuDevice, Primitive, Program, Uniforms, Vertex};
use crate::render::error::RenderError;
use crate::render::tessellate::{StyleRef, Tessellation, tessellate};
use crate::render::texture_cache::{TextureBinding, TextureCache};
use crate::render::vertex_pool::{VertexPool, VertexRange};

/// Draw call over a contiguous run of uploaded vertices sharing one texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Batch {
    pub primitive: Primitive,
    pub texture: Option<TextureBinding>,
    /// Absolute offset into the device vertex buffer.
    pub offset: u32,
    pub count: u32,
}

/// How a mesh is being drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Color,
    MaskWrite,
    MaskClear,
}

/// Tessellated shape plus its lease on the shared vertex pool.
#[derive(Debug)]
pub struct ShapeMesh {
    tessellation: Tessellation,
    fill_styles: Vec<FillStyle>,
    line_colors: Vec<Rgba8>,
    lease: Option<VertexRange>,
    batches: SmallVec<[Batch; 4]>,
    dirty: bool,
    revision: u64,
}

impl ShapeMesh {
    pub fn create_tessellation(shape: &ShapeDef, tolerance: f64, revision: u64) -> Self {
        Self {
            tessellation: tessellate(shape, tolerance),
            fill_styles: shape.fill_styles.clone(),
            line_colors: shape.line_styles.iter().map(|l| l.color).collect(),
            lease: None,
            batches: SmallVec::new(),
            dirty: true,
            revision,
        }
    }

    /// Replace the geometry, returning the old lease to `pool`.
    pub fn retessellate(
        &mut self,
        shape: &ShapeDef,
        tolerance: f64,
        revision: u64,
        pool: &mut VertexPool,
    ) {
        self.destroy(pool);
        *self = Self::create_tessellation(shape, tolerance, revision);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tessellation(&self) -> &Tessellation {
        &self.tessellation
    }

    pub fn bounds(&self) -> Rect {
        self.tessellation.bounds
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn lease(&self) -> Option<VertexRange> {
        self.lease
    }

    /// Upload vertices and rebuild batches if dirty. Returns whether any work was done.
    ///
    /// Textures resolve once per fill style before the vertex range is leased, so a failure
    /// leaves the pool untouched and the mesh dirty.
    pub fn update_renderable(
        &mut self,
        device: &mut dyn GpuDevice,
        pool: &mut VertexPool,
        textures: &mut dyn TextureCache,
    ) -> Result<bool, RenderError> {
        if !self.dirty {
            return Ok(false);
        }
        let bindings = self
            .fill_styles
            .iter()
            .map(|s| textures.resolve(s))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(old) = self.lease.take() {
            pool.release(old);
        }
        self.batches.clear();
        let total = self.tessellation.vertex_count();
        let lease = u32::try_from(total)
            .ok()
            .and_then(|n| pool.acquire(n))
            .ok_or_else(|| RenderError::VertexPoolExhausted {
                requested: total,
                available: pool.largest_free() as usize,
            })?;

        let vertices = device.lock_vertices(lease.offset, lease.count);
        let mut cursor = 0usize;
        for group in &self.tessellation.groups {
            let (color, texture) = match group.style {
                StyleRef::Fill(i) => (
                    self.fill_styles
                        .get(i)
                        .map_or(Rgba8::WHITE, FillStyle::vertex_color),
                    bindings.get(i).copied().flatten(),
                ),
                StyleRef::Line(i) => (
                    self.line_colors.get(i).copied().unwrap_or(Rgba8::BLACK),
                    None,
                ),
            };
            let color = color.to_array();
            for (slot, p) in vertices[cursor..].iter_mut().zip(&group.points) {
                *slot = Vertex {
                    position: [p.x as f32, p.y as f32],
                    color,
                };
            }
            let offset = lease.offset + cursor as u32;
            let count = group.points.len() as u32;
            match self.batches.last_mut() {
                Some(last)
                    if last.primitive == group.primitive
                        && last.texture == texture
                        && last.offset + last.count == offset =>
                {
                    last.count += count;
                }
                _ => self.batches.push(Batch {
                    primitive: group.primitive,
                    texture,
                    offset,
                    count,
                }),
            }
            cursor += group.points.len();
        }
        device.unlock_vertices();

        self.lease = Some(lease);
        self.dirty = false;
        Ok(true)
    }

    /// One draw call per batch.
    pub fn render(
        &self,
        device: &mut dyn GpuDevice,
        transform: Affine,
        cxform: ColorTransform,
        mode: DrawMode,
    ) {
        for batch in &self.batches {
            let (program, texture) = match mode {
                DrawMode::MaskWrite => (Program::MaskIncrement, None),
                DrawMode::MaskClear => (Program::MaskDecrement, None),
                DrawMode::Color if batch.texture.is_some() => (Program::Textured, batch.texture),
                DrawMode::Color => (Program::Solid, None),
            };
            device.bind_program(program);
            device.bind_texture(texture.map(|t| t.texture));
            device.set_uniforms(&Uniforms {
                transform,
                cxform,
                tex_transform: texture.map_or(Affine::IDENTITY, |t| t.transform),
            });
            device.draw(batch.primitive, batch.offset, batch.count);
        }
    }

    /// Return the vertex lease. The mesh becomes dirty again.
    pub fn destroy(&mut self, pool: &mut VertexPool) {
        if let Some(lease) = self.lease.take() {
            pool.release(lease);
        }
        self.batches.clear();
        self.dirty = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/shape_mesh.rs"]
mod tests;
