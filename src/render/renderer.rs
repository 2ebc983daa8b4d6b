use crate::display::character::ShapeDef;
use crate::display::cxform::ColorTransform;
use crate::display::instance::InstanceId;
use crate::foundation::core::{Affine, CharacterId, Rect, Rgba8};
use crate::render::error::RenderError;

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    /// Maximum distance between a curve and its flattened polyline, in local units.
    pub curve_tolerance: f64,
    /// Layers whose composed alpha is below this are skipped.
    pub alpha_epsilon: f32,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            curve_tolerance: 0.25,
            alpha_epsilon: 1.0 / 512.0,
        }
    }
}

/// Identity of cached geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKey {
    /// A shape definition; `movie` is the address of the owning movie.
    Character { movie: usize, id: CharacterId },
    Glyph {
        movie: usize,
        font: CharacterId,
        glyph: u16,
    },
    /// Per-instance geometry, such as an interpolated morph.
    Instance(InstanceId),
}

/// One shape draw request.
#[derive(Clone, Copy, Debug)]
pub struct DrawShape<'a> {
    pub key: MeshKey,
    /// Geometry under `key` is rebuilt when this changes.
    pub revision: u64,
    pub shape: &'a ShapeDef,
    pub transform: Affine,
    pub cxform: ColorTransform,
}

/// Capability the movie renderer drives.
///
/// Mask passes bracket geometry: write passes add the drawn coverage to the stencil, and
/// draws between `end_mask_write` and `begin_mask_clear` only land inside it.
pub trait Renderer {
    fn begin_frame(&mut self, _background: Rgba8, _stage: Rect) {}

    fn end_frame(&mut self) {}

    fn begin_mask_write(&mut self);

    fn end_mask_write(&mut self);

    fn begin_mask_clear(&mut self);

    fn end_mask_clear(&mut self);

    fn draw_shape(&mut self, draw: &DrawShape<'_>) -> Result<(), RenderError>;

    /// Drop any per-instance state held for `instance`.
    fn release_instance(&mut self, _instance: InstanceId) {}
}
