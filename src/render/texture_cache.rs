use std::collections::HashMap;

use crate::display::character::FillStyle;
use crate::foundation::core::{Affine, CharacterId};
use crate::render::device::TextureHandle;
use crate::render::error::RenderError;

/// Texture plus the transform from shape space into its `0..1` texture space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureBinding {
    pub texture: TextureHandle,
    pub transform: Affine,
}

/// Resolves gradient and bitmap fills to textures.
pub trait TextureCache {
    /// `Ok(None)` for solid fills.
    fn resolve(&mut self, style: &FillStyle) -> Result<Option<TextureBinding>, RenderError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextureCacheOpts {
    pub max_textures: usize,
}

impl Default for TextureCacheOpts {
    fn default() -> Self {
        Self { max_textures: 1024 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub rejected: u64,
}

/// Content identity of a texture. Placement matrices are excluded so fills that share a
/// gradient ramp share the texture.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TextureKey {
    Gradient { radial: bool, ramp: String },
    Bitmap(CharacterId),
}

/// Memoizing handle allocator. Texel upload belongs to the device embedding.
#[derive(Debug, Default)]
pub struct HandleTextureCache {
    opts: TextureCacheOpts,
    handles: HashMap<TextureKey, TextureHandle>,
    stats: TextureCacheStats,
}

impl HandleTextureCache {
    pub fn new(opts: TextureCacheOpts) -> Self {
        Self {
            opts,
            handles: HashMap::new(),
            stats: TextureCacheStats::default(),
        }
    }

    pub fn stats(&self) -> TextureCacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn handle_for(&mut self, key: TextureKey) -> Result<TextureHandle, RenderError> {
        if let Some(h) = self.handles.get(&key) {
            self.stats.hits += 1;
            return Ok(*h);
        }
        if self.handles.len() >= self.opts.max_textures {
            self.stats.rejected += 1;
            return Err(RenderError::TextureUnavailable(format!(
                "cache full ({} textures)",
                self.opts.max_textures
            )));
        }
        self.stats.misses += 1;
        let h = TextureHandle(self.handles.len() as u32 + 1);
        self.handles.insert(key, h);
        Ok(h)
    }
}

impl TextureCache for HandleTextureCache {
    fn resolve(&mut self, style: &FillStyle) -> Result<Option<TextureBinding>, RenderError> {
        let (key, matrix) = match style {
            FillStyle::Solid { .. } => return Ok(None),
            FillStyle::LinearGradient { stops, matrix } => (
                TextureKey::Gradient {
                    radial: false,
                    ramp: serde_json::to_string(stops)
                        .map_err(|e| RenderError::TextureUnavailable(e.to_string()))?,
                },
                *matrix,
            ),
            FillStyle::RadialGradient { stops, matrix } => (
                TextureKey::Gradient {
                    radial: true,
                    ramp: serde_json::to_string(stops)
                        .map_err(|e| RenderError::TextureUnavailable(e.to_string()))?,
                },
                *matrix,
            ),
            FillStyle::Bitmap { bitmap, matrix, .. } => (TextureKey::Bitmap(*bitmap), *matrix),
        };
        if matrix.determinant() == 0.0 {
            return Err(RenderError::TextureUnavailable(
                "fill matrix is not invertible".into(),
            ));
        }
        let texture = self.handle_for(key)?;
        Ok(Some(TextureBinding {
            texture,
            transform: matrix.inverse(),
        }))
    }
}
