pub use kurbo::{Affine, BezPath, PathEl, Point, Rect, Vec2};

/// Small integer key of a character definition inside one movie's dictionary.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct CharacterId(pub u16);

/// Z-order slot inside one container. Higher depths draw on top.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Depth(pub i32);

impl Depth {
    /// Depth following `self`, saturating at `i32::MAX`.
    pub fn next(self) -> Self {
        Depth(self.0.saturating_add(1))
    }
}

/// 0-based index into a timeline's frame list.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

/// Straight-alpha RGBA8 color as stored in movie descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Normalized `[r, g, b, a]` in `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Component-wise linear interpolation, used by morph shapes.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        fn mix(a: u8, b: u8, t: f64) -> u8 {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        }
        Self {
            r: mix(self.r, other.r, t),
            g: mix(self.g, other.g, t),
            b: mix(self.b, other.b, t),
            a: mix(self.a, other.a, t),
        }
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Interpolate two affine transforms coefficient-wise.
pub fn lerp_affine(a: Affine, b: Affine, t: f64) -> Affine {
    let ca = a.as_coeffs();
    let cb = b.as_coeffs();
    let mut out = [0.0; 6];
    for i in 0..6 {
        out[i] = ca[i] + (cb[i] - ca[i]) * t;
    }
    Affine::new(out)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
