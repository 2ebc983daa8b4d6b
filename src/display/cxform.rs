use crate::foundation::core::Rgba8;
use crate::foundation::math::clamp_unit;

/// Per-channel color adjustment: `out = in * mult + add`, channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorTransform {
    /// Multipliers for `[r, g, b, a]`.
    pub mult: [f32; 4],
    /// Additive terms for `[r, g, b, a]`.
    pub add: [f32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorTransform {
    pub const IDENTITY: Self = Self {
        mult: [1.0; 4],
        add: [0.0; 4],
    };

    /// Multiply-only transform that tints white to `color`.
    pub fn tint(color: Rgba8) -> Self {
        Self {
            mult: color.to_unit(),
            add: [0.0; 4],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose `self` (outer) with `inner`: `self(inner(c))`.
    ///
    /// Multipliers are clamped to `0..=1` and additive terms to `-1..=1` after composition.
    pub fn concat(&self, inner: &ColorTransform) -> ColorTransform {
        let mut out = ColorTransform::IDENTITY;
        for i in 0..4 {
            out.mult[i] = clamp_unit(self.mult[i] * inner.mult[i]);
            let add = inner.add[i] * self.mult[i] + self.add[i];
            out.add[i] = if add.is_nan() { 0.0 } else { add.clamp(-1.0, 1.0) };
        }
        out
    }

    /// Apply to a normalized color, clamping each channel.
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = clamp_unit(rgba[i] * self.mult[i] + self.add[i]);
        }
        out
    }

    pub fn apply_rgba8(&self, color: Rgba8) -> Rgba8 {
        let [r, g, b, a] = self.apply(color.to_unit());
        let q = |v: f32| (v * 255.0).round() as u8;
        Rgba8::new(q(r), q(g), q(b), q(a))
    }

    /// Alpha of an opaque pixel after this transform.
    pub fn alpha(&self) -> f32 {
        clamp_unit(self.mult[3] + self.add[3])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/cxform.rs"]
mod tests;
