use std::cell::OnceCell;
use std::rc::Rc;

use kurbo::Shape as _;

use crate::display::cxform::ColorTransform;
use crate::display::movie::Frame;
use crate::foundation::core::{
    Affine, BezPath, CharacterId, Depth, PathEl, Rect, Rgba8, lerp_affine,
};
use crate::vm::bytecode::CodeImage;

/// Immutable template shared by every instance placed from it.
///
/// Closed set of kinds; consumers `match` instead of dispatching dynamically.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum CharacterDef {
    Shape(ShapeDef),
    MorphShape(MorphShapeDef),
    Font(FontDef),
    StaticText(StaticTextDef),
    EditText(EditTextDef),
    Button(ButtonDef),
    Sprite(SpriteDef),
    Bitmap(BitmapDef),
}

impl CharacterDef {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Shape(_) => "shape",
            Self::MorphShape(_) => "morph_shape",
            Self::Font(_) => "font",
            Self::StaticText(_) => "static_text",
            Self::EditText(_) => "edit_text",
            Self::Button(_) => "button",
            Self::Sprite(_) => "sprite",
            Self::Bitmap(_) => "bitmap",
        }
    }

    /// Whether the kind can occupy a display list layer.
    pub fn is_placeable(&self) -> bool {
        !matches!(self, Self::Font(_) | Self::Bitmap(_))
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, `0.0..=1.0`.
    pub ratio: f64,
    pub color: Rgba8,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FillStyle {
    Solid {
        color: Rgba8,
    },
    LinearGradient {
        stops: Vec<GradientStop>,
        #[serde(default)]
        matrix: Affine,
    },
    RadialGradient {
        stops: Vec<GradientStop>,
        #[serde(default)]
        matrix: Affine,
    },
    Bitmap {
        bitmap: CharacterId,
        #[serde(default)]
        matrix: Affine,
        #[serde(default)]
        smoothed: bool,
    },
}

impl FillStyle {
    /// Color written into vertices; textured styles use white and sample the texture.
    pub fn vertex_color(&self) -> Rgba8 {
        match self {
            Self::Solid { color } => *color,
            _ => Rgba8::WHITE,
        }
    }

    pub fn is_textured(&self) -> bool {
        !matches!(self, Self::Solid { .. })
    }

    fn lerp(&self, other: &FillStyle, t: f64) -> FillStyle {
        match (self, other) {
            (Self::Solid { color: a }, Self::Solid { color: b }) => Self::Solid {
                color: a.lerp(*b, t),
            },
            (
                Self::LinearGradient { stops: sa, matrix: ma },
                Self::LinearGradient { stops: sb, matrix: mb },
            ) if sa.len() == sb.len() => Self::LinearGradient {
                stops: lerp_stops(sa, sb, t),
                matrix: lerp_affine(*ma, *mb, t),
            },
            (
                Self::RadialGradient { stops: sa, matrix: ma },
                Self::RadialGradient { stops: sb, matrix: mb },
            ) if sa.len() == sb.len() => Self::RadialGradient {
                stops: lerp_stops(sa, sb, t),
                matrix: lerp_affine(*ma, *mb, t),
            },
            _ if t < 0.5 => self.clone(),
            _ => other.clone(),
        }
    }
}

fn lerp_stops(a: &[GradientStop], b: &[GradientStop], t: f64) -> Vec<GradientStop> {
    a.iter()
        .zip(b)
        .map(|(sa, sb)| GradientStop {
            ratio: sa.ratio + (sb.ratio - sa.ratio) * t,
            color: sa.color.lerp(sb.color, t),
        })
        .collect()
}

/// Stroke style. A zero width is a one-pixel hairline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineStyle {
    #[serde(default)]
    pub width: f64,
    pub color: Rgba8,
}

/// One outline with the fill and stroke styles applied to it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapePath {
    /// Index into [`ShapeDef::fill_styles`].
    #[serde(default)]
    pub fill: Option<usize>,
    /// Index into [`ShapeDef::line_styles`].
    #[serde(default)]
    pub line: Option<usize>,
    /// Outline as SVG path data in local units.
    #[serde(with = "svg_path")]
    pub path: BezPath,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeDef {
    #[serde(default)]
    pub fill_styles: Vec<FillStyle>,
    #[serde(default)]
    pub line_styles: Vec<LineStyle>,
    pub paths: Vec<ShapePath>,
}

impl ShapeDef {
    /// Single solid-filled outline.
    pub fn filled(path: BezPath, color: Rgba8) -> Self {
        Self {
            fill_styles: vec![FillStyle::Solid { color }],
            line_styles: Vec::new(),
            paths: vec![ShapePath {
                fill: Some(0),
                line: None,
                path,
            }],
        }
    }

    /// Local bounds including half the widest stroke on stroked paths.
    pub fn bounds(&self) -> Rect {
        let mut out: Option<Rect> = None;
        for p in &self.paths {
            if p.path.elements().is_empty() {
                continue;
            }
            let mut r = p.path.bounding_box();
            if let Some(ls) = p.line.and_then(|i| self.line_styles.get(i)) {
                r = r.inflate(ls.width / 2.0, ls.width / 2.0);
            }
            out = Some(out.map_or(r, |o| o.union(r)));
        }
        out.unwrap_or(Rect::ZERO)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, p) in self.paths.iter().enumerate() {
            if let Some(f) = p.fill
                && f >= self.fill_styles.len()
            {
                return Err(format!("path {i} references missing fill style {f}"));
            }
            if let Some(l) = p.line
                && l >= self.line_styles.len()
            {
                return Err(format!("path {i} references missing line style {l}"));
            }
        }
        Ok(())
    }

    pub(crate) fn bitmap_refs(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.fill_styles.iter().filter_map(|f| match f {
            FillStyle::Bitmap { bitmap, .. } => Some(*bitmap),
            _ => None,
        })
    }
}

/// Shape interpolated between two outlines by a placement ratio.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MorphShapeDef {
    pub start: ShapeDef,
    pub end: ShapeDef,
}

impl MorphShapeDef {
    /// Blend start and end at `ratio` (clamped to `0..=1`).
    ///
    /// Paths and styles are blended pairwise. Where the two sides disagree structurally the
    /// nearer side is used unchanged.
    pub fn interpolate(&self, ratio: f64) -> ShapeDef {
        let t = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        if t == 0.0 {
            return self.start.clone();
        }
        if t == 1.0 {
            return self.end.clone();
        }
        let fill_styles = blend_list(&self.start.fill_styles, &self.end.fill_styles, t, |a, b| {
            a.lerp(b, t)
        });
        let line_styles = blend_list(&self.start.line_styles, &self.end.line_styles, t, |a, b| {
            LineStyle {
                width: a.width + (b.width - a.width) * t,
                color: a.color.lerp(b.color, t),
            }
        });
        let paths = blend_list(&self.start.paths, &self.end.paths, t, |a, b| ShapePath {
            fill: a.fill,
            line: a.line,
            path: lerp_path(&a.path, &b.path, t),
        });
        ShapeDef {
            fill_styles,
            line_styles,
            paths,
        }
    }
}

fn blend_list<T: Clone>(a: &[T], b: &[T], t: f64, f: impl Fn(&T, &T) -> T) -> Vec<T> {
    if a.len() != b.len() {
        return if t < 0.5 { a.to_vec() } else { b.to_vec() };
    }
    a.iter().zip(b).map(|(x, y)| f(x, y)).collect()
}

fn lerp_path(a: &BezPath, b: &BezPath, t: f64) -> BezPath {
    let (ea, eb) = (a.elements(), b.elements());
    if ea.len() != eb.len() {
        return if t < 0.5 { a.clone() } else { b.clone() };
    }
    let mut out = BezPath::new();
    for (x, y) in ea.iter().zip(eb) {
        let el = match (*x, *y) {
            (PathEl::MoveTo(p), PathEl::MoveTo(q)) => PathEl::MoveTo(p.lerp(q, t)),
            (PathEl::LineTo(p), PathEl::LineTo(q)) => PathEl::LineTo(p.lerp(q, t)),
            (PathEl::QuadTo(p1, p2), PathEl::QuadTo(q1, q2)) => {
                PathEl::QuadTo(p1.lerp(q1, t), p2.lerp(q2, t))
            }
            (PathEl::CurveTo(p1, p2, p3), PathEl::CurveTo(q1, q2, q3)) => {
                PathEl::CurveTo(p1.lerp(q1, t), p2.lerp(q2, t), p3.lerp(q3, t))
            }
            (PathEl::ClosePath, PathEl::ClosePath) => PathEl::ClosePath,
            _ if t < 0.5 => *x,
            _ => *y,
        };
        out.push(el);
    }
    out
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Glyph {
    /// Outline in em units, baseline at `y = 0`.
    #[serde(with = "svg_path")]
    pub outline: BezPath,
    pub advance: f64,
    /// Character this glyph renders, for dynamic text.
    #[serde(default)]
    pub code: Option<char>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FontDef {
    #[serde(default = "default_em_size")]
    pub em_size: f64,
    #[serde(default)]
    pub ascent: f64,
    #[serde(default)]
    pub descent: f64,
    #[serde(default)]
    pub leading: f64,
    pub glyphs: Vec<Glyph>,
    #[serde(skip)]
    shapes: OnceCell<Vec<ShapeDef>>,
}

fn default_em_size() -> f64 {
    1024.0
}

impl FontDef {
    pub fn new(em_size: f64, glyphs: Vec<Glyph>) -> Self {
        Self {
            em_size,
            ascent: em_size * 0.8,
            descent: em_size * 0.2,
            leading: 0.0,
            glyphs,
            shapes: OnceCell::new(),
        }
    }

    pub fn glyph_for(&self, ch: char) -> Option<u16> {
        self.glyphs
            .iter()
            .position(|g| g.code == Some(ch))
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Advance in em units; unknown glyphs advance by zero.
    pub fn advance(&self, glyph: u16) -> f64 {
        self.glyphs
            .get(usize::from(glyph))
            .map_or(0.0, |g| g.advance)
    }

    /// White-filled shape for a glyph, built on first use.
    pub fn glyph_shape(&self, glyph: u16) -> Option<&ShapeDef> {
        self.shapes
            .get_or_init(|| {
                self.glyphs
                    .iter()
                    .map(|g| ShapeDef::filled(g.outline.clone(), Rgba8::WHITE))
                    .collect()
            })
            .get(usize::from(glyph))
    }

    /// Scale from em units to a text height.
    pub fn scale_for(&self, height: f64) -> f64 {
        if self.em_size > 0.0 {
            height / self.em_size
        } else {
            0.0
        }
    }
}

/// Run of glyphs from one font at one size and color.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextRecord {
    pub font: CharacterId,
    pub height: f64,
    #[serde(default = "default_text_color")]
    pub color: Rgba8,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub glyphs: Vec<u16>,
}

fn default_text_color() -> Rgba8 {
    Rgba8::BLACK
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StaticTextDef {
    pub bounds: Rect,
    #[serde(default)]
    pub matrix: Affine,
    pub records: Vec<TextRecord>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditTextDef {
    pub bounds: Rect,
    pub font: CharacterId,
    pub height: f64,
    #[serde(default = "default_text_color")]
    pub color: Rgba8,
    #[serde(default)]
    pub initial_text: String,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub word_wrap: bool,
    /// Extra space between lines, in text units.
    #[serde(default)]
    pub leading: f64,
    /// Script variable mirrored into the field each frame.
    #[serde(default)]
    pub variable: Option<String>,
}

/// Bitmask of button states a record is visible in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ButtonStates(pub u8);

impl ButtonStates {
    pub const UP: Self = Self(1);
    pub const OVER: Self = Self(2);
    pub const DOWN: Self = Self(4);
    pub const HIT: Self = Self(8);

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for ButtonStates {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ButtonRecord {
    pub states: ButtonStates,
    pub character: CharacterId,
    pub depth: Depth,
    #[serde(default)]
    pub matrix: Affine,
    #[serde(default)]
    pub cxform: ColorTransform,
    #[serde(default)]
    pub clip_depth: Option<Depth>,
}

/// State transition a button action can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ButtonEvent {
    RollOver,
    RollOut,
    Press,
    Release,
    ReleaseOutside,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ButtonAction {
    pub on: Vec<ButtonEvent>,
    pub script: Rc<CodeImage>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ButtonDef {
    pub records: Vec<ButtonRecord>,
    #[serde(default)]
    pub actions: Vec<ButtonAction>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SpriteDef {
    pub frames: Vec<Frame>,
}

/// Bitmap metadata; pixel data lives with the texture cache.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BitmapDef {
    pub width: u32,
    pub height: u32,
}

/// Serde adapter storing a [`BezPath`] as SVG path data.
pub(crate) mod svg_path {
    use kurbo::BezPath;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(path: &BezPath, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&path.to_svg())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BezPath, D::Error> {
        let data = String::deserialize(d)?;
        BezPath::from_svg(&data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/character.rs"]
mod tests;
