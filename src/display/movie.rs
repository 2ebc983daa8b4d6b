use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::display::character::{CharacterDef, ShapeDef};
use crate::display::cxform::ColorTransform;
use crate::foundation::core::{Affine, CharacterId, Depth, Rect, Rgba8};
use crate::foundation::error::{MarqueeError, MarqueeResult};
use crate::vm::bytecode::CodeImage;

/// Clip event bound to a script on a placed instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ClipEvent {
    Init,
    Load,
    Unload,
    EnterFrame,
    MouseDown,
    MouseUp,
    MouseMove,
    KeyDown,
    KeyUp,
    Press,
    Release,
    RollOver,
    RollOut,
}

impl ClipEvent {
    pub fn mask(self) -> EventMask {
        EventMask(1 << self as u32)
    }
}

/// Set of [`ClipEvent`]s as bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventMask(pub u32);

impl EventMask {
    pub const NONE: Self = Self(0);

    pub fn from_events(events: &[ClipEvent]) -> Self {
        Self(events.iter().fold(0, |acc, e| acc | e.mask().0))
    }

    pub fn contains(self, event: ClipEvent) -> bool {
        self.0 & event.mask().0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ClipEventHandler {
    pub events: Vec<ClipEvent>,
    pub script: Rc<CodeImage>,
}

/// Place a new character at a depth, or modify the one already there.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlaceObject {
    pub depth: Depth,
    /// `None` moves or recolors the existing occupant.
    pub character: Option<CharacterId>,
    pub matrix: Option<Affine>,
    pub cxform: Option<ColorTransform>,
    /// Morph ratio in `0..=1`.
    pub ratio: Option<f64>,
    pub name: Option<String>,
    pub clip_depth: Option<Depth>,
    pub events: Vec<ClipEventHandler>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ControlTag {
    Place(PlaceObject),
    Remove { depth: Depth },
    SetBackground { color: Rgba8 },
    DoAction { script: Rc<CodeImage> },
}

/// One timeline step: control tags applied in order on entry.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tags: Vec<ControlTag>,
}

impl Frame {
    pub fn actions(&self) -> impl Iterator<Item = &Rc<CodeImage>> {
        self.tags.iter().filter_map(|t| match t {
            ControlTag::DoAction { script } => Some(script),
            _ => None,
        })
    }
}

/// Fully parsed movie: stage, character dictionary, exports and root timeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MovieDef {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    pub stage: Rect,
    #[serde(default)]
    pub background: Rgba8,
    /// Dialect version of the movie's scripts.
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub characters: BTreeMap<CharacterId, CharacterDef>,
    #[serde(default)]
    pub exports: HashMap<String, CharacterId>,
    pub frames: Vec<Frame>,
}

fn default_frame_rate() -> f64 {
    12.0
}

fn default_version() -> u8 {
    8
}

impl MovieDef {
    pub fn from_json(text: &str) -> MarqueeResult<Self> {
        let movie: MovieDef = serde_json::from_str(text)?;
        movie.validate()?;
        Ok(movie)
    }

    pub fn character(&self, id: CharacterId) -> Option<&CharacterDef> {
        self.characters.get(&id)
    }

    pub fn export(&self, name: &str) -> Option<CharacterId> {
        self.exports.get(name).copied()
    }

    pub fn frame_period(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }

    /// Check every cross reference and byte-code image. Any failure is a load error.
    pub fn validate(&self) -> MarqueeResult<()> {
        if !self.frame_rate.is_finite() || self.frame_rate < 0.0 {
            return Err(MarqueeError::load("frame_rate must be a finite, non-negative number"));
        }
        if self.frames.is_empty() {
            return Err(MarqueeError::load("movie must have at least one frame"));
        }
        for (name, id) in &self.exports {
            if !self.characters.contains_key(id) {
                return Err(MarqueeError::load(format!(
                    "export '{name}' references missing character {}",
                    id.0
                )));
            }
        }
        for (id, def) in &self.characters {
            self.validate_character(*id, def)?;
        }
        self.validate_nesting()?;
        self.validate_frames("root", &self.frames)
    }

    /// Rejects sprites and buttons that end up containing themselves through placements.
    fn validate_nesting(&self) -> MarqueeResult<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<CharacterId, Mark> = HashMap::new();
        for &start in self.characters.keys() {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::Visiting);
            let mut stack = vec![(start, self.nested_characters(start))];
            while let Some((node, children)) = stack.last_mut() {
                let node = *node;
                let Some(child) = children.pop() else {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                };
                match marks.get(&child).copied() {
                    Some(Mark::Visiting) => {
                        return Err(MarqueeError::load(format!(
                            "character {}: placement cycle through character {}",
                            child.0, node.0
                        )));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Visiting);
                        stack.push((child, self.nested_characters(child)));
                    }
                }
            }
        }
        Ok(())
    }

    fn nested_characters(&self, id: CharacterId) -> Vec<CharacterId> {
        match self.characters.get(&id) {
            Some(CharacterDef::Sprite(s)) => s
                .frames
                .iter()
                .flat_map(|f| &f.tags)
                .filter_map(|t| match t {
                    ControlTag::Place(p) => p.character,
                    _ => None,
                })
                .collect(),
            Some(CharacterDef::Button(b)) => b.records.iter().map(|r| r.character).collect(),
            _ => Vec::new(),
        }
    }

    fn validate_character(&self, id: CharacterId, def: &CharacterDef) -> MarqueeResult<()> {
        let fail = |msg: String| MarqueeError::load(format!("character {}: {msg}", id.0));
        match def {
            CharacterDef::Shape(s) => self.validate_shape(s).map_err(fail),
            CharacterDef::MorphShape(m) => {
                self.validate_shape(&m.start).map_err(fail)?;
                self.validate_shape(&m.end).map_err(fail)
            }
            CharacterDef::Font(_) | CharacterDef::Bitmap(_) => Ok(()),
            CharacterDef::StaticText(t) => {
                for r in &t.records {
                    self.require_font(r.font).map_err(fail)?;
                }
                Ok(())
            }
            CharacterDef::EditText(t) => self.require_font(t.font).map_err(fail),
            CharacterDef::Button(b) => {
                for r in &b.records {
                    if !self.characters.contains_key(&r.character) {
                        return Err(fail(format!(
                            "button record references missing character {}",
                            r.character.0
                        )));
                    }
                }
                for a in &b.actions {
                    a.script
                        .validate()
                        .map_err(|e| fail(format!("button action: {e}")))?;
                }
                Ok(())
            }
            CharacterDef::Sprite(s) => self.validate_frames(&format!("sprite {}", id.0), &s.frames),
        }
    }

    fn validate_shape(&self, shape: &ShapeDef) -> Result<(), String> {
        shape.validate()?;
        for bitmap in shape.bitmap_refs() {
            match self.characters.get(&bitmap) {
                Some(CharacterDef::Bitmap(_)) => {}
                _ => return Err(format!("fill references missing bitmap {}", bitmap.0)),
            }
        }
        Ok(())
    }

    fn require_font(&self, font: CharacterId) -> Result<(), String> {
        match self.characters.get(&font) {
            Some(CharacterDef::Font(_)) => Ok(()),
            _ => Err(format!("missing font {}", font.0)),
        }
    }

    fn validate_frames(&self, owner: &str, frames: &[Frame]) -> MarqueeResult<()> {
        for (i, frame) in frames.iter().enumerate() {
            for tag in &frame.tags {
                match tag {
                    ControlTag::Place(p) => {
                        if let Some(c) = p.character
                            && !self.characters.contains_key(&c)
                        {
                            return Err(MarqueeError::load(format!(
                                "{owner} frame {i} places missing character {}",
                                c.0
                            )));
                        }
                        for h in &p.events {
                            h.script.validate().map_err(|e| {
                                MarqueeError::load(format!("{owner} frame {i} clip event: {e}"))
                            })?;
                        }
                    }
                    ControlTag::DoAction { script } => {
                        script.validate().map_err(|e| {
                            MarqueeError::load(format!("{owner} frame {i} action: {e}"))
                        })?;
                    }
                    ControlTag::Remove { .. } | ControlTag::SetBackground { .. } => {}
                }
            }
        }
        Ok(())
    }
}

/// Resolves external sub-movies for `attachMovie` names missing from the export table.
pub trait MovieLoader {
    fn load(&mut self, url: &str) -> MarqueeResult<Rc<MovieDef>>;
}

/// Loader over movies registered up front, keyed by URL.
#[derive(Debug, Default)]
pub struct StaticLoader {
    movies: HashMap<String, Rc<MovieDef>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, movie: MovieDef) {
        self.movies.insert(url.into(), Rc::new(movie));
    }
}

impl MovieLoader for StaticLoader {
    fn load(&mut self, url: &str) -> MarqueeResult<Rc<MovieDef>> {
        self.movies
            .get(url)
            .cloned()
            .ok_or_else(|| MarqueeError::load(format!("no movie registered for '{url}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/movie.rs"]
mod tests;
