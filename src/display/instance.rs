use std::rc::Rc;

use crate::display::character::{ButtonStates, CharacterDef};
use crate::display::cxform::ColorTransform;
use crate::display::display_list::DisplayList;
use crate::display::movie::{ClipEvent, EventMask, Frame, MovieDef};
use crate::foundation::core::{Affine, CharacterId, Depth, FrameIndex, Rect};
use crate::vm::bytecode::CodeImage;
use crate::vm::heap::ObjectRef;
use crate::vm::object::HostHandle;

/// Generational handle into an [`InstanceArena`].
///
/// Parent links and script host handles store these; lookups validate the generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    pub fn to_host(self) -> HostHandle {
        HostHandle((u64::from(self.generation) << 32) | u64::from(self.index))
    }

    pub fn from_host(handle: HostHandle) -> Self {
        Self {
            index: handle.0 as u32,
            generation: (handle.0 >> 32) as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Up,
    Over,
    Down,
}

impl ButtonState {
    pub fn states(self) -> ButtonStates {
        match self {
            Self::Up => ButtonStates::UP,
            Self::Over => ButtonStates::OVER,
            Self::Down => ButtonStates::DOWN,
        }
    }
}

/// Where a container's frames come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineSource {
    /// The owning movie's root timeline.
    Movie,
    Sprite(CharacterId),
}

/// Playback state of a container.
#[derive(Clone, Debug)]
pub struct Timeline {
    pub source: TimelineSource,
    pub display_list: DisplayList,
    /// Last entered frame; `None` before the first.
    pub current: Option<FrameIndex>,
    pub playing: bool,
}

impl Timeline {
    pub fn new(source: TimelineSource) -> Self {
        Self {
            source,
            display_list: DisplayList::new(),
            current: None,
            playing: true,
        }
    }
}

/// Per-kind mutable state. The definition itself stays in the movie.
#[derive(Clone, Debug)]
pub enum InstanceKind {
    Shape,
    MorphShape { ratio: f64 },
    StaticText,
    EditText { text: String },
    Button { state: ButtonState },
    Sprite(Timeline),
    /// Placed from a kind that cannot draw; renders nothing.
    Unsupported,
}

/// Live occurrence of a character in some display list.
#[derive(Clone, Debug)]
pub struct CharacterInstance {
    /// Movie whose dictionary this instance resolves characters in.
    pub movie: Rc<MovieDef>,
    pub character: Option<CharacterId>,
    /// Container holding this instance; validated on use.
    pub parent: Option<InstanceId>,
    pub depth: Depth,
    pub transform: Affine,
    pub cxform: ColorTransform,
    pub visible: bool,
    pub name: Option<String>,
    pub events: Vec<(EventMask, Rc<CodeImage>)>,
    /// Script-side object, once one has been allocated.
    pub object: Option<ObjectRef>,
    pub kind: InstanceKind,
}

impl CharacterInstance {
    pub fn new(movie: Rc<MovieDef>, character: Option<CharacterId>, kind: InstanceKind) -> Self {
        Self {
            movie,
            character,
            parent: None,
            depth: Depth(0),
            transform: Affine::IDENTITY,
            cxform: ColorTransform::IDENTITY,
            visible: true,
            name: None,
            events: Vec::new(),
            object: None,
            kind,
        }
    }

    /// Root container playing `movie`'s own timeline.
    pub fn root(movie: Rc<MovieDef>) -> Self {
        Self::new(
            movie,
            None,
            InstanceKind::Sprite(Timeline::new(TimelineSource::Movie)),
        )
    }

    /// Fresh instance of dictionary entry `id`. Unknown ids and fonts/bitmaps are unsupported.
    pub fn from_definition(movie: &Rc<MovieDef>, id: CharacterId) -> Self {
        let kind = match movie.character(id) {
            Some(CharacterDef::Shape(_)) => InstanceKind::Shape,
            Some(CharacterDef::MorphShape(_)) => InstanceKind::MorphShape { ratio: 0.0 },
            Some(CharacterDef::StaticText(_)) => InstanceKind::StaticText,
            Some(CharacterDef::EditText(t)) => InstanceKind::EditText {
                text: t.initial_text.clone(),
            },
            Some(CharacterDef::Button(_)) => InstanceKind::Button {
                state: ButtonState::Up,
            },
            Some(CharacterDef::Sprite(_)) => {
                InstanceKind::Sprite(Timeline::new(TimelineSource::Sprite(id)))
            }
            Some(def @ (CharacterDef::Font(_) | CharacterDef::Bitmap(_))) => {
                tracing::warn!(id = id.0, kind = def.kind_name(), "character is not placeable");
                InstanceKind::Unsupported
            }
            None => {
                tracing::warn!(id = id.0, "placed character is missing");
                InstanceKind::Unsupported
            }
        };
        Self::new(movie.clone(), Some(id), kind)
    }

    pub fn def(&self) -> Option<&CharacterDef> {
        self.movie.character(self.character?)
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        match &self.kind {
            InstanceKind::Sprite(t) => Some(t),
            _ => None,
        }
    }

    pub fn timeline_mut(&mut self) -> Option<&mut Timeline> {
        match &mut self.kind {
            InstanceKind::Sprite(t) => Some(t),
            _ => None,
        }
    }

    pub fn display_list(&self) -> Option<&DisplayList> {
        self.timeline().map(|t| &t.display_list)
    }

    /// Frames of this container's timeline; empty for leaf kinds.
    pub fn frames(&self) -> &[Frame] {
        match self.timeline().map(|t| t.source) {
            Some(TimelineSource::Movie) => &self.movie.frames,
            Some(TimelineSource::Sprite(id)) => match self.movie.character(id) {
                Some(CharacterDef::Sprite(s)) => &s.frames,
                _ => &[],
            },
            None => &[],
        }
    }

    pub fn event_mask(&self) -> EventMask {
        EventMask(self.events.iter().fold(0, |acc, (m, _)| acc | m.0))
    }

    /// Scripts bound to `event`, in declaration order.
    pub fn handlers(&self, event: ClipEvent) -> impl Iterator<Item = &Rc<CodeImage>> {
        self.events
            .iter()
            .filter(move |(m, _)| m.contains(event))
            .map(|(_, s)| s)
    }

    /// Bounds of a leaf kind in local space; containers answer `None`.
    ///
    /// Buttons report the union of their hit-state records.
    pub fn local_bounds(&self) -> Option<Rect> {
        match (self.def()?, &self.kind) {
            (CharacterDef::Shape(s), _) => Some(s.bounds()),
            (CharacterDef::MorphShape(m), InstanceKind::MorphShape { ratio }) => {
                Some(m.interpolate(*ratio).bounds())
            }
            (CharacterDef::StaticText(t), _) => Some(t.bounds),
            (CharacterDef::EditText(t), _) => Some(t.bounds),
            (CharacterDef::Button(b), _) => b
                .records
                .iter()
                .filter(|r| r.states.intersects(ButtonStates::HIT))
                .filter_map(|r| {
                    let bounds = match self.movie.character(r.character)? {
                        CharacterDef::Shape(s) => s.bounds(),
                        CharacterDef::MorphShape(m) => m.start.bounds(),
                        CharacterDef::StaticText(t) => t.bounds,
                        CharacterDef::EditText(t) => t.bounds,
                        _ => return None,
                    };
                    Some(r.matrix.transform_rect_bbox(bounds))
                })
                .reduce(|a, b| a.union(b)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ArenaSlot {
    generation: u32,
    instance: Option<CharacterInstance>,
}

/// Owner of every live instance in a player.
#[derive(Debug, Default)]
pub struct InstanceArena {
    slots: Vec<ArenaSlot>,
    free_list: Vec<u32>,
    live: usize,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: CharacterInstance) -> InstanceId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.instance = Some(instance);
            return InstanceId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(ArenaSlot {
            generation: 0,
            instance: Some(instance),
        });
        InstanceId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<&CharacterInstance> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.instance.as_ref())
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut CharacterInstance> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.instance.as_mut())
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    /// Free the slot. The handle and any copies of it go stale.
    pub fn remove(&mut self, id: InstanceId) -> Option<CharacterInstance> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)?;
        let instance = slot.instance.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        Some(instance)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &CharacterInstance)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.instance.as_ref().map(|inst| {
                (
                    InstanceId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    inst,
                )
            })
        })
    }

    /// `id` and its descendants in render order (parent first, children by ascending depth).
    pub fn subtree(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(inst) = self.get(next) else {
                continue;
            };
            out.push(next);
            if let Some(list) = inst.display_list() {
                let children: Vec<InstanceId> = list.instances().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    /// Compose transforms from the root down to `id`.
    pub fn world_transform(&self, id: InstanceId) -> Affine {
        let mut xf = Affine::IDENTITY;
        let mut cursor = Some(id);
        // Parent links come from placement; cap the walk in case of corruption.
        for _ in 0..1024 {
            let Some(inst) = cursor.and_then(|c| self.get(c)) else {
                break;
            };
            xf = inst.transform * xf;
            cursor = inst.parent;
        }
        xf
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/instance.rs"]
mod tests;
