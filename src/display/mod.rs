//! Character definitions, instances and the depth-ordered scene graph.

pub mod character;
pub mod cxform;
pub mod display_list;
pub mod instance;
pub mod movie;

pub use character::{
    BitmapDef, ButtonAction, ButtonDef, ButtonEvent, ButtonRecord, ButtonStates, CharacterDef,
    EditTextDef, FillStyle, FontDef, Glyph, GradientStop, LineStyle, MorphShapeDef, ShapeDef,
    ShapePath, SpriteDef, StaticTextDef, TextRecord,
};
pub use cxform::ColorTransform;
pub use display_list::{DisplayList, Layer};
pub use instance::{
    ButtonState, CharacterInstance, InstanceArena, InstanceId, InstanceKind, Timeline,
    TimelineSource,
};
pub use movie::{
    ClipEvent, ClipEventHandler, ControlTag, EventMask, Frame, MovieDef, MovieLoader, PlaceObject,
    StaticLoader,
};
