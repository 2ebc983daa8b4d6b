//! Marquee is a runtime for scripted vector-graphics movies.
//!
//! A movie is a dictionary of characters plus a timeline of frames. The runtime is split into
//! layers that can be used on their own:
//!
//! - [`vm`]: the stack-machine interpreter with its object model and tracing collector
//! - [`display`]: character definitions, live instances and depth-ordered display lists
//! - [`render`]: the movie renderer and a batched shape renderer over a GPU device capability
//! - [`Player`]: drives timelines, scripts and input, and renders frames
#![forbid(unsafe_code)]
// Some option fields and accessors exist for embedders only and are not read inside the crate.
#![allow(dead_code)]

mod foundation;

pub mod display;
pub mod player;
pub mod render;
pub mod vm;

pub use crate::foundation::core::{
    Affine, BezPath, CharacterId, Depth, FrameIndex, Point, Rect, Rgba8, Vec2,
};
pub use crate::foundation::error::{MarqueeError, MarqueeResult};

pub use crate::display::{ColorTransform, InstanceId, MovieDef, MovieLoader, StaticLoader};
pub use crate::player::{Player, PlayerOpts, PlayerStats};
pub use crate::render::{
    AcceleratedRenderer, GpuDevice, RecordingDevice, RenderOpts, RenderStats, Renderer,
    VertexPoolOpts,
};
pub use crate::vm::{ExecutionContext, Host, LoggedHost, NativeHost, Value, VmOpts};
