#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod canvas;
pub mod context;
pub mod errors;
pub mod filter;
pub mod filters;
pub mod gpu;
pub mod graph;
pub mod program;
pub mod source;

pub use canvas::{Canvas, CanvasKind, CanvasSpec, TextureUnitTracker};
pub use context::RenderContext;
pub use errors::{PrismError, Result};
pub use filter::{Filter, FilterPipeline, TwoPassFilter};
pub use gpu::{CanvasSize, GpuContext, HeadlessContext, PixelFormat, UniformValue};
pub use graph::{FlowGraph, FlowNode, FrameMailbox, NodeKey, SourceArity, Timestamp};
pub use program::{Program, Rotation};
pub use source::{FramePayload, PictureSource, StreamSource};
