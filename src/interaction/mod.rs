//! Camera, picking and the events they publish.

pub mod camera;
pub mod events;
pub mod picking;

pub use camera::{Camera, CameraController, CameraPreset, TransitionOutcome, Viewport, ease_in_out_quad};
pub use events::{ChannelSink, EventSink, NullSink, RecordingSink, SceneEvent};
pub use picking::{HoverChange, PickOutcome, PickingError, PickingService};
