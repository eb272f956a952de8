//! The render engine: a [`Session`] of tracks and channel strips, driven by a
//! [`RenderLoop`] on its own thread and steered through [`Controller`]s.

pub mod control;
pub mod preset;
pub mod render_loop;
pub mod session;

pub use control::{ControlMessage, Controller};
pub use render_loop::{RenderLoop, TransportState, RENDER_THREAD_NAME};
pub use session::{Session, TrackInfo};
