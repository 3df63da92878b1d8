pub mod engine;
pub mod events;
pub mod realtime;
pub mod scope;

pub use crate::engine::{SimEngine, DEFAULT_LOAD_TORQUE, FRAME_PERIOD, MAX_STEPS_PER_FRAME};
pub use crate::events::SimEvent;
pub use crate::realtime::FramePacer;
