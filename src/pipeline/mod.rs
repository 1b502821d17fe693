pub mod actions;
pub mod frame_loop;

pub use actions::{
    register_standard_actions, CaptureOptions, Collaborators, APPROACH_SOUND, CAPTURE_AND_NOTIFY,
    CAPTURE_SOUND, NOTIFY_INTRUDER,
};
pub use frame_loop::{FrameLoop, FrameLoopConfig};
