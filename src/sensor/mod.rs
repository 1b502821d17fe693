pub mod frame;
pub mod replay;

pub use frame::{BodyFrame, CameraSpacePoint, ColorFrame, JointKind, TrackedBody, INFERRED_Z_CLAMP};
pub use replay::{ReplaySource, SensorEvent};
