pub mod buffer;
pub mod median;

pub use buffer::{PositionSample, SampleBuffer, SmoothedEstimate, DEFAULT_WINDOW_CAPACITY};
pub use median::median;
