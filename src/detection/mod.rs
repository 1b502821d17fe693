pub mod episode;
pub mod presence;

pub use episode::{DetectionEpisode, EpisodeResetPolicy};
pub use presence::{next_state, PresenceDetector, PresenceState, Transition, ZoneThresholds};
