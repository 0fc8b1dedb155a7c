mod episode;
mod show;
pub mod timestamp;

pub use episode::{Episode, EpisodeNumber, episode_guid, format_duration};
pub use show::{Show, ShowMetadata};
