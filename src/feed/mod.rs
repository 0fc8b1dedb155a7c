mod assemble;

pub use assemble::{AUDIO_MIME_TYPE, Feed};
