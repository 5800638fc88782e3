//! Domain entities

mod audio_buffer;
mod talk;

pub use audio_buffer::AudioBuffer;
pub use talk::Talk;
