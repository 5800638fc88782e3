//! Backend adapter implementations
//!
//! Contains concrete implementations of the `SpeechSynthesizer` port.

pub mod openai;

pub use openai::OpenAISpeechProvider;
