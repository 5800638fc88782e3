//! AI Speech - ordered, rate-limited speech synthesis and playback
//!
//! Turns a sequence of talks into audible speech against one of many
//! interchangeable synthesis backends, while an avatar plays the audio in
//! order and keeps its mouth in sync.
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` defines the external collaborators (backends, avatar,
//!   notifications, reading converter)
//! - `providers` contains concrete backend adapters
//! - `pipeline` serializes and rate-limits backend calls
//! - `playback` plays resolved audio strictly in submission order
//! - `speaker` is the caller-facing entry point
//!
//! Work is tagged with the session id current at submission; a session change
//! cancels queued audio and anything from an older session that resolves
//! later.
//!
//! # Example
//!
//! ```ignore
//! use ai_speech::{OpenAISpeechProvider, SettingsStore, Speaker, SpeechSettings, VoiceBackend};
//! use domain::{Emotion, SessionId, Talk};
//!
//! let speaker = Speaker::builder(SettingsStore::new(SpeechSettings::load(None)?))
//!     .backend(VoiceBackend::Openai, Arc::new(OpenAISpeechProvider::new()?))
//!     .avatar(avatar)
//!     .build()?;
//!
//! let session = SessionId::generate();
//! speaker.speak(session.clone(), Talk::new("Hello!", Emotion::Happy));
//! let outcome = speaker.speak(session, Talk::new("How are you?", Emotion::Neutral)).await;
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod notification;
pub mod pipeline;
pub mod playback;
pub mod ports;
pub mod preprocess;
pub mod providers;
pub mod registry;
pub mod speaker;

pub use completion::{Completion, CompletionSender, SkipReason, SpeakCallbacks, SpeechOutcome};
pub use config::{BackendParams, SettingsStore, SpeechSettings, VoiceBackend};
pub use error::SpeechError;
pub use notification::{Notification, NotificationKind, TracingNotificationSink};
pub use pipeline::FetchPipeline;
pub use playback::{AudioTask, PlaybackQueue};
pub use ports::{AvatarSync, NotificationSink, ReadingConverter, SpeechSynthesizer, SynthesisRequest};
pub use providers::openai::OpenAISpeechProvider;
pub use registry::BackendRegistry;
pub use speaker::{Speaker, SpeakerBuilder};
