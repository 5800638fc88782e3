//! Speak CLI
//!
//! Command-line front end for the speech pipeline: speaks text through the
//! configured backend with a console avatar.

#![allow(clippy::print_stdout)]

mod avatar;

use std::path::PathBuf;
use std::sync::Arc;

use ai_speech::{
    OpenAISpeechProvider, SettingsStore, Speaker, SpeechOutcome, SpeechSettings, VoiceBackend,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use domain::{Emotion, SessionId, Talk};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::avatar::ConsoleAvatar;

/// Speak CLI
#[derive(Parser)]
#[command(name = "speak-cli")]
#[command(author, version, about = "Ordered text-to-speech from the command line", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Speech settings file (TOML)
    #[arg(short, long, env = "TALK_SPEECH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured voice backend
    #[arg(short, long)]
    backend: Option<VoiceBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Speak text in order
    ///
    /// Each argument is one talk. Without arguments, every non-empty line
    /// read from stdin is a talk.
    /// Example: speak-cli speak "こんにちは" "元気ですか？"
    Speak {
        /// Talks to speak
        texts: Vec<String>,

        /// Session the talks belong to (random if not given)
        #[arg(short, long)]
        session: Option<String>,

        /// Expression for every talk
        #[arg(short, long, default_value = "neutral")]
        emotion: Emotion,

        /// Directory to save synthesized clips into
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Synthesize and play one sample directly through a backend
    TestBackend {
        /// Backend to try (defaults to the configured one)
        backend: Option<VoiceBackend>,

        /// Sample text
        #[arg(short, long, default_value = "音声合成のテストです")]
        text: String,
    },

    /// List voice backends and whether an adapter is available
    Backends,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Keep the non-blank lines of an input stream
fn talk_lines<I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Tally of outcomes for the final report
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    played: usize,
    skipped: usize,
    cancelled: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: SpeechOutcome) {
        match outcome {
            SpeechOutcome::Played => self.played += 1,
            SpeechOutcome::Skipped(_) => self.skipped += 1,
            SpeechOutcome::Cancelled => self.cancelled += 1,
            SpeechOutcome::Failed => self.failed += 1,
        }
    }

    const fn total(&self) -> usize {
        self.played + self.skipped + self.cancelled + self.failed
    }
}

/// Load settings and apply command-line overrides
fn load_settings(cli: &Cli) -> anyhow::Result<SpeechSettings> {
    let mut settings =
        SpeechSettings::load(cli.config.as_deref()).context("Failed to load speech settings")?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    Ok(settings)
}

/// Build a speaker with every HTTP adapter this binary ships
fn build_speaker(settings: SpeechSettings, avatar: Arc<ConsoleAvatar>) -> anyhow::Result<Speaker> {
    let speaker = Speaker::builder(SettingsStore::new(settings))
        .backend(VoiceBackend::Openai, Arc::new(OpenAISpeechProvider::new()?))
        .backend(VoiceBackend::Azure, Arc::new(OpenAISpeechProvider::azure()?))
        .avatar(avatar)
        .build()?;
    Ok(speaker)
}

async fn read_stdin_talks() -> anyhow::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut collected = Vec::new();
    while let Some(line) = lines.next_line().await? {
        collected.push(line);
    }
    Ok(talk_lines(collected))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(log_filter_from_verbosity(cli.verbose))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Speak {
            texts,
            session,
            emotion,
            save_dir,
        } => {
            if let Some(dir) = &save_dir {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }

            let texts = if texts.is_empty() {
                read_stdin_talks().await?
            } else {
                talk_lines(texts)
            };

            let avatar = Arc::new(ConsoleAvatar::new(save_dir));
            let speaker = build_speaker(settings, Arc::clone(&avatar))?;
            let session = session.map_or_else(SessionId::generate, SessionId::from);
            info!(session = %session, talks = texts.len(), "Speaking");

            let completions: Vec<_> = texts
                .into_iter()
                .map(|text| speaker.speak(session.clone(), Talk::new(text, emotion)))
                .collect();

            let mut summary = Summary::default();
            for completion in completions {
                summary.record(completion.await);
            }

            println!(
                "🔊 Played {}/{} talks ({} skipped, {} cancelled, {} failed)",
                summary.played,
                summary.total(),
                summary.skipped,
                summary.cancelled,
                summary.failed
            );
            if summary.failed > 0 {
                std::process::exit(1);
            }
        },

        Commands::TestBackend { backend, text } => {
            let backend = backend.unwrap_or(settings.backend);
            let avatar = Arc::new(ConsoleAvatar::new(None));
            let speaker = build_speaker(settings, avatar)?;

            println!("🎤 Testing {}...", backend.service_name());
            match speaker.test_backend(backend, &text).await {
                Ok(()) => println!("✅ {} is working", backend.service_name()),
                Err(e) => {
                    println!("❌ {} failed: {e}", backend.service_name());
                    std::process::exit(1);
                },
            }
        },

        Commands::Backends => {
            let avatar = Arc::new(ConsoleAvatar::new(None));
            let speaker = build_speaker(settings, avatar)?;
            let selected = speaker.settings().snapshot().backend;

            println!("🗣️  Voice backends:");
            for backend in VoiceBackend::ALL {
                let marker = if backend == selected { "*" } else { " " };
                let status = if speaker.has_backend(backend) {
                    "available"
                } else {
                    "no adapter"
                };
                println!(
                    "{marker} {:<16} {:<24} {status}",
                    backend.as_str(),
                    backend.service_name()
                );
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ai_speech::SkipReason;

    use super::*;

    #[test]
    fn log_filter_verbosity_zero() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
    }

    #[test]
    fn log_filter_verbosity_one() {
        assert_eq!(log_filter_from_verbosity(1), "info");
    }

    #[test]
    fn log_filter_verbosity_three_or_more() {
        assert_eq!(log_filter_from_verbosity(3), "trace");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn blank_lines_are_not_talks() {
        let lines = vec![
            "first".to_string(),
            String::new(),
            "   ".to_string(),
            "second".to_string(),
        ];
        assert_eq!(talk_lines(lines), vec!["first", "second"]);
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut summary = Summary::default();
        summary.record(SpeechOutcome::Played);
        summary.record(SpeechOutcome::Played);
        summary.record(SpeechOutcome::Skipped(SkipReason::Unspeakable));
        summary.record(SpeechOutcome::Failed);

        assert_eq!(summary.played, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn cli_parses_speak_with_overrides() {
        let cli = Cli::try_parse_from([
            "speak-cli",
            "--backend",
            "openai",
            "speak",
            "--emotion",
            "happy",
            "hello",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(VoiceBackend::Openai));
        match cli.command {
            Commands::Speak { texts, emotion, .. } => {
                assert_eq!(texts, vec!["hello"]);
                assert_eq!(emotion, Emotion::Happy);
            },
            _ => panic!("expected speak"),
        }
    }

    #[test]
    fn config_path_can_come_from_environment() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        let config = cmd
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(
            config.get_env(),
            Some(std::ffi::OsStr::new("TALK_SPEECH_CONFIG"))
        );
    }

    #[test]
    fn cli_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["speak-cli", "--backend", "espeak", "backends"]).is_err());
    }
}
