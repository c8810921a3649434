//! Speech narration
//!
//! All spoken output flows through one [`Narrator`] queue so guidance,
//! search feedback and error notices never talk over each other. The
//! audio backend sits behind the [`Speaker`] trait.

mod narrator;
mod tts;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use narrator::Narrator;
pub use tts::HttpTts;

/// Narration sink collaborator
///
/// `speak` resolves when the utterance has been fully handed to the audio
/// backend; cancellation happens by dropping the future.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;

    /// Estimated playback duration, used to size the narration watchdog
    fn estimate(&self, text: &str) -> Duration {
        Duration::from_millis(300 + 60 * text.chars().count() as u64)
    }
}

/// Prints utterances to stdout; used by the CLI simulation and as a
/// fallback when no TTS credentials are configured
pub struct ConsoleSpeaker;

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("[voice] {text}");
        Ok(())
    }

    fn estimate(&self, _text: &str) -> Duration {
        Duration::from_millis(10)
    }
}
