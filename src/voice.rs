//! Voice input and output coordination.
//!
//! At most one recognition and one synthesis run at a time. Starting a
//! recognition stops playback and supersedes any earlier recognition; a new
//! utterance cancels the one still playing. Synthesis that is unsupported
//! degrades to a no-op.
//!
//! This is a library surface for front-ends that own a microphone and a
//! speaker: they implement [`SpeechRecognizer`] and [`SpeechSynthesizer`] and
//! drive a [`CampaignService`] through [`VoiceCoordinator::dictate`]. The
//! bundled binary is text-only and does not construct one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::campaign::{CampaignService, InputOrigin, SessionSnapshot, TurnRole};
use crate::error::{Error, VoiceError};

/// Why a recognition session produced no transcript.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    #[error("network error")]
    Network,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("no speech detected")]
    NoSpeech,
    #[error("{0}")]
    Other(String),
}

impl RecognitionError {
    /// Short message shown in the input field until the user types again.
    pub fn transient_message(&self) -> &'static str {
        match self {
            Self::Network => "Network error. Check your connection and try again.",
            Self::PermissionDenied => "Microphone access was denied. Allow it in your browser settings.",
            Self::NoSpeech => "No speech detected. Please try again.",
            Self::Other(_) => "Voice input failed. Please type your message instead.",
        }
    }
}

/// Speech-to-text engine. One call yields one final transcript.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self) -> Result<String, RecognitionError>;

    /// Stop an in-flight recognition.
    fn abort(&self);
}

/// Text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    /// Speak `text`, resolving when playback ends.
    async fn speak(&self, text: &str, voice: Option<&str>);

    /// Stop playback.
    fn cancel(&self);
}

/// Enforces the one-at-a-time rules over a recognizer and a synthesizer.
#[derive(Default)]
pub struct VoiceCoordinator {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    voice: Option<String>,
    listening: Mutex<Option<Arc<Notify>>>,
    speaking: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Prefer a named voice for synthesis.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn supports_recognition(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Capture one transcript.
    ///
    /// Returns `Ok(None)` when a later `listen` superseded this one.
    pub async fn listen(&self) -> Result<Option<String>, VoiceError> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(VoiceError::RecognitionUnsupported)?;
        self.stop_speaking().await;

        let cancel = Arc::new(Notify::new());
        if let Some(previous) = self.listening.lock().await.replace(cancel.clone()) {
            debug!("Superseding active recognition");
            previous.notify_one();
            recognizer.abort();
        }

        let result = tokio::select! {
            r = recognizer.recognize() => Some(r),
            _ = cancel.notified() => None,
        };

        {
            let mut slot = self.listening.lock().await;
            if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, &cancel)) {
                *slot = None;
            }
        }

        match result {
            None => Ok(None),
            Some(Ok(transcript)) => {
                let transcript = transcript.trim().to_string();
                if transcript.is_empty() {
                    return Err(RecognitionError::NoSpeech.into());
                }
                Ok(Some(transcript))
            }
            Some(Err(e)) => {
                warn!(error = %e, "Speech recognition failed");
                Err(e.into())
            }
        }
    }

    /// Start speaking `text`, cancelling any utterance still playing.
    pub async fn speak(&self, text: &str) {
        let Some(synthesizer) = self.synthesizer.as_ref().filter(|s| s.is_supported()) else {
            debug!("Speech synthesis unavailable; skipping");
            return;
        };

        let mut speaking = self.speaking.lock().await;
        self.halt(speaking.take());

        let synthesizer = synthesizer.clone();
        let text = text.to_string();
        let voice = self.voice.clone();
        *speaking = Some(tokio::spawn(async move {
            synthesizer.speak(&text, voice.as_deref()).await;
        }));
    }

    pub async fn stop_speaking(&self) {
        let handle = self.speaking.lock().await.take();
        self.halt(handle);
    }

    fn halt(&self, handle: Option<JoinHandle<()>>) {
        if let Some(handle) = handle
            && !handle.is_finished()
        {
            handle.abort();
            if let Some(synthesizer) = &self.synthesizer {
                synthesizer.cancel();
            }
        }
    }

    pub async fn is_speaking(&self) -> bool {
        self.speaking
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Listen, submit the transcript as voice input, and read the reply aloud.
    ///
    /// Returns `Ok(None)` when the recognition was superseded.
    pub async fn dictate(&self, service: &CampaignService) -> Result<Option<SessionSnapshot>, Error> {
        let Some(transcript) = self.listen().await? else {
            return Ok(None);
        };
        info!(chars = transcript.len(), "Submitting voice transcript");
        let snapshot = service.submit(&transcript, InputOrigin::Voice).await?;

        if let Some(turn) = snapshot.turns.iter().rev().find(|t| t.role == TurnRole::Ai) {
            self.speak(&turn.text).await;
        }
        Ok(Some(snapshot))
    }
}
