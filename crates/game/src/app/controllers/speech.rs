//! Text-to-speech and speech-to-text behind host-independent traits.
//!
//! The adapter owns the TTS toggle and the listening flag, and drives the talk animation
//! from utterance start/end events.

use npc_engine::{AnimationKind, LoopPolicy, SceneController, CROSS_FADE_SECONDS};
use tracing::{debug, info, warn};

const SECONDS_PER_WORD: f32 = 0.35;
const MIN_UTTERANCE_SECONDS: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Voice {
    pub(crate) name: String,
    pub(crate) lang: String,
}

impl Voice {
    pub(crate) fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Utterance {
    pub(crate) text: String,
    /// `None` leaves the choice to the synthesizer.
    pub(crate) voice: Option<Voice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpeechEvent {
    UtteranceStarted,
    UtteranceEnded,
    ListenEnded,
    RecognitionResult(String),
    RecognitionError(String),
}

pub(crate) trait SpeechSynthesizer {
    fn voices(&self) -> Vec<Voice>;
    fn speak(&mut self, utterance: Utterance);
    /// Cancelling an utterance that already started still reports its end.
    fn cancel(&mut self);
    fn poll(&mut self, dt_seconds: f32) -> Vec<SpeechEvent>;
}

/// Single-shot recognizer: one `start` yields at most one result, then ends.
pub(crate) trait SpeechRecognizer {
    fn start(&mut self);
    fn stop(&mut self);
    fn poll(&mut self) -> Vec<SpeechEvent>;
}

/// Prefers a Google en-US voice, else the first voice the engine offers.
pub(crate) fn select_voice(voices: &[Voice]) -> Option<Voice> {
    voices
        .iter()
        .find(|voice| voice.name.contains("Google") && voice.lang.contains("en-US"))
        .or_else(|| voices.first())
        .cloned()
}

/// Desktop stand-in for a speech engine: logs each utterance and simulates its duration.
#[derive(Debug)]
pub(crate) struct ConsoleSynthesizer {
    voices: Vec<Voice>,
    playing: Option<Playback>,
    pending: Vec<SpeechEvent>,
}

#[derive(Debug)]
struct Playback {
    remaining_seconds: f32,
    started: bool,
}

impl ConsoleSynthesizer {
    pub(crate) fn new(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            playing: None,
            pending: Vec::new(),
        }
    }

    fn utterance_seconds(text: &str) -> f32 {
        (text.split_whitespace().count() as f32 * SECONDS_PER_WORD).max(MIN_UTTERANCE_SECONDS)
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) {
        info!(
            voice = utterance
                .voice
                .as_ref()
                .map(|voice| voice.name.as_str())
                .unwrap_or("default"),
            text = %utterance.text,
            "speech_utterance"
        );
        self.playing = Some(Playback {
            remaining_seconds: Self::utterance_seconds(&utterance.text),
            started: false,
        });
    }

    fn cancel(&mut self) {
        if let Some(playback) = self.playing.take() {
            debug!(started = playback.started, "speech_cancelled");
            if playback.started {
                self.pending.push(SpeechEvent::UtteranceEnded);
            }
        }
    }

    fn poll(&mut self, dt_seconds: f32) -> Vec<SpeechEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(playback) = self.playing.as_mut() else {
            return events;
        };
        if !playback.started {
            playback.started = true;
            events.push(SpeechEvent::UtteranceStarted);
            return events;
        }
        playback.remaining_seconds -= dt_seconds.max(0.0);
        if playback.remaining_seconds <= 0.0 {
            self.playing = None;
            events.push(SpeechEvent::UtteranceEnded);
        }
        events
    }
}

pub(crate) struct SpeechAdapter {
    synthesizer: Box<dyn SpeechSynthesizer>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    enabled: bool,
    listening: bool,
}

impl SpeechAdapter {
    pub(crate) fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        enabled: bool,
    ) -> Self {
        Self {
            synthesizer,
            recognizer,
            enabled,
            listening: false,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flips speech output; turning it off silences the current utterance.
    pub(crate) fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.synthesizer.cancel();
        }
        info!(enabled = self.enabled, "speech_output_toggled");
        self.enabled
    }

    pub(crate) fn can_listen(&self) -> bool {
        self.recognizer.is_some()
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening
    }

    pub(crate) fn preferred_voice(&self) -> Option<Voice> {
        select_voice(&self.synthesizer.voices())
    }

    pub(crate) fn speak(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        self.synthesizer.cancel();
        let voice = self.preferred_voice();
        self.synthesizer.speak(Utterance {
            text: text.to_string(),
            voice,
        });
    }

    pub(crate) fn cancel(&mut self) {
        self.synthesizer.cancel();
    }

    /// Returns false when listening is unsupported or already in progress.
    pub(crate) fn start_listening(&mut self) -> bool {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return false;
        };
        if self.listening {
            return false;
        }
        recognizer.start();
        self.listening = true;
        true
    }

    pub(crate) fn stop_listening(&mut self) {
        if !self.listening {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.listening = false;
    }

    /// Pumps both engines, applies talk-animation rules and returns recognized transcripts.
    pub(crate) fn poll(&mut self, dt_seconds: f32, scene: &mut SceneController) -> Vec<String> {
        let mut events = self.synthesizer.poll(dt_seconds);
        if let Some(recognizer) = self.recognizer.as_mut() {
            events.extend(recognizer.poll());
        }

        let mut transcripts = Vec::new();
        for event in events {
            match event {
                SpeechEvent::UtteranceStarted => on_utterance_started(scene),
                SpeechEvent::UtteranceEnded => on_utterance_ended(scene),
                SpeechEvent::ListenEnded => self.listening = false,
                SpeechEvent::RecognitionResult(transcript) => {
                    debug!(transcript = %transcript, "speech_recognized");
                    transcripts.push(transcript);
                }
                SpeechEvent::RecognitionError(message) => {
                    warn!(error = %message, "speech_recognition_failed");
                    self.listening = false;
                }
            }
        }
        transcripts
    }
}

/// Talk only when nothing more specific owns the pose.
fn on_utterance_started(scene: &mut SceneController) {
    let keep_current = scene.active().is_some_and(|active| {
        active.loop_policy == LoopPolicy::OnceClamp || active.kind.is_movement()
    });
    if !keep_current {
        let _ = scene.play_kind(AnimationKind::DEFAULT_TALK);
    }
}

fn on_utterance_ended(scene: &mut SceneController) {
    let settle = scene.active().is_some_and(|active| {
        active.kind == AnimationKind::DEFAULT_TALK || active.loop_policy == LoopPolicy::OnceClamp
    });
    if settle {
        scene.fade_out_active(CROSS_FADE_SECONDS);
    }
}
