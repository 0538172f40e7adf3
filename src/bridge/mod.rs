//! Message protocol between a presentation side and the renderer.
//!
//! The worker side is a [`Bridge`]: a single-threaded pump that fully
//! handles one inbound JSON message before taking the next, and posts every
//! renderer event as an [`EventMessage`] on an outbound channel.
//! [`ScoreWorker`] runs that pump on its own thread; [`InlineBridge`] runs
//! it on the caller's thread for hosts that bring their own threading.

mod message;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, ErrorEnvelope, Result};
use crate::renderer::{RenderEvent, ScoreRenderer};
use crate::settings::Settings;

pub use message::{decode, Command, EventMessage, Inbound};
pub use worker::{ReceivedEvent, ScoreWorker};

// ═══════════════════════════════════════════════════════════════════════
// Worker-side pump
// ═══════════════════════════════════════════════════════════════════════

pub struct Bridge {
    renderer: Option<ScoreRenderer>,
    outbound: Sender<EventMessage>,
    /// Ordinal of the inbound message being handled
    seq: Arc<AtomicU64>,
    dropped: u64,
}

impl Bridge {
    pub fn new(outbound: Sender<EventMessage>) -> Self {
        Self {
            renderer: None,
            outbound,
            seq: Arc::new(AtomicU64::new(0)),
            dropped: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.renderer.is_some()
    }

    /// Messages dropped for carrying an unknown command tag.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped
    }

    /// Number of inbound messages seen so far.
    pub fn seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Pump `inbound` until every sender is gone.
    pub fn run(mut self, inbound: Receiver<Value>) {
        info!("bridge pump started");
        for message in inbound {
            self.dispatch(message);
        }
        info!(
            handled = self.seq(),
            dropped = self.dropped,
            "inbound channel closed; bridge pump stopped"
        );
    }

    /// Handle one message; a rejection is reported as an `error` event.
    pub fn dispatch(&mut self, message: Value) {
        if let Err(err) = self.handle_message(message) {
            self.reject(&err);
        }
    }

    /// Handle one message given as JSON text.
    pub fn dispatch_json(&mut self, text: &str) {
        match serde_json::from_str(text) {
            Ok(message) => self.dispatch(message),
            Err(err) => {
                self.seq.fetch_add(1, Ordering::SeqCst);
                self.reject(&Error::from(err));
            }
        }
    }

    /// Handle one message, returning the rejection instead of posting it.
    pub fn handle_message(&mut self, message: Value) -> Result<()> {
        self.seq.fetch_add(1, Ordering::SeqCst);
        match decode(message)? {
            Inbound::Command(command) => self.handle(command),
            Inbound::Unknown(tag) => {
                self.dropped += 1;
                warn!(tag, dropped = self.dropped, "dropping message with unknown command tag");
                Ok(())
            }
        }
    }

    pub fn handle(&mut self, command: Command) -> Result<()> {
        debug!(cmd = command.name(), seq = self.seq(), "handling command");
        match command {
            Command::Initialize { settings } => self.initialize(settings),
            Command::Invalidate => self.renderer()?.invalidate(),
            Command::Resize { width } => self.renderer()?.resize(width),
            Command::Render {
                score,
                track_indexes,
            } => self.renderer()?.render(Arc::new(score), &track_indexes),
            Command::UpdateSettings { settings } => {
                let renderer = self.renderer()?;
                let merged = renderer.settings().merged(&settings)?;
                renderer.update_settings(merged);
            }
        }
        Ok(())
    }

    fn renderer(&mut self) -> Result<&mut ScoreRenderer> {
        self.renderer.as_mut().ok_or(Error::NotInitialized)
    }

    fn initialize(&mut self, settings: Settings) {
        if self.renderer.is_some() {
            info!("re-initializing; previous renderer dropped");
        }
        let mut renderer = ScoreRenderer::new(settings);
        let outbound = self.outbound.clone();
        let seq = Arc::clone(&self.seq);
        renderer.add_listener(move |event| {
            let message = EventMessage {
                seq: seq.load(Ordering::SeqCst),
                event: event.clone(),
            };
            if outbound.send(message).is_err() {
                debug!(event = event.name(), "event receiver gone");
            }
        });
        self.renderer = Some(renderer);
        info!("renderer initialized");
    }

    fn reject(&mut self, err: &Error) {
        warn!(error = %err, seq = self.seq(), "rejected inbound message");
        let message = EventMessage {
            seq: self.seq(),
            event: RenderEvent::Error {
                stage: "bridge".to_owned(),
                error: ErrorEnvelope::from_error(err),
            },
        };
        if self.outbound.send(message).is_err() {
            debug!("event receiver gone");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Inline host
// ═══════════════════════════════════════════════════════════════════════

/// A bridge pumped on the caller's thread: each post returns the events it
/// produced.
pub struct InlineBridge {
    bridge: Bridge,
    events: Receiver<EventMessage>,
}

impl Default for InlineBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineBridge {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            bridge: Bridge::new(tx),
            events: rx,
        }
    }

    pub fn post(&mut self, message: Value) -> Vec<EventMessage> {
        self.bridge.dispatch(message);
        self.events.try_iter().collect()
    }

    pub fn post_text(&mut self, text: &str) -> Vec<EventMessage> {
        self.bridge.dispatch_json(text);
        self.events.try_iter().collect()
    }

    /// JSON text in, JSON array of event messages out.
    pub fn post_json(&mut self, text: &str) -> String {
        let events = self.post_text(text);
        serde_json::to_string(&events).unwrap_or_else(|err| {
            warn!(error = %err, "failed to encode event messages");
            "[]".to_owned()
        })
    }

    pub fn dropped_messages(&self) -> u64 {
        self.bridge.dropped_messages()
    }

    pub fn is_initialized(&self) -> bool {
        self.bridge.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn names(events: &[EventMessage]) -> Vec<&'static str> {
        events.iter().map(EventMessage::name).collect()
    }

    fn tiny_score() -> Value {
        json!({
            "masterBars": [{}],
            "tracks": [{ "name": "Flute", "bars": [{ "beats": [{ "duration": "whole", "notes": [] }] }] }]
        })
    }

    #[test]
    fn commands_before_initialize_are_rejected() {
        let mut bridge = InlineBridge::new();
        let events = bridge.post(json!({ "cmd": "resize", "width": 300 }));

        assert_eq!(names(&events), vec!["error"]);
        match &events[0].event {
            RenderEvent::Error { stage, error } => {
                assert_eq!(stage, "bridge");
                assert_eq!(error.kind, ErrorKind::NotInitialized);
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert!(!bridge.is_initialized());
    }

    #[test]
    fn render_events_carry_the_command_seq() {
        let mut bridge = InlineBridge::new();
        assert!(bridge.post(json!({ "cmd": "initialize" })).is_empty());
        let events = bridge.post(json!({ "cmd": "render", "score": tiny_score(), "trackIndexes": [0] }));

        assert_eq!(
            names(&events),
            vec!["preRender", "partialRenderFinished", "renderFinished", "postRenderFinished"]
        );
        assert!(events.iter().all(|e| e.seq == 2));
    }

    #[test]
    fn unknown_tags_are_counted_and_dropped() {
        let mut bridge = InlineBridge::new();
        bridge.post(json!({ "cmd": "initialize" }));
        assert!(bridge.post(json!({ "cmd": "foo.bar" })).is_empty());
        assert!(bridge.post(json!({ "cmd": "foo.baz", "x": [1, 2] })).is_empty());
        assert_eq!(bridge.dropped_messages(), 2);
    }

    #[test]
    fn malformed_text_reports_protocol_violation() {
        let mut bridge = InlineBridge::new();
        let out: Value = serde_json::from_str(&bridge.post_json("{not json")).unwrap();
        assert_eq!(out[0]["cmd"], "error");
        assert_eq!(out[0]["seq"], 1);
        assert_eq!(out[0]["error"]["kind"], "ProtocolViolation");
    }

    #[test]
    fn update_settings_merges_partial_objects() {
        let (tx, _rx) = mpsc::channel();
        let mut bridge = Bridge::new(tx);
        bridge
            .handle(Command::Initialize {
                settings: Settings::from_json(&json!({ "display": { "scale": 1.5 } })).unwrap(),
            })
            .unwrap();
        bridge
            .handle(Command::UpdateSettings {
                settings: json!({ "display": { "showTrackNames": true } }),
            })
            .unwrap();

        let settings = bridge.renderer().unwrap().settings().clone();
        assert_eq!(settings.display.scale, 1.5);
        assert!(settings.display.show_track_names);

        let err = bridge
            .handle(Command::UpdateSettings {
                settings: json!({ "display": { "scale": "huge" } }),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }
}
