//! Presentation-side handle that owns the worker thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Bridge, Command, EventMessage};
use crate::error::{Error, Result};
use crate::model::Score;
use crate::settings::Settings;

/// An event as seen by the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub message: EventMessage,
    /// Produced before the latest invalidate/render/resize was sent; the
    /// consumer should discard it.
    pub stale: bool,
}

/// Runs a [`Bridge`] on a dedicated thread. Commands are fire-and-forget;
/// events are polled with [`try_recv`](Self::try_recv) or
/// [`recv_timeout`](Self::recv_timeout).
pub struct ScoreWorker {
    commands: Option<Sender<Value>>,
    events: Receiver<EventMessage>,
    thread: Option<JoinHandle<()>>,
    sent: u64,
    stale_before: u64,
}

impl ScoreWorker {
    pub fn spawn() -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<Value>();
        let (event_tx, event_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("score-worker".into())
            .spawn(move || Bridge::new(event_tx).run(command_rx))
            .map_err(|e| Error::invalid_state(format!("cannot spawn worker thread: {e}")))?;

        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            thread: Some(thread),
            sent: 0,
            stale_before: 0,
        })
    }

    /// Send a raw message; returns its sequence number.
    pub fn post(&mut self, message: Value) -> Result<u64> {
        let supersedes = message
            .get("cmd")
            .and_then(Value::as_str)
            .is_some_and(Command::tag_supersedes_output);
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| Error::invalid_state("worker is shut down"))?;
        commands
            .send(message)
            .map_err(|_| Error::invalid_state("worker thread has stopped"))?;
        self.sent += 1;
        if supersedes {
            self.stale_before = self.sent;
        }
        Ok(self.sent)
    }

    pub fn send(&mut self, command: &Command) -> Result<u64> {
        self.post(serde_json::to_value(command)?)
    }

    pub fn initialize(&mut self, settings: Settings) -> Result<u64> {
        self.send(&Command::Initialize { settings })
    }

    pub fn invalidate(&mut self) -> Result<u64> {
        self.send(&Command::Invalidate)
    }

    pub fn resize(&mut self, width: f64) -> Result<u64> {
        self.send(&Command::Resize { width })
    }

    pub fn render(&mut self, score: Score, track_indexes: &[usize]) -> Result<u64> {
        self.send(&Command::Render {
            score,
            track_indexes: track_indexes.to_vec(),
        })
    }

    /// Send a partial settings object to merge onto the current settings.
    pub fn update_settings(&mut self, patch: Value) -> Result<u64> {
        self.send(&Command::UpdateSettings { settings: patch })
    }

    pub fn try_recv(&self) -> Option<ReceivedEvent> {
        match self.events.try_recv() {
            Ok(message) => Some(self.classify(message)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("worker event channel closed");
                None
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ReceivedEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(message) => Some(self.classify(message)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("worker event channel closed");
                None
            }
        }
    }

    fn classify(&self, message: EventMessage) -> ReceivedEvent {
        let stale = message.seq < self.stale_before;
        ReceivedEvent { message, stale }
    }

    /// Close the command channel and wait for the pump to finish the
    /// commands already sent. Dropping the worker closes the channel
    /// without waiting.
    pub fn join(mut self) -> Result<()> {
        self.commands.take();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                warn!("worker thread panicked");
                Error::invalid_state("worker thread panicked")
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ScoreWorker {
    fn drop(&mut self) {
        // closing the command channel ends the pump once it drains;
        // the thread is detached so the caller never waits on a pass
        self.commands.take();
        if self.thread.take().is_some() {
            debug!("worker detached");
        }
    }
}
