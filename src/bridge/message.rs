//! Wire shapes of the bridge: inbound commands and outbound event messages.
//!
//! Both directions are JSON objects tagged by a `cmd` string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Score;
use crate::renderer::RenderEvent;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Command {
    Initialize {
        #[serde(default)]
        settings: Settings,
    },
    Invalidate,
    Resize {
        width: f64,
    },
    Render {
        score: Score,
        #[serde(default, rename = "trackIndexes")]
        track_indexes: Vec<usize>,
    },
    /// `settings` is a partial object merged onto the current settings.
    UpdateSettings {
        settings: Value,
    },
}

impl Command {
    /// Every tag this version understands.
    pub const TAGS: &'static [&'static str] =
        &["initialize", "invalidate", "resize", "render", "updateSettings"];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::Invalidate => "invalidate",
            Command::Resize { .. } => "resize",
            Command::Render { .. } => "render",
            Command::UpdateSettings { .. } => "updateSettings",
        }
    }

    /// Commands after which earlier render output no longer applies.
    pub fn supersedes_output(&self) -> bool {
        Self::tag_supersedes_output(self.name())
    }

    /// [`supersedes_output`](Self::supersedes_output) for a raw `cmd` tag.
    pub fn tag_supersedes_output(tag: &str) -> bool {
        matches!(tag, "invalidate" | "resize" | "render")
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(Command),
    /// Well-formed message with a tag this version does not know
    Unknown(String),
}

/// Decode one inbound message. Unknown tags are not an error; a missing
/// tag or a known tag with the wrong payload is.
pub fn decode(message: Value) -> Result<Inbound> {
    let tag = message
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("message has no string 'cmd' tag"))?;
    if !Command::TAGS.contains(&tag) {
        return Ok(Inbound::Unknown(tag.to_owned()));
    }
    Ok(Inbound::Command(serde_json::from_value(message)?))
}

/// One outbound event, stamped with the ordinal of the inbound message
/// whose handling produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMessage {
    pub seq: u64,
    #[serde(flatten)]
    pub event: RenderEvent,
}

impl EventMessage {
    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_known_commands() {
        let inbound = decode(json!({ "cmd": "resize", "width": 640 })).unwrap();
        assert_eq!(inbound, Inbound::Command(Command::Resize { width: 640.0 }));

        let inbound = decode(json!({
            "cmd": "render",
            "score": { "masterBars": [{}], "tracks": [] },
            "trackIndexes": [1, 0]
        }))
        .unwrap();
        match inbound {
            Inbound::Command(Command::Render { score, track_indexes }) => {
                assert_eq!(score.bar_count(), 1);
                assert_eq!(track_indexes, vec![1, 0]);
            }
            other => panic!("expected render, got {other:?}"),
        }

        let inbound = decode(json!({ "cmd": "initialize" })).unwrap();
        assert_eq!(
            inbound,
            Inbound::Command(Command::Initialize { settings: Settings::default() })
        );
    }

    #[test]
    fn unknown_tags_are_reported_not_rejected() {
        let inbound = decode(json!({ "cmd": "foo.bar", "x": 1 })).unwrap();
        assert_eq!(inbound, Inbound::Unknown("foo.bar".into()));
    }

    #[test]
    fn malformed_messages_are_protocol_violations() {
        for message in [
            json!({ "width": 3 }),
            json!({ "cmd": 7 }),
            json!({ "cmd": "resize", "width": "wide" }),
            json!({ "cmd": "render" }),
        ] {
            let err = decode(message).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        }
    }

    #[test]
    fn event_messages_flatten_the_event() {
        let message = EventMessage {
            seq: 3,
            event: RenderEvent::PreRender,
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "seq": 3, "cmd": "preRender" })
        );
    }

    #[test]
    fn commands_serialize_with_tags() {
        let value = serde_json::to_value(Command::UpdateSettings {
            settings: json!({ "display": { "scale": 2.0 } }),
        })
        .unwrap();
        assert_eq!(value["cmd"], "updateSettings");
        assert!(Command::TAGS.contains(&Command::Invalidate.name()));
    }
}
