use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, Sender};
use std::time::Duration;

use core_types::Summary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marks messages that belong to the monitor; anything else on the
/// transport is foreign traffic and gets dropped.
pub const CHANNEL_TAG: u8 = 1;

/// Free-text fields are clipped to this many chars before crossing.
pub const MAX_TEXT_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Error,
    Warn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageOp {
    Set,
    Remove,
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkApi {
    Fetch,
    Xhr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    UserGesture,
    ExitApi,
}

/// The closed set of messages that cross from the monitored context to
/// the host. Every variant is self-contained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MonitorEvent {
    LogEntry {
        level: LogLevel,
        message: String,
    },
    Dialog {
        kind: DialogKind,
        message: String,
    },
    StorageWrite {
        op: StorageOp,
        #[serde(default)]
        key: Option<String>,
    },
    NetworkActivity {
        api: NetworkApi,
        method: String,
        url: String,
        #[serde(default)]
        rewritten: bool,
    },
    RuntimeError {
        message: String,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        line: Option<u32>,
    },
    SummarySnapshot {
        summary: Summary,
    },
    ClickCandidate {
        destination: String,
        provenance: Provenance,
        #[serde(default)]
        api: Option<String>,
    },
}

impl MonitorEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            MonitorEvent::LogEntry { .. } => "log-entry",
            MonitorEvent::Dialog { .. } => "dialog",
            MonitorEvent::StorageWrite { .. } => "storage-write",
            MonitorEvent::NetworkActivity { .. } => "network-activity",
            MonitorEvent::RuntimeError { .. } => "runtime-error",
            MonitorEvent::SummarySnapshot { .. } => "summary-snapshot",
            MonitorEvent::ClickCandidate { .. } => "click-candidate",
        }
    }
}

/// Wire shape: `{ "channelTag": 1, "type": "...", ...variant fields }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub channel_tag: u8,
    #[serde(flatten)]
    pub event: MonitorEvent,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("foreign channel tag {0}")]
    ForeignTag(u8),
}

pub fn encode(event: &MonitorEvent) -> Result<String, WireError> {
    let envelope = Envelope {
        channel_tag: CHANNEL_TAG,
        event: event.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode(text: &str) -> Result<MonitorEvent, WireError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.channel_tag != CHANNEL_TAG {
        return Err(WireError::ForeignTag(envelope.channel_tag));
    }
    Ok(envelope.event)
}

pub fn clip(text: &str) -> String {
    text.chars().take(MAX_TEXT_CHARS).collect()
}

/// In-context end of the channel. Fire-and-forget: a closed host side is
/// not an error for the sender.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<String>,
}

impl EventSender {
    pub fn emit(&self, event: MonitorEvent) -> bool {
        match encode(&event) {
            Ok(text) => self.tx.send(text).is_ok(),
            Err(err) => {
                log::debug!(target: "bus", "dropping {}: {err}", event.type_name());
                false
            }
        }
    }

    /// Posts arbitrary text on the transport, the way any other script in
    /// the context could.
    pub fn post_raw(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}

/// Host end of the channel. Undecodable and foreign messages are skipped.
pub struct EventReceiver {
    rx: Receiver<String>,
}

impl EventReceiver {
    pub fn recv(&self) -> Result<MonitorEvent, RecvError> {
        loop {
            let text = self.rx.recv()?;
            if let Some(event) = Self::accept(&text) {
                return Ok(event);
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<MonitorEvent, RecvTimeoutError> {
        loop {
            let text = self.rx.recv_timeout(timeout)?;
            if let Some(event) = Self::accept(&text) {
                return Ok(event);
            }
        }
    }

    /// Drains everything currently queued without blocking.
    pub fn try_drain(&self) -> Vec<MonitorEvent> {
        self.rx
            .try_iter()
            .filter_map(|text| Self::accept(&text))
            .collect()
    }

    fn accept(text: &str) -> Option<MonitorEvent> {
        match decode(text) {
            Ok(event) => Some(event),
            Err(err) => {
                log::debug!(target: "bus", "ignoring message: {err}");
                None
            }
        }
    }
}

pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_carries_channel_tag_and_type() {
        let text = encode(&MonitorEvent::Dialog {
            kind: DialogKind::Alert,
            message: "hi".into(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["channelTag"], 1);
        assert_eq!(value["type"], "dialog");
        assert_eq!(value["kind"], "alert");
    }

    #[test]
    fn variant_fields_are_camel_case() {
        let text = encode(&MonitorEvent::ClickCandidate {
            destination: "https://example.com".into(),
            provenance: Provenance::UserGesture,
            api: None,
        })
        .unwrap();
        assert!(text.contains("\"provenance\":\"user-gesture\""));

        let text = encode(&MonitorEvent::SummarySnapshot {
            summary: Summary::default(),
        })
        .unwrap();
        assert!(text.contains("\"type\":\"summary-snapshot\""));
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let event = decode(
            r#"{"channelTag":1,"type":"storage-write","op":"set","key":"k","extra":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            MonitorEvent::StorageWrite {
                op: StorageOp::Set,
                key: Some("k".into())
            }
        );
    }

    #[test]
    fn decode_rejects_foreign_and_unknown_messages() {
        assert!(matches!(
            decode(r#"{"channelTag":7,"type":"dialog","kind":"alert","message":""}"#),
            Err(WireError::ForeignTag(7))
        ));
        assert!(decode(r#"{"channelTag":1,"type":"telemetry"}"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[test]
    fn receiver_skips_noise_between_events() {
        let (tx, rx) = channel();
        tx.post_raw("{\"hello\":true}");
        tx.emit(MonitorEvent::LogEntry {
            level: LogLevel::Warn,
            message: "careful".into(),
        });
        tx.post_raw("garbage");
        let drained = rx.try_drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].type_name(), "log-entry");
    }

    #[test]
    fn emit_after_host_hangs_up_is_not_an_error() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.emit(MonitorEvent::RuntimeError {
            message: "boom".into(),
            source: None,
            line: None,
        }));
    }

    #[test]
    fn clip_bounds_free_text() {
        let long = "x".repeat(MAX_TEXT_CHARS * 2);
        assert_eq!(clip(&long).chars().count(), MAX_TEXT_CHARS);
    }
}
