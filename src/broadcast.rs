//! Pushes full state snapshots and transient events to the UI collaborator.
//!
//! Messages are newline-delimited JSON on stdout, tagged by `type`. The UI
//! never mutates local state independently of a snapshot; every externally
//! visible mutation ends with a `data-update` push.

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::store::Schema;

/// Outbound messages to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPush {
    /// Full snapshot after a mutation.
    DataUpdate(Schema),
    #[serde(rename_all = "camelCase")]
    ProfileChanged { id: String },
    #[serde(rename_all = "camelCase")]
    PageChanged { index: usize },
    /// Transient overlay notification (name/color on profile switch, page
    /// number on page switch).
    #[serde(rename_all = "camelCase")]
    ShowOverlay {
        message: String,
        color: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sub_message: Option<String>,
    },
    /// Tells the UI to raise the window and focus the group filter field.
    FocusGroupFilter,
    #[serde(rename_all = "camelCase")]
    ExportComplete { success: bool },
    #[serde(rename_all = "camelCase")]
    ImportComplete { success: bool },
    /// Forwarded window-control command; the core owns no window.
    #[serde(rename_all = "camelCase")]
    WindowCommand { action: WindowAction },
    /// Result dialog for the explicit desktop-shortcut action. The only
    /// automation failure surfaced to the user.
    #[serde(rename_all = "camelCase")]
    DesktopShortcutResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GeneratePageComplete {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RefineKeyComplete {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAction {
    Minimize,
    Maximize,
    Close,
}

/// Sink for UI pushes. The production sink writes JSONL to stdout; tests use
/// a recording sink.
pub trait UiSink {
    fn push(&self, push: UiPush);
}

/// JSONL-over-stdout sink. One JSON object per line, flushed per push so the
/// UI process sees events promptly.
pub struct StdoutSink {
    out: Mutex<std::io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(std::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UiSink for StdoutSink {
    fn push(&self, push: UiPush) {
        let line = match serde_json::to_string(&push) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize UI push");
                return;
            }
        };
        let mut out = self.out.lock();
        if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
            warn!("Failed to write UI push to stdout");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_serialize_with_kebab_case_tags() {
        let push = UiPush::FocusGroupFilter;
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["type"], "focus-group-filter");

        let push = UiPush::ProfileChanged { id: "p1".into() };
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["type"], "profile-changed");
        assert_eq!(json["id"], "p1");
    }

    #[test]
    fn overlay_payload_uses_camel_case_sub_message() {
        let push = UiPush::ShowOverlay {
            message: "Work".into(),
            color: "#f00".into(),
            sub_message: Some("Profile Switched".into()),
        };
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["subMessage"], "Profile Switched");
    }

    #[test]
    fn data_update_flattens_snapshot_fields() {
        let push = UiPush::DataUpdate(Schema::default());
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["type"], "data-update");
        assert!(json.get("profiles").is_some());
        assert!(json.get("activeProfileId").is_some());
        assert!(json.get("variables").is_some());
        assert!(json.get("settings").is_some());
    }
}
