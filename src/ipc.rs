//! Inbound cross-process protocol from the UI collaborator.
//!
//! Requests arrive as newline-delimited JSON on stdin, tagged by `type`.
//! Malformed lines are logged and skipped; a bad message from the UI must
//! never terminate the event loop.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::store::{Profile, Settings};

/// Inbound requests from the UI process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    GetData,
    SaveProfiles {
        profiles: Vec<Profile>,
    },
    SetActiveProfile {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    SetActivePage {
        profile_id: String,
        index: usize,
    },
    SaveSettings {
        settings: Settings,
    },
    SaveVariables {
        variables: BTreeMap<String, String>,
    },
    ExportProfiles {
        path: PathBuf,
    },
    ImportProfiles {
        path: PathBuf,
    },
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    CreateDesktopShortcut,
    /// Generate a full page of bindings via the AI collaborator and apply it
    /// to the active page.
    GeneratePage {
        description: String,
        #[serde(default)]
        context: Option<String>,
    },
    /// Refine a single key's text via the AI collaborator.
    #[serde(rename_all = "camelCase")]
    RefineKey {
        accelerator: String,
        #[serde(default)]
        instruction: Option<String>,
        #[serde(default)]
        context: Option<String>,
    },
}

/// Read requests line by line until EOF, invoking the callback per parsed
/// request. Parse failures are logged and skipped.
pub fn read_requests(reader: impl BufRead, mut on_request: impl FnMut(Request)) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read request line, stopping reader");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(?request, "Parsed inbound request");
                on_request(request);
            }
            Err(e) => {
                warn!(error = %e, line = %line, "Skipping malformed request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<Request> {
        let mut out = Vec::new();
        read_requests(Cursor::new(input.to_string()), |r| out.push(r));
        out
    }

    #[test]
    fn parses_tagged_requests() {
        let requests = collect(
            "{\"type\":\"get-data\"}\n\
             {\"type\":\"set-active-profile\",\"id\":\"work\"}\n\
             {\"type\":\"set-active-page\",\"profileId\":\"work\",\"index\":2}\n",
        );
        assert_eq!(
            requests,
            vec![
                Request::GetData,
                Request::SetActiveProfile { id: "work".into() },
                Request::SetActivePage {
                    profile_id: "work".into(),
                    index: 2
                },
            ]
        );
    }

    #[test]
    fn skips_malformed_and_blank_lines() {
        let requests = collect(
            "not json\n\
             \n\
             {\"type\":\"unknown-kind\"}\n\
             {\"type\":\"window-close\"}\n",
        );
        assert_eq!(requests, vec![Request::WindowClose]);
    }

    #[test]
    fn parses_save_variables_payload() {
        let requests =
            collect("{\"type\":\"save-variables\",\"variables\":{\"name\":\"World\"}}\n");
        match &requests[0] {
            Request::SaveVariables { variables } => {
                assert_eq!(variables.get("name").unwrap(), "World")
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn parses_generate_page_with_optional_context() {
        let requests = collect(
            "{\"type\":\"generate-page\",\"description\":\"git commands\"}\n\
             {\"type\":\"refine-key\",\"accelerator\":\"Num1\",\"instruction\":\"shorter\"}\n",
        );
        assert_eq!(
            requests[0],
            Request::GeneratePage {
                description: "git commands".into(),
                context: None
            }
        );
        assert_eq!(
            requests[1],
            Request::RefineKey {
                accelerator: "Num1".into(),
                instruction: Some("shorter".into()),
                context: None
            }
        );
    }

    #[test]
    fn parses_save_profiles_with_camel_case_profile_fields() {
        let requests = collect(
            "{\"type\":\"save-profiles\",\"profiles\":[{\"id\":\"p\",\"name\":\"P\",\"color\":\"#000\",\"globalPrompts\":{\"Num1\":\"hi\"},\"pages\":[{\"prompts\":{}}]}]}\n",
        );
        match &requests[0] {
            Request::SaveProfiles { profiles } => {
                assert_eq!(profiles[0].global_prompts.get("Num1").unwrap(), "hi");
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }
}
