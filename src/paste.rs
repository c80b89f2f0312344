//! Variable substitution, clipboard write, and paste-keystroke injection.
//!
//! Invoked directly from dynamic hotkey callbacks: a failing paste must never
//! propagate into the hotkey path or cause a binding to be unregistered, so
//! every failure here is logged and swallowed.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::platform;
use crate::store::OsPlatform;

/// Seam over the system clipboard so the paste pipeline is testable without
/// touching real clipboard state.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// arboard-backed clipboard. A fresh handle is opened per write; the handle
/// is not kept across calls because some platforms tie it to display state.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("failed to access clipboard")?;
        clipboard
            .set_text(text)
            .context("failed to set clipboard text")?;
        Ok(())
    }
}

pub struct PasteService<C: Clipboard> {
    clipboard: C,
}

impl<C: Clipboard> PasteService<C> {
    pub fn new(clipboard: C) -> Self {
        Self { clipboard }
    }

    /// Substitute variables, write the clipboard, and inject the platform
    /// paste keystroke. Never returns an error: all failures are logged.
    pub fn paste(&mut self, raw: &str, variables: &BTreeMap<String, String>, os: OsPlatform) {
        let text = substitute_variables(raw, variables);

        if let Err(e) = self.clipboard.set_text(&text) {
            error!(error = %e, "Clipboard write failed, skipping paste keystroke");
            return;
        }
        debug!(text_len = text.len(), "Wrote paste text to clipboard");

        if let Err(e) = platform::send_paste_keystroke(os) {
            error!(error = %e, "Paste automation failed");
        }
    }
}

/// Single left-to-right substitution pass: each `#name` occurrence is
/// replaced with `variables[name]`. Undefined names are left verbatim and
/// substituted values are not re-scanned (no recursive expansion). At each
/// `#` the longest defined name wins.
pub fn substitute_variables(raw: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(hash) = rest.find('#') {
        out.push_str(&rest[..hash]);
        let after = &rest[hash + 1..];

        let matched = variables
            .iter()
            .filter(|(name, _)| !name.is_empty() && after.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len());

        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len()..];
            }
            None => {
                out.push('#');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
