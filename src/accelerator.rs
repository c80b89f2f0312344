//! Accelerator string handling.
//!
//! Accelerators arrive as Electron-style strings (`"CommandOrControl+P"`,
//! `"Num7"`, `"7"`). This module parses them into [`global_hotkey::hotkey::HotKey`]
//! values and owns the canonical-key rule for the digit/numpad alias pair:
//! `"1".."9"` and `"Num1".."Num9"` denote the same logical key, and the
//! numpad-prefixed form is canonical for new entries.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use thiserror::Error;

/// Fixed navigation accelerators. These are never available as dynamic
/// bindings so stored data cannot shadow system navigation.
pub const CYCLE_PROFILE: &str = "CommandOrControl+P";
pub const PAGE_PREV: &str = "CommandOrControl+Left";
pub const PAGE_NEXT: &str = "CommandOrControl+Right";
pub const FOCUS_GROUP_FILTER: &str = "CommandOrControl+Shift+G";

pub const RESERVED_ACCELERATORS: [&str; 4] =
    [CYCLE_PROFILE, PAGE_PREV, PAGE_NEXT, FOCUS_GROUP_FILTER];

/// True if the accelerator is one of the fixed navigation hotkeys.
pub fn is_reserved(accelerator: &str) -> bool {
    RESERVED_ACCELERATORS.contains(&accelerator)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcceleratorParseError {
    #[error("accelerator string is empty")]
    Empty,
    #[error("accelerator has no key, only modifiers")]
    MissingKey,
    #[error("unexpected token '{0}' after key")]
    UnexpectedToken(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Returns the bare digit denoted by this accelerator, if it is one of the
/// aliased logical keys (`"1".."9"` or `"Num1".."Num9"`).
pub fn logical_digit(accelerator: &str) -> Option<char> {
    let bare = accelerator.strip_prefix("Num").unwrap_or(accelerator);
    let mut chars = bare.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ '1'..='9'), None) => Some(c),
        _ => None,
    }
}

/// The canonical storage/registration form: bare digits become their
/// numpad-prefixed alias, everything else is unchanged.
pub fn canonical_form(accelerator: &str) -> String {
    match logical_digit(accelerator) {
        Some(digit) => format!("Num{}", digit),
        None => accelerator.to_string(),
    }
}

/// The other spelling of an aliased logical key, if one exists.
/// `"7"` -> `"Num7"`, `"Num7"` -> `"7"`, anything else -> None.
pub fn alias_of(accelerator: &str) -> Option<String> {
    let digit = logical_digit(accelerator)?;
    if accelerator.starts_with("Num") {
        Some(digit.to_string())
    } else {
        Some(format!("Num{}", digit))
    }
}

/// Parse an accelerator string into a registrable hotkey.
pub fn parse_accelerator(accelerator: &str) -> Result<HotKey, AcceleratorParseError> {
    let trimmed = accelerator.trim();
    if trimmed.is_empty() {
        return Err(AcceleratorParseError::Empty);
    }

    let mut modifiers = Modifiers::empty();
    let mut code: Option<Code> = None;

    for token in trimmed.split('+').map(str::trim) {
        if let Some(m) = parse_modifier(token) {
            modifiers |= m;
            continue;
        }
        if code.is_some() {
            return Err(AcceleratorParseError::UnexpectedToken(token.to_string()));
        }
        code = Some(parse_key(token)?);
    }

    let code = code.ok_or(AcceleratorParseError::MissingKey)?;
    let modifiers = if modifiers.is_empty() {
        None
    } else {
        Some(modifiers)
    };
    Ok(HotKey::new(modifiers, code))
}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token {
        // The platform accelerator key: Command on macOS, Ctrl elsewhere.
        "CommandOrControl" | "CmdOrCtrl" => {
            #[cfg(target_os = "macos")]
            {
                Some(Modifiers::META)
            }
            #[cfg(not(target_os = "macos"))]
            {
                Some(Modifiers::CONTROL)
            }
        }
        "Command" | "Cmd" | "Super" | "Meta" => Some(Modifiers::META),
        "Control" | "Ctrl" => Some(Modifiers::CONTROL),
        "Alt" | "Option" => Some(Modifiers::ALT),
        "Shift" => Some(Modifiers::SHIFT),
        _ => None,
    }
}

fn parse_key(token: &str) -> Result<Code, AcceleratorParseError> {
    let code = match token {
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "Num0" => Code::Numpad0,
        "Num1" => Code::Numpad1,
        "Num2" => Code::Numpad2,
        "Num3" => Code::Numpad3,
        "Num4" => Code::Numpad4,
        "Num5" => Code::Numpad5,
        "Num6" => Code::Numpad6,
        "Num7" => Code::Numpad7,
        "Num8" => Code::Numpad8,
        "Num9" => Code::Numpad9,
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "Left" => Code::ArrowLeft,
        "Right" => Code::ArrowRight,
        "Up" => Code::ArrowUp,
        "Down" => Code::ArrowDown,
        "Space" => Code::Space,
        "Enter" | "Return" => Code::Enter,
        "Tab" => Code::Tab,
        "Escape" | "Esc" => Code::Escape,
        "Backspace" => Code::Backspace,
        "Delete" => Code::Delete,
        "Home" => Code::Home,
        "End" => Code::End,
        "PageUp" => Code::PageUp,
        "PageDown" => Code::PageDown,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        other => return Err(AcceleratorParseError::UnknownKey(other.to_string())),
    };
    Ok(code)
}
