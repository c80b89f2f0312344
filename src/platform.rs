//! OS automation process spawning.
//!
//! The fully supported platform is Windows, where automation runs through
//! spawned PowerShell commands. Everything here reports failure as
//! `AutomationFailure`; callers decide whether it is swallowed (routine
//! paste) or surfaced (desktop-shortcut dialog).

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{PrompterError, Result};
use crate::store::OsPlatform;

/// Send a paste keystroke to the focused application.
///
/// Windows: spawns PowerShell sending Ctrl+V via WScript.Shell. Fire and
/// forget; the child is not awaited. Mac/Linux paste automation is
/// intentionally stubbed: logged, no error.
pub fn send_paste_keystroke(os: OsPlatform) -> Result<()> {
    match os {
        OsPlatform::Windows => {
            let script = "$wshell = New-Object -ComObject wscript.shell; $wshell.SendKeys('^v');";
            Command::new("powershell")
                .args(["-NoProfile", "-Command", script])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| {
                    PrompterError::AutomationFailure(format!(
                        "failed to spawn paste keystroke process: {}",
                        e
                    ))
                })?;
            debug!("Spawned paste keystroke process");
            Ok(())
        }
        OsPlatform::Mac => {
            info!("Mac paste not implemented yet");
            Ok(())
        }
        OsPlatform::Linux => {
            info!("Linux paste not implemented yet");
            Ok(())
        }
    }
}

/// Create a desktop `.lnk` shortcut pointing at the running executable.
/// Waits for the PowerShell child so the caller can report success or
/// failure to the user.
pub fn create_desktop_shortcut() -> Result<()> {
    let target = std::env::current_exe().map_err(|e| {
        PrompterError::AutomationFailure(format!("failed to resolve executable path: {}", e))
    })?;
    let desktop = desktop_dir().ok_or_else(|| {
        PrompterError::AutomationFailure("failed to resolve desktop directory".to_string())
    })?;
    let shortcut = desktop.join("Numpad Prompter.lnk");

    let script = format!(
        "$WshShell = New-Object -comObject WScript.Shell; \
         $Shortcut = $WshShell.CreateShortcut(\"{shortcut}\"); \
         $Shortcut.TargetPath = \"{target}\"; \
         $Shortcut.IconLocation = \"{target}\"; \
         $Shortcut.Save()",
        shortcut = shortcut.display(),
        target = target.display(),
    );

    let status = Command::new("powershell")
        .args(["-NoProfile", "-Command", &script])
        .stdin(Stdio::null())
        .status()
        .map_err(|e| {
            PrompterError::AutomationFailure(format!(
                "failed to spawn shortcut creation process: {}",
                e
            ))
        })?;

    if !status.success() {
        return Err(PrompterError::AutomationFailure(format!(
            "shortcut creation process exited with {}",
            status
        )));
    }
    info!(path = %shortcut.display(), "Created desktop shortcut");
    Ok(())
}

fn desktop_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
}
