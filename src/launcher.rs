use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};

/// Hands `path` to the desktop's default application without waiting for it.
pub fn open_with_default_app(path: &Path) -> Result<()> {
    let mut command = default_app_command(path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = command
        .status()
        .with_context(|| format!("Failed to launch default application for {}", path.display()))?;

    if !status.success() {
        bail!(
            "Default application exited with {status} for {}",
            path.display()
        );
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn default_app_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn default_app_command(path: &Path) -> Command {
    // Goes straight to the shell association handler; no cmd.exe parsing.
    let mut command = Command::new("rundll32");
    command.arg("url.dll,FileProtocolHandler").arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_app_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}
