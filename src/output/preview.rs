use super::Preview;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Opens images with the desktop's default viewer.
///
/// The viewer is spawned and left running; the batch never waits on it.
#[derive(Debug, Default)]
pub struct SystemViewer;

impl SystemViewer {
    fn command(path: &Path) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut command = Command::new("open");
            command.arg(path);
            command
        }
        #[cfg(target_os = "windows")]
        {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

impl Preview for SystemViewer {
    fn show(&mut self, path: &Path) -> Result<()> {
        Self::command(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open viewer for {}", path.display()))?;
        Ok(())
    }
}
