use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use super::types::MattingModel;

/// Runs an external background-removal program per image.
///
/// The program receives the encoded image on stdin and must print the RGBA
/// PNG result on stdout, e.g. `rembg i - -`.
pub struct CommandMatting {
    program: OsString,
    args: Vec<OsString>,
    label: String,
}

impl CommandMatting {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let program = program.into();
        let label = program.to_string_lossy().into_owned();
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            label,
        }
    }
}

impl MattingModel for CommandMatting {
    fn remove_background(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let _span = tracing::debug_span!("command_matting", program = %self.label).entered();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.label))?;

        let mut stdin = child
            .stdin
            .take()
            .context("Child process has no stdin")?;

        // Feed stdin from a helper so a chatty child cannot fill its stdout
        // pipe while we are still writing
        let payload = input.to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&payload));

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", self.label))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.label, output.status, stderr.trim());
        }

        writer
            .join()
            .map_err(|_| anyhow!("stdin writer for {} panicked", self.label))?
            .with_context(|| format!("Failed to send image to {}", self.label))?;

        if output.stdout.is_empty() {
            bail!("{} produced no output", self.label);
        }

        tracing::debug!("{} returned {} bytes", self.label, output.stdout.len());
        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_program() {
        let mut model = CommandMatting::new("cat", Vec::<OsString>::new());
        let output = model.remove_background(b"png bytes").unwrap();
        assert_eq!(output, b"png bytes");
        assert_eq!(model.name(), "cat");
    }

    #[test]
    fn test_failing_program_reports_stderr() {
        let mut model = CommandMatting::new("sh", ["-c", "cat >/dev/null; echo boom >&2; exit 3"]);
        let err = model.remove_background(b"data").unwrap_err();
        assert!(err.to_string().contains("boom"), "{err}");
    }

    #[test]
    fn test_empty_output_is_error() {
        let mut model = CommandMatting::new("sh", ["-c", "cat >/dev/null"]);
        assert!(model.remove_background(b"data").is_err());
    }

    #[test]
    fn test_missing_program() {
        let mut model = CommandMatting::new("definitely-not-a-real-matting-tool", Vec::<OsString>::new());
        assert!(model.remove_background(b"data").is_err());
    }
}
