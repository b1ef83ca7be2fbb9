//! External command execution.
//!
//! The resource pipeline runs its build command through [`Cmd`]. With PTY
//! mode on, tools that check for a terminal keep their colored output; the
//! escape codes are stripped again when the output ends up in an error.
//!
//! ```ignore
//! Cmd::from_slice(&["npx", "smaller"])
//!     .cwd(root)
//!     .envs(&vars)
//!     .pty(true)
//!     .run()?;
//! ```

use crate::log;
use anyhow::{Context, Result, bail};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").ok());

/// What a finished process left behind.
struct Finished {
    success: bool,
    status: String,
    stdout: String,
    stderr: String,
}

#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    pty: bool,
    quiet: bool,
}

impl Cmd {
    /// Program and arguments from one array, e.g. `["npx", "smaller"]`.
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut parts = cmd.iter().map(|s| s.as_ref().to_owned());
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
            ..Default::default()
        }
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.envs.extend(
            vars.into_iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// Run inside a pseudo-terminal.
    pub fn pty(mut self, enable: bool) -> Self {
        self.pty = enable;
        self
    }

    /// Keep the output of successful runs off the terminal.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run to completion and return stdout followed by stderr (PTY mode has
    /// a single stream). A non-zero exit is an error carrying the output.
    pub fn run(self) -> Result<String> {
        if self.program.is_empty() {
            bail!("empty command");
        }
        let name = self.program.to_string_lossy().into_owned();

        let finished = if self.pty {
            self.spawn_pty(&name)?
        } else {
            self.spawn_plain(&name)?
        };

        if !finished.success {
            bail!(failure_message(&name, &finished));
        }

        let mut text = finished.stdout;
        text.push_str(&finished.stderr);
        if !self.quiet {
            echo(&name, &text);
        }
        Ok(text)
    }

    fn spawn_plain(&self, name: &str) -> Result<Finished> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("failed to execute `{name}`"))?;
        Ok(Finished {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn_pty(&self, name: &str) -> Result<Finished> {
        let mut builder = CommandBuilder::new(&self.program);
        builder.args(&self.args);
        for (k, v) in &self.envs {
            builder.env(k, v);
        }
        if let Some(dir) = &self.cwd {
            builder.cwd(dir);
        }

        let pair = NativePtySystem::default().openpty(PtySize {
            rows: 24,
            cols: 120,
            pixel_width: 0,
            pixel_height: 0,
        })?;
        let mut child = pair
            .slave
            .spawn_command(builder)
            .with_context(|| format!("failed to spawn `{name}`"))?;
        drop(pair.slave);

        // Reads block until the child closes its side
        let mut reader = pair.master.try_clone_reader()?;
        let collector = std::thread::spawn(move || {
            let mut text = String::new();
            let _ = reader.read_to_string(&mut text);
            text
        });

        let status = child.wait()?;
        drop(pair.master);
        let stdout = collector
            .join()
            .map_err(|_| anyhow::anyhow!("output reader for `{name}` panicked"))?;

        Ok(Finished {
            success: status.success(),
            status: format!("exit code {}", status.exit_code()),
            stdout,
            stderr: String::new(),
        })
    }
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}

/// Print the non-blank output lines under the command's name.
fn echo(name: &str, output: &str) {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !strip_ansi(line).trim().is_empty())
        .collect();
    if !lines.is_empty() {
        log!(name; "{}", lines.join("\n"));
    }
}

fn failure_message(name: &str, finished: &Finished) -> String {
    let mut msg = format!("`{name}` failed with {}", finished.status);
    for (label, stream) in [("", &finished.stderr), ("stdout:\n", &finished.stdout)] {
        let stream = stream.trim();
        if !stream.is_empty() {
            msg.push('\n');
            msg.push_str(label);
            msg.push_str(&strip_ansi(stream));
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["npx", "smaller", "--out", "dist"]).cwd("/tmp");
        assert_eq!(cmd.program, OsString::from("npx"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_command_fails() {
        let empty: [&str; 0] = [];
        assert!(Cmd::from_slice(&empty).run().is_err());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_failure_message_includes_streams() {
        let finished = Finished {
            success: false,
            status: "exit status: 2".into(),
            stdout: "built 1 file\n".into(),
            stderr: "\x1b[31mmissing input\x1b[0m".into(),
        };
        assert_eq!(
            failure_message("npx", &finished),
            "`npx` failed with exit status: 2\nmissing input\nstdout:\nbuilt 1 file"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output() {
        let output = Cmd::from_slice(&["echo", "hello"]).quiet(true).run().unwrap();
        assert!(output.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status() {
        let err = Cmd::from_slice(&["false"]).quiet(true).run().unwrap_err();
        assert!(err.to_string().contains("`false` failed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_is_passed() {
        let output = Cmd::from_slice(&["sh", "-c", "printf %s \"$DEVROOT_MODE\""])
            .envs([("DEVROOT_MODE", "serve")])
            .quiet(true)
            .run()
            .unwrap();
        assert_eq!(output, "serve");
    }
}
