//! Configuration error types.

use super::FieldPath;
use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid TOML in config file")]
    Toml(#[from] toml::de::Error),

    #[error("config file `{}` not found", .0.display())]
    NotFound(PathBuf),

    /// Rendered in full by `Display`; no `source` so the chain is not printed twice.
    #[error("{0}")]
    Diagnostics(ConfigDiagnostics),
}

/// A single configuration problem.
#[derive(Debug, Clone)]
pub struct ConfigDiagnostic {
    pub field: FieldPath,
    pub message: String,
    pub hint: Option<String>,
}

impl ConfigDiagnostic {
    pub fn new(field: FieldPath, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}{}",
            "[".dimmed(),
            self.field.as_str().cyan(),
            "]".dimmed()
        )?;
        write!(f, "{} {}", "→".red(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {}", "hint:".yellow(), hint)?;
        }
        Ok(())
    }
}

/// Errors and warnings collected over a whole validation pass, so the user
/// sees every problem at once.
#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    errors: Vec<ConfigDiagnostic>,
    warnings: Vec<ConfigDiagnostic>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: FieldPath, message: impl Into<String>) {
        self.errors.push(ConfigDiagnostic::new(field, message));
    }

    pub fn error_with_hint(
        &mut self,
        field: FieldPath,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.errors
            .push(ConfigDiagnostic::new(field, message).with_hint(hint));
    }

    /// Non-fatal problem, printed by [`Self::print_warnings`].
    pub fn warn(&mut self, field: FieldPath, message: impl Into<String>) {
        self.warnings.push(ConfigDiagnostic::new(field, message));
    }

    pub fn print_warnings(&self) {
        for warning in self.warnings() {
            crate::log!("warning"; "[{}] {}", warning.field.as_str(), warning.message);
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ConfigDiagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ConfigDiagnostic] {
        &self.warnings
    }

    /// Convert to Result (returns Err if there are errors).
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", "config validation failed:".red().bold())?;
        for (i, err) in self.errors().iter().enumerate() {
            write!(f, "{err}")?;
            if i + 1 < self.len() {
                writeln!(f, "\n")?;
            }
        }
        if self.len() > 1 {
            write!(
                f,
                "\n\n{} {} {}",
                "found".dimmed(),
                self.len().to_string().red().bold(),
                "errors".dimmed()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigDiagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    const PORT: FieldPath = FieldPath::new("serve.port");

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("devroot.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("cannot read"));
        assert!(display.contains("devroot.toml"));

        let missing = ConfigError::NotFound(PathBuf::from("devroot.toml"));
        assert!(missing.to_string().contains("not found"));
    }

    #[test]
    fn test_diagnostics_collect_all_errors() {
        let mut diag = ConfigDiagnostics::new();
        diag.error(PORT, "first");
        diag.error_with_hint(PORT, "second", "try again");
        diag.warn(PORT, "only a warning");

        assert_eq!(diag.len(), 2);
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.errors()[1].hint.as_deref(), Some("try again"));

        let report = diag.into_result().unwrap_err().to_string();
        assert!(report.contains("first"));
        assert!(report.contains("second"));
        assert!(report.contains("try again"));
    }

    #[test]
    fn test_warnings_alone_are_ok() {
        let mut diag = ConfigDiagnostics::new();
        diag.warn(PORT, "only a warning");
        assert!(diag.into_result().is_ok());
    }
}
