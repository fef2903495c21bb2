//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Binaries read environment variables and hand the raw values to the `*_from_env_value`
//! helpers here; nothing in the core reads the environment while handling a request.

use crate::constants::{DEFAULT_DATA_DIR, PROCEDURES_DIR_NAME};
use crate::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use vaultmd_types::NonEmptyText;

/// External command used as the AI-generation collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorCommand {
    program: NonEmptyText,
    args: Vec<String>,
}

impl GeneratorCommand {
    pub fn new(program: NonEmptyText, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    generator_command: Option<GeneratorCommand>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` if `data_dir` exists but is not a directory.
    pub fn new(
        data_dir: PathBuf,
        generator_command: Option<GeneratorCommand>,
    ) -> PipelineResult<Self> {
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(PipelineError::InvalidInput(format!(
                "data directory is not a directory: {}",
                data_dir.display()
            )));
        }

        Ok(Self {
            data_dir,
            generator_command,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn procedures_dir(&self) -> PathBuf {
        self.data_dir.join(PROCEDURES_DIR_NAME)
    }

    pub fn generator_command(&self) -> Option<&GeneratorCommand> {
        self.generator_command.as_ref()
    }
}

/// Resolve the data directory from an optional value, falling back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse a whitespace-separated command line into a [`GeneratorCommand`].
///
/// `None` or a blank value means no generator is configured.
pub fn generator_command_from_env_value(value: Option<String>) -> Option<GeneratorCommand> {
    let value = value?;
    let mut parts = value.split_whitespace().map(str::to_string);
    let program = NonEmptyText::new(parts.next()?).ok()?;
    Some(GeneratorCommand::new(program, parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_dir_defaults_when_blank() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            data_dir_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        assert_eq!(
            data_dir_from_env_value(Some(" /srv/vaultmd ".into())),
            PathBuf::from("/srv/vaultmd")
        );
    }

    #[test]
    fn generator_command_splits_program_and_args() {
        let cmd = generator_command_from_env_value(Some("llm-cli --model gemini-2.5-pro".into()))
            .unwrap();
        assert_eq!(cmd.program(), "llm-cli");
        assert_eq!(cmd.args(), ["--model", "gemini-2.5-pro"]);
    }

    #[test]
    fn generator_command_blank_is_unconfigured() {
        assert!(generator_command_from_env_value(None).is_none());
        assert!(generator_command_from_env_value(Some("  \t ".into())).is_none());
    }

    #[test]
    fn config_rejects_file_as_data_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let result = CoreConfig::new(file, None);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn procedures_dir_is_under_data_dir() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().to_path_buf(), None).unwrap();
        assert_eq!(cfg.procedures_dir(), temp.path().join(PROCEDURES_DIR_NAME));
        assert!(cfg.generator_command().is_none());
    }
}
