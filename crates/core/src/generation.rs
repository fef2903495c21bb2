//! AI-generation collaborator.
//!
//! The core does not talk to a model provider itself. It builds the prompt and hands it to a
//! [`Generator`], which returns the model's unstructured response. [`CommandGenerator`] is the
//! bundled adapter: it pipes the prompt into an operator-configured command and reads the
//! response from its standard output, so any provider CLI or wrapper script can be plugged in.

use crate::config::{CoreConfig, GeneratorCommand};
use crate::constants::{PROMPT_DETAILS_HEADING, PROMPT_INSTRUCTION};
use std::future::Future;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no AI generator is configured")]
    NotConfigured,
    #[error("{0}")]
    Unavailable(String),
    #[error("failed to start generator: {0}")]
    Spawn(#[source] io::Error),
    #[error("generator I/O failed: {0}")]
    Io(#[source] io::Error),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("no response from AI model")]
    NoContent,
    #[error("response was not valid UTF-8")]
    InvalidResponse,
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Turns a prompt into a model response.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = GenerationResult<String>> + Send;
}

impl<T: Generator> Generator for Arc<T> {
    async fn generate(&self, prompt: &str) -> GenerationResult<String> {
        (**self).generate(prompt).await
    }
}

/// Builds the prompt sent for a procedure's merged text.
pub fn build_prompt(merged_text: &str) -> String {
    format!(
        "{}\n\n{}\n{}",
        PROMPT_INSTRUCTION, PROMPT_DETAILS_HEADING, merged_text
    )
}

/// Runs an external command per prompt: prompt on stdin, response on stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: GeneratorCommand,
}

impl CommandGenerator {
    pub fn new(command: GeneratorCommand) -> Self {
        Self { command }
    }

    /// # Errors
    ///
    /// Returns `GenerationError::NotConfigured` when the configuration names no command.
    pub fn from_config(cfg: &CoreConfig) -> GenerationResult<Self> {
        cfg.generator_command()
            .cloned()
            .map(Self::new)
            .ok_or(GenerationError::NotConfigured)
    }
}

impl Generator for CommandGenerator {
    async fn generate(&self, prompt: &str) -> GenerationResult<String> {
        tracing::debug!(
            program = self.command.program(),
            prompt_bytes = prompt.len(),
            "running generator"
        );

        let mut child = Command::new(self.command.program())
            .args(self.command.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(GenerationError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GenerationError::Io(io::Error::other("generator stdin unavailable")))?;
        let prompt = prompt.as_bytes().to_vec();

        // Write and read concurrently so a chatty generator cannot fill its stdout pipe
        // while we are still writing.
        let write = async move {
            stdin.write_all(&prompt).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(GenerationError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GenerationError::Provider(if stderr.is_empty() {
                format!("generator exited with {}", output.status)
            } else {
                stderr
            }));
        }
        if let Err(e) = written {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(GenerationError::Io(e));
            }
        }

        let text = String::from_utf8(output.stdout).map_err(|_| GenerationError::InvalidResponse)?;
        if text.trim().is_empty() {
            return Err(GenerationError::NoContent);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultmd_types::NonEmptyText;

    fn command(program: &str, args: &[&str]) -> CommandGenerator {
        CommandGenerator::new(GeneratorCommand::new(
            NonEmptyText::new(program).unwrap(),
            args.iter().map(|a| a.to_string()).collect(),
        ))
    }

    #[test]
    fn prompt_has_instruction_heading_and_text() {
        let prompt = build_prompt("Patient underwent appendectomy.");
        assert_eq!(
            prompt,
            "Generate op note and billing ICD-10 and CPT codes for billing purposes and medical records documentation\n\nProcedure Details:\nPatient underwent appendectomy."
        );
    }

    #[test]
    fn prompt_keeps_merged_text_verbatim() {
        let merged = "  line one\n---\nline two  ";
        assert!(build_prompt(merged).ends_with(merged));
    }

    #[test]
    fn from_config_without_command_is_not_configured() {
        let temp = tempfile::TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().to_path_buf(), None).unwrap();
        assert!(matches!(
            CommandGenerator::from_config(&cfg),
            Err(GenerationError::NotConfigured)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_receives_prompt_on_stdin() {
        let response = command("cat", &[]).generate("Operative Note: echoed").await.unwrap();
        assert_eq!(response, "Operative Note: echoed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_provider_error() {
        let result = command("sh", &["-c", "echo quota exceeded >&2; exit 3"])
            .generate("prompt")
            .await;
        assert!(matches!(result, Err(GenerationError::Provider(msg)) if msg == "quota exceeded"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn blank_response_is_no_content() {
        let result = command("sh", &["-c", "cat >/dev/null; printf '  \\n'"])
            .generate("prompt")
            .await;
        assert!(matches!(result, Err(GenerationError::NoContent)));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let result = command("vaultmd-no-such-generator", &[]).generate("prompt").await;
        assert!(matches!(result, Err(GenerationError::Spawn(_))));
    }
}
