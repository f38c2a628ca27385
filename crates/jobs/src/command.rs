use std::{
    path::Path,
    process::{ExitStatus, Stdio},
};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::process::Command;

use crate::transcript::Transcript;

/// Command line argument. Sensitive values are replaced by their display form
/// wherever the command line is shown.
pub enum Arg {
    Plain(String),
    Sensitive { value: SecretString, display: String },
}

impl Arg {
    pub fn sensitive(value: SecretString, display: impl Into<String>) -> Self {
        Self::Sensitive { value, display: display.into() }
    }

    fn display(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Sensitive { display, .. } => display,
        }
    }

    fn value(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Sensitive { value, .. } => value.expose_secret(),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self { Self::Plain(value.to_string()) }
}

impl From<String> for Arg {
    fn from(value: String) -> Self { Self::Plain(value) }
}

impl From<&Path> for Arg {
    fn from(value: &Path) -> Self { Self::Plain(value.to_string_lossy().into_owned()) }
}

/// Environment variables set on a single invocation, on top of the inherited environment.
#[derive(Debug, Clone, Default)]
pub struct CommandEnv {
    vars: Vec<(String, String)>,
}

impl CommandEnv {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    /// Never prompt for credentials on a terminal.
    pub fn git() -> Self { Self::default().with("GIT_TERMINAL_PROMPT", "0") }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },
}

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
}

/// Run `program` to completion, recording the command line and its output in
/// `transcript` whether or not it succeeds.
pub async fn run(
    transcript: &mut Transcript,
    program: &Path,
    args: &[Arg],
    env: &CommandEnv,
) -> Result<CommandOutput, CommandError> {
    let command = std::iter::once(program.to_string_lossy().into_owned())
        .chain(args.iter().map(|arg| arg.display().to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("Running {}", command);

    let output = Command::new(program)
        .args(args.iter().map(Arg::value))
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;
    let output = match output {
        Ok(output) => output,
        Err(source) => {
            transcript.record(&command, source.to_string().as_bytes());
            return Err(CommandError::Spawn { command, source });
        }
    };

    let mut combined = output.stdout.clone();
    combined.extend_from_slice(&output.stderr);
    transcript.record(&command, &combined);
    if !output.status.success() {
        return Err(CommandError::Failed { command, status: output.status });
    }
    Ok(CommandOutput { stdout: String::from_utf8_lossy(&output.stdout).into_owned() })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_util::script;

    #[tokio::test]
    async fn test_records_command_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "tool", "echo \"out $*\"\necho \"err\" >&2\n");
        let mut transcript = Transcript::default();
        let output =
            run(&mut transcript, &program, &["a".into(), "b".into()], &CommandEnv::default())
                .await
                .unwrap();
        assert_eq!(output.stdout, "out a b\n");
        let log = String::from_utf8(transcript.as_bytes().to_vec()).unwrap();
        assert_eq!(log, format!("{} a b\nout a b\nerr\n\n", program.display()));
    }

    #[tokio::test]
    async fn test_sensitive_arg_is_masked() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "tool", "exit 3\n");
        let mut transcript = Transcript::default();
        let args = [Arg::sensitive(SecretString::from("hunter2".to_string()), "<REDACTED>")];
        let err = run(&mut transcript, &program, &args, &CommandEnv::default()).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
        assert!(err.to_string().contains("<REDACTED>"));
        assert!(!err.to_string().contains("hunter2"));
        let log = String::from_utf8(transcript.as_bytes().to_vec()).unwrap();
        assert!(log.contains("<REDACTED>"));
        assert!(!log.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_env_is_per_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "tool", "echo \"prompt=$GIT_TERMINAL_PROMPT\"\n");
        let mut transcript = Transcript::default();
        let output = run(&mut transcript, &program, &[], &CommandEnv::git()).await.unwrap();
        assert_eq!(output.stdout, "prompt=0\n");
        let output = run(&mut transcript, &program, &[], &CommandEnv::default()).await.unwrap();
        let inherited = std::env::var("GIT_TERMINAL_PROMPT").unwrap_or_default();
        assert_eq!(output.stdout, format!("prompt={inherited}\n"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::default();
        let err = run(&mut transcript, &dir.path().join("missing"), &[], &CommandEnv::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(!transcript.as_bytes().is_empty());
    }
}
