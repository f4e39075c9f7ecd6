// src/system/executor.rs

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' was not found. Is it installed and on your PATH?")]
    NotFound(String),
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with status {code}.")]
    NonZeroExitStatus { command: String, code: i32 },
}

/// A fully prepared external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ExternalCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Self::default()
        }
    }

    /// Builds a command from a shell-like line, e.g. `mysql --batch`.
    pub fn parse(command_line: &str) -> Result<Self, ExecutionError> {
        let parts = shlex::split(command_line.trim())
            .ok_or_else(|| ExecutionError::CommandParse(command_line.to_string()))?;
        let (program, args) = parts.split_first().ok_or(ExecutionError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: BTreeMap::new(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    /// The command line as it would be typed, with every value that came from
    /// the environment left out.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| shlex::try_quote(part).map_or_else(|_| part.to_string(), |q| q.into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs `command` in `cwd` with inherited standard streams and waits for it.
pub fn execute_command(command: &ExternalCommand, cwd: &Path) -> Result<(), ExecutionError> {
    if command.program.trim().is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    let line = command.display_line();
    log::debug!("Executing '{}' in '{}'.", line, cwd.display());

    let status = StdCommand::new(&command.program)
        .args(&command.args)
        .current_dir(dunce::simplified(cwd))
        .envs(&command.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExecutionError::NotFound(command.program.clone()),
            _ => ExecutionError::CommandFailed(line.clone(), e),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ExecutionError::NonZeroExitStatus {
            command: line,
            code: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_quoted_arguments() {
        let cmd = ExternalCommand::parse(r#"mysql --execute="SELECT 1" --batch"#).unwrap();
        assert_eq!(cmd.program, "mysql");
        assert_eq!(cmd.args, vec!["--execute=SELECT 1", "--batch"]);
    }

    #[test]
    fn test_parse_rejects_empty_and_unbalanced_lines() {
        assert!(matches!(ExternalCommand::parse("   "), Err(ExecutionError::EmptyCommand)));
        assert!(matches!(
            ExternalCommand::parse("mysql \"unterminated"),
            Err(ExecutionError::CommandParse(_))
        ));
    }

    #[test]
    fn test_display_line_hides_environment() {
        let cmd = ExternalCommand::new("mysql")
            .arg("--user=root")
            .arg("SELECT 1")
            .env("MYSQL_PWD", "secret");
        let line = cmd.display_line();
        assert!(line.starts_with("mysql "));
        assert!(line.ends_with("'SELECT 1'"));
        assert!(!line.contains("secret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_is_reported() {
        let cmd = ExternalCommand::new("definitely-not-a-real-binary-4f1c");
        let err = execute_command(&cmd, Path::new(".")).unwrap_err();
        assert!(matches!(err, ExecutionError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_an_error() {
        let cmd = ExternalCommand::new("sh").arg("-c").arg("exit 3");
        let err = execute_command(&cmd, Path::new(".")).unwrap_err();
        assert!(matches!(err, ExecutionError::NonZeroExitStatus { code: 3, .. }));
    }
}
