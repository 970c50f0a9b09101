//! Ordered fallback over diagnostic commands
//!
//! Each command is tried in turn until one exits 0 with empty stderr. Benign
//! misses advance to the next command; any other failure aborts the run.

use tracing::debug;

use crate::error::ProbeError;
use crate::executor::Executor;
use podprobe_types::{CandidatePod, ExecOutput, ExitClass, ExitStatus};

/// Outcome of running the chain against one pod
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainResult {
    /// Discovered artifact line or raw command output; empty if nothing matched
    pub info: String,
    /// Whether some command exited cleanly
    pub exited_cleanly: bool,
    /// The command that ended the chain
    pub command: Option<String>,
}

pub struct FallbackChain {
    commands: Vec<String>,
    artifact_suffixes: Vec<String>,
    benign_exit_codes: Vec<i32>,
}

impl FallbackChain {
    /// Blank commands are dropped
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands: commands
                .into_iter()
                .filter(|c| !c.trim().is_empty())
                .collect(),
            artifact_suffixes: vec![".war".to_string()],
            benign_exit_codes: vec![1, 2],
        }
    }

    pub fn with_artifact_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.artifact_suffixes = suffixes
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();
        self
    }

    pub fn with_benign_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.benign_exit_codes = codes;
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Decide whether a finished command succeeded, missed, or failed
    pub fn classify(&self, output: &ExecOutput) -> ExitClass {
        match &output.exit {
            ExitStatus::Success if output.stderr.is_empty() => ExitClass::Success,
            ExitStatus::Success => ExitClass::Benign,
            ExitStatus::Exited(code) if self.benign_exit_codes.contains(code) => ExitClass::Benign,
            ExitStatus::Exited(_) | ExitStatus::Failed { .. } => ExitClass::Fatal,
        }
    }

    pub async fn run(
        &self,
        executor: &Executor<'_>,
        pod: &CandidatePod,
    ) -> Result<ChainResult, ProbeError> {
        for command in &self.commands {
            let output = executor.exec_line(pod, command).await?;

            match self.classify(&output) {
                ExitClass::Success => {
                    return Ok(ChainResult {
                        info: self.extract_info(command, &output.stdout),
                        exited_cleanly: true,
                        command: Some(command.clone()),
                    });
                }
                ExitClass::Benign => {
                    debug!("{}: `{}` did not apply ({})", pod, command, output.exit);
                }
                ExitClass::Fatal => {
                    return Err(ProbeError::FatalExec {
                        pod: pod.to_string(),
                        command: command.clone(),
                        status: output.exit,
                    });
                }
            }
        }

        debug!("{}: no command succeeded", pod);
        Ok(ChainResult::default())
    }

    fn extract_info(&self, command: &str, stdout: &str) -> String {
        if is_listing_probe(command) {
            find_artifact(stdout, &self.artifact_suffixes).unwrap_or_default()
        } else {
            stdout.to_string()
        }
    }
}

/// A listing probe is a command whose program is exactly `ls`.
///
/// Only the bare program name counts: `/bin/ls` and `lsof` keep their raw
/// stdout.
pub fn is_listing_probe(command: &str) -> bool {
    command.split_whitespace().next() == Some("ls")
}

/// First line ending (case-insensitively) in one of `suffixes`, with carriage
/// returns removed. Suffixes must be lowercase.
pub fn find_artifact(stdout: &str, suffixes: &[String]) -> Option<String> {
    stdout
        .split('\n')
        .map(|line| line.replace('\r', ""))
        .find(|line| {
            let lower = line.to_lowercase();
            suffixes.iter().any(|s| lower.ends_with(s.as_str()))
        })
}
