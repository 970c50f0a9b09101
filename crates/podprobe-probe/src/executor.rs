use tracing::debug;

use crate::error::ProbeError;
use podprobe_k8s::ClusterApi;
use podprobe_types::{CandidatePod, ExecOutput};

/// Runs commands in selected pods, one blocking round trip at a time
pub struct Executor<'a> {
    cluster: &'a dyn ClusterApi,
}

impl<'a> Executor<'a> {
    pub fn new(cluster: &'a dyn ClusterApi) -> Self {
        Self { cluster }
    }

    /// Run `argv` in the pod's chosen container.
    ///
    /// Only transport failures are errors; the exit status is returned as-is.
    pub async fn exec(
        &self,
        pod: &CandidatePod,
        argv: &[String],
    ) -> Result<ExecOutput, ProbeError> {
        let output = self
            .cluster
            .exec(pod, argv)
            .await
            .map_err(|e| ProbeError::Transport {
                pod: pod.to_string(),
                source: e.into(),
            })?;

        debug!(
            "{} `{}` -> {} ({} bytes stdout, {} bytes stderr)",
            pod,
            argv.join(" "),
            output.exit,
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(output)
    }

    /// Run a command line, split on whitespace into argv
    pub async fn exec_line(
        &self,
        pod: &CandidatePod,
        command: &str,
    ) -> Result<ExecOutput, ProbeError> {
        self.exec(pod, &split_command(command)).await
    }
}

/// Split a command line into argv. No quoting or shell expansion is applied.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
