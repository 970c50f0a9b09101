//! Remote command execution over the pod `exec` subresource

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::Api;
use kube::api::AttachParams;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use podprobe_types::{CandidatePod, ExecOutput, ExitStatus};

/// Run a command in the target container and collect its output and status.
///
/// Opening the session, a broken stream, or a session that closes without a
/// status frame are errors. A command that runs and fails is not.
pub(crate) async fn exec_in_pod(
    client: &kube::Client,
    target: &CandidatePod,
    command: &[String],
    tty: bool,
) -> Result<ExecOutput> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), &target.namespace);
    let params = AttachParams::default()
        .container(target.container.clone())
        .stdin(false)
        .stdout(true)
        .stderr(!tty)
        .tty(tty);

    debug!("exec {} [{}]: {:?}", target, target.container, command);

    let mut process = pods
        .exec(&target.pod_name, command.to_vec(), &params)
        .await
        .with_context(|| format!("Failed to open exec session to {}", target))?;

    let status = process.take_status();
    let stdout_reader = process.stdout();
    let stderr_reader = process.stderr();

    // Drain both streams together so neither side blocks on a full buffer
    let (stdout, stderr) = tokio::join!(read_stream(stdout_reader), read_stream(stderr_reader));
    let stdout = stdout.with_context(|| format!("Failed to read stdout from {}", target))?;
    let stderr = stderr.with_context(|| format!("Failed to read stderr from {}", target))?;

    let status = match status {
        Some(status) => status.await,
        None => None,
    };

    process
        .join()
        .await
        .with_context(|| format!("Exec session to {} ended abnormally", target))?;

    let status = status.with_context(|| {
        format!("Exec session to {} closed without reporting an exit status", target)
    })?;

    Ok(ExecOutput::new(stdout, stderr, exit_status(&status)))
}

async fn read_stream<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Decode the status frame sent when a remote process exits.
///
/// A non-zero exit arrives as a `Failure` with reason `NonZeroExitCode` and an
/// `ExitCode` cause whose message holds the code.
pub fn exit_status(status: &Status) -> ExitStatus {
    if status.status.as_deref() == Some("Success") {
        return ExitStatus::Success;
    }

    let reason = status.reason.clone().unwrap_or_else(|| "Unknown".to_string());

    if reason == "NonZeroExitCode" {
        let code = status
            .details
            .as_ref()
            .and_then(|d| d.causes.as_ref())
            .and_then(|causes| {
                causes
                    .iter()
                    .find(|c| c.reason.as_deref() == Some("ExitCode"))
            })
            .and_then(|c| c.message.as_deref())
            .and_then(|m| m.trim().parse::<i32>().ok());

        if let Some(code) = code {
            return ExitStatus::Exited(code);
        }
    }

    ExitStatus::Failed {
        reason,
        message: status.message.clone().unwrap_or_default(),
    }
}
