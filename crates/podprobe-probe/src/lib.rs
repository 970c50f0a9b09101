//! Probe engine for podprobe
//!
//! This crate selects one eligible pod per deployment, runs diagnostic
//! commands inside it, and aggregates what it finds into a result table.

mod aggregate;
mod chain;
mod config;
mod error;
mod executor;
mod index;
mod selector;
mod settings;
#[cfg(test)]
mod testing;

pub use aggregate::{aggregate, extract_identifier};
pub use chain::{ChainResult, FallbackChain, find_artifact, is_listing_probe};
pub use config::{ConfigSource, load_target_config};
pub use error::{ProbeError, SettingsError};
pub use executor::{Executor, split_command};
pub use index::build_index;
pub use selector::{SelectionPolicy, select_pods};
pub use settings::ProbeSettings;

// Re-export types used in our public API
pub use podprobe_types::{ResultEntry, ResultTable, TargetConfig};

use podprobe_k8s::ClusterApi;
use podprobe_types::{CandidatePod, ExitStatus};
use tracing::{debug, info, warn};

/// Runs a full discovery pass against a cluster
pub struct Prober<'a> {
    cluster: &'a dyn ClusterApi,
    settings: &'a ProbeSettings,
}

impl<'a> Prober<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, settings: &'a ProbeSettings) -> Self {
        Self { cluster, settings }
    }

    /// Load the target configuration from the ConfigMap named in the settings
    pub async fn load_config(&self) -> Result<TargetConfig, ProbeError> {
        load_target_config(self.cluster, &self.settings.config_source()).await
    }

    /// Index deployments, select pods, and probe each selected pod in turn.
    ///
    /// Any fatal error aborts the pass; no partial table is returned.
    pub async fn run(&self, target: &TargetConfig) -> Result<ResultTable, ProbeError> {
        let mut index = build_index(self.cluster, &target.namespaces).await?;
        let pods = select_pods(
            self.cluster,
            &mut index,
            self.settings.selection,
            self.settings.container.as_deref(),
        )
        .await?;

        let chain = self.chain(target);
        let executor = Executor::new(self.cluster);
        let mut table = ResultTable::new();

        for pod in &pods {
            let entry = self.probe_pod(&executor, &chain, pod).await?;
            let identifier = entry.identifier.clone();
            if let Some(previous) = table.insert(entry) {
                debug!("{}: replaced info '{}' for {}", pod, previous, identifier);
            }
        }

        info!("Probed {} pods, found {} identifiers", pods.len(), table.len());
        Ok(table)
    }

    /// Commands from the target config take precedence over the settings
    fn chain(&self, target: &TargetConfig) -> FallbackChain {
        let commands = target
            .commands()
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.settings.commands.clone());

        FallbackChain::new(commands)
            .with_artifact_suffixes(self.settings.artifact_suffixes.clone())
            .with_benign_exit_codes(self.settings.benign_exit_codes.clone())
    }

    async fn probe_pod(
        &self,
        executor: &Executor<'_>,
        chain: &FallbackChain,
        pod: &CandidatePod,
    ) -> Result<ResultEntry, ProbeError> {
        let env = executor.exec_line(pod, &self.settings.env_command).await?;
        if env.exit != ExitStatus::Success {
            return Err(ProbeError::FatalExec {
                pod: pod.to_string(),
                command: self.settings.env_command.clone(),
                status: env.exit,
            });
        }
        if !env.stderr.is_empty() {
            warn!("{}: environment probe wrote to stderr: {}", pod, env.stderr.trim_end());
        }

        let result = chain.run(executor, pod).await?;
        match &result.command {
            Some(command) if result.exited_cleanly => {
                debug!("{}: info taken from `{}`", pod, command);
            }
            _ => debug!("{}: no diagnostic command exited cleanly, info left empty", pod),
        }
        Ok(aggregate(pod, &env.stdout, &result.info, &self.settings.env_var))
    }
}
