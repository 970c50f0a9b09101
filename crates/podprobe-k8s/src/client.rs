use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::path::Path;
use tracing::debug;

/// Kubernetes client factory
pub struct KubeClient {
    kubeconfig: Option<Kubeconfig>,
    current_context: Option<String>,
}

impl KubeClient {
    /// Load the kubeconfig from `path`, or from the default locations.
    ///
    /// An explicit path must be readable. Without one, a missing kubeconfig is
    /// not an error: [`KubeClient::client`] then falls back to in-cluster config.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let kubeconfig = match path {
            Some(path) => Some(
                Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig at {}", path.display()))?,
            ),
            None => match Kubeconfig::read() {
                Ok(kubeconfig) => Some(kubeconfig),
                Err(e) => {
                    debug!("No usable kubeconfig ({}), will try in-cluster config", e);
                    None
                }
            },
        };

        let current_context = kubeconfig.as_ref().and_then(|k| k.current_context.clone());

        Ok(Self {
            kubeconfig,
            current_context,
        })
    }

    /// Names of all contexts in the kubeconfig
    pub fn context_names(&self) -> Vec<&str> {
        self.kubeconfig
            .iter()
            .flat_map(|k| k.contexts.iter())
            .map(|ctx| ctx.name.as_str())
            .collect()
    }

    /// Get the current context name
    pub fn current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    /// Create a kube::Client for `context`, or for the current context when `None`
    pub async fn client(&self, context: Option<&str>) -> Result<kube::Client> {
        let config = match &self.kubeconfig {
            Some(kubeconfig) => {
                if let Some(name) = context {
                    if !self.context_names().contains(&name) {
                        anyhow::bail!("Context '{}' not found in kubeconfig", name);
                    }
                }

                let context_name = context.or(self.current_context()).unwrap_or("<default>");
                debug!("Using kubeconfig context {}", context_name);

                kube::Config::from_custom_kubeconfig(
                    kubeconfig.clone(),
                    &KubeConfigOptions {
                        context: context.map(str::to_string),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context_name
                ))?
            }
            None => {
                if let Some(name) = context {
                    anyhow::bail!("Context '{}' requested but no kubeconfig was found", name);
                }
                debug!("Using in-cluster configuration");
                kube::Config::incluster()
                    .context("No kubeconfig found and not running inside a cluster")?
            }
        };

        kube::Client::try_from(config).context("Failed to create Kubernetes client")
    }
}
