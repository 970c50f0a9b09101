use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::Api;
use kube::api::ListParams;
use std::collections::BTreeMap;

use crate::exec;
use podprobe_types::{CandidatePod, ContainerInfo, DeploymentInfo, ExecOutput, PodInfo, PodStatus};

/// Cluster operations used by the probe engine.
///
/// An `Err` from any method means the call itself failed (API error, broken
/// stream). A remote command that runs and exits non-zero is not an error for
/// [`ClusterApi::exec`]; its status is carried in [`ExecOutput::exit`].
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Data of a ConfigMap, or `None` if it does not exist
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>>;

    /// All deployments in a namespace
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentInfo>>;

    /// All pods in a namespace, in the order the API returns them
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>>;

    /// Run `command` in the target pod's container and wait for it to exit
    async fn exec(&self, target: &CandidatePod, command: &[String]) -> Result<ExecOutput>;
}

/// [`ClusterApi`] backed by a live API server
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    tty: bool,
}

impl KubeCluster {
    pub fn new(client: kube::Client) -> Self {
        Self { client, tty: false }
    }

    /// Attach a TTY to exec sessions. The API server merges stderr into
    /// stdout on a TTY, so stderr is not requested in that mode.
    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Convert a k8s Deployment to DeploymentInfo
    fn deployment_to_info(deploy: Deployment, namespace: &str) -> DeploymentInfo {
        let name = deploy.metadata.name.unwrap_or_default();
        let mut info = DeploymentInfo::new(name, namespace.to_string());

        if let Some(spec) = deploy.spec {
            info.replicas = spec.replicas.unwrap_or(0);
        }

        if let Some(status) = deploy.status {
            info.ready_replicas = status.ready_replicas.unwrap_or(0);
        }

        info
    }

    /// Convert a k8s Pod to PodInfo
    fn pod_to_info(pod: Pod, namespace: &str) -> PodInfo {
        let name = pod.metadata.name.unwrap_or_default();
        let mut info = PodInfo::new(name, namespace.to_string());

        if let Some(spec) = pod.spec {
            info.container_names = spec.containers.into_iter().map(|c| c.name).collect();
        }

        if let Some(status) = pod.status {
            info.status = status
                .phase
                .as_deref()
                .map(PodStatus::from)
                .unwrap_or(PodStatus::Unknown);

            if let Some(container_statuses) = status.container_statuses {
                info.containers = container_statuses
                    .into_iter()
                    .map(|cs| {
                        let mut container = ContainerInfo::new(cs.name);
                        container.ready = cs.ready;
                        container
                    })
                    .collect();
            }
        }

        info
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let config_map = config_maps.get_opt(name).await.context(format!(
            "Failed to get ConfigMap '{}' in namespace '{}'",
            name, namespace
        ))?;

        Ok(config_map.map(|cm| cm.data.unwrap_or_default()))
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentInfo>> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let list = deployments
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list deployments in {}", namespace))?;

        Ok(list
            .items
            .into_iter()
            .map(|d| Self::deployment_to_info(d, namespace))
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in {}", namespace))?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| Self::pod_to_info(pod, namespace))
            .collect())
    }

    async fn exec(&self, target: &CandidatePod, command: &[String]) -> Result<ExecOutput> {
        exec::exec_in_pod(&self.client, target, command, self.tty).await
    }
}
