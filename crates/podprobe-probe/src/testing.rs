//! In-memory cluster for engine tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use podprobe_k8s::ClusterApi;
use podprobe_types::{
    CandidatePod, ContainerInfo, DeploymentInfo, ExecOutput, NamespaceWorkloads, PodInfo,
    PodStatus, WorkloadIndex,
};

/// Exec results are scripted per pod and consumed in call order
#[derive(Default)]
pub(crate) struct FakeCluster {
    config_maps: HashMap<(String, String), BTreeMap<String, String>>,
    deployments: HashMap<String, Vec<DeploymentInfo>>,
    pods: HashMap<String, Vec<PodInfo>>,
    failing_namespaces: HashSet<String>,
    exec_results: Mutex<HashMap<String, VecDeque<Option<ExecOutput>>>>,
    exec_calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_map(mut self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.config_maps
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_deployment(mut self, namespace: &str, name: &str) -> Self {
        self.deployments
            .entry(namespace.to_string())
            .or_default()
            .push(DeploymentInfo::new(name.to_string(), namespace.to_string()));
        self
    }

    pub fn with_pod(mut self, pod: PodInfo) -> Self {
        self.pods.entry(pod.namespace.clone()).or_default().push(pod);
        self
    }

    /// Every API call touching this namespace fails
    pub fn failing_namespace(mut self, namespace: &str) -> Self {
        self.failing_namespaces.insert(namespace.to_string());
        self
    }

    pub fn script_exec(&self, pod_name: &str, output: ExecOutput) {
        self.exec_results
            .lock()
            .entry(pod_name.to_string())
            .or_default()
            .push_back(Some(output));
    }

    pub fn script_transport_error(&self, pod_name: &str) {
        self.exec_results
            .lock()
            .entry(pod_name.to_string())
            .or_default()
            .push_back(None);
    }

    /// (pod name, argv) for every exec call so far
    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.exec_calls.lock().clone()
    }

    fn check_namespace(&self, namespace: &str) -> Result<()> {
        if self.failing_namespaces.contains(namespace) {
            return Err(anyhow!("namespace {} is unreachable", namespace));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn config_map_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        self.check_namespace(namespace)?;
        Ok(self
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentInfo>> {
        self.check_namespace(namespace)?;
        Ok(self.deployments.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        self.check_namespace(namespace)?;
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn exec(&self, target: &CandidatePod, command: &[String]) -> Result<ExecOutput> {
        self.exec_calls
            .lock()
            .push((target.pod_name.clone(), command.to_vec()));

        let next = self
            .exec_results
            .lock()
            .get_mut(&target.pod_name)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Some(output)) => Ok(output),
            Some(None) => Err(anyhow!("connection reset by peer")),
            None => Err(anyhow!("no exec result scripted for {}", target.pod_name)),
        }
    }
}

/// A running pod whose single container is ready
pub(crate) fn ready_pod(namespace: &str, name: &str, container: &str) -> PodInfo {
    let mut pod = PodInfo::new(name.to_string(), namespace.to_string());
    pod.status = PodStatus::Running;
    pod.container_names = vec![container.to_string()];
    let mut status = ContainerInfo::new(container.to_string());
    status.ready = true;
    pod.containers = vec![status];
    pod
}

pub(crate) fn candidate(namespace: &str, pod_name: &str, workload: &str) -> CandidatePod {
    CandidatePod {
        namespace: namespace.to_string(),
        pod_name: pod_name.to_string(),
        workload: workload.to_string(),
        container: "app".to_string(),
        ready: true,
    }
}

/// Workloads tracked for `namespace`; panics if the namespace was not indexed
pub(crate) fn workloads<'a>(
    index: &'a WorkloadIndex,
    namespace: &str,
) -> &'a NamespaceWorkloads {
    index
        .iter()
        .find(|n| n.namespace == namespace)
        .unwrap_or_else(|| panic!("namespace {} not indexed", namespace))
}
