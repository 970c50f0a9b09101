use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ProbeError;
use podprobe_k8s::ClusterApi;
use podprobe_types::{CandidatePod, PodInfo, WorkloadIndex};

/// Which pods may be probed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Every reported container status is ready
    #[default]
    AllContainersReady,
    /// The pod phase is `Running`, regardless of readiness
    RunningPhase,
}

impl SelectionPolicy {
    pub fn is_eligible(&self, pod: &PodInfo) -> bool {
        match self {
            Self::AllContainersReady => pod.all_containers_ready(),
            Self::RunningPhase => pod.is_running(),
        }
    }
}

/// Pick at most one eligible pod per tracked deployment.
///
/// Pods are considered in list order, so the first eligible replica of a
/// deployment wins. Claimed deployments are marked fulfilled in `index`.
pub async fn select_pods(
    cluster: &dyn ClusterApi,
    index: &mut WorkloadIndex,
    policy: SelectionPolicy,
    container: Option<&str>,
) -> Result<Vec<CandidatePod>, ProbeError> {
    let mut selected = Vec::new();

    for workloads in index.iter_mut() {
        let pods = cluster
            .list_pods(&workloads.namespace)
            .await
            .map_err(|e| ProbeError::list("pods", &workloads.namespace, e))?;

        for pod in &pods {
            if !policy.is_eligible(pod) {
                debug!("Skipping {}/{}: not eligible", pod.namespace, pod.name);
                continue;
            }

            let Some(workload) = pod.owning_workload() else {
                continue;
            };

            if workloads.is_fulfilled(workload) != Some(false) {
                continue;
            }

            let Some(container) = exec_container(pod, container) else {
                debug!("Skipping {}/{}: no containers", pod.namespace, pod.name);
                continue;
            };

            if workloads.claim(workload) {
                debug!("Selected {}/{} for {}", pod.namespace, pod.name, workload);
                selected.push(CandidatePod {
                    namespace: pod.namespace.clone(),
                    pod_name: pod.name.clone(),
                    workload: workload.to_string(),
                    container: container.to_string(),
                    ready: pod.all_containers_ready(),
                });
            }
        }

        for workload in workloads.unfulfilled() {
            debug!("No eligible pod for {}/{}", workloads.namespace, workload);
        }
    }

    info!("Selected {} pods", selected.len());
    Ok(selected)
}

/// The preferred container if the pod declares it, else the first one
fn exec_container<'a>(pod: &'a PodInfo, preferred: Option<&str>) -> Option<&'a str> {
    preferred
        .and_then(|name| pod.container_names.iter().find(|c| c.as_str() == name))
        .or_else(|| pod.container_names.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::testing::{FakeCluster, ready_pod, workloads};
    use podprobe_types::PodStatus;

    async fn select(
        cluster: &FakeCluster,
        namespaces: &[&str],
        policy: SelectionPolicy,
    ) -> (Vec<CandidatePod>, WorkloadIndex) {
        let namespaces: Vec<String> = namespaces.iter().map(|n| n.to_string()).collect();
        let mut index = build_index(cluster, &namespaces).await.unwrap();
        let pods = select_pods(cluster, &mut index, policy, None).await.unwrap();
        (pods, index)
    }

    fn names(pods: &[CandidatePod]) -> Vec<&str> {
        pods.iter().map(|p| p.pod_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_first_ready_replica_wins() {
        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_pod(ready_pod("shop", "web-5d8f9-aaaaa", "tomcat"))
            .with_pod(ready_pod("shop", "web-5d8f9-bbbbb", "tomcat"));

        let (pods, index) = select(&cluster, &["shop"], SelectionPolicy::AllContainersReady).await;
        assert_eq!(names(&pods), vec!["web-5d8f9-aaaaa"]);
        assert_eq!(pods[0].workload, "web");
        assert_eq!(pods[0].container, "tomcat");
        assert_eq!(workloads(&index, "shop").is_fulfilled("web"), Some(true));
    }

    #[tokio::test]
    async fn test_unready_replica_is_skipped() {
        let mut unready = ready_pod("shop", "web-5d8f9-aaaaa", "tomcat");
        unready.containers[0].ready = false;

        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_pod(unready)
            .with_pod(ready_pod("shop", "web-5d8f9-bbbbb", "tomcat"));

        let (pods, _) = select(&cluster, &["shop"], SelectionPolicy::AllContainersReady).await;
        assert_eq!(names(&pods), vec!["web-5d8f9-bbbbb"]);
    }

    #[tokio::test]
    async fn test_running_phase_policy_ignores_readiness() {
        let mut unready = ready_pod("shop", "web-5d8f9-aaaaa", "tomcat");
        unready.containers[0].ready = false;
        let mut pending = ready_pod("shop", "api-77c4f-ccccc", "api");
        pending.status = PodStatus::Pending;

        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_deployment("shop", "api")
            .with_pod(unready)
            .with_pod(pending);

        let (pods, _) = select(&cluster, &["shop"], SelectionPolicy::RunningPhase).await;
        assert_eq!(names(&pods), vec!["web-5d8f9-aaaaa"]);
        assert!(!pods[0].ready);
    }

    #[tokio::test]
    async fn test_untracked_and_nonconforming_pods_are_skipped() {
        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_pod(ready_pod("shop", "standalone", "app"))
            .with_pod(ready_pod("shop", "cron-job-28391-xyz12", "job"))
            .with_pod(ready_pod("shop", "static-web", "app"));

        let (pods, index) = select(&cluster, &["shop"], SelectionPolicy::AllContainersReady).await;
        assert!(pods.is_empty());
        assert_eq!(workloads(&index, "shop").unfulfilled().collect::<Vec<_>>(), vec!["web"]);
    }

    #[tokio::test]
    async fn test_each_workload_claimed_once_per_namespace() {
        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_deployment("billing", "web")
            .with_pod(ready_pod("shop", "web-1a2b3-aaaaa", "app"))
            .with_pod(ready_pod("shop", "web-1a2b3-bbbbb", "app"))
            .with_pod(ready_pod("billing", "web-9f8e7-ccccc", "app"));

        let (pods, _) = select(
            &cluster,
            &["shop", "billing"],
            SelectionPolicy::AllContainersReady,
        )
        .await;
        assert_eq!(names(&pods), vec!["web-1a2b3-aaaaa", "web-9f8e7-ccccc"]);
        assert_eq!(pods[1].namespace, "billing");
    }

    #[tokio::test]
    async fn test_pod_without_containers_does_not_claim() {
        let mut bare = ready_pod("shop", "web-1a2b3-aaaaa", "app");
        bare.container_names.clear();

        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_pod(bare)
            .with_pod(ready_pod("shop", "web-1a2b3-bbbbb", "app"));

        let (pods, _) = select(&cluster, &["shop"], SelectionPolicy::AllContainersReady).await;
        assert_eq!(names(&pods), vec!["web-1a2b3-bbbbb"]);
    }

    #[tokio::test]
    async fn test_list_failure_aborts() {
        let cluster = FakeCluster::new().with_deployment("shop", "web");
        let mut index = build_index(&cluster, &["shop".to_string()]).await.unwrap();

        let failing = FakeCluster::new().failing_namespace("shop");
        let err = select_pods(&failing, &mut index, SelectionPolicy::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::List { kind: "pods", .. }));
    }

    #[test]
    fn test_exec_container_prefers_named() {
        let mut pod = ready_pod("shop", "web-1a2b3-aaaaa", "istio-proxy");
        pod.container_names.push("tomcat".to_string());

        assert_eq!(exec_container(&pod, Some("tomcat")), Some("tomcat"));
        assert_eq!(exec_container(&pod, Some("missing")), Some("istio-proxy"));
        assert_eq!(exec_container(&pod, None), Some("istio-proxy"));
    }
}
