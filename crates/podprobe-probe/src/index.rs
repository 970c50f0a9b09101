use tracing::{debug, info};

use crate::error::ProbeError;
use podprobe_k8s::ClusterApi;
use podprobe_types::WorkloadIndex;

/// List the deployments of every namespace and track each as unfulfilled.
///
/// A failed list aborts the whole build.
pub async fn build_index(
    cluster: &dyn ClusterApi,
    namespaces: &[String],
) -> Result<WorkloadIndex, ProbeError> {
    let mut index = WorkloadIndex::new();

    for namespace in namespaces {
        let deployments = cluster
            .list_deployments(namespace)
            .await
            .map_err(|e| ProbeError::list("deployments", namespace, e))?;

        let workloads = index.namespace_mut(namespace);
        for deployment in deployments {
            debug!(
                "Tracking deployment {}/{} ({} ready)",
                namespace,
                deployment.name,
                deployment.replica_status()
            );
            workloads.insert(deployment.name);
        }
    }

    info!(
        "Indexed {} deployments across {} namespaces",
        index.workload_count(),
        namespaces.len()
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCluster, workloads};

    fn namespaces(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_builds_unfulfilled_sets() {
        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .with_deployment("shop", "worker")
            .with_deployment("billing", "api");

        let index = build_index(&cluster, &namespaces(&["shop", "billing", "empty"]))
            .await
            .unwrap();

        let shop = workloads(&index, "shop");
        assert_eq!(shop.len(), 2);
        assert_eq!(shop.is_fulfilled("web"), Some(false));
        assert_eq!(shop.is_fulfilled("api"), None);
        assert_eq!(workloads(&index, "billing").is_fulfilled("api"), Some(false));
        assert!(workloads(&index, "empty").is_empty());
        assert_eq!(index.workload_count(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_namespace_indexed_once() {
        let cluster = FakeCluster::new().with_deployment("shop", "web");
        let index = build_index(&cluster, &namespaces(&["shop", "shop"]))
            .await
            .unwrap();

        assert_eq!(index.iter().count(), 1);
        assert_eq!(index.workload_count(), 1);
    }

    #[tokio::test]
    async fn test_list_failure_aborts() {
        let cluster = FakeCluster::new()
            .with_deployment("shop", "web")
            .failing_namespace("billing");

        let err = build_index(&cluster, &namespaces(&["shop", "billing"]))
            .await
            .unwrap_err();
        match err {
            ProbeError::List {
                kind, namespace, ..
            } => {
                assert_eq!(kind, "deployments");
                assert_eq!(namespace, "billing");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
