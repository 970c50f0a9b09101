use tracing::{debug, info};

use crate::error::ProbeError;
use podprobe_k8s::ClusterApi;
use podprobe_types::TargetConfig;

/// Location of the target configuration in the cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSource {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Read and parse the target configuration from its ConfigMap
pub async fn load_target_config(
    cluster: &dyn ClusterApi,
    source: &ConfigSource,
) -> Result<TargetConfig, ProbeError> {
    debug!(
        "Reading target config from ConfigMap {}/{} key {}",
        source.namespace, source.name, source.key
    );

    let data = cluster
        .config_map_data(&source.namespace, &source.name)
        .await
        .map_err(|e| ProbeError::ConfigUnavailable {
            namespace: source.namespace.clone(),
            name: source.name.clone(),
            source: Some(e.into()),
        })?
        .ok_or_else(|| ProbeError::ConfigUnavailable {
            namespace: source.namespace.clone(),
            name: source.name.clone(),
            source: None,
        })?;

    let value = data
        .get(&source.key)
        .ok_or_else(|| ProbeError::ConfigMalformed {
            namespace: source.namespace.clone(),
            name: source.name.clone(),
            detail: format!("key '{}' is missing", source.key),
            source: None,
        })?;

    let config = TargetConfig::from_json(value).map_err(|e| ProbeError::ConfigMalformed {
        namespace: source.namespace.clone(),
        name: source.name.clone(),
        detail: format!("key '{}' is not a valid target config", source.key),
        source: Some(e),
    })?;

    info!("Loaded target config with {} namespaces", config.namespaces.len());
    Ok(config)
}
