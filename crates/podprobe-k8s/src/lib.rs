//! Kubernetes client for podprobe
//!
//! This crate provides kubeconfig loading and the cluster operations the probe
//! engine depends on: reading a ConfigMap, listing deployments and pods, and
//! executing commands inside a container.

mod client;
mod cluster;
mod exec;

pub use client::KubeClient;
pub use cluster::{ClusterApi, KubeCluster};
pub use exec::exit_status;

// Re-export types that are used in our public API
pub use podprobe_types::{
    CandidatePod, ContainerInfo, DeploymentInfo, ExecOutput, ExitStatus, PodInfo, PodStatus,
};
