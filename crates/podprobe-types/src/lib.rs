//! Shared types for podprobe
//!
//! This crate contains data structures used across multiple podprobe crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier used when the environment probe finds no matching variable
pub const DEFAULT_IDENTIFIER: &str = "None";

// ============================================================================
// Kubernetes Resource Types
// ============================================================================

/// Deployment information
#[derive(Clone, Debug)]
pub struct DeploymentInfo {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready_replicas: i32,
}

impl DeploymentInfo {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            replicas: 0,
            ready_replicas: 0,
        }
    }

    /// Format replica status as "ready/total"
    pub fn replica_status(&self) -> String {
        format!("{}/{}", self.ready_replicas, self.replicas)
    }
}

/// Pod information
#[derive(Clone, Debug)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub status: PodStatus,
    /// Reported container statuses
    pub containers: Vec<ContainerInfo>,
    /// Container names as declared in the pod spec, in declaration order
    pub container_names: Vec<String>,
}

impl PodInfo {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            status: PodStatus::Unknown,
            containers: Vec::new(),
            container_names: Vec::new(),
        }
    }

    /// Name of the deployment that generated this pod.
    ///
    /// Deployment pods are named `<deployment>-<replicaset hash>-<suffix>`, so
    /// the last two hyphen-delimited segments are dropped. Returns `None` when
    /// the name has fewer than two hyphens.
    pub fn owning_workload(&self) -> Option<&str> {
        let mut parts = self.name.rsplitn(3, '-');
        parts.next()?;
        parts.next()?;
        parts.next()
    }

    /// True when every reported container status is ready.
    /// A pod without reported statuses passes.
    pub fn all_containers_ready(&self) -> bool {
        self.containers.iter().all(|c| c.ready)
    }

    pub fn is_running(&self) -> bool {
        self.status == PodStatus::Running
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodStatus {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContainerInfo {
    pub name: String,
    pub ready: bool,
}

impl ContainerInfo {
    pub fn new(name: String) -> Self {
        Self { name, ready: false }
    }
}

// ============================================================================
// Probe Types
// ============================================================================

/// Namespaces to scan and an optional command list override.
///
/// Stored as JSON in a ConfigMap: `{"namespaces": [...], "path": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub path: Option<Vec<String>>,
}

impl TargetConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Static configuration used when namespaces are given directly
    pub fn from_namespaces(namespaces: Vec<String>) -> Self {
        Self {
            namespaces,
            path: None,
        }
    }

    /// Command override, if one was configured and is non-empty
    pub fn commands(&self) -> Option<&[String]> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Deployments of one namespace and whether a pod has been claimed for each
#[derive(Clone, Debug)]
pub struct NamespaceWorkloads {
    pub namespace: String,
    workloads: BTreeMap<String, bool>,
}

impl NamespaceWorkloads {
    pub fn new(namespace: String) -> Self {
        Self {
            namespace,
            workloads: BTreeMap::new(),
        }
    }

    /// Track a workload as unfulfilled. Returns false if it was already tracked.
    pub fn insert(&mut self, name: String) -> bool {
        if self.workloads.contains_key(&name) {
            return false;
        }
        self.workloads.insert(name, false);
        true
    }

    /// Mark a workload fulfilled. Returns true only for a tracked workload
    /// that had not been claimed yet.
    pub fn claim(&mut self, name: &str) -> bool {
        match self.workloads.get_mut(name) {
            Some(fulfilled) if !*fulfilled => {
                *fulfilled = true;
                true
            }
            _ => false,
        }
    }

    /// `None` for an untracked workload
    pub fn is_fulfilled(&self, name: &str) -> Option<bool> {
        self.workloads.get(name).copied()
    }

    pub fn unfulfilled(&self) -> impl Iterator<Item = &str> {
        self.workloads
            .iter()
            .filter(|(_, fulfilled)| !**fulfilled)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }
}

/// Per-namespace workload sets, in configuration order
#[derive(Clone, Debug, Default)]
pub struct WorkloadIndex {
    namespaces: Vec<NamespaceWorkloads>,
}

impl WorkloadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a namespace, creating it if needed
    pub fn namespace_mut(&mut self, namespace: &str) -> &mut NamespaceWorkloads {
        let pos = match self.namespaces.iter().position(|n| n.namespace == namespace) {
            Some(pos) => pos,
            None => {
                self.namespaces
                    .push(NamespaceWorkloads::new(namespace.to_string()));
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[pos]
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceWorkloads> {
        self.namespaces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NamespaceWorkloads> {
        self.namespaces.iter_mut()
    }

    /// Total number of tracked workloads across namespaces
    pub fn workload_count(&self) -> usize {
        self.namespaces.iter().map(NamespaceWorkloads::len).sum()
    }
}

/// A pod chosen to represent its workload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidatePod {
    pub namespace: String,
    pub pod_name: String,
    pub workload: String,
    pub container: String,
    pub ready: bool,
}

impl fmt::Display for CandidatePod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.pod_name)
    }
}

/// How a remote process ended, as reported by the exec status frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Non-zero exit code
    Exited(i32),
    /// Failure without an exit code (e.g. the executable was not found)
    Failed { reason: String, message: String },
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "exit code 0"),
            Self::Exited(code) => write!(f, "exit code {}", code),
            Self::Failed { reason, message } => write!(f, "{}: {}", reason, message),
        }
    }
}

/// Captured output of one remote command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitStatus,
}

impl ExecOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit: ExitStatus) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit,
        }
    }

    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "", ExitStatus::Success)
    }

    pub fn exited(code: i32) -> Self {
        Self::new("", "", ExitStatus::Exited(code))
    }
}

/// Decision for a finished probe command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitClass {
    /// Exit 0 with empty stderr
    Success,
    /// The probe did not apply: a benign exit code, or exit 0 with stderr
    Benign,
    /// Any other failure; aborts the run
    Fatal,
}

/// Identifier and discovered info for one pod
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultEntry {
    pub identifier: String,
    pub info: String,
}

impl ResultEntry {
    /// Create an entry with line breaks removed from both fields
    pub fn new(identifier: &str, info: &str) -> Self {
        Self {
            identifier: strip_line_breaks(identifier),
            info: strip_line_breaks(info),
        }
    }
}

/// Final identifier -> info table. Later entries replace earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    entries: BTreeMap<String, String>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the info it replaced
    pub fn insert(&mut self, entry: ResultEntry) -> Option<String> {
        self.entries.insert(entry.identifier, entry.info)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Output lines in the form `<identifier> <info>`
    pub fn lines(&self) -> Vec<String> {
        self.iter()
            .map(|(identifier, info)| format!("{} {}", identifier, info))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remove every carriage return and newline
pub fn strip_line_breaks(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}
