use podprobe_types::ExitStatus;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a probe run
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("configuration ConfigMap {namespace}/{name} is unavailable")]
    ConfigUnavailable {
        namespace: String,
        name: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("configuration ConfigMap {namespace}/{name} is malformed: {detail}")]
    ConfigMalformed {
        namespace: String,
        name: String,
        detail: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("failed to list {kind} in namespace {namespace}")]
    List {
        kind: &'static str,
        namespace: String,
        #[source]
        source: BoxError,
    },

    #[error("exec transport to {pod} failed")]
    Transport {
        pod: String,
        #[source]
        source: BoxError,
    },

    #[error("command `{command}` in {pod} failed with {status}")]
    FatalExec {
        pod: String,
        command: String,
        status: ExitStatus,
    },
}

impl ProbeError {
    pub(crate) fn list(kind: &'static str, namespace: &str, source: anyhow::Error) -> Self {
        Self::List {
            kind,
            namespace: namespace.to_string(),
            source: source.into(),
        }
    }
}

/// Errors loading the local settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
