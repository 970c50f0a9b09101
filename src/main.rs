use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use podprobe_k8s::{KubeClient, KubeCluster};
use podprobe_probe::{ProbeSettings, Prober, ResultTable, SelectionPolicy, TargetConfig};

/// podprobe - Discover deployed artifacts by probing one ready pod per deployment
#[derive(Parser, Debug)]
#[command(name = "podprobe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Kubernetes context name (defaults to the current context)
    #[arg(long)]
    context: Option<String>,

    /// Namespace to scan; repeatable. Skips the ConfigMap lookup
    #[arg(short = 'n', long = "namespace", value_name = "NAMESPACE")]
    namespaces: Vec<String>,

    /// Settings file (defaults to ~/.podprobe/config.toml)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// ConfigMap holding the target configuration
    #[arg(long)]
    config_map: Option<String>,

    /// Namespace of the target configuration ConfigMap
    #[arg(long)]
    config_namespace: Option<String>,

    /// Key within the ConfigMap
    #[arg(long)]
    config_key: Option<String>,

    /// Environment variable that identifies a pod
    #[arg(long)]
    env_var: Option<String>,

    /// Diagnostic command; repeat to set the fallback order
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    commands: Vec<String>,

    /// Container to exec into (defaults to the pod's first container)
    #[arg(long)]
    container: Option<String>,

    /// Pod eligibility policy
    #[arg(long, value_enum)]
    selection: Option<Selection>,

    /// Attach a TTY to exec sessions (stderr is merged into stdout)
    #[arg(long)]
    tty: bool,

    /// Print results as a JSON object
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Selection {
    /// Every container reports ready
    Ready,
    /// Pod phase is Running
    Running,
}

impl From<Selection> for SelectionPolicy {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Ready => Self::AllContainersReady,
            Selection::Running => Self::RunningPhase,
        }
    }
}

impl Args {
    /// Override settings with anything given on the command line
    fn apply(&self, settings: &mut ProbeSettings) {
        if let Some(config_map) = &self.config_map {
            settings.config_map = config_map.clone();
        }
        if let Some(namespace) = &self.config_namespace {
            settings.config_namespace = namespace.clone();
        }
        if let Some(key) = &self.config_key {
            settings.config_key = key.clone();
        }
        if let Some(env_var) = &self.env_var {
            settings.env_var = env_var.clone();
        }
        if !self.commands.is_empty() {
            settings.commands = self.commands.clone();
        }
        if let Some(container) = &self.container {
            settings.container = Some(container.clone());
        }
        if let Some(selection) = self.selection {
            settings.selection = selection.into();
        }
        if self.tty {
            settings.tty = true;
        }
    }

    fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only results
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(args.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut settings =
        ProbeSettings::load(args.settings.as_deref()).context("Failed to load settings")?;
    args.apply(&mut settings);

    let kube_client = KubeClient::new(args.kubeconfig.as_deref())?;
    let client = kube_client.client(args.context.as_deref()).await?;
    let cluster = KubeCluster::new(client).with_tty(settings.tty);
    let prober = Prober::new(&cluster, &settings);

    let target = if args.namespaces.is_empty() {
        prober.load_config().await?
    } else {
        TargetConfig::from_namespaces(args.namespaces.clone())
    };

    let table = prober.run(&target).await?;
    if table.is_empty() {
        tracing::warn!("No pods were eligible; nothing to report");
    }
    print_table(&mut std::io::stdout().lock(), &table, args.json)
}

fn print_table(out: &mut impl Write, table: &ResultTable, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, table)?;
        writeln!(out)?;
    } else {
        for line in table.lines() {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}
