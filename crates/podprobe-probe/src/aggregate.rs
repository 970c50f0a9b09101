use tracing::debug;

use podprobe_types::{CandidatePod, DEFAULT_IDENTIFIER, ResultEntry};

/// Value of the first `NAME=value` line in an environment dump
pub fn extract_identifier<'a>(env_output: &'a str, env_var: &str) -> Option<&'a str> {
    let prefix = format!("{}=", env_var);
    env_output
        .split('\n')
        .find_map(|line| line.strip_prefix(prefix.as_str()))
}

/// Build the result entry for one probed pod
pub fn aggregate(pod: &CandidatePod, env_output: &str, info: &str, env_var: &str) -> ResultEntry {
    let identifier = extract_identifier(env_output, env_var).unwrap_or_else(|| {
        debug!("{}: {} not set", pod, env_var);
        DEFAULT_IDENTIFIER
    });

    ResultEntry::new(identifier, info)
}
