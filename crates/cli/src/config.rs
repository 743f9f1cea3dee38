//! Assembles orchestrator and sink configuration from the environment and
//! command-line flags. Flags win over environment variables.

use std::path::Path;
use std::time::Duration;

use seqexec_core::discovery::DEFAULT_OUTPUT_DIR;
use seqexec_core::orchestrator::OrchestratorConfig;
use seqexec_core::runner::RunnerConfig;
use seqexec_sink::config::SinkConfig;

use crate::args::Args;

pub struct LaunchConfig {
    pub orchestrator: OrchestratorConfig,
    pub sink: SinkConfig,
}

impl LaunchConfig {
    /// `root` must already be validated and absolute.
    ///
    /// | Env Var              | Default                        |
    /// |----------------------|--------------------------------|
    /// | `SEQEXEC_OUTPUT_DIR` | `output`                       |
    /// | `SEQEXEC_ENTRY_NAME` | file name of this executable   |
    ///
    /// Runner and sink variables are read by their own `from_env`.
    pub fn from_env(root: &Path, args: &Args) -> Self {
        let output_dir_name = std::env::var("SEQEXEC_OUTPUT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let mut runner = RunnerConfig::from_env();
        if let Some(secs) = args.timeout {
            runner.timeout = Some(Duration::from_secs(secs));
        }

        let mut orchestrator = OrchestratorConfig::new(root);
        orchestrator.output_dir_name = output_dir_name;
        orchestrator.self_name = entry_name();
        orchestrator.reset = args.reset;
        orchestrator.runner = runner;

        let mut sink = SinkConfig::from_env(&root.join(&orchestrator.output_dir_name));
        if args.no_export {
            sink.export = false;
        }

        Self { orchestrator, sink }
    }
}

fn entry_name() -> Option<String> {
    if let Ok(name) = std::env::var("SEQEXEC_ENTRY_NAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_runner_and_sink_settings() {
        let args =
            Args::try_parse_from(["seqexec", "/srv/jobs", "--timeout", "5", "--no-export", "--reset"])
                .unwrap();
        let config = LaunchConfig::from_env(Path::new("/srv/jobs"), &args);

        assert_eq!(config.orchestrator.runner.timeout, Some(Duration::from_secs(5)));
        assert!(config.orchestrator.reset);
        assert!(!config.sink.export);
        assert!(config.orchestrator.self_name.is_some());
        assert!(config
            .sink
            .output_dir
            .starts_with("/srv/jobs"));
    }
}
