use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Runtime;
use tracing::info;

use crate::bin_resolver::{self, ResolveCtx};
use crate::key_file::DEFAULT_KEY_FILE_PATH;
use crate::logging::{self, LogFormat};
use crate::pipeline::{self, Inputs};
use crate::plan::Tools;
use crate::runner::{self, RunOptions};
use crate::shutdown;

#[derive(Parser, Debug)]
#[command(name = "gke-port-forward")]
#[command(
    about = "Authenticate to GKE with injected credentials and forward a service port",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "ESTAFETTE_EXTENSION_CUSTOM_PROPERTIES_YAML",
        help = "Extension parameters, created from custom properties."
    )]
    params_yaml: String,

    #[arg(
        long,
        env = "ESTAFETTE_RELEASE_NAME",
        help = "Name of the release target, which is used by convention to resolve the credentials."
    )]
    release_target_name: Option<String>,

    #[arg(
        long,
        env = "ESTAFETTE_CREDENTIALS_KUBERNETES_ENGINE",
        hide_env_values = true,
        help = "GKE credentials configured at service level, passed in to this trusted extension."
    )]
    credentials: Option<String>,

    #[arg(
        long,
        env = "GKE_PORT_FORWARD_KEY_FILE",
        default_value = DEFAULT_KEY_FILE_PATH,
        help = "Where the service account key file is written."
    )]
    key_file_path: PathBuf,

    #[arg(long, help = "Path to the gcloud binary.")]
    gcloud_binary: Option<PathBuf>,

    #[arg(long, help = "Path to the kubectl binary.")]
    kubectl_binary: Option<PathBuf>,

    #[arg(
        long,
        env = "GKE_PORT_FORWARD_SHUTDOWN_GRACE_SECS",
        default_value_t = runner::DEFAULT_SHUTDOWN_GRACE.as_secs(),
        help = "Seconds the port-forward gets to exit after a shutdown signal before it is killed."
    )]
    shutdown_grace_secs: u64,

    #[arg(
        long,
        env = "ESTAFETTE_LOG_FORMAT",
        default_value = "plaintext",
        help = "Log format: plaintext, console or json."
    )]
    log_format: String,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        logging::init(LogFormat::from_name(&self.log_format))?;
        info!(
            app = env!("CARGO_PKG_NAME"),
            version = env!("CARGO_PKG_VERSION"),
            "Starting"
        );

        let runtime = Runtime::new().context("failed to start async runtime")?;
        runtime.block_on(self.run_pipeline())?;
        Ok(())
    }

    async fn run_pipeline(self) -> crate::error::Result<()> {
        let shutdown = shutdown::listen()?;

        let tools = Tools {
            key_file: self.key_file_path,
            ..Tools::default()
        };
        let inputs = Inputs {
            params_yaml: self.params_yaml,
            release_target_name: self.release_target_name,
            credentials_json: self.credentials,
        };
        let mut prepared = pipeline::prepare(&inputs, &tools)?;

        let gcloud =
            bin_resolver::resolve_binary("gcloud", &ResolveCtx::from_env(self.gcloud_binary))?;
        let kubectl =
            bin_resolver::resolve_binary("kubectl", &ResolveCtx::from_env(self.kubectl_binary))?;
        prepared.plan.replace_program(&tools.gcloud, &gcloud);
        prepared.plan.replace_program(&tools.kubectl, &kubectl);

        let options = RunOptions {
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        };
        runner::run_plan(&prepared.plan, &shutdown, &options).await?;
        info!("Shut down cleanly");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags_with_defaults() {
        let cli = Cli::try_parse_from([
            "gke-port-forward",
            "--params-yaml",
            "service: api",
            "--release-target-name",
            "development",
        ])
        .unwrap();
        assert_eq!(cli.params_yaml, "service: api");
        assert_eq!(cli.release_target_name.as_deref(), Some("development"));
        assert_eq!(cli.key_file_path, PathBuf::from(DEFAULT_KEY_FILE_PATH));
        assert_eq!(cli.shutdown_grace_secs, 10);
    }
}
