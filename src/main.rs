mod cli;
mod config;
mod output;

use std::error::Error;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info};
use stream_ingest::{
    ApiClient, IngestError, Ingestor, ProcessWalletAssigner, RegistryStore, WalletPool,
};

use cli::Args;
use config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version also arrive here and are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(args.debug);

    let config = AppConfig::load_or_default();
    if let Ok(path) = AppConfig::get_config_path() {
        debug!("Using configuration from {}", path.display());
    }

    exit_code(&run(&args, &config, interrupted()).await)
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Log the outcome of a run and map it to the process exit code.
fn exit_code(result: &Result<(), IngestError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(IngestError::Interrupted) => {
            error!("Ingestion cancelled by user");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Error during ingestion: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                debug!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

/// Ingest, then save and write output. If `interrupt` resolves first the run
/// stops before touching the registry.
async fn run(
    args: &Args,
    config: &AppConfig,
    interrupt: impl Future<Output = ()>,
) -> Result<(), IngestError> {
    let filter = args.call_filter()?;

    let mut ingestor = Ingestor::new(ApiClient::new(config.api_config())?);
    if args.assign_wallets {
        let assigner = ProcessWalletAssigner::new(config.process_config());
        let pool = WalletPool::new(Arc::new(assigner), config.wallet.max_concurrent);
        info!(
            "Wallet assignment enabled ({} concurrent)",
            pool.max_concurrent()
        );
        ingestor = ingestor.with_wallets(pool);
    }

    let profile = tokio::select! {
        biased;
        () = interrupt => return Err(IngestError::Interrupted),
        profile = ingestor.ingest(&args.system, &filter, None) => profile,
    };

    if args.save {
        let store = RegistryStore::new(config.registry_path(args.registry.as_deref()));
        store.merge_and_save(&args.system, &profile)?;
        info!("Registry updated: {}", store.path().display());
    }

    let rendered = output::render(&profile, args.format)?;
    output::write_output(args.output.as_deref(), &rendered)?;

    info!(
        "Ingestion complete: {} streams available",
        profile.total_streams
    );
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("Interrupt handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(registry: &Path, output: &Path) -> Args {
        Args::try_parse_from([
            "openmhz-ingest",
            "--system",
            "rhode-island",
            "--save",
            "--registry",
            registry.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap()
    }

    fn config_for(base_url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.api.base_url = base_url.to_string();
        config.api.request_timeout_secs = 2;
        config
    }

    #[tokio::test]
    async fn test_interrupt_aborts_before_registry_write() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("streams.json");
        let output = dir.path().join("profile.json");

        let result = run(
            &args(&registry, &output),
            &config_for("http://127.0.0.1:9"),
            std::future::ready(()),
        )
        .await;

        assert!(matches!(result, Err(IngestError::Interrupted)));
        assert!(!registry.exists());
        assert!(!output.exists());
        assert_eq!(exit_code(&result), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_completed_run_saves_and_writes_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rhode-island/talkgroups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"num": 3344, "description": "Fire Dispatch"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rhode-island/calls/newer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "calls": [{
                    "_id": "abc",
                    "talkgroupNum": 3344,
                    "time": "2025-10-23T19:50:45.000Z",
                    "len": 15
                }]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("streams.json");
        let output = dir.path().join("profile.json");

        let result = run(
            &args(&registry, &output),
            &config_for(&server.uri()),
            std::future::pending(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(exit_code(&result), ExitCode::SUCCESS);

        let saved = RegistryStore::new(&registry).load().unwrap();
        assert_eq!(saved["rhode-island"].total_streams, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["streams"][0]["name"], "Fire Dispatch");
    }

    #[tokio::test]
    async fn test_conflicting_filters_fail_before_fetching() {
        let args = Args::try_parse_from([
            "openmhz-ingest",
            "-s",
            "rhode-island",
            "-t",
            "3344",
            "-g",
            "fire",
        ])
        .unwrap();

        let result = run(&args, &config_for("http://127.0.0.1:9"), std::future::pending()).await;

        assert!(matches!(result, Err(IngestError::Validation(_))));
        assert_eq!(exit_code(&result), ExitCode::FAILURE);
    }
}
