// Plugin Indexer
// Main entry point for the plugin-indexer binary

use clap::Parser;
use plugin_indexer::cli::Cli;
use plugin_indexer::config::Config;
use plugin_indexer::error::{exit_code, IndexerError, IndexerErrorExt};
use plugin_indexer::handlers::handle_index;
use plugin_indexer::runtime::NativeLoader;
use plugin_indexer::telemetry::{init_telemetry, init_telemetry_with_level};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments; --help and --version are not usage errors
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_code::USAGE
            } else {
                exit_code::SUCCESS
            };
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    // Load configuration (or use custom path if provided)
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            return report_error(&e);
        }
    };
    cli.apply_overrides(&mut config);

    // Priority: RUST_LOG > --log > config file
    init_telemetry_with_level(&config.core.log_level);
    tracing::info!("Plugin Indexer v{}", env!("CARGO_PKG_VERSION"));

    let root = cli.root;
    let outcome =
        tokio::task::spawn_blocking(move || handle_index(&root, &config, NativeLoader::new()))
            .await;

    match outcome {
        Ok(Ok(report)) => {
            tracing::info!(
                "Indexed {} ({} assets): {}",
                report.library_name,
                report.asset_count,
                report.package.path.display()
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => report_error(&e),
        Err(e) => {
            // A panic anywhere in the pipeline, including worker threads
            tracing::error!("Indexer task failed: {:?}", e);
            eprintln!("An unknown error has occurred! {}", e);
            ExitCode::from(exit_code::UNEXPECTED)
        }
    }
}

fn report_error(error: &IndexerError) -> ExitCode {
    match error {
        IndexerError::Capability { .. } | IndexerError::Unexpected(_) => {
            tracing::error!("{:?}", error);
            eprintln!("An unknown error has occurred! {}", error);
        }
        _ => {
            tracing::debug!("{:?}", error);
            eprintln!("{}", error);
        }
    }
    eprintln!("Hint: {}", error.user_hint());
    ExitCode::from(error.exit_code())
}
