use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use subrecon::cli::Cli;
use subrecon::config::AppConfig;
use subrecon::discovery::load_wordlist;
use subrecon::export;
use subrecon::logger::{ScanLogger, VerbosityLevel};
use subrecon::scanner::SubdomainScanner;
use subrecon::TargetDomain;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.tracing_directive())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.init {
        match AppConfig::create_default_config_at(&cli.config) {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Input is validated before anything touches the network
    let raw_domain = cli.domain.as_deref().unwrap_or_default();
    let target = match TargetDomain::parse(raw_domain) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Invalid domain: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = match AppConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let wordlist = match &cli.wordlist {
        Some(path) => match load_wordlist(path) {
            Ok(words) => Some(words),
            Err(e) => {
                eprintln!("{:#}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };
    cli.apply_overrides(&mut config, wordlist);
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let mut logger = ScanLogger::new(verbosity);
    if cli.no_progress {
        logger = logger.without_progress();
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            eprintln!("\nForce exiting.");
            std::process::exit(130);
        }
        eprintln!(
            "\nInterrupt received. Stopping scan and keeping partial results \
             (press Ctrl-C again to force exit)..."
        );
        handler_token.cancel();
    })
    .unwrap_or_else(|e| {
        eprintln!("Warning: Failed to set Ctrl-C handler: {}", e);
    });

    let scanner = match SubdomainScanner::from_config(&config, Some(logger.clone())) {
        Ok(scanner) => scanner,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let report = scanner.scan(&target, &cancel).await;

    let output_path =
        export::default_output_path(&config.output.directory, target.as_str(), cli.format);
    if let Err(e) = export::export_report(&report, cli.format, &output_path) {
        logger.error(&format!("Failed to save results: {:#}", e));
        std::process::exit(1);
    }
    logger.log_export_success(&output_path.display().to_string());

    logger.print_final_summary();

    if report.cancelled {
        std::process::exit(130);
    }
    Ok(())
}
