//! Binary entry point logic

use crate::app::args::Args;
use crate::app::config::load_config_file;
use crate::app::driver::{run_driver, DriverReport};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::version_banner;
use clap::Parser;
use colored::Colorize;

/// Parse arguments, configure logging, run the driver; returns the exit code
pub async fn startup() -> i32 {
    let mut args = Args::parse();

    let config_path = match load_config_file(&mut args).await {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let use_color = args.use_color();
    colored::control::set_override(use_color);

    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        args.log_file_path(),
        use_color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return 1;
    }

    log::info!("{}", version_banner());
    if let Some(path) = config_path {
        log::debug!("Loaded configuration from {}", path.display());
    }

    let settings = match args.driver_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log_error_with_context(&e, "Resolving driver settings");
            return 1;
        }
    };
    log::debug!("Driver settings: {:?}", settings);

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    match run_driver(&settings, &shutdown, None).await {
        Ok(report) => {
            print_summary(&report);
            if report.failed_workers > 0 {
                2
            } else {
                0
            }
        }
        Err(e) => {
            log_error_with_context(&e, "Running message pipeline");
            1
        }
    }
}

fn print_summary(report: &DriverReport) {
    let stats = &report.stats;
    println!("{}", "Run summary".bold());
    println!("  produced:        {}", report.produced);
    println!("  processed:       {}", stats.processed.to_string().green());
    if stats.failed > 0 {
        println!("  failed:          {}", stats.failed.to_string().red());
    }
    println!("  peak in flight:  {}", stats.peak_in_flight);
    println!(
        "  workers:         {} stopped, {} queue closed, {} cancelled, {} failed",
        report.stopped_workers,
        report.closed_workers,
        report.cancelled_workers,
        report.failed_workers
    );
    if report.forced {
        println!(
            "  {}",
            "grace period elapsed; remaining workers were force stopped".yellow()
        );
    }
    if report.interrupted {
        println!("  {}", "run interrupted by shutdown signal".yellow());
    }
}
