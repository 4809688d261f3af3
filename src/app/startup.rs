//! Application startup and the scan run

use crate::app::cli::args::Args;
use crate::app::cli::config::describe_config_source;
use crate::app::cli::settings::invoking_user_home;
use crate::app::progress::{status, ProgressTask, ScanProgress};
use crate::app::report::{render, RunSummary};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::{Escalation, ShutdownCoordinator, INTERRUPTED_EXIT_CODE};
use crate::core::styles::palette_to_clap;
use crate::scanner::api::{
    BatchDispatcher, DatabaseUpdater, Disposition, EngineError, FileEnumerator, FileFilter,
    ScanResult, ScannerCommandResolver,
};
use clap::{CommandFactory, FromArgMatches};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_INFECTED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Host facts a run depends on
pub struct Environment {
    pub resolver: ScannerCommandResolver,
    pub home: Option<PathBuf>,
    pub cpus: usize,
    pub install_signal_handlers: bool,
}

impl Environment {
    pub fn from_host() -> Self {
        Self {
            resolver: ScannerCommandResolver::new(),
            home: invoking_user_home(),
            cpus: num_cpus::get(),
            install_signal_handlers: true,
        }
    }
}

fn color_default(stream_is_terminal: bool) -> bool {
    stream_is_terminal && std::env::var_os("NO_COLOR").is_none()
}

/// Exit status for a finished run
pub fn exit_code_for(result: &ScanResult) -> i32 {
    if result.cancelled {
        INTERRUPTED_EXIT_CODE
    } else if result.has_infections() {
        EXIT_INFECTED
    } else {
        EXIT_CLEAN
    }
}

/// Parse the command line and run; returns the process exit status
pub async fn startup() -> i32 {
    let help_colors = color_default(std::io::stdout().is_terminal())
        && !std::env::args().any(|a| a == "--no-color");
    let matches = Args::command()
        .styles(palette_to_clap(help_colors))
        .get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    run(args, Environment::from_host()).await
}

pub async fn run(mut args: Args, env: Environment) -> i32 {
    // Logging is not up yet, so configuration problems go straight to stderr
    let config_load = match args.load_config_file().await {
        Ok(load) => load,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };
    let settings = match args.resolve(env.home.clone(), env.cpus) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };

    let output_color = settings
        .color
        .unwrap_or_else(|| color_default(std::io::stdout().is_terminal()));
    let log_color = settings
        .color
        .unwrap_or_else(|| color_default(std::io::stderr().is_terminal()));
    // With a log file attached the console only sees errors, so the file can take INFO
    let default_level = if settings.log_file.is_some() { "info" } else { "warn" };
    if let Err(e) = init_logging(
        Some(settings.log_level.as_deref().unwrap_or(default_level)),
        settings.log_format,
        settings.log_file.as_deref(),
        log_color,
    ) {
        eprintln!("Warning: logging could not be initialised: {}", e);
    }

    for key in &config_load.unknown_keys {
        log::warn!("Ignoring unknown configuration key '{}'", key);
    }
    log::info!(
        "clamsweep {} starting (config: {}, roots: {:?})",
        env!("CARGO_PKG_VERSION"),
        describe_config_source(&config_load),
        settings.roots
    );
    log::debug!("Run settings: {:#?}", settings);

    let (coordinator, mut notices) = ShutdownCoordinator::new();
    if env.install_signal_handlers {
        coordinator.install_signal_handlers();
        tokio::spawn(async move {
            while let Ok(escalation) = notices.recv().await {
                match escalation {
                    Escalation::Drain => {
                        log::warn!("Cancellation requested");
                        eprintln!(
                            "\nStopping: letting batches in progress finish (interrupt again to stop sooner)"
                        );
                    }
                    Escalation::Abort => {
                        log::warn!("Abort requested");
                        eprintln!(
                            "\nStopping after the files being scanned now (interrupt again to exit immediately)"
                        );
                    }
                    Escalation::Exit => {}
                }
            }
        });
    }
    let cancel = coordinator.cancellation();

    let update = if settings.update_database {
        status("Updating signature database...");
        let outcome = DatabaseUpdater::from_command_line(&settings.updater)
            .update()
            .await;
        if outcome.is_warning() {
            eprintln!("Warning: signature database {}", outcome);
        }
        Some(outcome)
    } else {
        log::info!("Signature database update skipped");
        None
    };

    let command = match env
        .resolver
        .with_preference(settings.scanner_mode)
        .resolve()
        .into_command()
    {
        Ok(command) => command,
        Err(e) => {
            log_error_with_context(&e, "Resolving scanner");
            return EXIT_ERROR;
        }
    };
    log::info!(
        "Using {} ({} mode)",
        command.program().display(),
        command.mode()
    );

    let config = match settings.scan_configuration() {
        Ok(config) => config,
        Err(e) => {
            log_error_with_context(&e, "Building scan configuration");
            return EXIT_ERROR;
        }
    };

    if let Disposition::Quarantine(dir) = config.disposition() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            let err = EngineError::Io {
                message: format!("Cannot create quarantine directory {}: {}", dir.display(), e),
            };
            log_error_with_context(&err, "Preparing quarantine directory");
            return EXIT_ERROR;
        }
    }

    let filter = match FileFilter::from_patterns(config.exclude_files()) {
        Ok(filter) => filter,
        Err(e) => {
            log_error_with_context(
                &EngineError::configuration(e.to_string()),
                "Building file filter",
            );
            return EXIT_ERROR;
        }
    };
    let enumerator = FileEnumerator::new(config.excluded().iter().cloned()).with_filter(filter);
    let roots = config.roots().to_vec();

    status("Collecting files to scan...");
    let enumeration = match tokio::task::spawn_blocking(move || enumerator.enumerate(&roots)).await
    {
        Ok(enumeration) => enumeration,
        Err(e) => {
            let err = EngineError::Io {
                message: format!("File enumeration failed: {}", e),
            };
            log_error_with_context(&err, "Collecting files");
            return EXIT_ERROR;
        }
    };

    if enumeration.files.is_empty() {
        println!("No files found to scan.");
        return EXIT_CLEAN;
    }
    if cancel.is_cancelled() {
        eprintln!("Cancelled before scanning started.");
        return INTERRUPTED_EXIT_CODE;
    }

    let warnings = enumeration.warnings.len();
    let files = enumeration.files;
    let progress = Arc::new(ScanProgress::new(files.len()));
    let progress_task = ProgressTask::spawn(progress.clone());

    let dispatcher = BatchDispatcher::with_command(config, command.clone());
    let outcome = dispatcher
        .run(files, |n| progress.advance(n), &cancel)
        .await;
    progress_task.finish().await;

    match outcome {
        Ok(result) => {
            let summary = RunSummary::new(&result, &command)
                .with_update(update.as_ref())
                .with_enumeration_warnings(warnings);
            println!("{}", render(&summary, settings.output, output_color));
            exit_code_for(&result)
        }
        Err(err) => {
            log_error_with_context(&err, "Scanning files");
            if let EngineError::PoolFailure { reason, partial } = &err {
                let summary = RunSummary::new(partial, &command)
                    .aborted(reason)
                    .with_update(update.as_ref())
                    .with_enumeration_warnings(warnings);
                println!("{}", render(&summary, settings.output, output_color));
            }
            EXIT_ERROR
        }
    }
}
