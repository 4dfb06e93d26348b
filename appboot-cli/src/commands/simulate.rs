//! `simulate` command: run the full lifecycle against the simulated host.
//!
//! ```text
//! attach_base_context ─► on_create ─► wait for warm-up ─► [hold] ─► on_terminate
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appboot::app::{AppConfig, AssistantApp, ShutdownOutcome};
use appboot::context::ProcessContext;
use appboot::locale::LocaleTarget;
use appboot::simulated::{Injection, SimulatedHost, SimulatedPlatform};
use appboot::tasks::TaskOutcome;
use clap::Args;
use console::style;
use tracing::info;

use crate::error::CliError;

const MIB: u64 = 1024 * 1024;

/// Arguments for `appboot simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Host API level (selects the locale capability tier)
    #[arg(long, default_value_t = 34)]
    pub api_level: u32,

    /// Target locale tag, e.g. zh-CN (overrides the config file)
    #[arg(long)]
    pub locale: Option<String>,

    /// Application package name
    #[arg(long)]
    pub package: Option<String>,

    /// Private data directory (default: <local data dir>/appboot/simulator)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Memory the simulated host reports as available, in MiB
    #[arg(long, default_value_t = 4096)]
    pub memory_mb: u64,

    /// Inject a subsystem fault (repeatable)
    #[arg(long = "inject", value_name = "FAULT")]
    pub injections: Vec<Injection>,

    /// Start the local web server before terminating
    #[arg(long)]
    pub start_web_server: bool,

    /// Keep the process up until Ctrl+C before terminating
    #[arg(long)]
    pub hold: bool,
}

/// Convert `--memory-mb` to bytes, rejecting zero and overflow.
fn available_memory_bytes(memory_mb: u64) -> Result<u64, CliError> {
    if memory_mb == 0 {
        return Err(CliError::InvalidArgument(
            "--memory-mb must be greater than zero".to_string(),
        ));
    }
    memory_mb.checked_mul(MIB).ok_or_else(|| {
        CliError::InvalidArgument(format!("--memory-mb {} is too large", memory_mb))
    })
}

/// Run the simulation.
pub fn run(args: SimulateArgs, mut config: AppConfig) -> Result<(), CliError> {
    if let Some(tag) = &args.locale {
        config.locale =
            LocaleTarget::parse(tag).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    }
    if let Some(package) = &args.package {
        config.package_name = package.clone();
    }
    let available_memory = available_memory_bytes(args.memory_mb)?;

    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let host = SimulatedHost::with_injections(args.injections.iter().copied());
    let platform = Arc::new(SimulatedPlatform::new(args.api_level));
    let base = ProcessContext::new(config.package_name.clone(), &data_dir, available_memory);

    println!("Simulating {}", style(&config.package_name).bold());
    println!("  API level:   {}", args.api_level);
    println!("  Target:      {}", config.locale);
    println!("  Data dir:    {}", data_dir.display());
    if !args.injections.is_empty() {
        let names: Vec<_> = args.injections.iter().map(|i| i.name()).collect();
        println!("  Injections:  {}", names.join(", "));
    }
    println!();

    let mut app = AssistantApp::new(config, platform, host.collaborators())?;
    println!("Tier: {}", app.tier().name());

    app.attach_base_context(base);
    let created = app.on_create();

    for step in app.startup_trace() {
        println!("  {} {}", style("✓").green(), step);
    }

    if let Err(e) = created {
        println!("  {} {}", style("✗").red(), e);
        report_background(&app);
        let outcome = app.on_terminate();
        println!("Terminate: {}", outcome);
        return Err(e.into());
    }

    println!("Locale: {} ({:?})", app.current_locale(), app.locale_state());
    report_background(&app);

    if args.start_web_server {
        host.web_server.start();
        info!("Simulated web server started");
    }

    if args.hold {
        wait_for_interrupt()?;
    }

    let outcome = app.on_terminate();
    let styled = match outcome {
        ShutdownOutcome::Failed(_) => style(outcome.to_string()).yellow(),
        _ => style(outcome.to_string()).green(),
    };
    println!("Terminate: {}", styled);

    Ok(())
}

fn report_background(app: &AssistantApp) {
    let reports = app.join_background();
    if reports.is_empty() {
        return;
    }

    println!("Background:");
    for report in &reports {
        let marker = match report.outcome {
            TaskOutcome::Completed => style("✓").green(),
            TaskOutcome::Failed(_) => style("!").yellow(),
            TaskOutcome::Panicked(_) => style("✗").red(),
        };
        println!(
            "  {} {} {} ({} ms)",
            marker,
            report.name,
            report.outcome,
            report.elapsed.as_millis()
        );
    }

    if let Some(faults) = app.fault_handler() {
        let records = faults.records();
        if !records.is_empty() {
            println!("Faults:");
            for record in records {
                println!(
                    "  [{}] {}: {}",
                    record.at.format("%H:%M:%S%.3f"),
                    record.source,
                    record.message
                );
            }
        }
    }
}

fn wait_for_interrupt() -> Result<(), CliError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, terminating...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    println!("Press Ctrl+C to terminate");
    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("appboot")
        .join("simulator")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> SimulateArgs {
        SimulateArgs {
            api_level: 30,
            locale: Some("fr-FR".to_string()),
            package: None,
            data_dir: Some(dir.path().to_path_buf()),
            memory_mb: 64,
            injections: Vec::new(),
            start_web_server: true,
            hold: false,
        }
    }

    fn config() -> AppConfig {
        AppConfig::default().with_panic_hook(false)
    }

    #[test]
    fn test_simulation_succeeds() {
        let dir = TempDir::new().unwrap();
        run(args(&dir), config()).unwrap();
        assert!(dir.path().join("cache").join("image_cache").is_dir());
    }

    #[test]
    fn test_fatal_injection_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.injections = vec![Injection::ShellFail];

        let err = run(args, config()).unwrap_err();
        assert!(matches!(err, CliError::App(_)));
    }

    #[test]
    fn test_background_injection_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.injections = vec![Injection::SegmenterPanic, Injection::DatabaseFail];

        run(args, config()).unwrap();
    }

    #[test]
    fn test_invalid_locale_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.locale = Some("not-a-locale".to_string());

        assert!(matches!(
            run(args, config()),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_memory_size_is_validated() {
        assert_eq!(available_memory_bytes(64).unwrap(), 64 * MIB);
        assert!(matches!(
            available_memory_bytes(0),
            Err(CliError::InvalidArgument(_))
        ));

        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.memory_mb = u64::MAX;
        assert!(matches!(
            run(args, config()),
            Err(CliError::InvalidArgument(m)) if m.contains("too large")
        ));
    }
}
