//! Flying Monkeys - main entry point
//!
//! Loads settings and the catalog, then either runs the checklist or one of
//! the headless subcommands.

use anyhow::{Context, Result};
use crossterm::terminal::{enable_raw_mode, EnterAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io::{self, stdout, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use flyingmonkeys::app::{App, AppExit, ChecklistState};
use flyingmonkeys::catalog::Catalog;
use flyingmonkeys::cli::{Cli, Commands};
use flyingmonkeys::command_executor::{CommandExecutor, DryRunExecutor, SystemExecutor};
use flyingmonkeys::config::Settings;
use flyingmonkeys::install_module::InstallContext;
use flyingmonkeys::logic::selection::installed_modules;
use flyingmonkeys::logic::{CommitReport, Committer, Selection};
use flyingmonkeys::process_guard::{self, ProcessGuard};

/// Whether log events are mirrored to stderr. Off while the checklist owns
/// the screen.
static CONSOLE_LOGGING: AtomicBool = AtomicBool::new(true);

/// Initialize tracing. `RUST_LOG` overrides the level.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = log_file
        .map(|path| -> Result<_> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Ok(fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)))
        })
        .transpose()?;

    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .with_filter(filter_fn(|_| CONSOLE_LOGGING.load(Ordering::Relaxed)));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Settings file (if any) with command line overrides applied
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::default(),
    };

    if let Some(work_dir) = &cli.work_dir {
        settings.work_dir = work_dir.clone();
    }
    if let Some(catalog) = &cli.catalog {
        settings.catalog = Some(catalog.clone());
    }
    if let Some(log_file) = &cli.log_file {
        settings.log_file = Some(log_file.clone());
    }

    settings.validate()?;
    Ok(settings)
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            info!("Loading catalog from {:?}", path);
            Catalog::load(path).with_context(|| format!("Invalid catalog {:?}", path))
        }
        None => Catalog::builtin().context("Built-in catalog is invalid"),
    }
}

/// Main application entry point
fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let settings = load_settings(&cli)?;

    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    if interactive || matches!(cli.command, Some(Commands::Install { .. })) {
        settings.ensure_work_dir()?;
    }

    // The checklist owns the screen, so its logs always go to a file
    let log_file: Option<PathBuf> = if interactive {
        Some(settings.log_file_path())
    } else {
        settings.log_file.clone()
    };
    CONSOLE_LOGGING.store(!interactive, Ordering::Relaxed);
    init_logging(cli.verbose, log_file.as_deref())?;
    info!("Flying Monkeys starting up");

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Settings: {:?}", settings);

    match cli.command {
        Some(Commands::ExportCatalog { ref path }) => export_catalog(path),
        Some(Commands::Validate { ref catalog }) => {
            validate_catalog(catalog.as_deref().or(settings.catalog.as_deref()))
        }
        Some(Commands::List) => {
            let catalog = load_catalog(settings.catalog.as_deref())?;
            let executor = SystemExecutor::new();
            list_catalog(&catalog, &settings.install_context(&executor));
            Ok(())
        }
        Some(Commands::Install {
            ref only,
            ref skip,
            yes,
        }) => {
            let catalog = load_catalog(settings.catalog.as_deref())?;
            run_headless(&cli, &settings, &catalog, only, skip, yes)
        }
        Some(Commands::Tui) | None => {
            let catalog = load_catalog(settings.catalog.as_deref())?;
            if let Some(path) = &log_file {
                eprintln!("Logging to {}", path.display());
            }
            run_interactive(&cli, &settings, &catalog)
        }
    }
}

fn export_catalog(path: &Path) -> Result<()> {
    let catalog = Catalog::builtin().context("Built-in catalog is invalid")?;
    catalog.to_definition().save_to_file(path)?;
    info!("Exported built-in catalog to {:?}", path);
    println!("✓ Wrote built-in catalog to {}", path.display());
    Ok(())
}

fn validate_catalog(path: Option<&Path>) -> Result<()> {
    match load_catalog(path) {
        Ok(catalog) => {
            println!(
                "✓ Catalog is valid: {} categories, {} modules",
                catalog.categories().len(),
                catalog.modules().len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Catalog validation failed: {:#}", e);
            eprintln!("✗ Catalog validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn list_catalog(catalog: &Catalog, ctx: &InstallContext<'_>) {
    let installed = installed_modules(catalog, ctx);
    let selection = Selection::from_installed(catalog, &installed);

    for category in catalog.categories() {
        println!("{}", category.name);
        for app in &category.applications {
            let module = catalog.module(app.module);
            println!(
                "  [{}] {:<20} {}{}",
                if selection.contains(app.module) { "x" } else { " " },
                app.display_name,
                module.strategy.as_strategy().describe(),
                if installed.contains(&app.module) { " (installed)" } else { "" }
            );
        }
    }
}

/// Executor for this run: dry-run wraps the real one
struct Executors {
    system: SystemExecutor,
    dry_run: Option<DryRunExecutor<SystemExecutor>>,
}

impl Executors {
    fn new(dry_run: bool) -> Self {
        Self {
            system: SystemExecutor::new(),
            dry_run: dry_run.then(|| DryRunExecutor::new(SystemExecutor::new())),
        }
    }

    fn active(&self) -> &dyn CommandExecutor {
        match &self.dry_run {
            Some(dry_run) => dry_run as &dyn CommandExecutor,
            None => &self.system,
        }
    }

    fn print_plan(&self) {
        if let Some(dry_run) = &self.dry_run {
            let planned = dry_run.planned();
            println!("\nPlanned commands ({}):", planned.len());
            for spec in planned {
                match &spec.cwd {
                    Some(cwd) => println!("  [{}] {}", cwd.display(), spec.command_line()),
                    None => println!("  {}", spec.command_line()),
                }
            }
        }
    }
}

fn run_headless(
    cli: &Cli,
    settings: &Settings,
    catalog: &Catalog,
    only: &[String],
    skip: &[String],
    yes: bool,
) -> Result<()> {
    let executors = Executors::new(cli.dry_run);
    let ctx = settings.install_context(executors.active());

    let mut selection = Selection::initial(catalog, &ctx);
    if !only.is_empty() {
        selection.restrict_to(catalog, only)?;
    }
    selection.deselect_named(catalog, skip)?;

    let chosen: Vec<&str> = selection
        .selected_applications(catalog)
        .iter()
        .map(|app| app.display_name.as_str())
        .collect();
    println!("Selected ({}): {}", chosen.len(), chosen.join(", "));

    let report = {
        let _guard = ProcessGuard::new();
        Committer::new(catalog, &selection, &ctx)
            .dry_run(cli.dry_run)
            .commit(|| yes || confirm_on_stdin(chosen.len()))
    };

    match report {
        Some(report) => finish(&report, &executors),
        None => {
            println!("Nothing installed.");
            Ok(())
        }
    }
}

fn confirm_on_stdin(count: usize) -> bool {
    print!("Install {} application(s)? [y/N] ", count);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn run_interactive(cli: &Cli, settings: &Settings, catalog: &Catalog) -> Result<()> {
    let executors = Executors::new(cli.dry_run);
    let ctx = settings.install_context(executors.active());

    let installed = installed_modules(catalog, &ctx);
    let selection = Selection::from_installed(catalog, &installed);
    let state = ChecklistState::new(catalog, selection, &installed).with_dry_run(cli.dry_run);

    let selection = match run_checklist(state).context("Checklist failed")? {
        AppExit::Commit(selection) => selection,
        AppExit::Quit => {
            println!("Nothing installed.");
            return Ok(());
        }
    };

    // The terminal is back in normal mode: progress and sudo prompts are
    // visible from here on.
    CONSOLE_LOGGING.store(true, Ordering::Relaxed);
    println!("Installing...");
    let report = {
        let _guard = ProcessGuard::new();
        Committer::new(catalog, &selection, &ctx)
            .dry_run(cli.dry_run)
            .commit(|| true)
    };

    match report {
        Some(report) => finish(&report, &executors),
        None => Ok(()),
    }
}

/// Run the checklist on the alternate screen, restoring the terminal after
fn run_checklist(state: ChecklistState) -> Result<AppExit> {
    debug!("Initializing terminal for checklist");
    enable_raw_mode().context("Failed to enable raw mode")?;
    // From here on a termination signal also restores the terminal
    process_guard::set_screen_active(true);

    let result = crossterm::execute!(stdout(), EnterAlternateScreen)
        .context("Failed to enter alternate screen")
        .and_then(|()| Ok(draw_checklist(state)?));

    process_guard::restore_screen();
    result
}

fn draw_checklist(state: ChecklistState) -> flyingmonkeys::Result<AppExit> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    App::new(state).run(&mut terminal)
}

fn finish(report: &CommitReport, executors: &Executors) -> Result<()> {
    println!("\n{}", report);
    executors.print_plan();

    if report.has_failures() {
        error!("{} item(s) failed", report.failures().count());
        std::process::exit(1);
    }
    Ok(())
}
