//! Subcommand handlers for run, displays and config actions.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::args::ConfigAction;
use tapmeter::config::{default_path as get_config_path, Config, DisplaysConfig, DEFAULT_CONFIG};
#[cfg(target_os = "macos")]
use tapmeter::display::CoreGraphicsDisplaySource;
#[cfg(not(target_os = "macos"))]
use tapmeter::display::RdevDisplaySource;
use tapmeter::display::{DisplayRegistry, DisplaySnapshot, DisplaySource};
use tapmeter::listener::{DisplayWatcher, RdevTranslator};
use tapmeter::process::FixedLayout;
use tapmeter::{exit_code, Delegate, Engine, FatalError, FlushReason, JsonLinesDelegate};

type Output = Box<dyn Write + Send>;

/// The display source selected by the config: manual displays if any are
/// declared, the OS otherwise.
fn display_source(config: &DisplaysConfig) -> Box<dyn DisplaySource + Send> {
    match config.manual_source() {
        Some(source) => Box::new(source),
        None => os_display_source(config),
    }
}

#[cfg(target_os = "macos")]
fn os_display_source(_config: &DisplaysConfig) -> Box<dyn DisplaySource + Send> {
    Box::new(CoreGraphicsDisplaySource)
}

/// Only the main display is visible to rdev; its physical size comes from
/// the configured DPI.
#[cfg(not(target_os = "macos"))]
fn os_display_source(config: &DisplaysConfig) -> Box<dyn DisplaySource + Send> {
    Box::new(RdevDisplaySource::new(config.fallback_dpi))
}

fn open_output(path: Option<&Path>) -> std::io::Result<Output> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Log a fatal error, flush what we have and exit with its code.
fn exit_fatal<D: Delegate>(engine: &mut Engine<D>, err: FatalError) -> ! {
    engine.flush(FlushReason::Shutdown);
    log::error!("{}", err);
    std::process::exit(err.exit_code());
}

/// Set up Ctrl+C handler that flushes the open stroke before exiting.
fn setup_ctrlc_handler<D: Delegate + Send + 'static>(engine: Arc<Mutex<Engine<D>>>) {
    let result = ctrlc::set_handler(move || {
        if engine.lock().flush(FlushReason::Shutdown) {
            log::debug!("Flushed open stroke on shutdown");
        }
        log::info!("Shutting down");
        std::process::exit(0);
    });
    if let Err(e) = result {
        log::warn!("Failed to set Ctrl+C handler: {}", e);
    }
}

/// Listen for global input until interrupted or a fatal error occurs.
pub fn run(config: Config, output: Option<PathBuf>, capacity: Option<usize>) {
    let source = display_source(&config.displays);
    let initial = match source.active_displays() {
        Ok(descriptors) => descriptors,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(exit_code::DISPLAY_LIST_UNAVAILABLE);
        }
    };
    let registry = DisplayRegistry::with_snapshot(DisplaySnapshot::from_descriptors(&initial));
    if registry.snapshot().is_empty() {
        log::warn!("No displays found; every input will fail to resolve");
    }
    log::info!("Tracking {} display(s)", registry.snapshot().len());

    let output_path = output.or_else(|| config.output.path.clone());
    let writer = match open_output(output_path.as_deref()) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Error opening output: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = &output_path {
        log::info!("Writing records to {}", path.display());
    }

    let mut policy = config.batch.policy();
    if let Some(capacity) = capacity {
        policy.capacity = capacity;
    }

    let engine = Engine::new(registry.clone(), JsonLinesDelegate::new(writer))
        .with_policy(policy)
        .with_keyboard_layout(FixedLayout::new(config.keyboard_layout.clone()));
    let engine = Arc::new(Mutex::new(engine));

    setup_ctrlc_handler(engine.clone());

    let _watcher = DisplayWatcher::spawn(
        source,
        registry,
        initial,
        config.displays.poll_interval(),
    );

    let mut translator = RdevTranslator::new();
    let listen_engine = engine.clone();
    log::info!("Listening for input (Ctrl+C to stop)");
    let result = rdev::listen(move |event| {
        let Some(notification) = translator.translate(&event) else {
            return;
        };
        let mut engine = listen_engine.lock();
        if let Err(e) = engine.handle(notification) {
            exit_fatal(&mut *engine, e);
        }
    });

    let err = match result {
        Ok(()) => FatalError::ListenFailed("listener returned unexpectedly".to_string()),
        Err(e) => FatalError::ListenFailed(format!("{:?}", e)),
    };
    exit_fatal(&mut *engine.lock(), err);
}

/// List the displays tapmeter can see and print them to stdout.
pub fn list_displays(config: &Config) {
    let source = display_source(&config.displays);
    let descriptors = match source.active_displays() {
        Ok(descriptors) => descriptors,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(exit_code::DISPLAY_LIST_UNAVAILABLE);
        }
    };

    let snapshot = DisplaySnapshot::from_descriptors(&descriptors);
    if snapshot.is_empty() {
        println!("No displays found.");
        return;
    }

    println!("Displays:");
    for display in snapshot.displays() {
        let mut tags = Vec::new();
        if display.is_main {
            tags.push("main");
        }
        if display.is_builtin {
            tags.push("built-in");
        }
        println!(
            "  [{}] origin ({}, {}), {}x{} pt, {}x{} px, {:.0}x{:.0} mm{}",
            display.id,
            display.bounds.origin.x,
            display.bounds.origin.y,
            display.bounds.size.width,
            display.bounds.size.height,
            display.physical_px.width,
            display.physical_px.height,
            display.size_mm.width,
            display.size_mm.height,
            if tags.is_empty() {
                String::new()
            } else {
                format!(" ({})", tags.join(", "))
            }
        );
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let config = match Config::load(Some(&config_path)) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(exit_code::CONFIG_INVALID);
                }
            };

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", config_path.display());
            }
            println!();

            match toml::to_string_pretty(&config) {
                Ok(text) => print!("{}", text),
                Err(e) => {
                    eprintln!("Error rendering config: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'tapmeter config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}
