//! # mdpp_soft_trigger_control
//!
//! Part of the mdpp_soft_trigger crate family.
//!
//! Console for the soft trigger running in the online pipeline. Settings are applied by
//! writing `MDPPSCPSROSoftTriggerSettings.tcl` next to the executable, and can be saved
//! to and loaded from JSON files.
//!
//! ## Use
//!
//! ```bash
//! mdpp_soft_trigger_control [-f settings.json]
//! ```
//!
//! `-f/--file` pre-loads a JSON settings file. Loaded settings are not applied until
//! Apply is clicked.

mod app;
use app::ControlApp;
use clap::{Arg, Command};
use libmdpp_soft_trigger::orchestrator::Orchestrator;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::path::PathBuf;

fn main() {
    // Create a cli
    let matches = Command::new("mdpp_soft_trigger_control")
        .about("MDPP SCP SRO Software Trigger Control GUI launcher")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("file")
                .help("JSON setting file (optional)"),
        )
        .get_matches();

    // Initialize feedback
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    match File::create("mdpp_soft_trigger_control.log") {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Info, Config::default(), file)),
        Err(e) => eprintln!("Could not create log file mdpp_soft_trigger_control.log: {e}"),
    }
    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Could not initialize logging: {e}");
    }
    log::info!("Starting MDPP SCP SRO Soft Trigger Control");

    let mut orchestrator = match Orchestrator::from_install_dir() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("Could not locate the install directory: {e}");
            return;
        }
    };

    // Parse the cli
    if let Some(path) = matches.get_one::<String>("file") {
        let path = PathBuf::from(path);
        log::info!("Loading settings from {}...", path.to_string_lossy());
        // Failures are shown in the status line; the console starts from defaults
        if orchestrator.load_settings(&path).is_ok() {
            log::info!("Settings successfully loaded.");
        }
    }

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("MDPP SCP SRO Soft Trigger Control")
            .with_inner_size(eframe::epaint::vec2(480.0, 360.0))
            .with_min_inner_size(eframe::epaint::vec2(420.0, 320.0)),
        ..Default::default()
    };
    match eframe::run_native(
        "mdpp_soft_trigger_control",
        native_options,
        Box::new(move |cc| Ok(Box::new(ControlApp::new(cc, orchestrator)))),
    ) {
        Ok(()) => (),
        Err(e) => log::error!("Eframe error: {}", e),
    }
}
