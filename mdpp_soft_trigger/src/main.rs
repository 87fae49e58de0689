//! # mdpp_soft_trigger
//!
//! Part of the mdpp_soft_trigger crate family.
//!
//! This is the offline soft trigger console, with a GUI using [egui](https://github.com/emilk/egui).
//!
//! ## Install
//!
//! Use `cargo install --path ./mdpp_soft_trigger` and place the `MDPPSCPSROSoftTrigger`
//! executable in the same directory as the installed console.
//!
//! ## Use
//!
//! To launch the application simply invoke it from a terminal
//!
//! ```bash
//! mdpp_soft_trigger
//! ```
//!
//! Pick the .evt file to convert and the file to write, choose the trigger channel and
//! the window, and click Start. The soft trigger prints its progress and any errors to
//! the terminal the console was launched from.
//!
//! ## Configuration
//!
//! - Input file: the streaming readout .evt file to filter
//! - Output file: where the triggered events are written
//! - Trigger Channel: the channel whose hits open a window. The name of the selected
//!   channel can be edited.
//! - Window Start / Window Width: integers between 0 and 9999999
//! - cut3s: enable the cut3s condition
//! - RF: enable the RF cut and choose the RF channel

mod app;
use app::SoftTriggerApp;
use libmdpp_soft_trigger::orchestrator::Orchestrator;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;

/// The program entry point
fn main() {
    // Setup logging to the terminal and to a file
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    match File::create("mdpp_soft_trigger.log") {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Info, Config::default(), file)),
        Err(e) => eprintln!("Could not create log file mdpp_soft_trigger.log: {e}"),
    }
    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Could not initialize logging: {e}");
    }
    log::info!("Starting MDPP SCP SRO Offline Soft Trigger");

    let orchestrator = match Orchestrator::from_install_dir() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("Could not locate the install directory: {e}");
            return;
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("MDPP SCP SRO Offline Soft Trigger")
            .with_inner_size(eframe::epaint::vec2(560.0, 420.0))
            .with_min_inner_size(eframe::epaint::vec2(480.0, 380.0)),
        ..Default::default()
    };
    match eframe::run_native(
        "mdpp_soft_trigger",
        native_options,
        Box::new(move |cc| Ok(Box::new(SoftTriggerApp::new(cc, orchestrator)))),
    ) {
        Ok(()) => (),
        Err(e) => log::error!("Eframe error: {}", e),
    }
}
