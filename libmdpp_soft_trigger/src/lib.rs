//! # libmdpp_soft_trigger
//!
//! libmdpp_soft_trigger is the core of the MDPP SCP SRO soft trigger consoles. The MDPP
//! in streaming readout mode writes every hit it sees; the soft trigger
//! (`MDPPSCPSROSoftTrigger`, part of the FRIBDAQ tooling and not of this repository)
//! keeps only the hits that fall inside a time window around hits on a chosen trigger
//! channel. This library holds everything the consoles do apart from drawing widgets:
//!
//! - `mdpp_soft_trigger` runs the soft trigger offline over an .evt file.
//! - `mdpp_soft_trigger_control` writes the settings of the soft trigger running in the
//!   online pipeline, and loads/saves those settings as JSON.
//!
//! ## Settings
//!
//! | Setting | Meaning |
//! |---|---|
//! | Input / output | .evt files offline, ring names online |
//! | Trigger channel | channel (0-31) whose hits open a window |
//! | Channel names | 32 labels shown in place of channel numbers |
//! | Window start / width | offset and span of the window around the trigger |
//! | cut3s | extra cut, offline only |
//! | RF channel | reference channel for the RF cut, offline only; -1 when off |
//!
//! Window values are integers between 0 and 9999999.
//!
//! ### JSON settings file
//!
//! ```json
//! {
//!   "inring": "tcp://localhost/mdpp",
//!   "outring": "mdpp_trig",
//!   "trigCh": 3,
//!   "chNames": ["Channel 0", "...", "Channel 31"],
//!   "windowStart": "100",
//!   "windowWidth": "50",
//!   "cut3s": false,
//!   "rfEnabled": false,
//!   "rfCh": 0
//! }
//! ```
//!
//! `chNames` must hold exactly 32 names. Files written before the offline-only keys
//! existed (without `cut3s`, `rfEnabled` and `rfCh`) load with those settings off.
//!
//! ### Pipeline script
//!
//! Applying settings in the control console writes `MDPPSCPSROSoftTriggerSettings.tcl`
//! next to the executable, which the pipeline sources:
//!
//! ```text
//! set inring tcp://localhost/mdpp
//! set outring mdpp_trig
//! set trigCh 3
//! set windowStart 100
//! set windowWidth 50
//! ```
//!
//! ## Offline conversion
//!
//! The soft trigger is launched as
//!
//! ```text
//! MDPPSCPSROSoftTrigger file:///path/in.evt file:///path/out.evt trigCh windowStart windowWidth cut3s rfCh
//! ```
//!
//! from the directory holding the consoles. It prints its diagnostics to the terminal the
//! console was started from; the console only reports whether it succeeded. Only one
//! conversion runs at a time.
pub mod conversion;
pub mod error;
pub mod orchestrator;
pub mod settings;
pub mod status;
pub mod text_fitter;
