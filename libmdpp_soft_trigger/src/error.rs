use std::path::PathBuf;
use thiserror::Error;

use super::settings::{NUMBER_OF_CHANNELS, WINDOW_MAX};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Input is empty; select a file or ring to read from")]
    MissingInput,
    #[error("Output is empty; select a file or ring to write to")]
    MissingOutput,
    #[error("Channel {0} is outside of the channel roster; expected 0 to {max}", max=NUMBER_OF_CHANNELS - 1)]
    InvalidChannel(i64),
    #[error("Window value {0:?} is not an integer between 0 and {max}", max=WINDOW_MAX)]
    InvalidWindow(String),
    #[error("Path {0:?} contains control characters")]
    InvalidPath(String),
    #[error("Ring {0:?} must be a single word without whitespace or Tcl special characters")]
    InvalidRing(String),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("ConversionJob refused to start because the input path is empty")]
    MissingInput,
    #[error("ConversionJob refused to start because the output path is empty")]
    MissingOutput,
    #[error("ConversionJob could not resolve path {0:?} to a file URI: {1}")]
    BadPath(PathBuf, std::io::Error),
    #[error("ConversionJob failed to spawn its worker thread: {0}")]
    ThreadError(std::io::Error),
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("A conversion is already running")]
    JobBusy,
    #[error("Conversion settings were rejected: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Conversion could not be launched: {0}")]
    Job(#[from] JobError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Settings failed due to IO error: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("Settings failed to parse JSON: {0}")]
    ParsingError(#[from] serde_json::Error),
    #[error("Settings are malformed: {0}")]
    MalformedSettings(String),
    #[error("Settings are invalid: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Settings cannot change while a conversion is running")]
    Busy,
}
