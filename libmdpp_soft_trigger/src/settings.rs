use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::error::{SettingsError, ValidationError};

/// Number of slots in the MDPP channel roster
pub const NUMBER_OF_CHANNELS: usize = 32;
/// Largest window start/width accepted by the soft trigger
pub const WINDOW_MAX: u32 = 9_999_999;

/// Check that a raw channel index points into the roster
pub fn parse_channel(channel: i64) -> Result<usize, ValidationError> {
    if (0..NUMBER_OF_CHANNELS as i64).contains(&channel) {
        Ok(channel as usize)
    } else {
        Err(ValidationError::InvalidChannel(channel))
    }
}

/// Parse a window value typed by the operator
pub fn parse_window(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value <= WINDOW_MAX => Ok(value),
        _ => Err(ValidationError::InvalidWindow(raw.to_string())),
    }
}

/// Check that an input/output value holds no control characters
pub fn parse_path(raw: &str) -> Result<&str, ValidationError> {
    if raw.chars().any(char::is_control) {
        Err(ValidationError::InvalidPath(raw.to_string()))
    } else {
        Ok(raw)
    }
}

/// Characters that split a word or start a substitution when Tcl sources the script
const TCL_SPECIAL: [char; 8] = ['"', '\\', '$', '[', ']', '{', '}', ';'];

/// Check that a ring name can be written to the pipeline script as a single Tcl word
pub fn parse_ring(raw: &str) -> Result<&str, ValidationError> {
    let is_word = !raw.is_empty()
        && !raw
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || TCL_SPECIAL.contains(&c));
    if is_word {
        Ok(raw)
    } else {
        Err(ValidationError::InvalidRing(raw.to_string()))
    }
}

fn default_channel_names() -> Vec<String> {
    (0..NUMBER_OF_CHANNELS)
        .map(|ch| format!("Channel {ch}"))
        .collect()
}

/// The canonical soft trigger configuration.
///
/// Fields are private so that the roster always holds exactly 32 names and every
/// channel index and window value stays in range. Mutation goes through the setters,
/// which validate the raw values handed over by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSettings {
    input: String,
    output: String,
    trigger_channel: usize,
    channel_names: Vec<String>,
    window_start: u32,
    window_width: u32,
    cut3s: bool,
    rf_enabled: bool,
    rf_channel: usize,
}

impl Default for TriggerSettings {
    /// Empty input/output, channel 0, a zero window, and every cut disabled
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            trigger_channel: 0,
            channel_names: default_channel_names(),
            window_start: 0,
            window_width: 0,
            cut3s: false,
            rf_enabled: false,
            rf_channel: 0,
        }
    }
}

impl TriggerSettings {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn trigger_channel(&self) -> usize {
        self.trigger_channel
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn channel_name(&self, channel: usize) -> Option<&str> {
        self.channel_names.get(channel).map(|name| name.as_str())
    }

    pub fn window_start(&self) -> u32 {
        self.window_start
    }

    pub fn window_width(&self) -> u32 {
        self.window_width
    }

    pub fn cut3s(&self) -> bool {
        self.cut3s
    }

    pub fn rf_enabled(&self) -> bool {
        self.rf_enabled
    }

    pub fn rf_channel(&self) -> usize {
        self.rf_channel
    }

    /// The RF channel as transmitted downstream, -1 when the RF cut is off
    pub fn rf_argument(&self) -> i64 {
        if self.rf_enabled {
            self.rf_channel as i64
        } else {
            -1
        }
    }

    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
    }

    pub fn set_output(&mut self, output: &str) {
        self.output = output.to_string();
    }

    pub fn set_trigger_channel(&mut self, channel: i64) -> Result<(), ValidationError> {
        self.trigger_channel = parse_channel(channel)?;
        Ok(())
    }

    /// Relabel a channel. The roster order never changes.
    pub fn set_channel_name(&mut self, channel: i64, name: &str) -> Result<(), ValidationError> {
        let idx = parse_channel(channel)?;
        self.channel_names[idx] = name.to_string();
        Ok(())
    }

    pub fn set_window_start(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.window_start = parse_window(raw)?;
        Ok(())
    }

    pub fn set_window_width(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.window_width = parse_window(raw)?;
        Ok(())
    }

    pub fn set_cut3s(&mut self, cut3s: bool) {
        self.cut3s = cut3s;
    }

    pub fn set_rf_enabled(&mut self, enabled: bool) {
        self.rf_enabled = enabled;
    }

    pub fn set_rf_channel(&mut self, channel: i64) -> Result<(), ValidationError> {
        self.rf_channel = parse_channel(channel)?;
        Ok(())
    }

    /// Take every value of a form at once. Nothing is changed unless the whole form is valid.
    pub fn apply_form(&mut self, form: &SettingsForm) -> Result<(), ValidationError> {
        let trigger_channel = parse_channel(form.trigger_channel)?;
        let rf_channel = parse_channel(form.rf_channel)?;
        let window_start = parse_window(&form.window_start)?;
        let window_width = parse_window(&form.window_width)?;
        let input = parse_path(&form.input)?;
        let output = parse_path(&form.output)?;

        self.input = input.to_string();
        self.output = output.to_string();
        self.trigger_channel = trigger_channel;
        self.window_start = window_start;
        self.window_width = window_width;
        self.cut3s = form.cut3s;
        self.rf_enabled = form.rf_enabled;
        self.rf_channel = rf_channel;
        Ok(())
    }

    /// Render the settings as the JSON document, including the full channel roster
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(&SettingsDocument::from(self))?)
    }

    /// Hydrate settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let document = serde_json::from_str::<SettingsDocument>(json).map_err(|e| {
            if e.is_data() {
                SettingsError::MalformedSettings(e.to_string())
            } else {
                SettingsError::ParsingError(e)
            }
        })?;
        Self::try_from(document)
    }

    /// Check that the rings can go into the pipeline script, one word per `set` line
    pub fn check_script(&self) -> Result<(), ValidationError> {
        parse_ring(&self.input)?;
        parse_ring(&self.output)?;
        Ok(())
    }

    /// Render the live pipeline script.
    ///
    /// Only the five pipeline keys are written; the roster, cut3s and RF settings are
    /// offline-only and never part of the script. The rings are written as they are, so
    /// callers must pass [`TriggerSettings::check_script`] first.
    pub fn to_script(&self) -> String {
        format!(
            "set inring {}\nset outring {}\nset trigCh {}\nset windowStart {}\nset windowWidth {}",
            self.input, self.output, self.trigger_channel, self.window_start, self.window_width
        )
    }

    /// Read settings from a JSON file
    pub fn read_json_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::BadFilePath(path.to_path_buf()));
        }

        let json_str = std::fs::read_to_string(path)?;

        Self::from_json(&json_str)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), SettingsError> {
        write_atomically(path, &self.to_json()?)?;
        Ok(())
    }

    pub fn write_script_file(&self, path: &Path) -> Result<(), SettingsError> {
        self.check_script()?;
        write_atomically(path, &self.to_script())?;
        Ok(())
    }
}

/// The raw values as edited in a console, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub input: String,
    pub output: String,
    pub trigger_channel: i64,
    pub window_start: String,
    pub window_width: String,
    pub cut3s: bool,
    pub rf_enabled: bool,
    pub rf_channel: i64,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::from(&TriggerSettings::default())
    }
}

impl From<&TriggerSettings> for SettingsForm {
    fn from(settings: &TriggerSettings) -> Self {
        Self {
            input: settings.input.clone(),
            output: settings.output.clone(),
            trigger_channel: settings.trigger_channel as i64,
            window_start: settings.window_start.to_string(),
            window_width: settings.window_width.to_string(),
            cut3s: settings.cut3s,
            rf_enabled: settings.rf_enabled,
            rf_channel: settings.rf_channel as i64,
        }
    }
}

/// Numeric values in settings files were historically written as strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LooseInt {
    Number(i64),
    Text(String),
}

impl LooseInt {
    fn zero() -> Self {
        Self::Number(0)
    }

    fn to_channel(&self, key: &str) -> Result<usize, SettingsError> {
        let channel = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                SettingsError::MalformedSettings(format!("{key} is not an integer: {text:?}"))
            })?,
        };
        parse_channel(channel).map_err(|e| SettingsError::MalformedSettings(format!("{key}: {e}")))
    }

    fn to_window(&self, key: &str) -> Result<u32, SettingsError> {
        let parsed = match self {
            Self::Number(value) => parse_window(&value.to_string()),
            Self::Text(text) => parse_window(text),
        };
        parsed.map_err(|e| SettingsError::MalformedSettings(format!("{key}: {e}")))
    }
}

/// The on-disk JSON shape of the settings.
///
/// Files written by the legacy Python console lack `cut3s`, `rfEnabled` and `rfCh`; those
/// keys default to off/channel 0 when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDocument {
    inring: String,
    outring: String,
    #[serde(rename = "trigCh")]
    trig_ch: LooseInt,
    #[serde(rename = "chNames")]
    ch_names: Vec<String>,
    #[serde(rename = "windowStart")]
    window_start: LooseInt,
    #[serde(rename = "windowWidth")]
    window_width: LooseInt,
    #[serde(default)]
    cut3s: bool,
    #[serde(default, rename = "rfEnabled")]
    rf_enabled: bool,
    #[serde(default = "LooseInt::zero", rename = "rfCh")]
    rf_ch: LooseInt,
}

impl From<&TriggerSettings> for SettingsDocument {
    fn from(settings: &TriggerSettings) -> Self {
        Self {
            inring: settings.input.clone(),
            outring: settings.output.clone(),
            trig_ch: LooseInt::Number(settings.trigger_channel as i64),
            ch_names: settings.channel_names.clone(),
            window_start: LooseInt::Text(settings.window_start.to_string()),
            window_width: LooseInt::Text(settings.window_width.to_string()),
            cut3s: settings.cut3s,
            rf_enabled: settings.rf_enabled,
            rf_ch: LooseInt::Number(settings.rf_channel as i64),
        }
    }
}

impl TryFrom<SettingsDocument> for TriggerSettings {
    type Error = SettingsError;

    fn try_from(document: SettingsDocument) -> Result<Self, Self::Error> {
        if document.ch_names.len() != NUMBER_OF_CHANNELS {
            return Err(SettingsError::MalformedSettings(format!(
                "chNames must hold {} names, found {}",
                NUMBER_OF_CHANNELS,
                document.ch_names.len()
            )));
        }

        for (key, value) in [("inring", &document.inring), ("outring", &document.outring)] {
            parse_path(value)
                .map_err(|e| SettingsError::MalformedSettings(format!("{key}: {e}")))?;
        }

        Ok(Self {
            trigger_channel: document.trig_ch.to_channel("trigCh")?,
            window_start: document.window_start.to_window("windowStart")?,
            window_width: document.window_width.to_window("windowWidth")?,
            rf_channel: document.rf_ch.to_channel("rfCh")?,
            input: document.inring,
            output: document.outring,
            channel_names: document.ch_names,
            cut3s: document.cut3s,
            rf_enabled: document.rf_enabled,
        })
    }
}

/// Write a file so that readers see either the old contents or the new, never a partial file.
///
/// The data goes to a uniquely named temporary file in the same directory, which is
/// persisted over the destination once synced. The temporary file is removed on failure.
pub fn write_atomically(path: &Path, contents: &str) -> Result<(), std::io::Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
