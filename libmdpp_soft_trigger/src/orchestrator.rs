use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::conversion::{
    ConversionJob, ConversionRequest, ConversionResult, ProcessRunner, SystemRunner,
};
use super::error::{SettingsError, StartError, ValidationError};
use super::settings::{SettingsForm, TriggerSettings};
use super::status::{StatusLevel, StatusLine};
use super::text_fitter::{TextFitter, TextMetric, STATUS_START_SIZE};

/// Executable name of the soft trigger, installed next to the consoles
pub const TOOL_NAME: &str = "MDPPSCPSROSoftTrigger";
/// Script read by the live pipeline, written next to the consoles
pub const SCRIPT_NAME: &str = "MDPPSCPSROSoftTriggerSettings.tcl";

pub const MSG_PROCESSING: &str = "Processing....";
pub const MSG_FINISHED: &str = "Conversion Finished!";
pub const MSG_FAILED: &str = "Error! See the terminal window for more information!";
pub const MSG_APPLIED: &str = "Successfully applied the settings!";

/// Path of a file that lives in the same directory as the running executable
pub fn install_path(file_name: &str) -> Result<PathBuf, std::io::Error> {
    let exe = std::env::current_exe()?;
    match exe.parent() {
        Some(dir) => Ok(dir.join(file_name)),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        )),
    }
}

fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => path.display().to_string(),
    }
}

/// Settings files always carry a .json extension
fn with_json_extension(path: &Path) -> PathBuf {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }
}

/// The console state that the UI drives.
///
/// Owns the settings, the (at most one) running conversion, and the status line. Every
/// operation reports its outcome through the status line as well as its return value,
/// so the UI never has to format errors itself.
pub struct Orchestrator {
    settings: TriggerSettings,
    tool_path: PathBuf,
    script_path: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    job: Option<ConversionJob>,
    status: StatusLine,
    status_size: Option<(f32, f32, f32)>,
}

impl Orchestrator {
    pub fn new(tool_path: &Path, script_path: &Path, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            settings: TriggerSettings::default(),
            tool_path: tool_path.to_path_buf(),
            script_path: script_path.to_path_buf(),
            runner,
            job: None,
            status: StatusLine::default(),
            status_size: None,
        }
    }

    /// An orchestrator using the soft trigger and script locations next to the executable
    pub fn from_install_dir() -> Result<Self, std::io::Error> {
        Ok(Self::new(
            &install_path(TOOL_NAME)?,
            &install_path(SCRIPT_NAME)?,
            Arc::new(SystemRunner),
        ))
    }

    pub fn settings(&self) -> &TriggerSettings {
        &self.settings
    }

    /// The current settings as editable raw values
    pub fn form(&self) -> SettingsForm {
        SettingsForm::from(&self.settings)
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Whether the UI may offer settings edits and a new run
    pub fn controls_enabled(&self) -> bool {
        !self.is_busy()
    }

    /// Show a message that originated in the UI, such as a cancelled dialog
    pub fn report(&mut self, level: StatusLevel, text: &str) {
        match level {
            StatusLevel::Good => log::info!("{text}"),
            StatusLevel::Warning => log::warn!("{text}"),
            StatusLevel::Error => log::error!("{text}"),
        }
        self.status = StatusLine::new(level, text);
        self.status_size = None;
    }

    /// Refuse settings changes while a conversion is running
    fn ensure_idle(&mut self) -> Result<(), SettingsError> {
        if self.is_busy() {
            self.report(StatusLevel::Warning, "Cannot change settings while converting!");
            return Err(SettingsError::Busy);
        }
        Ok(())
    }

    pub fn set_channel_name(&mut self, channel: i64, name: &str) -> Result<(), SettingsError> {
        self.ensure_idle()?;
        Ok(self.settings.set_channel_name(channel, name)?)
    }

    /// Settings as they would be after taking the form, without touching the current ones
    fn validated(&self, form: &SettingsForm) -> Result<TriggerSettings, ValidationError> {
        if form.input.trim().is_empty() {
            return Err(ValidationError::MissingInput);
        }
        if form.output.trim().is_empty() {
            return Err(ValidationError::MissingOutput);
        }
        let mut candidate = self.settings.clone();
        candidate.apply_form(form)?;
        Ok(candidate)
    }

    /// Check a form and build the request a run would use
    pub fn validate(&self, form: &SettingsForm) -> Result<ConversionRequest, ValidationError> {
        Ok(ConversionRequest::from_settings(&self.validated(form)?))
    }

    /// Take the form into the settings without exporting anything.
    ///
    /// Empty rings are kept, so that a half-filled form can still be saved; they are
    /// refused when the settings are applied or a conversion starts.
    pub fn update_settings(&mut self, form: &SettingsForm) -> Result<(), SettingsError> {
        self.ensure_idle()?;
        let mut candidate = self.settings.clone();
        match candidate.apply_form(form) {
            Ok(()) => {
                self.settings = candidate;
                Ok(())
            }
            Err(e) => {
                self.report(StatusLevel::Error, &e.to_string());
                Err(SettingsError::Invalid(e))
            }
        }
    }

    /// Validate a form and launch the soft trigger with it.
    ///
    /// Nothing is spawned unless no job is running and the whole form is valid.
    pub fn validate_and_start(&mut self, form: &SettingsForm) -> Result<(), StartError> {
        if self.is_busy() {
            self.report(StatusLevel::Warning, "A conversion is already running!");
            return Err(StartError::JobBusy);
        }

        let candidate = match self.validated(form) {
            Ok(candidate) => candidate,
            Err(e) => {
                self.report(StatusLevel::Error, &e.to_string());
                return Err(StartError::Invalid(e));
            }
        };
        self.settings = candidate;

        let request = ConversionRequest::from_settings(&self.settings);
        match ConversionJob::start(request, &self.tool_path, self.runner.clone()) {
            Ok(job) => {
                self.job = Some(job);
                self.report(StatusLevel::Warning, MSG_PROCESSING);
                Ok(())
            }
            Err(e) => {
                self.report(StatusLevel::Error, &e.to_string());
                Err(StartError::Job(e))
            }
        }
    }

    /// Pick up the result of the running job, if it has finished.
    ///
    /// The status is updated before the job slot is released.
    pub fn poll(&mut self) -> Option<ConversionResult> {
        let result = self.job.as_mut()?.try_result()?;
        self.on_job_complete(&result);
        self.job = None;
        Some(result)
    }

    /// Block until the running job finishes
    pub fn wait(&mut self) -> Option<ConversionResult> {
        let result = self.job.as_mut()?.wait()?;
        self.on_job_complete(&result);
        self.job = None;
        Some(result)
    }

    pub fn on_job_complete(&mut self, result: &ConversionResult) {
        if result.is_success() {
            self.report(StatusLevel::Good, MSG_FINISHED);
        } else {
            if let Some(msg) = &result.diagnostic {
                log::error!("{msg}");
            }
            self.report(StatusLevel::Error, MSG_FAILED);
        }
    }

    /// Take the form and export it as the live pipeline script
    pub fn apply_settings(&mut self, form: &SettingsForm) -> Result<(), SettingsError> {
        self.ensure_idle()?;
        let checked = self
            .validated(form)
            .and_then(|candidate| candidate.check_script().map(|_| candidate));
        let candidate = match checked {
            Ok(candidate) => candidate,
            Err(e) => {
                self.report(StatusLevel::Error, &e.to_string());
                return Err(SettingsError::Invalid(e));
            }
        };

        match candidate.write_script_file(&self.script_path) {
            Ok(()) => {
                log::info!("Wrote pipeline settings to {}", self.script_path.display());
                self.settings = candidate;
                self.report(StatusLevel::Good, MSG_APPLIED);
                Ok(())
            }
            Err(e) => {
                self.report(
                    StatusLevel::Error,
                    &format!("Failed to apply the settings! - {e}"),
                );
                Err(e)
            }
        }
    }

    /// Replace the settings with the contents of a JSON file. Nothing is exported.
    pub fn load_settings(&mut self, path: &Path) -> Result<(), SettingsError> {
        self.ensure_idle()?;
        match TriggerSettings::read_json_file(path) {
            Ok(settings) => {
                self.settings = settings;
                self.report(
                    StatusLevel::Good,
                    &format!(
                        "Successfully loaded the file! - {} (Not applied yet)",
                        display_name(path)
                    ),
                );
                Ok(())
            }
            Err(e) => {
                self.report(
                    StatusLevel::Error,
                    &format!("Failed to load the file! - {e}"),
                );
                Err(e)
            }
        }
    }

    /// Write the settings to a JSON file, adding the .json extension when missing.
    /// Returns the path actually written.
    pub fn save_settings(&mut self, path: &Path) -> Result<PathBuf, SettingsError> {
        let path = with_json_extension(path);
        match self.settings.write_json_file(&path) {
            Ok(()) => {
                self.report(
                    StatusLevel::Good,
                    &format!("Successfully saved to file! - {}", display_name(&path)),
                );
                Ok(path)
            }
            Err(e) => {
                self.report(
                    StatusLevel::Error,
                    &format!("Failed to save the file! - {e}"),
                );
                Err(e)
            }
        }
    }

    /// Font size that fits the status text into a `width` x `height` label.
    /// Refitted only when the text or the label changes.
    pub fn status_font_size(&mut self, metric: &dyn TextMetric, width: f32, height: f32) -> f32 {
        if let Some((w, h, size)) = self.status_size {
            if w == width && h == height {
                return size;
            }
        }
        let size =
            TextFitter::STATUS.fit(metric, &self.status.text, width, height, STATUS_START_SIZE);
        self.status_size = Some((width, height, size));
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionStatus;
    use crate::text_fitter::MonospaceMetric;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};

    /// Holds every run until the test releases it
    struct GatedRunner {
        gate: Mutex<mpsc::Receiver<i32>>,
        calls: AtomicUsize,
    }

    impl ProcessRunner for GatedRunner {
        fn run(&self, _program: &Path, _args: &[String]) -> Result<Option<i32>, std::io::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let code = self.gate.lock().unwrap().recv().unwrap_or(0);
            Ok(Some(code))
        }
    }

    fn gated() -> (Arc<GatedRunner>, mpsc::Sender<i32>) {
        let (tx, rx) = mpsc::channel();
        let runner = Arc::new(GatedRunner {
            gate: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        });
        (runner, tx)
    }

    fn orchestrator(runner: Arc<dyn ProcessRunner>, dir: &Path) -> Orchestrator {
        Orchestrator::new(&dir.join("tool"), &dir.join(SCRIPT_NAME), runner)
    }

    fn valid_form() -> SettingsForm {
        SettingsForm {
            input: String::from("/data/in.evt"),
            output: String::from("/data/out.evt"),
            trigger_channel: 3,
            window_start: String::from("100"),
            window_width: String::from("50"),
            ..SettingsForm::default()
        }
    }

    #[test]
    fn invalid_forms_start_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner.clone(), dir.path());

        let cases = [
            (
                SettingsForm {
                    input: String::new(),
                    ..valid_form()
                },
                ValidationError::MissingInput,
            ),
            (
                SettingsForm {
                    output: String::from("  "),
                    ..valid_form()
                },
                ValidationError::MissingOutput,
            ),
            (
                SettingsForm {
                    trigger_channel: 32,
                    ..valid_form()
                },
                ValidationError::InvalidChannel(32),
            ),
            (
                SettingsForm {
                    window_start: String::from("ten"),
                    ..valid_form()
                },
                ValidationError::InvalidWindow(String::from("ten")),
            ),
            (
                SettingsForm {
                    window_width: String::from("10000000"),
                    ..valid_form()
                },
                ValidationError::InvalidWindow(String::from("10000000")),
            ),
            (
                SettingsForm {
                    output: String::from("/data/out.evt\nrm -rf /"),
                    ..valid_form()
                },
                ValidationError::InvalidPath(String::from("/data/out.evt\nrm -rf /")),
            ),
        ];
        for (form, expected) in cases {
            match orch.validate_and_start(&form) {
                Err(StartError::Invalid(e)) => assert_eq!(e, expected),
                other => panic!("expected {expected:?}, got {other:?}"),
            }
            assert!(!orch.is_busy());
            assert_eq!(orch.status().level, StatusLevel::Error);
        }
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.settings(), &TriggerSettings::default());
    }

    #[test]
    fn second_start_is_busy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, tx) = gated();
        let mut orch = orchestrator(runner.clone(), dir.path());

        orch.validate_and_start(&valid_form()).unwrap();
        assert!(!orch.controls_enabled());
        assert_eq!(orch.status().text, MSG_PROCESSING);
        assert_eq!(orch.status().level, StatusLevel::Warning);
        assert!(matches!(
            orch.validate_and_start(&valid_form()),
            Err(StartError::JobBusy)
        ));

        tx.send(0).unwrap();
        let result = orch.wait().unwrap();
        assert!(result.is_success());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.status().text, MSG_FINISHED);
        assert_eq!(orch.status().level, StatusLevel::Good);
        assert!(orch.controls_enabled());
        assert_eq!(orch.poll(), None);
    }

    #[test]
    fn started_run_keeps_the_form() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        let form = valid_form();
        assert_eq!(
            orch.validate(&form).unwrap().input(),
            Path::new("/data/in.evt")
        );
        orch.validate_and_start(&form).unwrap();
        assert_eq!(orch.form(), form);
        tx.send(1).unwrap();
        let result = orch.wait().unwrap();
        assert_eq!(result.status, ConversionStatus::ToolFailure(Some(1)));
        assert_eq!(orch.status().text, MSG_FAILED);
    }

    #[test]
    fn poll_waits_for_the_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        orch.validate_and_start(&valid_form()).unwrap();
        assert_eq!(orch.poll(), None);
        assert!(orch.is_busy());

        tx.send(0).unwrap();
        let mut result = None;
        for _ in 0..1000 {
            result = orch.poll();
            if result.is_some() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(result.unwrap().is_success());
        assert!(!orch.is_busy());
    }

    #[test]
    fn apply_writes_the_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        orch.apply_settings(&SettingsForm {
            input: String::from("mdpp_raw"),
            output: String::from("mdpp_trig"),
            ..valid_form()
        })
        .unwrap();
        let script = std::fs::read_to_string(dir.path().join(SCRIPT_NAME)).unwrap();
        assert!(script.starts_with("set inring mdpp_raw\nset outring mdpp_trig\n"));
        assert_eq!(orch.status().text, MSG_APPLIED);
        assert_eq!(orch.settings().input(), "mdpp_raw");
    }

    #[test]
    fn apply_refuses_rings_that_break_the_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        for input in ["ring_a\nset trigCh 31", "ring a", "[exec reboot]"] {
            let result = orch.apply_settings(&SettingsForm {
                input: String::from(input),
                output: String::from("ring_b"),
                ..valid_form()
            });
            assert!(matches!(result, Err(SettingsError::Invalid(_))), "{input}");
            assert_eq!(orch.status().level, StatusLevel::Error);
        }
        assert!(!dir.path().join(SCRIPT_NAME).exists());
        assert_eq!(orch.settings(), &TriggerSettings::default());
    }

    #[test]
    fn settings_are_frozen_while_converting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, tx) = gated();
        let mut orch = orchestrator(runner.clone(), dir.path());
        let file = dir.path().join("other.json");
        let mut other = TriggerSettings::default();
        other.set_input("other_in");
        other.write_json_file(&file).unwrap();

        let form = SettingsForm {
            input: String::from("/a.evt"),
            ..valid_form()
        };
        orch.validate_and_start(&form).unwrap();
        assert!(matches!(orch.load_settings(&file), Err(SettingsError::Busy)));
        assert_eq!(orch.status().level, StatusLevel::Warning);
        assert!(matches!(
            orch.update_settings(&valid_form()),
            Err(SettingsError::Busy)
        ));
        assert!(matches!(
            orch.apply_settings(&valid_form()),
            Err(SettingsError::Busy)
        ));
        assert!(matches!(
            orch.set_channel_name(0, "busy"),
            Err(SettingsError::Busy)
        ));
        assert_eq!(orch.settings().input(), "/a.evt");
        assert_eq!(orch.settings().channel_name(0), Some("Channel 0"));
        assert!(!dir.path().join(SCRIPT_NAME).exists());

        tx.send(0).unwrap();
        orch.wait().unwrap();
        orch.load_settings(&file).unwrap();
        assert_eq!(orch.settings().input(), "other_in");
    }

    #[test]
    fn half_filled_form_can_be_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        let form = SettingsForm {
            input: String::new(),
            output: String::new(),
            ..valid_form()
        };
        orch.update_settings(&form).unwrap();
        let written = orch.save_settings(&dir.path().join("draft")).unwrap();
        let loaded = TriggerSettings::read_json_file(&written).unwrap();
        assert_eq!(loaded.input(), "");
        assert_eq!(loaded.trigger_channel(), 3);

        assert!(matches!(
            orch.update_settings(&SettingsForm {
                window_start: String::from("soon"),
                ..form
            }),
            Err(SettingsError::Invalid(ValidationError::InvalidWindow(_)))
        ));
    }

    #[test]
    fn failed_apply_keeps_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = Orchestrator::new(
            &dir.path().join("tool"),
            &dir.path().join("missing_dir").join(SCRIPT_NAME),
            runner,
        );
        assert!(matches!(
            orch.apply_settings(&valid_form()),
            Err(SettingsError::IoFailure(_))
        ));
        assert_eq!(orch.status().level, StatusLevel::Error);
        assert!(orch.status().text.starts_with("Failed to apply the settings!"));
        assert_eq!(orch.settings(), &TriggerSettings::default());
    }

    #[test]
    fn save_and_load_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner.clone(), dir.path());
        orch.update_settings(&valid_form()).unwrap();
        orch.set_channel_name(3, "Si front").unwrap();
        assert!(orch.set_channel_name(-1, "nope").is_err());

        let written = orch.save_settings(&dir.path().join("beam_test")).unwrap();
        assert_eq!(written, dir.path().join("beam_test.json"));
        assert_eq!(
            orch.status().text,
            "Successfully saved to file! - beam_test.json"
        );
        let kept = orch.save_settings(&dir.path().join("upper.JSON")).unwrap();
        assert_eq!(kept, dir.path().join("upper.JSON"));

        let mut other = orchestrator(runner, dir.path());
        other.load_settings(&written).unwrap();
        assert_eq!(other.settings(), orch.settings());
        assert_eq!(other.settings().channel_name(3), Some("Si front"));
        assert_eq!(
            other.status().text,
            "Successfully loaded the file! - beam_test.json (Not applied yet)"
        );
    }

    #[test]
    fn failed_load_keeps_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"inring": "a"}"#).unwrap();
        assert!(matches!(
            orch.load_settings(&bad),
            Err(SettingsError::MalformedSettings(_))
        ));
        assert_eq!(orch.status().level, StatusLevel::Error);
        assert!(orch.load_settings(&dir.path().join("gone.json")).is_err());
        assert_eq!(orch.settings(), &TriggerSettings::default());
    }

    struct CountingMetric {
        inner: MonospaceMetric,
        calls: Cell<usize>,
    }

    impl TextMetric for CountingMetric {
        fn wrapped_height(&self, text: &str, font_size: f32, wrap_width: f32) -> f32 {
            self.calls.set(self.calls.get() + 1);
            self.inner.wrapped_height(text, font_size, wrap_width)
        }
    }

    #[test]
    fn status_size_is_refit_on_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (runner, _tx) = gated();
        let mut orch = orchestrator(runner, dir.path());
        let metric = CountingMetric {
            inner: MonospaceMetric::default(),
            calls: Cell::new(0),
        };
        orch.report(StatusLevel::Error, MSG_FAILED);
        let size = orch.status_font_size(&metric, 200.0, 30.0);
        let calls = metric.calls.get();
        assert_eq!(orch.status_font_size(&metric, 200.0, 30.0), size);
        assert_eq!(metric.calls.get(), calls);

        orch.report(StatusLevel::Good, MSG_FINISHED);
        let finished = orch.status_font_size(&metric, 200.0, 30.0);
        assert!(finished > size);
        assert!(metric.calls.get() > calls);
    }
}
