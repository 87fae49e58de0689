use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::error::JobError;
use super::settings::TriggerSettings;

/// Characters escaped when a local path is turned into a file URI
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Turn a local path into a `file://` URI. Relative paths are resolved against the
/// current directory.
pub fn file_uri(path: &Path) -> Result<String, std::io::Error> {
    let absolute = std::path::absolute(path)?;
    Ok(format!(
        "file://{}",
        utf8_percent_encode(&absolute.to_string_lossy(), PATH_ESCAPES)
    ))
}

/// Everything the soft trigger needs for one run, frozen when the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    input: PathBuf,
    output: PathBuf,
    trigger_channel: usize,
    window_start: u32,
    window_width: u32,
    cut3s: bool,
    /// -1 when the RF cut is off
    rf_channel: i64,
}

impl ConversionRequest {
    pub fn from_settings(settings: &TriggerSettings) -> Self {
        Self {
            input: PathBuf::from(settings.input()),
            output: PathBuf::from(settings.output()),
            trigger_channel: settings.trigger_channel(),
            window_start: settings.window_start(),
            window_width: settings.window_width(),
            cut3s: settings.cut3s(),
            rf_channel: settings.rf_argument(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The soft trigger arguments, in the order the tool expects them:
    /// input URI, output URI, trigger channel, window start, window width, cut3s flag,
    /// and the RF channel (-1 for no RF cut)
    pub fn arguments(&self) -> Result<Vec<String>, JobError> {
        let input_uri =
            file_uri(&self.input).map_err(|e| JobError::BadPath(self.input.clone(), e))?;
        let output_uri =
            file_uri(&self.output).map_err(|e| JobError::BadPath(self.output.clone(), e))?;
        Ok(vec![
            input_uri,
            output_uri,
            self.trigger_channel.to_string(),
            self.window_start.to_string(),
            self.window_width.to_string(),
            (self.cut3s as u8).to_string(),
            self.rf_channel.to_string(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    Success,
    /// The tool ran and exited non-zero; `None` when it was killed by a signal
    ToolFailure(Option<i32>),
    /// The tool could not be started at all
    LaunchFailure(String),
}

/// Outcome of one conversion.
///
/// The tool writes its own diagnostics to the terminal it inherits; they are not
/// captured here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub status: ConversionStatus,
    pub diagnostic: Option<String>,
}

impl ConversionResult {
    fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self {
                status: ConversionStatus::Success,
                diagnostic: None,
            },
            Some(code) => Self {
                status: ConversionStatus::ToolFailure(Some(code)),
                diagnostic: Some(format!("soft trigger exited with code {code}")),
            },
            None => Self {
                status: ConversionStatus::ToolFailure(None),
                diagnostic: Some(String::from("soft trigger was terminated by a signal")),
            },
        }
    }

    fn launch_failure(reason: &str) -> Self {
        Self {
            status: ConversionStatus::LaunchFailure(reason.to_string()),
            diagnostic: Some(reason.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

/// Runs an external program to completion and reports its exit code
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[String]) -> Result<Option<i32>, std::io::Error>;
}

/// Runs programs as child processes sharing this process's terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<Option<i32>, std::io::Error> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.code())
    }
}

/// A single soft trigger run executing on its own thread.
///
/// The worker sends exactly one [`ConversionResult`] back, and the job hands it out
/// exactly once. A worker that dies without reporting is reported as a launch failure.
#[derive(Debug)]
pub struct ConversionJob {
    worker: Option<JoinHandle<()>>,
    rx: mpsc::Receiver<ConversionResult>,
    delivered: bool,
}

impl ConversionJob {
    /// Launch the tool for a request. Empty paths are refused before anything is spawned.
    pub fn start(
        request: ConversionRequest,
        tool_path: &Path,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, JobError> {
        if request.input.as_os_str().is_empty() {
            return Err(JobError::MissingInput);
        }
        if request.output.as_os_str().is_empty() {
            return Err(JobError::MissingOutput);
        }

        let args = request.arguments()?;
        let program = tool_path.to_path_buf();
        log::info!("Launching {} {}", program.display(), args.join(" "));

        let (tx, rx) = mpsc::channel::<ConversionResult>();
        let worker = std::thread::Builder::new()
            .name(String::from("conversion"))
            .spawn(move || {
                let result = match runner.run(&program, &args) {
                    Ok(code) => ConversionResult::from_exit_code(code),
                    Err(e) => ConversionResult::launch_failure(&format!(
                        "Could not launch {}: {e}",
                        program.display()
                    )),
                };
                match &result.diagnostic {
                    Some(msg) => log::error!("Conversion failed: {msg}"),
                    None => log::info!("Conversion complete"),
                }
                if tx.send(result).is_err() {
                    log::warn!("Conversion finished after its job was dropped");
                }
            })
            .map_err(JobError::ThreadError)?;

        Ok(Self {
            worker: Some(worker),
            rx,
            delivered: false,
        })
    }

    /// Check for the result without blocking
    pub fn try_result(&mut self) -> Option<ConversionResult> {
        if self.delivered {
            return None;
        }
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => {
                ConversionResult::launch_failure("Conversion worker stopped without reporting")
            }
        };
        self.finish();
        Some(result)
    }

    /// Block until the result arrives
    pub fn wait(&mut self) -> Option<ConversionResult> {
        if self.delivered {
            return None;
        }
        let result = self.rx.recv().unwrap_or_else(|_| {
            ConversionResult::launch_failure("Conversion worker stopped without reporting")
        });
        self.finish();
        Some(result)
    }

    pub fn is_finished(&self) -> bool {
        self.delivered
    }

    fn finish(&mut self) {
        self.delivered = true;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("An error occured joining the conversion worker!");
            }
        }
    }
}
