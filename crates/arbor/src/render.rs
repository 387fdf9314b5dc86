//! Layout engine invocation.
//!
//! [`RenderDriver`] runs the Graphviz executable on a DOT description and
//! moves the produced image into place. Every render works inside its own
//! temporary directory created next to the output path, and the output is
//! only touched by the final rename, so a failed or timed-out render never
//! leaves a partial file behind.

use std::{
    fmt, fs,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    str::FromStr,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};
use serde::Deserialize;
use tempfile::Builder;

use crate::{ArborError, config::EngineConfig};

/// Image format produced by the layout engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Pdf,
    Jpg,
    /// Laid-out DOT with coordinates, as produced by `-Tdot`.
    Dot,
}

impl OutputFormat {
    /// File extension, which is also the value passed with `-T`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
            Self::Dot => "dot",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "dot" | "gv" => Ok(Self::Dot),
            _ => Err(format!(
                "unsupported output format `{s}`, expected one of png, svg, pdf, jpg, dot"
            )),
        }
    }
}

/// Derives an output file name from a diagram title.
///
/// The title is lowercased and spaces become underscores. Untitled diagrams
/// are named `diagram`.
///
/// ```
/// # use arbor::render::{OutputFormat, default_file_name};
/// assert_eq!(default_file_name(Some("AWS Trivia"), OutputFormat::Png), "aws_trivia.png");
/// assert_eq!(default_file_name(None, OutputFormat::Svg), "diagram.svg");
/// ```
pub fn default_file_name(title: Option<&str>, format: OutputFormat) -> String {
    let stem = title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(|title| title.to_lowercase().replace(' ', "_"))
        .unwrap_or_else(|| "diagram".to_string());
    format!("{stem}.{}", format.extension())
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    path: PathBuf,
    format: OutputFormat,
    bytes: u64,
    warnings: Option<String>,
}

impl RenderOutput {
    /// Path of the written artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Size of the artifact in bytes.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Diagnostics the engine wrote to stderr while still succeeding.
    pub fn warnings(&self) -> Option<&str> {
        self.warnings.as_deref()
    }
}

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const INPUT_FILE: &str = "diagram.dot";

/// Runs an external layout engine.
///
/// # Examples
///
/// ```rust,no_run
/// use std::{path::Path, time::Duration};
/// use arbor::render::{OutputFormat, RenderDriver};
///
/// let driver = RenderDriver::new("dot").with_timeout(Some(Duration::from_secs(30)));
/// let output = driver
///     .render("digraph { a -> b }", Path::new("out.svg"), OutputFormat::Svg)
///     .expect("render failed");
/// println!("wrote {} bytes", output.bytes());
/// ```
#[derive(Debug, Clone)]
pub struct RenderDriver {
    program: PathBuf,
    layout: String,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl RenderDriver {
    /// Creates a driver running `program` with the `dot` layout algorithm.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            layout: "dot".to_string(),
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program())
            .with_layout(config.layout())
            .with_timeout(config.timeout())
    }

    /// Sets the layout algorithm passed with `-K`.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Kills the engine when it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Renders `description` into `output` as `format`.
    ///
    /// Blocks until the engine exits or the timeout elapses.
    ///
    /// # Errors
    ///
    /// - [`ArborError::LayoutEngineUnavailable`] if the engine cannot be started
    /// - [`ArborError::LayoutEngine`] on a non-zero exit or a missing or empty
    ///   artifact, carrying the engine's stderr verbatim
    /// - [`ArborError::LayoutEngineTimeout`] if the timeout elapsed
    /// - [`ArborError::Io`] if the working directory cannot be prepared or the
    ///   artifact cannot be moved into place
    pub fn render(
        &self,
        description: &str,
        output: &Path,
        format: OutputFormat,
    ) -> Result<RenderOutput, ArborError> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let workdir = Builder::new().prefix(".arbor-").tempdir_in(parent)?;
        let input = workdir.path().join(INPUT_FILE);
        let artifact = workdir
            .path()
            .join(format!("diagram.{}", format.extension()));
        let artifact = if artifact == input {
            workdir.path().join("diagram.out.dot")
        } else {
            artifact
        };
        fs::write(&input, description)?;

        info!(
            program = self.program.display().to_string(),
            layout = self.layout.as_str(),
            format = format.extension();
            "Running layout engine"
        );
        let mut command = Command::new(&self.program);
        command
            .arg(format!("-T{}", format.extension()))
            .arg(format!("-K{}", self.layout))
            .arg("-o")
            .arg(&artifact)
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        trace!(command:?; "Spawning");

        let mut child = command
            .spawn()
            .map_err(|source| ArborError::LayoutEngineUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        let (sender, stderr) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                let _ = sender.send(String::from_utf8_lossy(&buffer).into_owned());
            });
        }

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let status = self.wait(&mut child, deadline)?;
        let diagnostics = self.collect_stderr(&mut child, &stderr, deadline)?;
        debug!(status:? = status.code(), stderr_len = diagnostics.len(); "Layout engine exited");

        if !status.success() {
            return Err(ArborError::LayoutEngine {
                status: status.code(),
                diagnostics,
            });
        }

        let bytes = match fs::metadata(&artifact) {
            Ok(metadata) if metadata.is_file() && metadata.len() > 0 => metadata.len(),
            _ => {
                let diagnostics = if diagnostics.trim().is_empty() {
                    "layout engine produced no output".to_string()
                } else {
                    diagnostics
                };
                return Err(ArborError::LayoutEngine {
                    status: status.code(),
                    diagnostics,
                });
            }
        };

        fs::rename(&artifact, output)?;

        let warnings = if diagnostics.trim().is_empty() {
            None
        } else {
            warn!(
                program = self.program.display().to_string();
                "Layout engine reported: {}", diagnostics.trim_end()
            );
            Some(diagnostics)
        };

        info!(path = output.display().to_string(), bytes; "Diagram rendered");
        Ok(RenderOutput {
            path: output.to_path_buf(),
            format,
            bytes,
            warnings,
        })
    }

    /// Waits for `child`, killing it once `deadline` passes.
    fn wait(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> Result<ExitStatus, ArborError> {
        let Some(deadline) = deadline else {
            return Ok(child.wait()?);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(self.time_out(child));
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Reads the engine's stderr once every process holding the pipe closed it.
    ///
    /// Processes left behind by the engine keep the pipe open, so the read is
    /// bounded by the same deadline as the engine itself.
    fn collect_stderr(
        &self,
        child: &mut Child,
        stderr: &Receiver<String>,
        deadline: Option<Instant>,
    ) -> Result<String, ArborError> {
        let received = match deadline {
            Some(deadline) => {
                stderr.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => stderr.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(diagnostics) => Ok(diagnostics),
            Err(RecvTimeoutError::Timeout) => Err(self.time_out(child)),
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        }
    }

    fn time_out(&self, child: &mut Child) -> ArborError {
        let timeout = self.timeout.unwrap_or_default();
        warn!(timeout:?; "Layout engine timed out, killing it");
        kill(child);
        ArborError::LayoutEngineTimeout { timeout }
    }
}

/// Kills the engine together with every process it started.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };

        // The engine leads its own process group, see `render`.
        if let Ok(pid) = i32::try_from(child.id()) {
            if let Err(errno) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                debug!(errno:?; "Could not signal the engine's process group");
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("svg".parse(), Ok(OutputFormat::Svg));
        assert_eq!("JPEG".parse(), Ok(OutputFormat::Jpg));
        assert_eq!("gv".parse(), Ok(OutputFormat::Dot));
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(
            default_file_name(Some("AWS Trivia Challenge Architecture"), OutputFormat::Png),
            "aws_trivia_challenge_architecture.png"
        );
        assert_eq!(default_file_name(Some("  "), OutputFormat::Pdf), "diagram.pdf");
    }

    #[test]
    fn test_driver_from_config() {
        let mut config = EngineConfig::default();
        config.set_program("/opt/graphviz/bin/dot");
        config.set_timeout(Some(Duration::from_secs(5)));

        let driver = RenderDriver::from_config(&config);
        assert_eq!(driver.program(), Path::new("/opt/graphviz/bin/dot"));
        assert_eq!(driver.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let driver = RenderDriver::new(dir.path().join("no-such-engine"));

        let err = driver
            .render("digraph {}", &output, OutputFormat::Png)
            .unwrap_err();

        assert!(matches!(err, ArborError::LayoutEngineUnavailable { .. }));
        assert!(!output.exists());
    }
}
