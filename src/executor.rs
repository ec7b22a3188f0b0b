use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};

use console::style;
use thiserror::Error;

use crate::manifest::PackageManifest;
use crate::progress::Spinner;

/// Program invoked as `<tool> get [-v] <url>` for each package.
pub const DEFAULT_FETCH_TOOL: &str = "go";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fetch(tool: &str, url: &str, verbose: bool) -> Self {
        let mut args = vec!["get".to_string()];
        if verbose {
            args.push("-v".to_string());
        }
        args.push(url.to_string());
        Self::new(tool, args)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Where a child's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Echo the command line, then stream child stdout/stderr to ours.
    Inherit,
    /// Discard stdout and keep stderr for the error report.
    Capture,
}

impl OutputMode {
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            OutputMode::Inherit
        } else {
            OutputMode::Capture
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{program}: executable not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("running {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} {}{}", describe_exit(.code), describe_stderr(.stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("writing command echo: {0}")]
    Echo(#[source] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

pub trait CommandRunner {
    fn run(&mut self, command: &ExternalCommand) -> Result<(), CommandError>;
}

/// Runs commands as child processes, routing their output per [`OutputMode`].
#[derive(Debug)]
pub struct ProcessRunner<W = io::Stdout> {
    mode: OutputMode,
    echo: W,
}

impl ProcessRunner<io::Stdout> {
    pub fn new(mode: OutputMode) -> Self {
        Self::with_echo(mode, io::stdout())
    }
}

impl<W: Write> ProcessRunner<W> {
    pub fn with_echo(mode: OutputMode, echo: W) -> Self {
        Self { mode, echo }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn echo_command(&mut self, command: &ExternalCommand) -> io::Result<()> {
        writeln!(
            self.echo,
            "COMMAND: {}",
            style(command.to_string()).black().on_red()
        )?;
        self.echo.flush()
    }
}

impl<W: Write> CommandRunner for ProcessRunner<W> {
    fn run(&mut self, command: &ExternalCommand) -> Result<(), CommandError> {
        let program =
            which::which(command.program()).map_err(|source| CommandError::NotFound {
                program: command.program().to_string(),
                source,
            })?;

        let mut child = Command::new(program);
        child.args(command.args());
        let spawn_error = |source| CommandError::Spawn {
            command: command.to_string(),
            source,
        };

        let (code, stderr) = match self.mode {
            OutputMode::Inherit => {
                self.echo_command(command).map_err(CommandError::Echo)?;
                let status = child
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(spawn_error)?;
                if status.success() {
                    return Ok(());
                }
                (status.code(), String::new())
            }
            OutputMode::Capture => {
                let output = child
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .output()
                    .map_err(spawn_error)?;
                if output.status.success() {
                    return Ok(());
                }
                (
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
        };

        tracing::debug!(%command, ?code, "command failed");
        Err(CommandError::Failed {
            command: command.to_string(),
            code,
            stderr,
        })
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub installed: Vec<String>,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("installing {url} (package {}): {source}", .index + 1)]
    Fetch {
        index: usize,
        url: String,
        #[source]
        source: CommandError,
    },
    #[error("writing progress: {0}")]
    Output(#[source] io::Error),
}

/// Installs manifest entries one at a time, aborting on the first failure.
pub struct Installer<R = ProcessRunner, W = io::Stdout> {
    runner: R,
    out: W,
    fetch_tool: String,
    spinner: bool,
}

impl Installer {
    /// Installer writing to the real terminal, with output routing and
    /// spinner chosen from the manifest's debug flag.
    pub fn for_manifest(manifest: &PackageManifest) -> Self {
        let debug = manifest.debug();
        Self::new(
            ProcessRunner::new(OutputMode::from_debug(debug)),
            io::stdout(),
        )
        .with_spinner(!debug && Spinner::supported())
    }
}

impl<R: CommandRunner, W: Write> Installer<R, W> {
    pub fn new(runner: R, out: W) -> Self {
        Self {
            runner,
            out,
            fetch_tool: DEFAULT_FETCH_TOOL.to_string(),
            spinner: false,
        }
    }

    pub fn with_fetch_tool(mut self, tool: impl Into<String>) -> Self {
        self.fetch_tool = tool.into();
        self
    }

    pub fn with_spinner(mut self, enabled: bool) -> Self {
        self.spinner = enabled;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn install(&mut self, manifest: &PackageManifest) -> Result<InstallReport, InstallError> {
        let mut installed = Vec::with_capacity(manifest.packages().len());

        for (index, package) in manifest.packages().iter().enumerate() {
            writeln!(self.out, "Installing: {}", style(&package.url).cyan())
                .and_then(|()| self.out.flush())
                .map_err(InstallError::Output)?;

            let command = ExternalCommand::fetch(&self.fetch_tool, &package.url, manifest.debug());
            tracing::debug!(index, %command, "invoking fetch tool");

            let spinner = self
                .spinner
                .then(|| Spinner::start(format!("fetching {}", package.url)));
            let result = self.runner.run(&command);
            if let Some(spinner) = spinner {
                spinner.finish();
            }

            result.map_err(|source| InstallError::Fetch {
                index,
                url: package.url.clone(),
                source,
            })?;
            installed.push(package.url.clone());
        }

        Ok(InstallReport { installed })
    }
}
