//! External preprocessor invocation
//!
//! Each source file is run through the configured compiler front end. The
//! output is read either straight from the child's stdout (pipe transport) or
//! from the `.i` file the tool leaves behind (temp-file transport).

pub mod job;

use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{platform_name, split_list, Config};
use crate::error::{DocError, Result};

pub use job::PreprocessJob;

pub const COMPILER_KEY: &str = "cppdoc.compiler";

/// Extension of the files written by the temp-file transport.
pub const OUTPUT_EXTENSION: &str = "i";

/// How the preprocessor output reaches the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Pipe,
    TempFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program to launch
    pub exec: String,
    /// Comma/newline separated arguments; `%` expands to the source base name
    pub options: String,
    /// Directories appended to `PATH` for the child
    pub search_path: Option<String>,
    pub transport: Transport,
    /// Directory the tool runs in and writes its `.i` files to
    pub work_dir: Option<PathBuf>,
}

impl ToolConfig {
    pub fn new(exec: impl Into<String>) -> Self {
        Self {
            exec: exec.into(),
            options: String::new(),
            search_path: None,
            transport: Transport::TempFile,
            work_dir: None,
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Reads `cppdoc.compiler.<platform>.<key>`, falling back to `cppdoc.compiler.<key>`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = |leaf: &str| {
            let platform_key = format!("{}.{}.{}", COMPILER_KEY, platform_name(), leaf);
            if config.has(&platform_key) {
                platform_key
            } else {
                format!("{}.{}", COMPILER_KEY, leaf)
            }
        };

        let exec = config
            .get_string(&key("exec"))
            .filter(|exec| !exec.trim().is_empty())
            .ok_or_else(|| {
                DocError::Config(format!("no preprocessor configured ({}.exec)", COMPILER_KEY))
            })?;

        let use_pipe = config.get_bool(&key("usePipe"))?.unwrap_or(false);

        Ok(Self {
            exec,
            options: config.get_string(&key("options")).unwrap_or_default(),
            search_path: config.get_string(&key("path")).filter(|p| !p.is_empty()),
            transport: if use_pipe {
                Transport::Pipe
            } else {
                Transport::TempFile
            },
            work_dir: config
                .get_string(&key("workDir"))
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Arguments for one source file; the source path always comes last.
    pub fn arguments(&self, source: &Path) -> Vec<OsString> {
        let options = self.options.replace('%', &base_name(source));
        let mut args: Vec<OsString> = split_list(&options).into_iter().map(OsString::from).collect();
        args.push(source.as_os_str().to_os_string());
        args
    }

    /// Where the tool is expected to write the preprocessed output of `source`.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let file_name = format!("{}.{}", base_name(source), OUTPUT_EXTENSION);
        match &self.work_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

pub struct Preprocessor {
    tool: ToolConfig,
}

impl Preprocessor {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Launches the tool for `source` and returns a job whose stream holds the output.
    pub fn run(&self, source: &Path) -> Result<PreprocessJob> {
        let command = self.command(source)?;
        match self.tool.transport {
            Transport::Pipe => self.run_piped(command, source),
            Transport::TempFile => self.run_to_file(command, source),
        }
    }

    fn command(&self, source: &Path) -> Result<Command> {
        let mut command = Command::new(&self.tool.exec);
        command
            .args(self.tool.arguments(source))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());

        if let Some(dir) = &self.tool.work_dir {
            command.current_dir(dir);
        }
        if let Some(extra) = &self.tool.search_path {
            command.env("PATH", augmented_search_path(extra)?);
        }

        Ok(command)
    }

    fn run_piped(&self, mut command: Command, source: &Path) -> Result<PreprocessJob> {
        command.stdout(Stdio::piped());
        let mut child = command.spawn().map_err(|e| self.launch_error(e))?;

        match child.stdout.take() {
            Some(stdout) => Ok(PreprocessJob::new(
                &self.tool.exec,
                source,
                child,
                Box::new(stdout),
                None,
            )),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(DocError::OpenFile(format!(
                    "no output pipe for {}",
                    source.display()
                )))
            }
        }
    }

    fn run_to_file(&self, mut command: Command, source: &Path) -> Result<PreprocessJob> {
        let output = self.tool.output_path(source);
        job::remove_quietly(&output);

        command.stdout(Stdio::inherit());
        let mut child = command.spawn().map_err(|e| self.launch_error(e))?;
        let status = child.wait()?;

        match File::open(&output) {
            Ok(file) => Ok(PreprocessJob::new(
                &self.tool.exec,
                source,
                child,
                Box::new(BufReader::new(file)),
                Some(output),
            )),
            Err(e) => {
                if !status.success() {
                    tracing::warn!("{} exited with {} for {}", self.tool.exec, status, source.display());
                }
                job::remove_quietly(&output);
                Err(DocError::OpenFile(format!("{}: {}", output.display(), e)))
            }
        }
    }

    fn launch_error(&self, source: std::io::Error) -> DocError {
        DocError::Launch {
            tool: self.tool.exec.clone(),
            source,
        }
    }
}

/// Inherited `PATH` with `extra` appended; only the child sees it.
fn augmented_search_path(extra: &str) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default();
    paths.extend(std::env::split_paths(extra));

    std::env::join_paths(paths)
        .map_err(|e| DocError::Config(format!("invalid search path `{}`: {}", extra, e)))
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
