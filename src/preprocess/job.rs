use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Child;

/// Preprocessor output for one source file.
///
/// The job owns the child process, its output stream and the temp file (if
/// any). Dropping it drains the stream so the child cannot block on a full
/// pipe, reaps the child and deletes the temp file.
pub struct PreprocessJob {
    tool: String,
    source: PathBuf,
    child: Child,
    stream: Box<dyn Read + Send>,
    temp_file: Option<PathBuf>,
}

impl PreprocessJob {
    pub(crate) fn new(
        tool: &str,
        source: &Path,
        child: Child,
        stream: Box<dyn Read + Send>,
        temp_file: Option<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.to_string(),
            source: source.to_path_buf(),
            child,
            stream,
            temp_file,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn stream(&mut self) -> &mut dyn Read {
        &mut self.stream
    }

    pub fn temp_file(&self) -> Option<&Path> {
        self.temp_file.as_deref()
    }

    /// OS process id of the preprocessor.
    pub fn process_id(&self) -> u32 {
        self.child.id()
    }
}

impl fmt::Debug for PreprocessJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessJob")
            .field("tool", &self.tool)
            .field("source", &self.source)
            .field("pid", &self.child.id())
            .field("temp_file", &self.temp_file)
            .finish()
    }
}

impl Read for PreprocessJob {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Drop for PreprocessJob {
    fn drop(&mut self) {
        let mut stream = std::mem::replace(&mut self.stream, Box::new(io::empty()));
        if let Err(e) = io::copy(&mut stream, &mut io::sink()) {
            tracing::debug!("Draining preprocessor output for {}: {}", self.source.display(), e);
        }
        drop(stream);

        match self.child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!("{} exited with {} for {}", self.tool, status, self.source.display());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Cannot wait for preprocessor of {}: {}", self.source.display(), e);
            }
        }

        if let Some(path) = self.temp_file.take() {
            remove_quietly(&path);
        }
    }
}

/// Deletes `path`, ignoring every error (including the file not existing).
pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!("Cannot remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::preprocess::{Preprocessor, ToolConfig, Transport};

    #[test]
    fn test_drop_drains_unread_output() {
        // Far more than a pipe buffer holds; the child would block forever if not drained.
        let tool = ToolConfig::new("sh")
            .with_options("-c, yes line | head -n 200000")
            .with_transport(Transport::Pipe);
        let mut job = Preprocessor::new(tool).run(Path::new("unused.h")).unwrap();

        let mut first = [0u8; 5];
        job.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"line\n");
        drop(job);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_drop_reaps_child() {
        let tool = ToolConfig::new("cat").with_transport(Transport::Pipe);
        let job = Preprocessor::new(tool).run(Path::new("/dev/null")).unwrap();
        let pid = job.process_id();
        drop(job);

        assert!(!Path::new(&format!("/proc/{}", pid)).exists());
    }

    #[test]
    fn test_drop_removes_temp_file_after_partial_read() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let source = temp_dir.path().join("big.cpp");
        std::fs::write(&source, "x\n".repeat(10_000)).unwrap();

        let tool = ToolConfig::new("sh")
            .with_options("-c, cat \"$0\" > %.i")
            .with_work_dir(temp_dir.path());
        let mut job = Preprocessor::new(tool).run(&source).unwrap();
        let mut first = [0u8; 2];
        job.read_exact(&mut first).unwrap();
        drop(job);

        assert!(!temp_dir.path().join("big.i").exists());
    }

    #[test]
    fn test_nonzero_pipe_exit_keeps_output() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let source = temp_dir.path().join("a.h");
        std::fs::write(&source, "class A {};\n").unwrap();

        let tool = ToolConfig::new("sh")
            .with_options("-c, cat \"$0\"; exit 3")
            .with_transport(Transport::Pipe);
        let mut job = Preprocessor::new(tool).run(&source).unwrap();

        let mut output = String::new();
        job.read_to_string(&mut output).unwrap();
        assert_eq!(output, "class A {};\n");
        drop(job);
    }

    #[test]
    fn test_debug_names_tool_and_source() {
        let tool = ToolConfig::new("cat").with_transport(Transport::Pipe);
        let job = Preprocessor::new(tool).run(Path::new("/dev/null")).unwrap();

        let text = format!("{:?}", job);
        assert!(text.contains("\"cat\""));
        assert!(text.contains("/dev/null"));
        assert!(text.contains(&job.process_id().to_string()));
    }
}
