//! External validator processes.

use super::LintCheck;
use crate::config::ValidatorSpec;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A structural check run against one manifest file.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    /// The returned check's `block` is filled in by the caller.
    fn check(&self, file: &Path) -> LintCheck;
}

/// Runs `program args...` with `{file}` substituted; exit code 0 passes.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandValidator {
    pub fn new(name: &str, program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }

    pub fn from_spec(spec: &ValidatorSpec) -> Self {
        Self {
            name: spec.name.clone(),
            program: spec.program.clone(),
            args: spec.args.clone(),
            timeout: Duration::from_secs(spec.timeout_secs),
        }
    }

    fn result(&self, passed: bool, output: String, error: String) -> LintCheck {
        LintCheck { tool: self.name.clone(), block: 0, passed, skipped: false, output, error }
    }
}

impl Validator for CommandValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, file: &Path) -> LintCheck {
        let file_arg = file.to_string_lossy();
        let args: Vec<String> = self.args.iter().map(|a| a.replace("{file}", &file_arg)).collect();

        let mut child = match Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("{} not found, skipping {} check", self.program, self.name);
                let mut check =
                    self.result(true, format!("{} not installed", self.program), String::new());
                check.skipped = true;
                return check;
            }
            Err(e) => return self.result(false, String::new(), e.to_string()),
        };

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(e) = child.kill() {
                        tracing::debug!("Failed to kill {}: {}", self.program, e);
                    }
                    let _ = child.wait();
                    break Err("Timeout".to_string());
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => break Err(e.to_string()),
            }
        };

        let output = join(stdout);
        let error = join(stderr);
        match status {
            Ok(status) => self.result(status.success(), output, error),
            Err(reason) => self.result(false, String::new(), reason),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
