use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::Outcome;
use crate::config::SignatureConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Checks a detached signature over a payload.
pub trait SignatureVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, payload: &[u8], signature: &str) -> Outcome;
}

/// Runs `gpg --verify <sigfile> -` with the payload on stdin and looks for
/// the verdict in its diagnostic output.
#[derive(Debug, Clone)]
pub struct GpgVerifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    good_marker: String,
    bad_marker: String,
}

impl GpgVerifier {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
            good_marker: "Good signature from".to_string(),
            bad_marker: "BAD signature from".to_string(),
        }
    }

    pub fn from_config(config: &SignatureConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            good_marker: config.good_marker.clone(),
            bad_marker: config.bad_marker.clone(),
        }
    }

    /// Arguments placed before `--verify`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the exit status and captured stderr, or `None` on timeout.
    fn run(&self, payload: &[u8], signature: &str) -> io::Result<Option<(ExitStatus, String)>> {
        // Removed when dropped, on every return path.
        let mut sig_file = tempfile::Builder::new()
            .prefix("plml")
            .suffix(".sig")
            .tempfile()?;
        sig_file.write_all(signature.as_bytes())?;
        sig_file.flush()?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--verify")
            .arg(sig_file.path())
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + self.timeout;

        // Neither thread is joined: a process left behind by the child can
        // hold the pipes open past the deadline.
        let stdin = child.stdin.take();
        let data = payload.to_vec();
        thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // the child may exit without reading everything
                let _ = stdin.write_all(&data);
            }
        });

        let stderr = child.stderr.take();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut output);
            }
            let _ = sender.send(String::from_utf8_lossy(&output).into_owned());
        });

        let Some(status) = wait_until(&mut child, deadline)? else {
            return Ok(None);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(output) => Ok(Some((status, output))),
            Err(RecvTimeoutError::Timeout) => {
                debug!("{} exited but its output stayed open", self.program);
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => Ok(Some((status, String::new()))),
        }
    }
}

impl Default for GpgVerifier {
    fn default() -> Self {
        Self::new("gpg")
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl SignatureVerifier for GpgVerifier {
    fn verify(&self, payload: &[u8], signature: &str) -> Outcome {
        let (status, output) = match self.run(payload, signature) {
            Ok(Some(result)) => result,
            Ok(None) => {
                warn!("{} timed out after {:?}", self.program, self.timeout);
                return Outcome::VerificationUnavailable(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs_f32()
                ));
            }
            Err(e) => {
                warn!("failed to run {}: {}", self.program, e);
                return Outcome::VerificationUnavailable(format!(
                    "failed to run {}: {}",
                    self.program, e
                ));
            }
        };
        debug!("{} exited with {}", self.program, status);

        if output.contains(&self.bad_marker) {
            return Outcome::Mismatch;
        }
        if !status.success() {
            return Outcome::VerificationUnavailable(format!(
                "{} exited with {}",
                self.program, status
            ));
        }
        if output.lines().any(|line| line.contains(&self.good_marker)) {
            Outcome::Match
        } else {
            Outcome::VerificationUnavailable(format!("no verdict in {} output", self.program))
        }
    }
}
