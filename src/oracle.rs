//! Oracle contract and adapters.
//!
//! The oracle is the external collaborator that classifies a raw input as
//! failure-inducing, benign, or indeterminate. The engine only depends on
//! the [`Oracle`] trait; closures over in-process checks and subprocess
//! invocations of a subject program both satisfy it.
//!
//! Oracle misbehavior never aborts a diagnosis: a call that times out or
//! cannot be spawned yields [`Verdict::Undefined`], and undefined inputs
//! are excluded from scoring while staying in the pool for provenance.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::warn;

/// Ground-truth classification of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The input triggers the failure under diagnosis.
    Failing,
    /// The input runs without the failure.
    Passing,
    /// The oracle could not decide (timeout, crash, spawn failure).
    Undefined,
}

impl Verdict {
    /// True for [`Verdict::Failing`].
    pub fn is_failing(&self) -> bool {
        matches!(self, Verdict::Failing)
    }

    /// True for [`Verdict::Passing`].
    pub fn is_passing(&self) -> bool {
        matches!(self, Verdict::Passing)
    }

    /// True when the verdict carries evidence (not `Undefined`).
    pub fn is_defined(&self) -> bool {
        !matches!(self, Verdict::Undefined)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Failing => write!(f, "failing"),
            Verdict::Passing => write!(f, "passing"),
            Verdict::Undefined => write!(f, "undefined"),
        }
    }
}

/// Black-box verdict function supplied by the caller.
///
/// Must be deterministic for a fixed input within one diagnosis run; the
/// engine labels each distinct input once and never re-labels.
pub trait Oracle: Sync {
    /// Classify one raw input.
    fn verdict(&self, input: &str) -> Verdict;
}

impl<F> Oracle for F
where
    F: Fn(&str) -> Verdict + Sync,
{
    fn verdict(&self, input: &str) -> Verdict {
        self(input)
    }
}

/// Oracle that runs a subject program as a subprocess.
///
/// The input is written to the child's stdin; exit status 0 maps to
/// [`Verdict::Passing`], any other exit status to [`Verdict::Failing`].
/// Spawn failures and timeouts map to [`Verdict::Undefined`].
pub struct SubprocessOracle {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessOracle {
    /// Default per-call timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create an oracle for the given program and fixed arguments.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, input: &str) -> std::io::Result<Verdict> {
        use std::io::Write;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading; a broken pipe here is
            // not a spawn failure.
            let _ = stdin.write_all(input.as_bytes());
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(if status.success() {
                    Verdict::Passing
                } else {
                    Verdict::Failing
                });
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Verdict::Undefined);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Oracle for SubprocessOracle {
    fn verdict(&self, input: &str) -> Verdict {
        match self.run(input) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "oracle spawn failed");
                Verdict::Undefined
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_implements_oracle() {
        let oracle = |input: &str| {
            if input.contains('&') {
                Verdict::Failing
            } else {
                Verdict::Passing
            }
        };
        assert_eq!(oracle.verdict("&x"), Verdict::Failing);
        assert_eq!(oracle.verdict("x"), Verdict::Passing);
    }

    #[test]
    fn verdict_predicates() {
        assert!(Verdict::Failing.is_failing());
        assert!(Verdict::Passing.is_passing());
        assert!(Verdict::Failing.is_defined());
        assert!(!Verdict::Undefined.is_defined());
    }

    #[test]
    fn missing_program_is_undefined() {
        let oracle = SubprocessOracle::new("/nonexistent/subject-program", vec![]);
        assert_eq!(oracle.verdict("anything"), Verdict::Undefined);
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_maps_to_verdict() {
        let passing = SubprocessOracle::new("/bin/sh", vec!["-c".into(), "exit 0".into()]);
        assert_eq!(passing.verdict(""), Verdict::Passing);

        let failing = SubprocessOracle::new("/bin/sh", vec!["-c".into(), "exit 3".into()]);
        assert_eq!(failing.verdict(""), Verdict::Failing);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_maps_to_undefined() {
        let oracle = SubprocessOracle::new("/bin/sh", vec!["-c".into(), "sleep 5".into()])
            .with_timeout(Duration::from_millis(50));
        assert_eq!(oracle.verdict(""), Verdict::Undefined);
    }
}
