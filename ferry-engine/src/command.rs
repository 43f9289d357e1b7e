//! External process invocation.
//!
//! `diff`, `merge`, `patch` and `bash` are reached only through
//! [`CommandRunner`], so the exit-status policy of each caller can be tested
//! with a scripted runner. There is no timeout: a hung tool hangs the run.

use std::path::Path;
use std::process::Command;

use ferry_core::Problem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn with_status(status: i32) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` in `working_dir` and wait for it.
    ///
    /// A non-zero exit is *not* an error here; callers interpret statuses.
    /// Only a failure to spawn is a [`Problem`].
    fn run(&self, program: &str, args: &[&str], working_dir: &Path)
        -> Result<CommandOutput, Problem>;
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        working_dir: &Path,
    ) -> Result<CommandOutput, Problem> {
        tracing::debug!(program, ?args, cwd = %working_dir.display(), "running command");
        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .output()
            .map_err(|e| Problem::new(format!("Could not run {program}: {e}")))?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command whose only acceptable exit status is 0.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    working_dir: &Path,
) -> Result<CommandOutput, Problem> {
    let output = runner.run(program, args, working_dir)?;
    if output.status != 0 {
        return Err(Problem::new(format!(
            "Running {program} {} failed with status {}: {}",
            args.join(" "),
            output.status,
            output.stderr.trim()
        )));
    }
    Ok(output)
}
