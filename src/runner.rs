//! External-runner collaborator (spec §6): runs a target binary compiled for
//! `gprof`-style profiling inside an isolated temp directory, then hands its
//! `gmon.out` to the system `gprof` and forwards its report to stdout.
//!
//! Grounded directly on `examples/original_source/src/external_runner.c`'s
//! fork/exec/waitpid dance, expressed with `std::process::Command` and
//! `tempfile::TempDir` instead of hand-rolled `mkdtemp`/`execv`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::error::{ProfilerError, Result};

/// Executes `target_path target_args` inside a fresh temp directory, then
/// runs `gprof target_path gmon.out` and streams its output to this
/// process's stdout. Returns `Ok(())` only if the target exits 0, produces a
/// `gmon.out`, and `gprof` itself exits 0 (spec §6/§7).
pub fn run_external_profile(target_path: &Path, target_args: &[String]) -> Result<()> {
    let resolved_target = fs::canonicalize(target_path).map_err(|_| ProfilerError::ExternalTargetMissing {
        path: target_path.to_path_buf(),
    })?;

    let temp_dir = TempDir::new().map_err(ProfilerError::TempDirCreate)?;
    let gmon_path = temp_dir.path().join("gmon.out");

    println!("{}", "=".repeat(80));
    println!("External Target Profiling");
    println!("{}", "=".repeat(80));
    println!("Target: {}", resolved_target.display());
    println!("Working directory: {}", temp_dir.path().display());
    io::stdout().flush().ok();

    let status = Command::new(&resolved_target)
        .args(target_args)
        .current_dir(temp_dir.path())
        .status()
        .map_err(|source| ProfilerError::SpawnFailed {
            path: resolved_target.clone(),
            source,
        })?;

    if !status.success() {
        return Err(ProfilerError::TargetExitedNonZero(status.code().unwrap_or(-1)));
    }

    if !gmon_path.exists() {
        return Err(ProfilerError::MissingGmonArtifact);
    }

    println!("\nGenerated profile: {}\n", gmon_path.display());
    io::stdout().flush().ok();

    run_gprof(&resolved_target, &gmon_path)
}

fn run_gprof(target_path: &Path, gmon_path: &Path) -> Result<()> {
    let output = Command::new("gprof")
        .arg(target_path)
        .arg(gmon_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ProfilerError::SpawnFailed {
            path: Path::new("gprof").to_path_buf(),
            source,
        })?;

    io::stdout().write_all(&output.stdout).ok();
    io::stderr().write_all(&output.stderr).ok();

    if !output.status.success() {
        return Err(ProfilerError::AnalyserFailed(format!(
            "gprof exited with status {}",
            output.status.code().unwrap_or(-1)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_is_reported_before_spawning() {
        let result = run_external_profile(Path::new("/nonexistent/path/to/target"), &[]);
        assert!(matches!(result, Err(ProfilerError::ExternalTargetMissing { .. })));
    }
}
