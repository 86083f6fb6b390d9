//! Downstream Gradle invocation
//!
//! The generated project is compiled by the Gradle wrapper checked into
//! the project root. The build is a black box here: stdio is inherited so
//! Gradle's own progress output reaches the terminal, and any non-zero
//! exit status aborts the run. No retry, no output parsing.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::GradleError;

/// Gradle task that produces the release shared libraries.
pub const ASSEMBLE_TASK: &str = ":lib_module:assembleRelease";

fn wrapper_name() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "gradlew"
    }
}

/// Run the library-module release build in `project_root`.
pub fn run_module_build(project_root: &Path) -> Result<(), GradleError> {
    let gradlew = project_root.join(wrapper_name());
    let command_line = format!("{} {ASSEMBLE_TASK}", gradlew.display());
    info!(command = %command_line, "running gradle build");

    let status = Command::new(&gradlew)
        .arg(ASSEMBLE_TASK)
        .current_dir(project_root)
        .status()
        .map_err(|source| GradleError::Spawn {
            command: command_line,
            source,
        })?;

    if !status.success() {
        return Err(GradleError::BuildFailed {
            status: status
                .code()
                .map_or_else(|| "terminated by signal".to_string(), |c| c.to_string()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_wrapper_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_module_build(dir.path()).unwrap_err();
        match err {
            GradleError::Spawn { command, .. } => assert!(command.contains(ASSEMBLE_TASK)),
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn failing_wrapper_surfaces_the_exit_status() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let wrapper = dir.path().join("gradlew");
        std::fs::write(&wrapper, "#!/bin/sh\nexit 7\n").unwrap();
        std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = run_module_build(dir.path()).unwrap_err();
        match err {
            GradleError::BuildFailed { status } => assert_eq!(status, "7"),
            other => panic!("expected BuildFailed, got {other:?}"),
        }
    }
}
