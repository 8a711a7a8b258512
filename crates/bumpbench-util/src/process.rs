use std::process::{Command, Output};

use crate::errors::BumpbenchError;

/// Run `program` with `args`, blocking until it exits, capturing both
/// output streams. Callers on the async runtime keep this off executor
/// threads (the reproducer drives it from dedicated worker threads).
pub fn run(program: &str, args: &[String]) -> Result<Output, BumpbenchError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(BumpbenchError::from)
}

/// Run `program` and require a zero exit status, returning stdout as
/// bytes. Non-zero exit is reported as a `Container` error carrying
/// stderr, since every caller of this path is a daemon/VCS subprocess.
pub fn run_ok(program: &str, args: &[String]) -> Result<Vec<u8>, BumpbenchError> {
    let output = run(program, args)?;
    if !output.status.success() {
        return Err(BumpbenchError::Container {
            message: format!(
                "`{program} {}` exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }
    Ok(output.stdout)
}
