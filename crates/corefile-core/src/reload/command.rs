//! Bounded external command execution

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Run `program args..`, capturing output, killed after `timeout`
pub(crate) async fn run(program: &str, args: &[String], timeout: Duration) -> Result<Output> {
    let description = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            tracing::error!(command = %description, error = %e, "Failed to spawn command");
            Err(Error::external(format!("failed to run `{description}`: {e}")))
        }
        Err(_) => {
            tracing::error!(command = %description, ?timeout, "Command timed out");
            Err(Error::Timeout(timeout, description))
        }
    }
}
