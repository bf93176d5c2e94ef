//! Bounded execution of external Postfix tools.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::AdapterError;

/// Run `program` with a discrete argument vector and return its stdout.
///
/// Arguments are passed straight to `execve`, never through a shell. When
/// `input` is given it is written to the child's stdin. The child is killed
/// if it has not exited within `timeout`.
pub(crate) async fn run<I, S>(
    program: &Path,
    args: I,
    input: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<String, AdapterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    trace!(program = %name, "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| AdapterError::Spawn {
            program: name.clone(),
            source,
        })?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(mut stdin), Some(input)) = (stdin, input) {
            // A child that stops reading early closes the pipe; its exit
            // status is what matters.
            let _ = stdin.write_all(&input).await;
        }
    };

    let output = match tokio::time::timeout(timeout, async {
        let (_, output) = tokio::join!(feed, child.wait_with_output());
        output
    })
    .await
    {
        Ok(output) => output?,
        Err(_) => {
            debug!(program = %name, ?timeout, "command timed out, killing");
            return Err(AdapterError::Timeout {
                program: name,
                after: timeout,
            });
        }
    };

    if !output.status.success() {
        return Err(AdapterError::ExitStatus {
            program: name,
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
