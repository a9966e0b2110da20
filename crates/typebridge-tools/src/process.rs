//! Subprocess execution with captured output and an optional deadline.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for the pipes to close once the child was killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// How a child process ended.
pub(crate) enum Completion {
    Exited(Output),
    /// Killed at the deadline; whatever was written to stderr so far.
    TimedOut { stderr: Vec<u8> },
}

/// Run `command` to completion, draining both pipes on helper threads so a
/// chatty child cannot fill a pipe and stall.
///
/// On unix the child leads a new process group, and the deadline kills the
/// whole group: wrappers such as `yarn json2ts` or `sh -c` leave the real
/// work to grandchildren that share the pipes.
pub(crate) fn run(mut command: Command, timeout: Option<Duration>) -> io::Result<Completion> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        command.process_group(0);
    }
    let mut child = command.spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        Some(limit) => wait_until(&mut child, Instant::now() + limit)?,
        None => Some(child.wait()?),
    };

    let grace = status.is_none().then_some(DRAIN_GRACE);
    let stdout = collect(stdout, grace);
    let stderr = collect(stderr, grace);
    Ok(match status {
        Some(status) => Completion::Exited(Output {
            status,
            stdout,
            stderr,
        }),
        None => Completion::TimedOut { stderr },
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(err) = pipe.read_to_end(&mut buf)
        {
            tracing::debug!(error = %err, "stopped reading child output");
        }
        // The receiver is gone when collection gave up waiting.
        let _ = tx.send(buf);
    });
    rx
}

/// Output of one pipe. With a `grace` period, a process that escaped the
/// kill and still holds the pipe open is not waited for.
fn collect(output: Receiver<Vec<u8>>, grace: Option<Duration>) -> Vec<u8> {
    match grace {
        Some(grace) => output.recv_timeout(grace).unwrap_or_else(|_| {
            tracing::debug!("child output still open after kill");
            Vec::new()
        }),
        None => output.recv().unwrap_or_default(),
    }
}

/// Poll until the child exits or `deadline` passes. `None` means the child
/// was killed.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill(child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child's process group, or just the child where groups are
/// unavailable.
fn kill(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let group = -(child.id() as libc::pid_t);
        // SAFETY: kill(2) takes no pointers; the group was created at spawn.
        if unsafe { libc::kill(group, libc::SIGKILL) } == 0 {
            return Ok(());
        }
    }
    // The child may exit between try_wait and kill.
    match child.kill() {
        Err(err) if err.kind() != io::ErrorKind::InvalidInput => Err(err),
        _ => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn captures_both_streams() {
        let Completion::Exited(output) = run(sh("echo out; echo err >&2"), None).unwrap() else {
            panic!("expected the child to exit");
        };
        assert!(output.status.success());
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }

    #[test]
    fn large_output_does_not_stall() {
        let script = "i=0; while [ $i -lt 20000 ]; do echo 0123456789abcdef; i=$((i+1)); done";
        let Completion::Exited(output) =
            run(sh(script), Some(Duration::from_secs(30))).unwrap()
        else {
            panic!("expected the child to exit");
        };
        assert_eq!(output.stdout.len(), 17 * 20000);
    }

    #[test]
    fn deadline_kills_child() {
        let started = Instant::now();
        let completion = run(
            sh("echo partial >&2; exec sleep 10"),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        let Completion::TimedOut { stderr } = completion else {
            panic!("expected a timeout");
        };
        assert_eq!(stderr, b"partial\n");
    }

    #[test]
    fn deadline_kills_grandchildren_holding_the_pipes() {
        let started = Instant::now();
        let completion = run(
            sh("echo partial >&2; sleep 10; :"),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        let Completion::TimedOut { stderr } = completion else {
            panic!("expected a timeout");
        };
        assert_eq!(stderr, b"partial\n");
    }
}
