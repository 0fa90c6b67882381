//! SSH command execution against the router
//!
//! Runs router commands through the system `ssh` client (or `sshpass -e ssh`
//! for password logins). The GPT-2541GNAC only offers legacy `ssh-rsa` host
//! keys and CBC ciphers, and its CLI does not accept exec requests reliably,
//! so the default [`SessionMode::Shell`] drives a PTY session and collects
//! output until the stream goes quiet.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;

use crate::config::{RouterSettings, SessionMode};
use crate::error::{CommandError, TransportError};

/// Ciphers the router firmware negotiates
const LEGACY_CIPHERS: &str = "+aes128-cbc,aes192-cbc,aes256-cbc";

/// How long to wait for the remote shell to exit after `exit`
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Output of one command as reported by the channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, when the channel can report one
    pub exit_status: Option<i32>,
    /// Standard output text
    pub stdout: String,
    /// Standard error text
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with no exit status
    #[must_use]
    pub fn text(stdout: impl Into<String>) -> Self {
        Self {
            exit_status: None,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// An open session that can run commands on the router
#[async_trait]
pub trait CommandChannel: Send {
    /// Runs one command and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Timeout`] when the command exceeds the
    /// execution timeout and [`CommandError::Disconnected`] when the session
    /// is lost.
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, CommandError>;

    /// Ends the session. Dropping a channel without closing it kills the
    /// session as well.
    async fn close(self: Box<Self>);
}

/// Opens command channels to one router
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a new channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the session cannot be established.
    async fn open(&self) -> Result<Box<dyn CommandChannel>, TransportError>;

    /// Human-readable target, for logs
    fn target(&self) -> String;
}

/// [`Transport`] backed by the OpenSSH client
#[derive(Debug, Clone)]
pub struct SshTransport {
    settings: RouterSettings,
    use_sshpass: bool,
}

impl SshTransport {
    /// Creates a transport for the configured router.
    ///
    /// Checks once whether `sshpass` is available when a password is set.
    #[must_use]
    pub fn new(settings: RouterSettings) -> Self {
        let use_sshpass = settings.password.is_some()
            && std::process::Command::new("sshpass")
                .arg("-V")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok();

        if settings.password.is_some() && !use_sshpass {
            tracing::warn!("Password configured but `sshpass` is not installed, trying key auth");
        }

        Self {
            settings,
            use_sshpass,
        }
    }

    /// Builds the `ssh` invocation shared by both session modes
    fn base_command(&self) -> Command {
        let mut cmd;

        if self.use_sshpass {
            cmd = Command::new("sshpass");
            cmd.arg("-e").arg("ssh");
            if let Some(ref pw) = self.settings.password {
                cmd.env("SSHPASS", pw.expose_secret());
            }
        } else {
            cmd = Command::new("ssh");
            cmd.arg("-o").arg("BatchMode=yes");
        }

        cmd.arg("-o").arg("StrictHostKeyChecking=no");
        cmd.arg("-o").arg("UserKnownHostsFile=/dev/null");
        cmd.arg("-o").arg("LogLevel=ERROR");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.settings.connect_timeout_secs));

        if self.settings.legacy_algorithms {
            cmd.arg("-o").arg("HostKeyAlgorithms=+ssh-rsa");
            cmd.arg("-o").arg("PubkeyAcceptedAlgorithms=+ssh-rsa");
            cmd.arg("-o").arg(format!("Ciphers={LEGACY_CIPHERS}"));
        }

        if self.settings.port != 22 {
            cmd.arg("-p").arg(self.settings.port.to_string());
        }

        if let Some(ref key) = self.settings.identity_file {
            cmd.arg("-i").arg(key);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.settings.username, self.settings.host)
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.command_timeout_secs)
    }

    /// Maps `ssh` diagnostics on stderr to a transport error
    fn classify_failure(&self, stderr: &str) -> TransportError {
        let stderr = stderr.trim();
        if stderr.contains("Permission denied") || stderr.contains("Authentication failed") {
            TransportError::Authentication {
                host: self.settings.host.clone(),
                user: self.settings.username.clone(),
            }
        } else if stderr.contains("timed out") {
            TransportError::ConnectTimeout {
                host: self.settings.host.clone(),
                secs: self.settings.connect_timeout_secs,
            }
        } else if stderr.is_empty() {
            TransportError::Disconnected("session ended without output".to_string())
        } else {
            TransportError::Disconnected(stderr.to_string())
        }
    }

    async fn open_shell(&self) -> Result<ShellChannel, TransportError> {
        let mut cmd = self.base_command();
        cmd.arg("-tt").arg(self.destination());
        cmd.stdin(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        let (Some(stdin), Some(stdout), stderr) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(TransportError::Spawn("SSH process has no stdio pipes".into()));
        };

        let mut channel = ShellChannel {
            transport: self.clone(),
            child,
            stdin,
            stdout,
            stderr,
        };

        // Wait for the login banner and prompt, then discard them.
        let connect = Duration::from_secs(self.settings.connect_timeout_secs);
        let timings = ReadTimings {
            first_byte: connect,
            quiet: self.settings.quiet_period(),
            limit: connect + self.command_timeout(),
        };
        let outcome = read_until_quiet(&mut channel.stdout, timings, None).await?;
        if matches!(outcome, ReadOutcome::Eof(_)) || !channel.alive() {
            let stderr = channel.drain_stderr().await;
            return Err(self.classify_failure(&stderr));
        }
        tracing::debug!(router = %self.target(), "Router shell ready");
        Ok(channel)
    }

    async fn exec_once(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let mut cmd = self.base_command();
        cmd.arg(self.destination()).arg(command);
        cmd.stdin(Stdio::null());

        let timeout = self.command_timeout();
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                // 255 is ssh's own failure status, not the router command's.
                if output.status.code() == Some(255) {
                    return Err(CommandError::Disconnected {
                        command: command.to_string(),
                        source: self.classify_failure(&stderr),
                    });
                }
                Ok(CommandOutput {
                    exit_status: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr,
                })
            }
            Ok(Err(e)) => Err(CommandError::Disconnected {
                command: command.to_string(),
                source: TransportError::Spawn(e.to_string()),
            }),
            Err(_) => Err(CommandError::Timeout {
                command: command.to_string(),
                secs: timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open(&self) -> Result<Box<dyn CommandChannel>, TransportError> {
        match self.settings.session {
            SessionMode::Shell => Ok(Box::new(self.open_shell().await?)),
            SessionMode::Exec => Ok(Box::new(ExecChannel {
                transport: self.clone(),
            })),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.destination(), self.settings.port)
    }
}

/// One `ssh host command` process per command
struct ExecChannel {
    transport: SshTransport,
}

#[async_trait]
impl CommandChannel for ExecChannel {
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        self.transport.exec_once(command).await
    }

    async fn close(self: Box<Self>) {}
}

/// Interactive PTY session
struct ShellChannel {
    transport: SshTransport,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
}

impl ShellChannel {
    fn alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn drain_stderr(&mut self) -> String {
        let Some(mut stderr) = self.stderr.take() else {
            return String::new();
        };
        let mut text = String::new();
        let _ = tokio::time::timeout(Duration::from_secs(1), stderr.read_to_string(&mut text)).await;
        text
    }

    async fn disconnected(&mut self, command: &str) -> CommandError {
        let stderr = self.drain_stderr().await;
        CommandError::Disconnected {
            command: command.to_string(),
            source: self.transport.classify_failure(&stderr),
        }
    }
}

#[async_trait]
impl CommandChannel for ShellChannel {
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        let line = format!("{command}\n");
        if let Err(e) = self.stdin.write_all(line.as_bytes()).await {
            return Err(CommandError::Disconnected {
                command: command.to_string(),
                source: TransportError::Io(e),
            });
        }
        if let Err(e) = self.stdin.flush().await {
            return Err(CommandError::Disconnected {
                command: command.to_string(),
                source: TransportError::Io(e),
            });
        }

        let timeout = self.transport.command_timeout();
        let timings = ReadTimings {
            first_byte: timeout,
            quiet: self.transport.settings.quiet_period(),
            limit: timeout,
        };

        match read_until_quiet(&mut self.stdout, timings, Some(command)).await {
            Ok(ReadOutcome::Quiet(data)) => Ok(CommandOutput::text(clean_shell_output(
                &data, command,
            ))),
            Ok(ReadOutcome::TimedOut(_)) => Err(CommandError::Timeout {
                command: command.to_string(),
                secs: timeout.as_secs(),
            }),
            Ok(ReadOutcome::Eof(_)) => Err(self.disconnected(command).await),
            Err(e) => Err(CommandError::Disconnected {
                command: command.to_string(),
                source: TransportError::Io(e),
            }),
        }
    }

    async fn close(mut self: Box<Self>) {
        let _ = self.stdin.write_all(b"exit\n").await;
        let _ = self.stdin.flush().await;
        if tokio::time::timeout(CLOSE_GRACE, self.child.wait())
            .await
            .is_err()
        {
            let _ = self.child.kill().await;
        }
    }
}

/// Timing bounds for one read
#[derive(Debug, Clone, Copy)]
struct ReadTimings {
    /// How long to wait for the first byte
    first_byte: Duration,
    /// Gap after which output is considered complete
    quiet: Duration,
    /// Hard limit for the whole read
    limit: Duration,
}

/// How a read ended
#[derive(Debug, PartialEq, Eq)]
enum ReadOutcome {
    /// Output arrived and then stopped for the quiet period
    Quiet(Vec<u8>),
    /// The stream closed
    Eof(Vec<u8>),
    /// Nothing arrived, or output was still streaming at the limit
    TimedOut(Vec<u8>),
}

/// Reads until the output goes quiet.
///
/// With `echo` set, the quiet period only starts once something past the
/// echoed command line has arrived; until then the `first_byte` wait applies.
async fn read_until_quiet<R>(
    reader: &mut R,
    timings: ReadTimings,
    echo: Option<&str>,
) -> std::io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
{
    let start = Instant::now();
    let mut buf = [0u8; 8192];
    let mut data = Vec::new();

    loop {
        let elapsed = start.elapsed();
        if elapsed >= timings.limit {
            return Ok(ReadOutcome::TimedOut(data));
        }
        let started = output_started(&data, echo);
        let wait = if started {
            timings.quiet
        } else {
            timings.first_byte
        };
        let wait = wait.min(timings.limit - elapsed);

        match tokio::time::timeout(wait, reader.read(&mut buf)).await {
            Err(_) if started => return Ok(ReadOutcome::Quiet(data)),
            Err(_) => return Ok(ReadOutcome::TimedOut(data)),
            Ok(Ok(0)) => return Ok(ReadOutcome::Eof(data)),
            Ok(Ok(n)) => data.extend_from_slice(&buf[..n]),
            Ok(Err(e)) => return Err(e),
        }
    }
}

/// Whether command output (not just its echo) has arrived
fn output_started(data: &[u8], echo: Option<&str>) -> bool {
    let Some(echo) = echo else {
        return !data.is_empty();
    };
    let text = String::from_utf8_lossy(data);
    match text.find(echo) {
        Some(pos) => text[pos + echo.len()..]
            .split_once('\n')
            .is_some_and(|(_, rest)| !rest.trim().is_empty()),
        None => !text.trim().is_empty(),
    }
}

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[()][0-9A-Za-z]")
        .expect("ANSI_ESCAPE is a valid regex pattern")
});

/// Strips terminal noise, the echoed command line and the trailing prompt
fn clean_shell_output(raw: &[u8], command: &str) -> String {
    let text = String::from_utf8_lossy(raw).replace('\r', "");
    let text = ANSI_ESCAPE.replace_all(&text, "");
    let mut lines: Vec<&str> = text.lines().collect();

    if let Some(pos) = lines
        .iter()
        .position(|l| l.trim_end().ends_with(command))
    {
        lines.drain(..=pos);
    }

    trim_trailing_blank(&mut lines);
    if lines.last().is_some_and(|l| is_prompt(l)) {
        lines.pop();
        trim_trailing_blank(&mut lines);
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn trim_trailing_blank(lines: &mut Vec<&str>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

fn is_prompt(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.len() <= 64
        && line.ends_with(['>', '#', '$'])
        && !line.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn timings(ms: u64) -> ReadTimings {
        ReadTimings {
            first_byte: Duration::from_millis(ms),
            quiet: Duration::from_millis(ms),
            limit: Duration::from_millis(ms * 20),
        }
    }

    #[test]
    fn test_clean_shell_output_strips_echo_and_prompt() {
        let raw = b"showlanstats\r\n\x1b[0mReceived Counters:\r\n  eth0 Up 1 2 3 4 5 6 7 8\r\nZTE>";
        let cleaned = clean_shell_output(raw, "showlanstats");
        assert_eq!(cleaned, "Received Counters:\n  eth0 Up 1 2 3 4 5 6 7 8\n");
    }

    #[test]
    fn test_clean_shell_output_with_prompt_prefixed_echo() {
        let raw = b"> lasercheck\nRx Optical Power = -20.5 dBm\n\n> ";
        let cleaned = clean_shell_output(raw, "lasercheck");
        assert_eq!(cleaned, "Rx Optical Power = -20.5 dBm\n");
    }

    #[test]
    fn test_clean_shell_output_empty() {
        assert_eq!(clean_shell_output(b"", "lasercheck"), "");
    }

    #[tokio::test]
    async fn test_read_until_quiet_collects_chunks() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tokio::spawn(async move {
            tx.write_all(b"abc").await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.write_all(b"def").await.unwrap();
            // keep the writer open so the reader sees quiet, not EOF
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let outcome = read_until_quiet(&mut rx, timings(100), None).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Quiet(b"abcdef".to_vec()));
    }

    #[tokio::test]
    async fn test_read_until_quiet_reports_eof() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"bye").await.unwrap();
        drop(tx);

        let outcome = read_until_quiet(&mut rx, timings(100), None).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Eof(b"bye".to_vec()));
    }

    #[tokio::test]
    async fn test_read_until_quiet_times_out_without_output() {
        let (_tx, mut rx) = tokio::io::duplex(64);
        let outcome = read_until_quiet(&mut rx, timings(20), None).await.unwrap();
        assert_eq!(outcome, ReadOutcome::TimedOut(Vec::new()));
    }

    #[tokio::test]
    async fn test_quiet_period_waits_for_output_after_echo() {
        let (mut tx, mut rx) = tokio::io::duplex(256);
        tokio::spawn(async move {
            tx.write_all(b"lasercheck\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.write_all(b"Rx Optical Power = -20.5 dBm\r\nZTE>").await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let timings = ReadTimings {
            first_byte: Duration::from_secs(2),
            quiet: Duration::from_millis(100),
            limit: Duration::from_secs(3),
        };
        let outcome = read_until_quiet(&mut rx, timings, Some("lasercheck"))
            .await
            .unwrap();
        let ReadOutcome::Quiet(data) = outcome else {
            panic!("expected quiet outcome, got {outcome:?}");
        };
        assert_eq!(
            clean_shell_output(&data, "lasercheck"),
            "Rx Optical Power = -20.5 dBm\n"
        );
    }

    #[tokio::test]
    async fn test_echo_without_output_times_out() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"showwanstats\r\n").await.unwrap();

        let outcome = read_until_quiet(&mut rx, timings(20), Some("showwanstats"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReadOutcome::TimedOut(_)));
        drop(tx);
    }

    #[test]
    fn test_output_started() {
        assert!(!output_started(b"", Some("lasercheck")));
        assert!(!output_started(b"lasercheck\r\n", Some("lasercheck")));
        assert!(!output_started(b"> lasercheck", Some("lasercheck")));
        assert!(output_started(b"lasercheck\r\nZTE>", Some("lasercheck")));
        assert!(output_started(b"banner", None));
    }
}
