//! In-memory router transport for tests.
//!
//! [`ScriptedTransport`] hands out one [`ScriptedChannel`] per poll cycle, in
//! order, so poll logic can be exercised without a router or an `ssh` binary.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{CommandError, TransportError};
use crate::router::{CommandChannel, CommandOutput, Transport};

/// What a scripted command does when executed
#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
    Disconnect,
    Hang,
}

/// A [`CommandChannel`] answering from a fixed script
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    replies: HashMap<String, Reply>,
    executed: Vec<String>,
    released: Option<Arc<AtomicUsize>>,
}

impl ScriptedChannel {
    /// Creates a channel that knows no commands
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `command` with `stdout` and no exit status
    #[must_use]
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.with_output(command, CommandOutput::text(stdout))
    }

    /// Answers `command` with a full output record
    #[must_use]
    pub fn with_output(mut self, command: &str, output: CommandOutput) -> Self {
        self.replies.insert(command.to_string(), Reply::Output(output));
        self
    }

    /// Makes `command` time out
    #[must_use]
    pub fn with_timeout(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Reply::Timeout);
        self
    }

    /// Makes the session drop while `command` runs
    #[must_use]
    pub fn with_disconnect(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Reply::Disconnect);
        self
    }

    /// Makes `command` never complete
    #[must_use]
    pub fn with_hang(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Reply::Hang);
        self
    }

    /// Commands executed so far, in order
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl Drop for ScriptedChannel {
    fn drop(&mut self) {
        if let Some(ref released) = self.released {
            released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        self.executed.push(command.to_string());
        match self.replies.get(command).cloned() {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(CommandError::Timeout {
                command: command.to_string(),
                secs: 10,
            }),
            Some(Reply::Disconnect) => Err(CommandError::Disconnected {
                command: command.to_string(),
                source: TransportError::Disconnected("connection reset by peer".into()),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(CommandOutput {
                exit_status: Some(127),
                stdout: String::new(),
                stderr: format!("{command}: command not found"),
            }),
        }
    }

    async fn close(self: Box<Self>) {}
}

/// One scripted poll cycle
#[derive(Debug)]
enum Cycle {
    Channel(ScriptedChannel),
    Refused(String),
}

/// A [`Transport`] replaying scripted cycles in order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    cycles: Mutex<VecDeque<Cycle>>,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Creates a transport with no cycles; every `open` fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a cycle served by `channel`
    #[must_use]
    pub fn then_channel(self, channel: ScriptedChannel) -> Self {
        self.push(Cycle::Channel(channel));
        self
    }

    /// Queues a cycle whose `open` fails with `reason`
    #[must_use]
    pub fn then_refuse(self, reason: &str) -> Self {
        self.push(Cycle::Refused(reason.to_string()));
        self
    }

    fn push(&self, cycle: Cycle) {
        if let Ok(mut cycles) = self.cycles.lock() {
            cycles.push_back(cycle);
        }
    }

    /// Number of channels opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of channels closed or dropped so far
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self) -> Result<Box<dyn CommandChannel>, TransportError> {
        let next = self.cycles.lock().ok().and_then(|mut c| c.pop_front());
        match next {
            Some(Cycle::Channel(mut channel)) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                channel.released = Some(Arc::clone(&self.released));
                Ok(Box::new(channel))
            }
            Some(Cycle::Refused(reason)) => Err(TransportError::Disconnected(reason)),
            None => Err(TransportError::Disconnected("no scripted cycle left".into())),
        }
    }

    fn target(&self) -> String {
        "scripted".to_string()
    }
}
