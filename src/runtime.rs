use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long the toggle acknowledgment stays in the channel.
pub const ACK_LIFETIME: Duration = Duration::from_secs(5);

/// Process-wide state shared by the listener and the commands.
///
/// Nothing here is persisted; a restart brings the bot back with listening off.
#[derive(Debug, Default)]
pub struct RuntimeContext {
    listening: AtomicBool,
}

impl RuntimeContext {
    pub fn new(listening: bool) -> Self {
        Self {
            listening: AtomicBool::new(listening),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// Flips the listening flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.listening.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Side effects a command asks the transport to perform.
///
/// `DeleteAfter` removes the acknowledgment produced by the preceding
/// `Edit` or `Reply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// Rewrite the invoking message; only possible on our own messages.
    Edit(String),
    /// Answer in the invoking channel.
    Reply(String),
    DeleteAfter(Duration),
}

/// Who sent a message that is allowed to run commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invoker {
    /// The logged-in account itself.
    Own,
    /// A human user.
    User,
}

impl Invoker {
    /// Decides whether the author may run commands. Other bots never may; when
    /// an owner is configured, only the owner (or the account itself) may.
    pub fn accepts(
        author_id: u64,
        author_is_bot: bool,
        self_id: u64,
        owner_id: Option<u64>,
    ) -> Option<Self> {
        if author_id == self_id {
            return Some(Self::Own);
        }
        if author_is_bot {
            return None;
        }
        match owner_id {
            Some(owner) if owner != author_id => None,
            _ => Some(Self::User),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Switch,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "switch" | "launch" | "react" => Some(Self::Switch),
            _ => None,
        }
    }

    /// Reads `<prefix><name> ...`, matching the prefix case-insensitively.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        if prefix.is_empty() {
            return None;
        }
        let head = content.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let name = content[prefix.len()..].split_whitespace().next()?;
        Self::from_name(name)
    }

    pub fn execute(self, runtime: &RuntimeContext, invoker: Invoker) -> Vec<CommandAction> {
        match self {
            Self::Switch => switch(runtime, invoker),
        }
    }
}

fn switch(runtime: &RuntimeContext, invoker: Invoker) -> Vec<CommandAction> {
    let listening = runtime.toggle();
    let message = format!("Switched listening state (new={})", listening);
    tracing::info!("{}", message);

    let content = format!("`{}`", message);
    let acknowledge = match invoker {
        Invoker::Own => CommandAction::Edit(content),
        Invoker::User => CommandAction::Reply(content),
    };
    vec![acknowledge, CommandAction::DeleteAfter(ACK_LIFETIME)]
}
