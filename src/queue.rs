use serenity::async_trait;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::reaction::ReactionToken;

/// Where a queued reaction goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
}

/// One pending reaction, consumed exactly once by the drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueJob {
    pub message: MessageRef,
    pub reaction: ReactionToken,
}

/// Applies reactions on behalf of the drain loop.
#[async_trait]
pub trait ReactionSink: Send + Sync {
    type Error: Display + Send;

    async fn deliver(&self, job: &QueueJob) -> Result<(), Self::Error>;

    /// Display name of the guild, used only for the debug log.
    fn guild_name(&self, _guild_id: u64) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Delivered,
    Failed,
}

/// Producer half. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct ReactionQueue {
    sender: UnboundedSender<QueueJob>,
}

impl ReactionQueue {
    /// Returns `false` only when the drain is gone, in which case the job is dropped.
    pub fn push(&self, job: QueueJob) -> bool {
        self.sender.send(job).is_ok()
    }
}

/// Consumer half, owned by the throttled drain loop.
#[derive(Debug)]
pub struct ReactionDrain {
    receiver: UnboundedReceiver<QueueJob>,
    verbose: bool,
}

pub fn reaction_queue(verbose: bool) -> (ReactionQueue, ReactionDrain) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ReactionQueue { sender }, ReactionDrain { receiver, verbose })
}

impl ReactionDrain {
    pub fn pop(&mut self) -> Option<QueueJob> {
        match self.receiver.try_recv() {
            Ok(job) => Some(job),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Pops at most one job and tries to apply it. Failed jobs are dropped.
    pub async fn tick<S: ReactionSink + ?Sized>(&mut self, sink: &S) -> TickOutcome {
        let Some(job) = self.pop() else {
            return TickOutcome::Idle;
        };

        match sink.deliver(&job).await {
            Ok(()) => {
                if self.verbose {
                    tracing::debug!(
                        "Added reaction (reaction={}, channel={}, guild={})",
                        job.reaction,
                        job.message.channel_id,
                        sink.guild_name(job.message.guild_id)
                            .unwrap_or_else(|| job.message.guild_id.to_string())
                    );
                }
                TickOutcome::Delivered
            }
            Err(e) => {
                tracing::error!("Error while adding reaction: {}", e);
                TickOutcome::Failed
            }
        }
    }

    /// Drains one job per `period` for as long as the process lives.
    pub async fn run<S: ReactionSink + ?Sized>(mut self, sink: &S, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Reaction queue draining every {:?}", period);
        loop {
            interval.tick().await;
            self.tick(sink).await;
        }
    }
}
