use serenity::{
    async_trait,
    client::{Context, EventHandler},
    model::{
        channel::{Message, ReactionType},
        gateway::Ready,
        id::{ChannelId, EmojiId, GuildId, MessageId},
    },
};
use std::sync::{Arc, Mutex};

use crate::listener::{InboundMessage, Listener, Verdict};
use crate::queue::{QueueJob, ReactionDrain, ReactionQueue, ReactionSink};
use crate::reaction::ReactionToken;
use crate::runtime::{Command, CommandAction, Invoker, RuntimeContext};

impl From<&ReactionToken> for ReactionType {
    fn from(token: &ReactionToken) -> Self {
        match token {
            ReactionToken::Custom { animated, name, id } => ReactionType::Custom {
                animated: *animated,
                id: EmojiId(*id),
                name: Some(name.clone()),
            },
            ReactionToken::Unicode(emoji) => ReactionType::Unicode(emoji.clone()),
        }
    }
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            author_id: msg.author.id.0,
            guild_id: msg.guild_id.map(|id| id.0),
            channel_id: msg.channel_id.0,
            message_id: msg.id.0,
        }
    }
}

/// Applies queued reactions through the Discord HTTP API.
pub struct DiscordSink {
    ctx: Context,
}

#[async_trait]
impl ReactionSink for DiscordSink {
    type Error = serenity::Error;

    async fn deliver(&self, job: &QueueJob) -> Result<(), serenity::Error> {
        ChannelId(job.message.channel_id)
            .create_reaction(
                &self.ctx.http,
                MessageId(job.message.message_id),
                ReactionType::from(&job.reaction),
            )
            .await
    }

    fn guild_name(&self, guild_id: u64) -> Option<String> {
        GuildId(guild_id).name(&self.ctx.cache)
    }
}

pub struct Handler {
    prefix: String,
    owner_id: Option<u64>,
    runtime: Arc<RuntimeContext>,
    listener: Listener,
    queue: ReactionQueue,
    drain: Mutex<Option<ReactionDrain>>,
    reaction_delay: std::time::Duration,
}

impl Handler {
    pub fn new(
        prefix: String,
        owner_id: Option<u64>,
        runtime: Arc<RuntimeContext>,
        listener: Listener,
        reaction_delay: std::time::Duration,
        (queue, drain): (ReactionQueue, ReactionDrain),
    ) -> Self {
        Self {
            prefix,
            owner_id,
            runtime,
            listener,
            queue,
            drain: Mutex::new(Some(drain)),
            reaction_delay,
        }
    }

    /// Hands the drain out once; later `ready` events after a reconnect get nothing.
    fn take_drain(&self) -> Option<ReactionDrain> {
        match self.drain.lock() {
            Ok(mut drain) => drain.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let self_id = ctx.cache.current_user_id();
        let inbound = InboundMessage::from(&msg);

        let verdict = {
            let mut rng = rand::thread_rng();
            self.listener
                .on_message(&self.runtime, self_id.0, &inbound, &self.queue, &mut rng)
        };
        if let Verdict::Skip(reason) = verdict {
            tracing::trace!("Skipped message {} ({:?})", msg.id, reason);
        }

        let invoker = Invoker::accepts(msg.author.id.0, msg.author.bot, self_id.0, self.owner_id);
        if let Some(invoker) = invoker {
            ReactionCommands::resolve_command(ctx, msg, invoker, &self.prefix, &self.runtime)
                .await;
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("Logged on as {}", ready.user.tag());

        let Some(drain) = self.take_drain() else {
            return;
        };
        let period = self.reaction_delay;
        let sink = DiscordSink { ctx };
        tokio::spawn(async move { drain.run(&sink, period).await });
    }
}

pub struct ReactionCommands;
impl ReactionCommands {
    pub async fn resolve_command(
        context: Context,
        message: Message,
        invoker: Invoker,
        prefix: &str,
        runtime: &RuntimeContext,
    ) {
        let Some(command) = Command::parse(prefix, &message.content) else {
            return;
        };

        tracing::debug!("Command {:?} from: {}", command, message.author.name);
        let actions = command.execute(runtime, invoker);
        if let Err(why) = ReactionCommands::apply(context, message, actions).await {
            tracing::error!("Failed to acknowledge command: {}", why);
        }
    }

    async fn apply(
        context: Context,
        mut message: Message,
        actions: Vec<CommandAction>,
    ) -> Result<(), serenity::Error> {
        let mut acknowledgment: Option<Message> = None;
        for action in actions {
            match action {
                CommandAction::Edit(content) => {
                    message.edit(&context, |edit| edit.content(content)).await?;
                    acknowledgment = Some(message.clone());
                }
                CommandAction::Reply(content) => {
                    acknowledgment = Some(message.reply(&context, content).await?);
                }
                CommandAction::DeleteAfter(delay) => {
                    let Some(acknowledgment) = acknowledgment.take() else {
                        continue;
                    };
                    let context = context.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Err(why) = acknowledgment.delete(&context).await {
                            tracing::error!("Failed to delete acknowledgment: {}", why);
                        }
                    });
                }
            }
        }
        Ok(())
    }
}
