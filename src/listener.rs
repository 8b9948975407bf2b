use rand::Rng;
use std::collections::HashMap;

use crate::config::ReactionSettings;
use crate::queue::{MessageRef, QueueJob, ReactionQueue};
use crate::runtime::RuntimeContext;
use crate::selector::{self, ReactionWeights};

/// The parts of an inbound message the filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage {
    pub author_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotListening,
    OwnMessage,
    NotInGuild,
    ChannelNotAllowed,
    ChanceMissed,
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Enqueue(QueueJob),
    Skip(SkipReason),
}

/// Decides, once per message, whether it earns a reaction.
#[derive(Debug, Clone)]
pub struct Listener {
    reaction_chance: u32,
    guild_mapping: HashMap<u64, Vec<u64>>,
    reaction_mapping: HashMap<u64, HashMap<u64, ReactionWeights>>,
}

impl Listener {
    pub fn new(settings: &ReactionSettings) -> Self {
        Self {
            reaction_chance: settings.reaction_chance,
            guild_mapping: settings.guild_mapping.clone(),
            reaction_mapping: settings.reaction_mapping.clone(),
        }
    }

    fn reactions_for(&self, guild_id: u64, channel_id: u64) -> Option<&ReactionWeights> {
        self.reaction_mapping.get(&guild_id)?.get(&channel_id)
    }

    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        runtime: &RuntimeContext,
        self_id: u64,
        message: &InboundMessage,
        rng: &mut R,
    ) -> Verdict {
        if !runtime.is_listening() {
            return Verdict::Skip(SkipReason::NotListening);
        }
        if message.author_id == self_id {
            return Verdict::Skip(SkipReason::OwnMessage);
        }
        let Some(guild_id) = message.guild_id else {
            return Verdict::Skip(SkipReason::NotInGuild);
        };

        let allowed = self
            .guild_mapping
            .get(&guild_id)
            .map_or(false, |channels| channels.contains(&message.channel_id));
        if !allowed {
            return Verdict::Skip(SkipReason::ChannelNotAllowed);
        }

        // Global gate first, then the weighted pick: two separate draws.
        if rng.gen_range(1..=100) > self.reaction_chance {
            return Verdict::Skip(SkipReason::ChanceMissed);
        }

        let picked = self
            .reactions_for(guild_id, message.channel_id)
            .and_then(|weights| selector::select(weights, rng));
        let Some(reaction) = picked else {
            tracing::error!(
                "No reactions for guild {} and channel {}",
                guild_id,
                message.channel_id
            );
            return Verdict::Skip(SkipReason::NoCandidates);
        };

        Verdict::Enqueue(QueueJob {
            message: MessageRef {
                guild_id,
                channel_id: message.channel_id,
                message_id: message.message_id,
            },
            reaction: reaction.clone(),
        })
    }

    /// Evaluates the message and pushes the resulting job, if any.
    pub fn on_message<R: Rng + ?Sized>(
        &self,
        runtime: &RuntimeContext,
        self_id: u64,
        message: &InboundMessage,
        queue: &ReactionQueue,
        rng: &mut R,
    ) -> Verdict {
        let verdict = self.evaluate(runtime, self_id, message, rng);
        if let Verdict::Enqueue(job) = &verdict {
            if !queue.push(job.clone()) {
                tracing::error!(
                    "Reaction queue is closed, dropping job for message {}",
                    message.message_id
                );
            }
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{reaction_queue, ReactionDrain};
    use crate::reaction::ReactionToken;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SELF_ID: u64 = 500;

    fn settings(chance: u32) -> ReactionSettings {
        let weights: ReactionWeights = [(":smile:", 70), (":frown:", 30)].into_iter().collect();
        ReactionSettings {
            reaction_delay: 1.75,
            reaction_chance: chance,
            guild_mapping: HashMap::from([(1, vec![10])]),
            reaction_mapping: HashMap::from([(1, HashMap::from([(10, weights)]))]),
        }
    }

    fn message(guild_id: Option<u64>, channel_id: u64) -> InboundMessage {
        InboundMessage {
            author_id: 42,
            guild_id,
            channel_id,
            message_id: 9000,
        }
    }

    fn drain_all(drain: &mut ReactionDrain) -> Vec<QueueJob> {
        std::iter::from_fn(|| drain.pop()).collect()
    }

    #[test]
    fn allowed_channel_always_enqueues_one_configured_reaction() {
        let listener = Listener::new(&settings(100));
        let runtime = RuntimeContext::new(true);
        let (queue, mut drain) = reaction_queue(false);
        let mut rng = StdRng::seed_from_u64(3);
        let configured = [ReactionToken::parse(":smile:"), ReactionToken::parse(":frown:")];

        for _ in 0..200 {
            let verdict =
                listener.on_message(&runtime, SELF_ID, &message(Some(1), 10), &queue, &mut rng);
            assert!(matches!(verdict, Verdict::Enqueue(_)));

            let jobs = drain_all(&mut drain);
            assert_eq!(jobs.len(), 1);
            assert!(configured.contains(&jobs[0].reaction));
            assert_eq!(jobs[0].message.channel_id, 10);
            assert_eq!(jobs[0].message.message_id, 9000);
        }
    }

    #[test]
    fn channel_outside_allow_list_never_enqueues() {
        let listener = Listener::new(&settings(100));
        let runtime = RuntimeContext::new(true);
        let (queue, mut drain) = reaction_queue(false);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let verdict =
                listener.on_message(&runtime, SELF_ID, &message(Some(1), 99), &queue, &mut rng);
            assert_eq!(verdict, Verdict::Skip(SkipReason::ChannelNotAllowed));
        }
        let verdict = listener.on_message(&runtime, SELF_ID, &message(Some(2), 10), &queue, &mut rng);
        assert_eq!(verdict, Verdict::Skip(SkipReason::ChannelNotAllowed));
        assert!(drain_all(&mut drain).is_empty());
    }

    #[test]
    fn not_listening_never_enqueues() {
        let listener = Listener::new(&settings(100));
        let runtime = RuntimeContext::new(false);
        let (queue, mut drain) = reaction_queue(false);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let verdict =
                listener.on_message(&runtime, SELF_ID, &message(Some(1), 10), &queue, &mut rng);
            assert_eq!(verdict, Verdict::Skip(SkipReason::NotListening));
        }
        assert!(drain_all(&mut drain).is_empty());
    }

    #[test]
    fn own_and_direct_messages_are_skipped() {
        let listener = Listener::new(&settings(100));
        let runtime = RuntimeContext::new(true);
        let mut rng = StdRng::seed_from_u64(3);

        let own = InboundMessage {
            author_id: SELF_ID,
            ..message(Some(1), 10)
        };
        assert_eq!(
            listener.evaluate(&runtime, SELF_ID, &own, &mut rng),
            Verdict::Skip(SkipReason::OwnMessage)
        );
        assert_eq!(
            listener.evaluate(&runtime, SELF_ID, &message(None, 10), &mut rng),
            Verdict::Skip(SkipReason::NotInGuild)
        );
    }

    #[test]
    fn zero_chance_always_misses() {
        let listener = Listener::new(&settings(0));
        let runtime = RuntimeContext::new(true);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..100 {
            assert_eq!(
                listener.evaluate(&runtime, SELF_ID, &message(Some(1), 10), &mut rng),
                Verdict::Skip(SkipReason::ChanceMissed)
            );
        }
    }

    #[test]
    fn partial_chance_gates_roughly_that_share() {
        let listener = Listener::new(&settings(40));
        let runtime = RuntimeContext::new(true);
        let mut rng = StdRng::seed_from_u64(11);

        let rounds = 20_000;
        let hits = (0..rounds)
            .filter(|_| {
                matches!(
                    listener.evaluate(&runtime, SELF_ID, &message(Some(1), 10), &mut rng),
                    Verdict::Enqueue(_)
                )
            })
            .count();
        let share = hits as f64 / rounds as f64;
        assert!((share - 0.40).abs() < 0.02, "share was {share}");
    }

    #[test]
    fn allowed_channel_without_reactions_is_skipped() {
        let mut settings = settings(100);
        settings.guild_mapping.insert(1, vec![10, 11]);
        let listener = Listener::new(&settings);
        let runtime = RuntimeContext::new(true);
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(
            listener.evaluate(&runtime, SELF_ID, &message(Some(1), 11), &mut rng),
            Verdict::Skip(SkipReason::NoCandidates)
        );
    }
}
