use rand::Rng;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::reaction::ReactionToken;

/// Reaction candidates with their relative chance, in the order they were
/// written in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionWeights {
    entries: Vec<(ReactionToken, u32)>,
}

impl ReactionWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: ReactionToken, chance: u32) {
        self.entries.push((token, chance));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReactionToken, u32)> {
        self.entries.iter().map(|(token, chance)| (token, *chance))
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, chance)| u64::from(*chance)).sum()
    }
}

impl<T: Into<ReactionToken>> FromIterator<(T, u32)> for ReactionWeights {
    fn from_iter<I: IntoIterator<Item = (T, u32)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(token, chance)| (token.into(), chance))
                .collect(),
        }
    }
}

/// Picks one reaction with probability `chance / total`.
///
/// Chances are relative weights and do not have to add up to 100:
/// `{A: 10, B: 20}` gives A one chance in three. Returns `None` when there is
/// nothing to pick from.
pub fn select<'a, R: Rng + ?Sized>(
    weights: &'a ReactionWeights,
    rng: &mut R,
) -> Option<&'a ReactionToken> {
    let total = weights.total();
    if total == 0 {
        return None;
    }

    let roll = rng.gen_range(0.0..total as f64);
    let mut cumulative = 0.0;
    for (token, chance) in weights.iter() {
        cumulative += f64::from(chance);
        if roll < cumulative {
            return Some(token);
        }
    }

    // Only reachable through float rounding.
    weights
        .iter()
        .min_by_key(|(_, chance)| *chance)
        .map(|(token, _)| token)
}

struct WeightsVisitor;

impl<'de> Visitor<'de> for WeightsVisitor {
    type Value = ReactionWeights;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of reaction to integer chance")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut weights = ReactionWeights::new();
        while let Some((token, chance)) = access.next_entry::<ReactionToken, u32>()? {
            weights.push(token, chance);
        }
        Ok(weights)
    }
}

impl<'de> Deserialize<'de> for ReactionWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WeightsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frequency(weights: &ReactionWeights, token: &str, rounds: usize) -> f64 {
        let mut rng = StdRng::seed_from_u64(7);
        let wanted = ReactionToken::parse(token);
        let hits = (0..rounds)
            .filter(|_| select(weights, &mut rng) == Some(&wanted))
            .count();
        hits as f64 / rounds as f64
    }

    #[test]
    fn empty_mapping_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select(&ReactionWeights::new(), &mut rng), None);
    }

    #[test]
    fn zero_total_selects_nothing() {
        let weights: ReactionWeights = [("👍", 0)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select(&weights, &mut rng), None);
    }

    #[test]
    fn single_candidate_always_wins() {
        let weights: ReactionWeights = [("👍", 3)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(select(&weights, &mut rng), Some(&ReactionToken::parse("👍")));
        }
    }

    #[test]
    fn weights_are_relative_not_percentages() {
        let weights: ReactionWeights = [("A", 10), ("B", 20)].into_iter().collect();
        let a = frequency(&weights, "A", 60_000);
        assert!((a - 1.0 / 3.0).abs() < 0.015, "A picked {a}");
    }

    #[test]
    fn frequencies_follow_weights() {
        let weights: ReactionWeights = [("x", 70), ("y", 25), ("z", 5)].into_iter().collect();
        let rounds = 100_000;
        assert!((frequency(&weights, "x", rounds) - 0.70).abs() < 0.01);
        assert!((frequency(&weights, "y", rounds) - 0.25).abs() < 0.01);
        assert!((frequency(&weights, "z", rounds) - 0.05).abs() < 0.01);
    }

    #[test]
    fn deserialize_keeps_document_order() {
        let weights: ReactionWeights =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "<:pepe:5>": 3}"#).unwrap();
        let order: Vec<String> = weights.iter().map(|(t, _)| t.to_string()).collect();
        assert_eq!(order, vec!["zeta", "alpha", "<:pepe:5>"]);
        assert_eq!(weights.total(), 6);
    }
}
