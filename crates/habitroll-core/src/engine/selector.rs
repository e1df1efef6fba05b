//! Variable-ratio reward selection.
//!
//! One weighted draw per completion over the eligible part of the catalog.
//! A reward is ineligible when its progress is ACHIEVED (goal met, not yet
//! claimed) or when today's awarded pieces have reached its daily cap.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{ProgressStatus, Reward, RewardProgress};

/// Outcome of one draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Drawn entry, which may be the "no reward" sentinel. `None` when
    /// nothing was eligible.
    pub reward: Option<Reward>,
    /// Multiplier applied to every candidate, kept for the audit record.
    pub total_weight: f64,
    /// Size of the candidate set after filtering.
    pub candidates: usize,
}

impl Selection {
    /// The drawn reward unless it is the sentinel.
    pub fn granted(&self) -> Option<&Reward> {
        self.reward.as_ref().filter(|reward| !reward.is_nothing)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewardSelector;

impl RewardSelector {
    pub fn new() -> Self {
        Self
    }

    /// Rewards still allowed to award a piece to this user today.
    pub fn eligible<'r>(
        &self,
        rewards: &'r [Reward],
        progress: &HashMap<i64, RewardProgress>,
        todays_piece_counts: &HashMap<i64, u32>,
    ) -> Vec<&'r Reward> {
        rewards
            .iter()
            .filter(|reward| {
                let achieved = progress
                    .get(&reward.id)
                    .map(|p| p.status(reward.pieces_required) == ProgressStatus::Achieved)
                    .unwrap_or(false);
                if achieved {
                    tracing::debug!("excluding reward {}: goal reached, awaiting claim", reward.id);
                    return false;
                }
                if let Some(cap) = reward.daily_cap() {
                    let today = todays_piece_counts.get(&reward.id).copied().unwrap_or(0);
                    if today >= cap {
                        tracing::debug!(
                            "excluding reward {}: {} of {} daily pieces used",
                            reward.id,
                            today,
                            cap
                        );
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    /// Draw one reward with probability proportional to
    /// `reward.weight * total_weight` among eligible rewards.
    pub fn select<R: Rng + ?Sized>(
        &self,
        rewards: &[Reward],
        total_weight: f64,
        progress: &HashMap<i64, RewardProgress>,
        todays_piece_counts: &HashMap<i64, u32>,
        rng: &mut R,
    ) -> Selection {
        let candidates = self.eligible(rewards, progress, todays_piece_counts);
        if !candidates.is_empty() && !candidates.iter().any(|reward| reward.is_nothing) {
            tracing::warn!(
                "no \"nothing\" reward among {} candidates; every draw grants a reward",
                candidates.len()
            );
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|reward| effective_weight(reward, total_weight))
            .collect();
        tracing::debug!("drawing from {} candidates, weights {:?}", candidates.len(), weights);

        let reward = draw_index(&weights, rng).map(|idx| candidates[idx].clone());
        Selection {
            reward,
            total_weight,
            candidates: candidates.len(),
        }
    }
}

/// Non-finite and negative products count as zero.
fn effective_weight(reward: &Reward, total_weight: f64) -> f64 {
    let weight = reward.weight * total_weight;
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Weighted index draw; uniform when no weight is usable.
fn draw_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    match weights.len() {
        0 => None,
        1 => Some(0),
        len => match WeightedIndex::new(weights) {
            Ok(dist) => Some(dist.sample(rng)),
            Err(_) => Some(rng.gen_range(0..len)),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    use super::*;

    fn reward(id: i64, weight: f64) -> Reward {
        Reward {
            id,
            name: format!("reward-{id}"),
            weight,
            pieces_required: 1,
            piece_value: None,
            max_daily_claims: None,
            is_nothing: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn progress(reward_id: i64, pieces_earned: u32, claimed: bool) -> RewardProgress {
        RewardProgress {
            user_id: 1,
            reward_id,
            pieces_earned,
            claimed,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_catalog_grants_nothing() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        let selection =
            RewardSelector::new().select(&[], 2.0, &HashMap::new(), &HashMap::new(), &mut rng);
        assert!(selection.reward.is_none());
        assert_eq!(selection.candidates, 0);
        assert_eq!(selection.total_weight, 2.0);
    }

    #[test]
    fn single_candidate_is_deterministic() {
        let rewards = vec![reward(1, 0.0), reward(2, 5.0)];
        let mut progress_rows = HashMap::new();
        progress_rows.insert(2, progress(2, 1, false));

        for seed in 0..20 {
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            let selection = RewardSelector::new().select(
                &rewards,
                1.0,
                &progress_rows,
                &HashMap::new(),
                &mut rng,
            );
            assert_eq!(selection.reward.map(|r| r.id), Some(1));
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform() {
        let rewards = vec![reward(1, 1.0), reward(2, 1.0), reward(3, 1.0)];
        let mut rng = Mcg128Xsl64::seed_from_u64(9);
        let mut seen = [0u32; 3];
        for _ in 0..300 {
            let selection = RewardSelector::new().select(
                &rewards,
                0.0,
                &HashMap::new(),
                &HashMap::new(),
                &mut rng,
            );
            let id = selection.reward.unwrap().id;
            seen[(id - 1) as usize] += 1;
        }
        assert!(seen.iter().all(|count| *count > 50), "{seen:?}");
    }

    #[test]
    fn achieved_reward_is_excluded_but_claimed_is_not() {
        let mut cumulative = reward(1, 1.0);
        cumulative.pieces_required = 3;
        let rewards = vec![cumulative.clone(), reward(2, 1.0)];

        let mut rows = HashMap::new();
        rows.insert(1, progress(1, 3, false));
        let eligible = RewardSelector::new().eligible(&rewards, &rows, &HashMap::new());
        assert_eq!(eligible.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);

        rows.insert(1, progress(1, 0, true));
        let eligible = RewardSelector::new().eligible(&rewards, &rows, &HashMap::new());
        assert_eq!(eligible.len(), 2);
    }

    #[test]
    fn daily_cap_excludes_once_reached() {
        let mut capped = reward(1, 1.0);
        capped.max_daily_claims = Some(2);
        let rewards = vec![capped, reward(2, 1.0)];

        let mut counts = HashMap::new();
        counts.insert(1, 1);
        let eligible = RewardSelector::new().eligible(&rewards, &HashMap::new(), &counts);
        assert_eq!(eligible.len(), 2);

        counts.insert(1, 2);
        let eligible = RewardSelector::new().eligible(&rewards, &HashMap::new(), &counts);
        assert_eq!(eligible.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn zero_cap_is_unlimited() {
        let mut uncapped = reward(1, 1.0);
        uncapped.max_daily_claims = Some(0);
        let mut counts = HashMap::new();
        counts.insert(1, 50);
        let rewards = vec![uncapped];
        let eligible = RewardSelector::new().eligible(&rewards, &HashMap::new(), &counts);
        assert_eq!(eligible.len(), 1);
    }

    #[test]
    fn same_seed_same_draw() {
        let rewards: Vec<Reward> = (1..=5).map(|id| reward(id, id as f64)).collect();
        let draw = |seed| {
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            RewardSelector::new()
                .select(&rewards, 1.3, &HashMap::new(), &HashMap::new(), &mut rng)
                .reward
                .map(|r| r.id)
        };
        assert_eq!(draw(77), draw(77));
    }

    #[test]
    fn granted_hides_sentinel() {
        let mut nothing = reward(1, 1.0);
        nothing.is_nothing = true;
        let selection = Selection {
            reward: Some(nothing),
            total_weight: 1.0,
            candidates: 1,
        };
        assert!(selection.granted().is_none());
    }

    proptest! {
        #[test]
        fn never_draws_an_excluded_reward(
            weights in prop::collection::vec(0.0f64..10.0, 1..8),
            achieved_mask in prop::collection::vec(any::<bool>(), 8),
            seed in any::<u64>(),
        ) {
            let rewards: Vec<Reward> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| reward(i as i64 + 1, *w))
                .collect();
            let mut rows = HashMap::new();
            for reward in &rewards {
                if achieved_mask[(reward.id - 1) as usize] {
                    rows.insert(reward.id, progress(reward.id, 1, false));
                }
            }

            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            let selection = RewardSelector::new()
                .select(&rewards, 1.0, &rows, &HashMap::new(), &mut rng);

            match selection.reward {
                Some(drawn) => prop_assert!(!rows.contains_key(&drawn.id)),
                None => prop_assert_eq!(rows.len(), rewards.len()),
            }
        }
    }
}
