//! Statistical check of the weighted draw.

use std::collections::HashMap;

use chrono::Utc;
use habitroll_core::{Reward, RewardSelector};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

const DRAWS: usize = 10_000;

fn reward(id: i64, weight: f64, is_nothing: bool) -> Reward {
    Reward {
        id,
        name: format!("reward-{id}"),
        weight,
        pieces_required: 1,
        piece_value: None,
        max_daily_claims: None,
        is_nothing,
        active: true,
        created_at: Utc::now(),
    }
}

fn frequencies(rewards: &[Reward], total_weight: f64, seed: u64) -> HashMap<i64, f64> {
    let selector = RewardSelector::new();
    let mut rng = Mcg128Xsl64::seed_from_u64(seed);
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for _ in 0..DRAWS {
        let selection = selector.select(
            rewards,
            total_weight,
            &HashMap::new(),
            &HashMap::new(),
            &mut rng,
        );
        *counts.entry(selection.reward.unwrap().id).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(id, count)| (id, count as f64 / DRAWS as f64))
        .collect()
}

#[test]
fn observed_frequencies_track_weights() {
    // [1, 1, 3, 2, 5] plus a weight-1 "nothing" entry: 13 in total
    let mut rewards: Vec<Reward> = [1.0, 1.0, 3.0, 2.0, 5.0]
        .iter()
        .enumerate()
        .map(|(i, w)| reward(i as i64 + 1, *w, false))
        .collect();
    rewards.push(reward(6, 1.0, true));

    let freq = frequencies(&rewards, 1.7, 42);
    let expected_low = 1.0 / 13.0;
    assert!(
        (freq[&1] - expected_low).abs() < 0.015,
        "weight-1 reward drawn {:.4}, expected ~{:.4}",
        freq[&1],
        expected_low
    );
    assert!((freq[&5] - 5.0 / 13.0).abs() < 0.02, "{freq:?}");
}

#[test]
fn total_weight_scales_every_candidate_alike() {
    let rewards = vec![reward(1, 1.0, false), reward(2, 3.0, false)];
    for total_weight in [0.5, 1.0, 4.4] {
        let freq = frequencies(&rewards, total_weight, 7);
        assert!((freq[&2] - 0.75).abs() < 0.02, "{total_weight}: {freq:?}");
    }
}
