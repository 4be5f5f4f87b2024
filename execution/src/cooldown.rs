use dicepit_types::game::{
    AssetStats, PopulationStats, COOLDOWN_JITTER_MS, PROBABILITY_CEIL, PROBABILITY_FLOOR,
};
use rand::Rng;

/// Relative weights of the three performance deltas.
const GAMES_WEIGHT: f64 = 0.25;
const WIN_RATE_WEIGHT: f64 = 0.5;
const RANK_WEIGHT: f64 = 0.25;

/// Probability pair controlling post-game cooldown jitter, with the
/// component deltas it was derived from.
///
/// This is a catch-up mechanism: performance above the population average
/// raises `increase` (longer cooldowns for strong assets), performance below
/// it raises `decrease` (shorter cooldowns for weak or new assets). Both
/// probabilities always lie in [PROBABILITY_FLOOR, PROBABILITY_CEIL], so
/// extreme outliers saturate instead of escaping [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CooldownBias {
    /// Total-games delta vs. the population average, normalized to [-1, 1].
    pub games_delta: f64,
    /// Win-rate delta vs. the population average, normalized to [-1, 1].
    pub win_rate_delta: f64,
    /// Rank delta vs. the population average, normalized to [-1, 1];
    /// positive means a better (lower) rank than average.
    pub rank_delta: f64,
    /// Probability the cooldown is lengthened.
    pub increase: f64,
    /// Probability the cooldown is shortened.
    pub decrease: f64,
}

/// Relative deviation from the average, clamped to [-1, 1].
fn normalize(value: f64, avg: f64) -> f64 {
    if avg <= f64::EPSILON {
        return 0.0;
    }
    ((value - avg) / avg).clamp(-1.0, 1.0)
}

/// Compute the cooldown bias for one asset.
///
/// The combined score is the weighted average of the three deltas
/// (games 0.25, win rate 0.50, rank 0.25); probabilities are
/// `0.5 +/- score / 2`, clamped to the configured bounds.
pub fn bias(stats: &AssetStats, population: &PopulationStats) -> CooldownBias {
    let games_delta = normalize(stats.total_games as f64, population.avg_total_games);
    let win_rate_delta = normalize(stats.win_rate(), population.avg_win_rate());
    // Rank is inverted: a numerically lower rank is better.
    let rank_delta = if population.avg_rank <= f64::EPSILON {
        0.0
    } else {
        ((population.avg_rank - stats.rank as f64) / population.avg_rank).clamp(-1.0, 1.0)
    };

    let score =
        GAMES_WEIGHT * games_delta + WIN_RATE_WEIGHT * win_rate_delta + RANK_WEIGHT * rank_delta;
    let increase = (0.5 + score / 2.0).clamp(PROBABILITY_FLOOR, PROBABILITY_CEIL);
    let decrease = (0.5 - score / 2.0).clamp(PROBABILITY_FLOOR, PROBABILITY_CEIL);

    CooldownBias {
        games_delta,
        win_rate_delta,
        rank_delta,
        increase,
        decrease,
    }
}

/// Cooldown actually applied to a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownRoll {
    pub cooldown_ms: u64,
    /// Whether the final value differs from the base duration.
    pub adjusted: bool,
}

/// Roll a participant's final cooldown from the base duration.
///
/// The two probabilities are rolled independently; each success adds or
/// subtracts a bounded jitter, so both firing can cancel out.
pub fn apply(base_ms: u64, bias: &CooldownBias, rng: &mut impl Rng) -> CooldownRoll {
    let mut cooldown = base_ms;
    if rng.gen::<f64>() < bias.increase {
        cooldown = cooldown.saturating_add(rng.gen_range(0..=COOLDOWN_JITTER_MS));
    }
    if rng.gen::<f64>() < bias.decrease {
        cooldown = cooldown.saturating_sub(rng.gen_range(0..=COOLDOWN_JITTER_MS));
    }
    CooldownRoll {
        cooldown_ms: cooldown,
        adjusted: cooldown != base_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn population() -> PopulationStats {
        PopulationStats {
            avg_total_games: 50.0,
            avg_wins: 20.0,
            avg_rank: 100.0,
        }
    }

    #[test]
    fn test_probabilities_bounded() {
        let extremes = [
            AssetStats {
                total_games: 0,
                wins: 0,
                rank: 10_000,
            },
            AssetStats {
                total_games: u64::MAX / 2,
                wins: u64::MAX / 2,
                rank: 1,
            },
            AssetStats {
                total_games: 50,
                wins: 20,
                rank: 100,
            },
        ];
        for stats in extremes {
            let bias = bias(&stats, &population());
            assert!((0.0..=1.0).contains(&bias.increase));
            assert!((0.0..=1.0).contains(&bias.decrease));
            assert!(bias.increase >= PROBABILITY_FLOOR && bias.increase <= PROBABILITY_CEIL);
            assert!(bias.decrease >= PROBABILITY_FLOOR && bias.decrease <= PROBABILITY_CEIL);
        }
    }

    #[test]
    fn test_underperformer_biased_toward_shorter() {
        let stats = AssetStats {
            total_games: 5,
            wins: 0,
            rank: 900,
        };
        let bias = bias(&stats, &population());
        assert!(bias.games_delta < 0.0);
        assert!(bias.win_rate_delta < 0.0);
        assert!(bias.rank_delta < 0.0);
        assert!(bias.decrease > bias.increase);
    }

    #[test]
    fn test_overperformer_biased_toward_longer() {
        let stats = AssetStats {
            total_games: 200,
            wins: 180,
            rank: 1,
        };
        let bias = bias(&stats, &population());
        assert!(bias.games_delta > 0.0);
        assert!(bias.win_rate_delta > 0.0);
        assert!(bias.rank_delta > 0.0);
        assert!(bias.increase > bias.decrease);
    }

    #[test]
    fn test_average_performer_is_neutral() {
        let stats = AssetStats {
            total_games: 50,
            wins: 20,
            rank: 100,
        };
        let bias = bias(&stats, &population());
        assert!(bias.games_delta.abs() < 1e-9);
        assert!(bias.win_rate_delta.abs() < 1e-9);
        assert!(bias.rank_delta.abs() < 1e-9);
        assert!((bias.increase - 0.5).abs() < 1e-9);
        assert!((bias.decrease - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_saturation_at_bounds() {
        // A maximally outperforming asset pins the score at 1.0.
        let stats = AssetStats {
            total_games: 1_000_000,
            wins: 1_000_000,
            rank: 1,
        };
        let bias = bias(&stats, &population());
        assert_eq!(bias.increase, PROBABILITY_CEIL);
        assert_eq!(bias.decrease, PROBABILITY_FLOOR);
    }

    #[test]
    fn test_empty_population_is_neutral() {
        let stats = AssetStats {
            total_games: 10,
            wins: 5,
            rank: 3,
        };
        let bias = bias(&stats, &PopulationStats::default());
        assert!((bias.increase - 0.5).abs() < 1e-9);
        assert!((bias.decrease - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_apply_flags_adjustment() {
        let stats = AssetStats {
            total_games: 50,
            wins: 20,
            rank: 100,
        };
        let bias = bias(&stats, &population());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let roll = apply(600_000, &bias, &mut rng);
            assert_eq!(roll.adjusted, roll.cooldown_ms != 600_000);
        }
    }

    #[test]
    fn test_apply_never_underflows() {
        // Guaranteed decrease on a tiny base saturates at zero.
        let bias = CooldownBias {
            games_delta: -1.0,
            win_rate_delta: -1.0,
            rank_delta: -1.0,
            increase: 0.0,
            decrease: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let roll = apply(10, &bias, &mut rng);
            assert!(roll.cooldown_ms <= 10);
        }
    }
}
