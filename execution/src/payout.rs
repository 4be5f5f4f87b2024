use dicepit_types::game::{BoostState, TokenConfig};
use thiserror::Error;

/// Economic invariant violation.
///
/// These are rejected with a descriptive error instead of coercing to a
/// wrong amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PayoutError {
    #[error("payout amount overflowed")]
    AmountOverflow,
    #[error("boost multiplier must be at least 1 (got {0})")]
    InvalidBoostMultiplier(u64),
    #[error("boost window is inverted ({starts_at_ms} >= {expires_at_ms})")]
    InvalidBoostWindow {
        starts_at_ms: u64,
        expires_at_ms: u64,
    },
}

/// Payout for a winning participant, before any global boost.
///
/// `base_amount + round_modifier * win_round`; a zen win is then multiplied
/// by `zen_multiplier` and increased by `zen_round_modifier * win_round`.
/// Worked example: base 10, round modifier 2, winning round 3 pays 16;
/// with zen multiplier 2 and zen round modifier 1, a zen win pays
/// `16 * 2 + 1 * 3 = 35`.
pub fn winner_payout(token: &TokenConfig, win_round: u32, zen: bool) -> Result<u64, PayoutError> {
    let round = win_round as u64;
    let mut payout = token
        .round_modifier
        .checked_mul(round)
        .and_then(|scaled| token.base_amount.checked_add(scaled))
        .ok_or(PayoutError::AmountOverflow)?;
    if zen {
        payout = payout
            .checked_mul(token.zen_multiplier)
            .and_then(|amplified| {
                token
                    .zen_round_modifier
                    .checked_mul(round)
                    .and_then(|bonus| amplified.checked_add(bonus))
            })
            .ok_or(PayoutError::AmountOverflow)?;
    }
    Ok(payout)
}

/// Reject malformed persisted boost state.
pub fn validate_boost(boost: &BoostState) -> Result<(), PayoutError> {
    if boost.multiplier == 0 {
        return Err(PayoutError::InvalidBoostMultiplier(boost.multiplier));
    }
    if boost.starts_at_ms >= boost.expires_at_ms {
        return Err(PayoutError::InvalidBoostWindow {
            starts_at_ms: boost.starts_at_ms,
            expires_at_ms: boost.expires_at_ms,
        });
    }
    Ok(())
}

/// Multiplier active at `now_ms`, if any.
///
/// Active only while `now_ms` lies strictly inside the window.
pub fn active_boost(boost: &BoostState, now_ms: u64) -> Result<Option<u64>, PayoutError> {
    validate_boost(boost)?;
    let active = boost.starts_at_ms < now_ms && now_ms < boost.expires_at_ms;
    Ok(active.then_some(boost.multiplier))
}

/// Scale a payout by an active boost multiplier.
pub fn boosted(amount: u64, multiplier: Option<u64>) -> Result<u64, PayoutError> {
    match multiplier {
        Some(multiplier) => amount
            .checked_mul(multiplier)
            .ok_or(PayoutError::AmountOverflow),
        None => Ok(amount),
    }
}
