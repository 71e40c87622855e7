use anchor_lang::prelude::*;

use crate::state::{CreditError, RATE_DENOMINATOR};

/// Premium owed for holding `capacity` over `[since, until]`.
///
/// Premium accrues linearly across the option's life `[first_bid_at, expiry)`:
/// the full-life premium is `capacity * rate / 100` and each second of that
/// interval earns an equal share. `until` is clamped to `expiry`.
///
/// Multiplies before dividing and truncates once, so a holder is never paid
/// more than their exact share.
pub fn premium_accrued(
    capacity: u64,
    rate: u64,
    since: i64,
    until: i64,
    first_bid_at: i64,
    expiry: i64,
) -> Result<u64> {
    require!(first_bid_at != 0, CreditError::InvalidInterval);
    require!(expiry > first_bid_at, CreditError::InvalidInterval);

    let until = until.min(expiry);
    require!(since <= until, CreditError::InvalidInterval);

    let held = (until - since) as u128;
    let life = (expiry - first_bid_at) as u128;

    let premium = (capacity as u128)
        .checked_mul(rate as u128)
        .and_then(|v| v.checked_mul(held))
        .and_then(|v| v.checked_div(RATE_DENOMINATOR.checked_mul(life)?))
        .ok_or(ProgramError::ArithmeticOverflow)?;

    u64::try_from(premium).map_err(|_| ProgramError::ArithmeticOverflow.into())
}
