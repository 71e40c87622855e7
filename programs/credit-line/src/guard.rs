use anchor_lang::prelude::*;

use crate::state::{CreditError, CreditOption};

pub fn is_closed(option: &CreditOption) -> bool {
    option.owner == Pubkey::default()
}

/// Caller must be the current owner. Fails for every closed record as well,
/// since the sentinel key can never sign.
pub fn require_owner(option: &CreditOption, caller: &Pubkey) -> Result<()> {
    require_keys_eq!(option.owner, *caller, CreditError::NotOwner);
    Ok(())
}

/// Rejects closed records when entering the auction.
pub fn require_open(option: &CreditOption) -> Result<()> {
    require!(!is_closed(option), CreditError::OptionClosed);
    Ok(())
}

/// Rejects closed records on the terminal paths (repay, seize).
pub fn require_not_closed(option: &CreditOption) -> Result<()> {
    require!(!is_closed(option), CreditError::AlreadyClosed);
    Ok(())
}

pub fn require_has_bids(option: &CreditOption) -> Result<()> {
    require!(option.has_bids(), CreditError::NoBids);
    Ok(())
}

pub fn require_before_expiry(option: &CreditOption, now: i64) -> Result<()> {
    require!(now < option.expiry, CreditError::Expired);
    Ok(())
}
