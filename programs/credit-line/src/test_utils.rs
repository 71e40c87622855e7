use anchor_lang::prelude::*;

use crate::state::{CollateralRef, CreditOption, OptionStatus};

pub const ONE: u64 = 1_000_000_000;
pub const START: i64 = 1_626_805_000;
pub const HOUR: i64 = 3_600;

pub const OWNER: Pubkey = Pubkey::new_from_array([1; 32]);
pub const UNDERWRITER_A: Pubkey = Pubkey::new_from_array([2; 32]);
pub const UNDERWRITER_B: Pubkey = Pubkey::new_from_array([3; 32]);
pub const STRANGER: Pubkey = Pubkey::new_from_array([4; 32]);

/// Option 1: rate 5%, ceiling 10 units, expiring one hour after START.
pub fn open(owner: Pubkey) -> CreditOption {
    CreditOption {
        id: 1,
        collateral: CollateralRef {
            collection: Pubkey::new_from_array([9; 32]),
            mint: Pubkey::new_from_array([8; 32]),
        },
        owner,
        rate: 5,
        ceiling: 10 * ONE,
        expiry: START + HOUR,
        status: OptionStatus::Open,
        created_at: START,
        bump: 254,
        collateral_vault_bump: 253,
        fund_vault_bump: 252,
        ..CreditOption::default()
    }
}
