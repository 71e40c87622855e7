use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

use crate::state::OPTION_SEED;

/// Moves tokens out of an account the signing caller controls.
pub fn deposit<'info>(
    token_program: AccountInfo<'info>,
    from: AccountInfo<'info>,
    to: AccountInfo<'info>,
    authority: AccountInfo<'info>,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    let cpi_accounts = Transfer { from, to, authority };
    token::transfer(CpiContext::new(token_program, cpi_accounts), amount)
}

/// Moves tokens out of an option vault, signed by the option PDA.
pub fn release<'info>(
    token_program: AccountInfo<'info>,
    vault: AccountInfo<'info>,
    to: AccountInfo<'info>,
    option_authority: AccountInfo<'info>,
    option_id: u64,
    option_bump: u8,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    let id_bytes = option_id.to_le_bytes();
    let seeds: &[&[u8]] = &[OPTION_SEED, id_bytes.as_ref(), &[option_bump]];
    let signer = &[seeds];

    let cpi_accounts = Transfer {
        from: vault,
        to,
        authority: option_authority,
    };
    token::transfer(
        CpiContext::new_with_signer(token_program, cpi_accounts, signer),
        amount,
    )
}
