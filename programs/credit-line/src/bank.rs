use anchor_lang::prelude::*;
use anchor_spl::token::Mint;

use crate::state::{Bank, CreditError, BANK_SEED, MAX_PREMIUM_RATE_LIMIT};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct BankParams {
    /// Highest premium rate (percent of capacity over the option's life) an owner may offer
    pub max_premium_rate: u64,
    /// Longest allowed distance between creation and expiry, in seconds
    pub max_duration: i64,
}

pub fn validate_bank_params(params: &BankParams) -> Result<()> {
    require!(
        params.max_premium_rate > 0 && params.max_premium_rate <= MAX_PREMIUM_RATE_LIMIT,
        CreditError::InvalidParams
    );
    require!(params.max_duration > 0, CreditError::InvalidParams);
    Ok(())
}

pub fn initialize_bank(ctx: Context<InitializeBank>, params: BankParams) -> Result<()> {
    validate_bank_params(&params)?;

    let bank = &mut ctx.accounts.bank;
    bank.authority = ctx.accounts.authority.key();
    bank.quote_mint = ctx.accounts.quote_mint.key();
    bank.option_count = 0;
    bank.max_premium_rate = params.max_premium_rate;
    bank.max_duration = params.max_duration;
    bank.paused = false;
    bank.created_at = Clock::get()?.unix_timestamp;
    bank.bump = ctx.bumps.bank;

    msg!(
        "Bank initialized: quote mint {}, max rate {}%, max duration {}s",
        bank.quote_mint,
        bank.max_premium_rate,
        bank.max_duration
    );
    Ok(())
}

/// New options and new bids need an unpaused bank. Exits never check this.
pub fn require_active(bank: &Bank) -> Result<()> {
    require!(!bank.paused, CreditError::BankPaused);
    Ok(())
}

/// Quote mint and option counter are immutable; only the bounds move.
pub fn apply_update_config(bank: &mut Bank, caller: &Pubkey, params: &BankParams) -> Result<()> {
    require_keys_eq!(bank.authority, *caller, CreditError::Unauthorized);
    validate_bank_params(params)?;

    bank.max_premium_rate = params.max_premium_rate;
    bank.max_duration = params.max_duration;
    Ok(())
}

/// Setting the flag to its current value is a no-op.
pub fn apply_set_paused(bank: &mut Bank, caller: &Pubkey, paused: bool) -> Result<()> {
    require_keys_eq!(bank.authority, *caller, CreditError::Unauthorized);
    bank.paused = paused;
    Ok(())
}

pub fn update_bank_config(ctx: Context<UpdateBankConfig>, params: BankParams) -> Result<()> {
    let authority = ctx.accounts.authority.key();
    let bank = &mut ctx.accounts.bank;
    apply_update_config(bank, &authority, &params)?;

    msg!(
        "Bank configuration updated: max rate {}%, max duration {}s",
        bank.max_premium_rate,
        bank.max_duration
    );
    Ok(())
}

/// Pausing blocks new options and new bids. Draw, repay, seize and cancel
/// stay open.
pub fn set_paused(ctx: Context<SetPaused>, paused: bool) -> Result<()> {
    let authority = ctx.accounts.authority.key();
    apply_set_paused(&mut ctx.accounts.bank, &authority, paused)?;

    msg!("Bank paused: {}", paused);
    Ok(())
}

#[derive(Accounts)]
pub struct InitializeBank<'info> {
    #[account(
        init,
        payer = authority,
        space = Bank::LEN,
        seeds = [BANK_SEED],
        bump
    )]
    pub bank: Account<'info, Bank>,
    pub quote_mint: Account<'info, Mint>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct UpdateBankConfig<'info> {
    #[account(mut, seeds = [BANK_SEED], bump = bank.bump)]
    pub bank: Account<'info, Bank>,
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetPaused<'info> {
    #[account(mut, seeds = [BANK_SEED], bump = bank.bump)]
    pub bank: Account<'info, Bank>,
    pub authority: Signer<'info>,
}
