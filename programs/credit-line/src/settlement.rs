use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::accrual::premium_accrued;
use crate::custody;
use crate::guard;
use crate::ledger::QuoteOption;
use crate::state::{
    Bank, CreditError, CreditOption, OptionStatus, BANK_SEED, COLLATERAL_AMOUNT,
    COLLATERAL_VAULT_SEED, FUND_VAULT_SEED, OPTION_SEED,
};

/// Pays out all undrawn capacity to the owner. Returns the amount drawn.
pub fn apply_draw(option: &mut CreditOption, caller: &Pubkey) -> Result<u64> {
    guard::require_owner(option, caller)?;
    require!(option.drawn < option.capacity, CreditError::NoCapacity);

    let amount = option.capacity - option.drawn;
    option.drawn = option.capacity;
    Ok(amount)
}

/// Premium owed to the current underwriter `lookahead` seconds from `now`.
/// Any lookahead past expiry quotes the premium up to expiry.
pub fn quote_premium(option: &CreditOption, now: i64, lookahead: u64) -> Result<u64> {
    guard::require_has_bids(option)?;
    let until = now.saturating_add(i64::try_from(lookahead).unwrap_or(i64::MAX));
    premium_accrued(
        option.capacity,
        option.rate,
        option.last_bid_at,
        until,
        option.first_bid_at,
        option.expiry,
    )
}

/// Premium paid to displaced underwriters plus what the current one has earned.
pub fn quote_total_premium(option: &CreditOption, now: i64, lookahead: u64) -> Result<u64> {
    quote_premium(option, now, lookahead)?
        .checked_add(option.historic_premium)
        .ok_or(ProgramError::ArithmeticOverflow.into())
}

/// Amount a repayer must send. Only the drawn part of capacity is owed; the
/// undrawn part is still in escrow and goes straight back to the underwriter.
pub fn quote_required_repayment(option: &CreditOption, now: i64, lookahead: u64) -> Result<u64> {
    quote_premium(option, now, lookahead)?
        .checked_add(option.drawn)
        .ok_or(ProgramError::ArithmeticOverflow.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaySettlement {
    /// Original owner, receives the collateral
    pub owner: Pubkey,
    pub underwriter: Pubkey,
    /// Pulled from the repayer
    pub required: u64,
    pub premium: u64,
    /// Escrowed capacity plus premium, paid to the underwriter
    pub underwriter_payout: u64,
    /// Part of the offered funds above `required`; never leaves the repayer
    pub refund: u64,
}

/// Closes the option against a repayment of `funds`. Anyone may repay.
pub fn apply_repay(option: &mut CreditOption, funds: u64, now: i64) -> Result<RepaySettlement> {
    guard::require_has_bids(option)?;
    guard::require_before_expiry(option, now)?;
    guard::require_not_closed(option)?;

    let premium = premium_accrued(
        option.capacity,
        option.rate,
        option.last_bid_at,
        now,
        option.first_bid_at,
        option.expiry,
    )?;
    let required = option
        .drawn
        .checked_add(premium)
        .ok_or(ProgramError::ArithmeticOverflow)?;
    require!(funds >= required, CreditError::InsufficientFunds);

    let underwriter_payout = option
        .capacity
        .checked_add(premium)
        .ok_or(ProgramError::ArithmeticOverflow)?;

    let settlement = RepaySettlement {
        owner: option.owner,
        underwriter: option.underwriter,
        required,
        premium,
        underwriter_payout,
        refund: funds - required,
    };

    option.owner = Pubkey::default();
    option.status = OptionStatus::Repaid;

    Ok(settlement)
}

pub fn draw(ctx: Context<Draw>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let owner = ctx.accounts.owner.key();

    let option = &mut ctx.accounts.option;
    let amount = apply_draw(option, &owner)?;
    let (id, bump, drawn) = (option.id, option.bump, option.drawn);

    custody::release(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.fund_vault.to_account_info(),
        ctx.accounts.owner_fund_account.to_account_info(),
        ctx.accounts.option.to_account_info(),
        id,
        bump,
        amount,
    )?;

    emit!(OptionDrawn {
        id,
        owner,
        amount,
        drawn,
        timestamp: now,
    });

    msg!("Option {}: owner drew {} (total drawn {})", id, amount, drawn);
    Ok(())
}

pub fn repay(ctx: Context<Repay>, funds: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let repayer = ctx.accounts.repayer.key();

    let option = &mut ctx.accounts.option;
    let settlement = apply_repay(option, funds, now)?;
    let (id, bump) = (option.id, option.bump);

    // Only the exact requirement is pulled; the excess stays with the repayer
    custody::deposit(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.repayer_fund_account.to_account_info(),
        ctx.accounts.fund_vault.to_account_info(),
        ctx.accounts.repayer.to_account_info(),
        settlement.required,
    )?;

    custody::release(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.fund_vault.to_account_info(),
        ctx.accounts.underwriter_fund_account.to_account_info(),
        ctx.accounts.option.to_account_info(),
        id,
        bump,
        settlement.underwriter_payout,
    )?;

    custody::release(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.collateral_vault.to_account_info(),
        ctx.accounts.owner_collateral_account.to_account_info(),
        ctx.accounts.option.to_account_info(),
        id,
        bump,
        COLLATERAL_AMOUNT,
    )?;

    emit!(OptionRepaid {
        id,
        owner: settlement.owner,
        underwriter: settlement.underwriter,
        repayer,
        amount: settlement.required,
        premium: settlement.premium,
        underwriter_payout: settlement.underwriter_payout,
        refund: settlement.refund,
        timestamp: now,
    });

    msg!(
        "Option {} repaid by {}: {} to underwriter {}",
        id,
        repayer,
        settlement.underwriter_payout,
        settlement.underwriter
    );
    Ok(())
}

pub fn premium_accrued_quote(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
    let quote = quote_premium(&ctx.accounts.option, Clock::get()?.unix_timestamp, lookahead)?;
    msg!("Option {} premium accrued in {}s: {}", ctx.accounts.option.id, lookahead, quote);
    Ok(quote)
}

pub fn total_premium_quote(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
    let quote = quote_total_premium(&ctx.accounts.option, Clock::get()?.unix_timestamp, lookahead)?;
    msg!("Option {} total premium in {}s: {}", ctx.accounts.option.id, lookahead, quote);
    Ok(quote)
}

pub fn required_repayment_quote(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
    let quote = quote_required_repayment(&ctx.accounts.option, Clock::get()?.unix_timestamp, lookahead)?;
    msg!("Option {} required repayment in {}s: {}", ctx.accounts.option.id, lookahead, quote);
    Ok(quote)
}

#[derive(Accounts)]
pub struct Draw<'info> {
    pub owner: Signer<'info>,

    #[account(seeds = [BANK_SEED], bump = bank.bump)]
    pub bank: Box<Account<'info, Bank>>,

    #[account(
        mut,
        seeds = [OPTION_SEED, option.id.to_le_bytes().as_ref()],
        bump = option.bump,
    )]
    pub option: Box<Account<'info, CreditOption>>,

    #[account(
        mut,
        seeds = [FUND_VAULT_SEED, option.key().as_ref()],
        bump = option.fund_vault_bump,
    )]
    pub fund_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = owner_fund_account.owner == owner.key() @ CreditError::InvalidPayoutAccount,
        constraint = owner_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub owner_fund_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct Repay<'info> {
    #[account(mut)]
    pub repayer: Signer<'info>,

    #[account(seeds = [BANK_SEED], bump = bank.bump)]
    pub bank: Box<Account<'info, Bank>>,

    #[account(
        mut,
        seeds = [OPTION_SEED, option.id.to_le_bytes().as_ref()],
        bump = option.bump,
    )]
    pub option: Box<Account<'info, CreditOption>>,

    #[account(
        mut,
        seeds = [FUND_VAULT_SEED, option.key().as_ref()],
        bump = option.fund_vault_bump,
    )]
    pub fund_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        seeds = [COLLATERAL_VAULT_SEED, option.key().as_ref()],
        bump = option.collateral_vault_bump,
    )]
    pub collateral_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = repayer_fund_account.owner == repayer.key() @ CreditError::InvalidPayoutAccount,
        constraint = repayer_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub repayer_fund_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = underwriter_fund_account.owner == option.underwriter @ CreditError::InvalidPayoutAccount,
        constraint = underwriter_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub underwriter_fund_account: Box<Account<'info, TokenAccount>>,

    /// CHECK: Original owner of the collateral, only used as the ATA authority
    #[account(address = option.owner @ CreditError::InvalidPayoutAccount)]
    pub collateral_owner: UncheckedAccount<'info>,

    #[account(address = option.collateral.mint @ CreditError::InvalidCollateral)]
    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(
        init_if_needed,
        payer = repayer,
        associated_token::mint = collateral_mint,
        associated_token::authority = collateral_owner,
    )]
    pub owner_collateral_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct OptionDrawn {
    pub id: u64,
    pub owner: Pubkey,
    pub amount: u64,
    pub drawn: u64,
    pub timestamp: i64,
}

#[event]
pub struct OptionRepaid {
    pub id: u64,
    pub owner: Pubkey,
    pub underwriter: Pubkey,
    pub repayer: Pubkey,
    pub amount: u64,
    pub premium: u64,
    pub underwriter_payout: u64,
    pub refund: u64,
    pub timestamp: i64,
}
