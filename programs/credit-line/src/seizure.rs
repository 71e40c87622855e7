use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::custody;
use crate::guard;
use crate::state::{
    Bank, CreditError, CreditOption, OptionStatus, BANK_SEED, COLLATERAL_AMOUNT,
    COLLATERAL_VAULT_SEED, FUND_VAULT_SEED, OPTION_SEED,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seizure {
    /// Receives the collateral
    pub underwriter: Pubkey,
    /// Receives whatever capacity was never drawn
    pub former_owner: Pubkey,
    pub undrawn: u64,
}

impl Seizure {
    /// The former owner's fund account is only touched when this holds.
    pub fn pays_owner(&self) -> bool {
        self.undrawn > 0
    }
}

/// Transfers an expired, unrepaid option's collateral to its underwriter.
/// Any undrawn capacity is settled to the owner so nothing stays in escrow.
pub fn apply_seize(option: &mut CreditOption, now: i64) -> Result<Seizure> {
    require!(now >= option.expiry, CreditError::NotExpired);
    guard::require_not_closed(option)?;
    guard::require_has_bids(option)?;

    let seizure = Seizure {
        underwriter: option.underwriter,
        former_owner: option.owner,
        undrawn: option.undrawn(),
    };

    option.drawn = option.capacity;
    option.owner = Pubkey::default();
    option.status = OptionStatus::Seized;

    Ok(seizure)
}

/// Anyone may trigger a seizure once the option has expired. The caller pays
/// rent for the underwriter's collateral account if it does not exist yet.
/// The former owner's fund account is only needed when capacity was left
/// undrawn.
pub fn seize(ctx: Context<Seize>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let caller = ctx.accounts.caller.key();

    let option = &mut ctx.accounts.option;
    let seizure = apply_seize(option, now)?;
    let (id, bump) = (option.id, option.bump);

    custody::release(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.collateral_vault.to_account_info(),
        ctx.accounts.underwriter_collateral_account.to_account_info(),
        ctx.accounts.option.to_account_info(),
        id,
        bump,
        COLLATERAL_AMOUNT,
    )?;

    if seizure.pays_owner() {
        let owner_fund_account = ctx
            .accounts
            .owner_fund_account
            .as_ref()
            .ok_or(CreditError::InvalidPayoutAccount)?;
        custody::release(
            ctx.accounts.token_program.to_account_info(),
            ctx.accounts.fund_vault.to_account_info(),
            owner_fund_account.to_account_info(),
            ctx.accounts.option.to_account_info(),
            id,
            bump,
            seizure.undrawn,
        )?;
    }

    emit!(OptionSeized {
        id,
        underwriter: seizure.underwriter,
        former_owner: seizure.former_owner,
        caller,
        undrawn_returned: seizure.undrawn,
        timestamp: now,
    });

    msg!("Option {} seized for underwriter {}", id, seizure.underwriter);
    Ok(())
}

#[derive(Accounts)]
pub struct Seize<'info> {
    #[account(mut)]
    pub caller: Signer<'info>,

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
        seeds = [COLLATERAL_VAULT_SEED, option.key().as_ref()],
        bump = option.collateral_vault_bump,
    )]
    pub collateral_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        seeds = [FUND_VAULT_SEED, option.key().as_ref()],
        bump = option.fund_vault_bump,
    )]
    pub fund_vault: Box<Account<'info, TokenAccount>>,

    #[account(address = option.collateral.mint @ CreditError::InvalidCollateral)]
    pub collateral_mint: Box<Account<'info, Mint>>,

    /// CHECK: Current underwriter, only used as the ATA authority
    #[account(address = option.underwriter @ CreditError::InvalidPayoutAccount)]
    pub underwriter: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = caller,
        associated_token::mint = collateral_mint,
        associated_token::authority = underwriter,
    )]
    pub underwriter_collateral_account: Box<Account<'info, TokenAccount>>,

    /// Receives undrawn capacity; may be omitted when everything was drawn
    #[account(
        mut,
        constraint = owner_fund_account.owner == option.owner @ CreditError::InvalidPayoutAccount,
        constraint = owner_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub owner_fund_account: Option<Box<Account<'info, TokenAccount>>>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct OptionSeized {
    pub id: u64,
    pub underwriter: Pubkey,
    pub former_owner: Pubkey,
    pub caller: Pubkey,
    pub undrawn_returned: u64,
    pub timestamp: i64,
}
