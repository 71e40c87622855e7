use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::bank::require_active;
use crate::custody;
use crate::guard;
use crate::metadata;
use crate::state::{
    Bank, CollateralRef, CreditError, CreditOption, OptionSnapshot, OptionStatus, BANK_SEED,
    COLLATERAL_AMOUNT, COLLATERAL_VAULT_SEED, FUND_VAULT_SEED, OPTION_SEED,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct CreateOptionParams {
    /// Premium over the whole option life, percent of capacity
    pub rate: u64,
    /// Largest capacity the owner accepts
    pub ceiling: u64,
    /// Unix timestamp after which the collateral may be seized
    pub expiry: i64,
}

pub fn validate_option_params(bank: &Bank, params: &CreateOptionParams, now: i64) -> Result<()> {
    require!(params.expiry > now, CreditError::InvalidExpiry);
    require!(params.expiry - now <= bank.max_duration, CreditError::InvalidExpiry);
    require!(
        params.rate > 0 && params.rate <= bank.max_premium_rate,
        CreditError::InvalidRate
    );
    require!(params.ceiling > 0, CreditError::InvalidParams);
    Ok(())
}

/// Hands out the next option id. Ids start at 1 and are never reused.
pub fn allocate_id(bank: &mut Bank) -> Result<u64> {
    bank.option_count = bank
        .option_count
        .checked_add(1)
        .ok_or(ProgramError::ArithmeticOverflow)?;
    Ok(bank.option_count)
}

pub fn open_option(
    option: &mut CreditOption,
    id: u64,
    owner: Pubkey,
    collateral: CollateralRef,
    params: &CreateOptionParams,
    now: i64,
) {
    option.id = id;
    option.collateral = collateral;
    option.owner = owner;
    option.underwriter = Pubkey::default();
    option.rate = params.rate;
    option.capacity = 0;
    option.ceiling = params.ceiling;
    option.drawn = 0;
    option.first_bid_at = 0;
    option.last_bid_at = 0;
    option.historic_premium = 0;
    option.expiry = params.expiry;
    option.status = OptionStatus::Open;
    option.created_at = now;
}

/// Nulls an unbid record and returns the owner the collateral goes back to.
///
/// The id, collateral reference and PDA bumps survive so the record still
/// resolves and later calls fail with a closed-option error instead of a
/// missing account.
pub fn apply_cancel(option: &mut CreditOption, caller: &Pubkey) -> Result<Pubkey> {
    guard::require_owner(option, caller)?;
    require!(option.capacity == 0, CreditError::BidsExist);

    let owner = option.owner;
    *option = CreditOption {
        id: option.id,
        collateral: option.collateral,
        status: OptionStatus::Cancelled,
        bump: option.bump,
        collateral_vault_bump: option.collateral_vault_bump,
        fund_vault_bump: option.fund_vault_bump,
        ..CreditOption::default()
    };
    Ok(owner)
}

pub fn create_option(ctx: Context<CreateOption>, params: CreateOptionParams) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let owner = ctx.accounts.owner.key();

    let bank = &mut ctx.accounts.bank;
    require_active(bank)?;
    validate_option_params(bank, &params, now)?;

    let collateral = metadata::resolve_collateral(
        &ctx.accounts.collateral_mint,
        &ctx.accounts.collateral_metadata.to_account_info(),
    )?;
    let id = allocate_id(bank)?;

    let option = &mut ctx.accounts.option;
    open_option(option, id, owner, collateral, &params, now);
    option.bump = ctx.bumps.option;
    option.collateral_vault_bump = ctx.bumps.collateral_vault;
    option.fund_vault_bump = ctx.bumps.fund_vault;

    // Escrow the NFT; the owner signs for their own token account
    custody::deposit(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.owner_collateral_account.to_account_info(),
        ctx.accounts.collateral_vault.to_account_info(),
        ctx.accounts.owner.to_account_info(),
        COLLATERAL_AMOUNT,
    )?;

    emit!(OptionCreated {
        id,
        owner,
        collateral_mint: collateral.mint,
        collection: collateral.collection,
        rate: params.rate,
        ceiling: params.ceiling,
        expiry: params.expiry,
        timestamp: now,
    });

    msg!("Option {} created for mint {} (ceiling {}, expiry {})", id, collateral.mint, params.ceiling, params.expiry);
    Ok(())
}

pub fn cancel_option(ctx: Context<CancelOption>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;

    let option = &mut ctx.accounts.option;
    let owner = apply_cancel(option, &ctx.accounts.owner.key())?;
    let (id, bump) = (option.id, option.bump);

    custody::release(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.collateral_vault.to_account_info(),
        ctx.accounts.owner_collateral_account.to_account_info(),
        ctx.accounts.option.to_account_info(),
        id,
        bump,
        COLLATERAL_AMOUNT,
    )?;

    emit!(OptionCancelled { id, owner, timestamp: now });

    msg!("Option {} cancelled", id);
    Ok(())
}

pub fn get_option(ctx: Context<QuoteOption>) -> Result<OptionSnapshot> {
    let snapshot = OptionSnapshot::from(&**ctx.accounts.option);
    msg!("Option {}: capacity {}, drawn {}", snapshot.id, snapshot.capacity, snapshot.drawn);
    Ok(snapshot)
}

#[derive(Accounts)]
pub struct CreateOption<'info> {
    #[account(mut)]
    pub owner: Signer<'info>,

    #[account(mut, seeds = [BANK_SEED], bump = bank.bump)]
    pub bank: Box<Account<'info, Bank>>,

    #[account(
        init,
        payer = owner,
        space = CreditOption::LEN,
        seeds = [OPTION_SEED, (bank.option_count + 1).to_le_bytes().as_ref()],
        bump
    )]
    pub option: Box<Account<'info, CreditOption>>,

    pub collateral_mint: Box<Account<'info, Mint>>,

    /// CHECK: Metaplex metadata for the collateral mint; decoded leniently in
    /// metadata::resolve_collateral, absence is not an error
    pub collateral_metadata: UncheckedAccount<'info>,

    #[account(
        mut,
        constraint = owner_collateral_account.owner == owner.key() @ CreditError::InvalidCollateral,
        constraint = owner_collateral_account.mint == collateral_mint.key() @ CreditError::InvalidCollateral,
    )]
    pub owner_collateral_account: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        payer = owner,
        seeds = [COLLATERAL_VAULT_SEED, option.key().as_ref()],
        bump,
        token::mint = collateral_mint,
        token::authority = option,
    )]
    pub collateral_vault: Box<Account<'info, TokenAccount>>,

    #[account(address = bank.quote_mint)]
    pub quote_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = owner,
        seeds = [FUND_VAULT_SEED, option.key().as_ref()],
        bump,
        token::mint = quote_mint,
        token::authority = option,
    )]
    pub fund_vault: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct CancelOption<'info> {
    pub owner: Signer<'info>,

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
        constraint = owner_collateral_account.owner == owner.key() @ CreditError::InvalidPayoutAccount,
        constraint = owner_collateral_account.mint == option.collateral.mint @ CreditError::InvalidPayoutAccount,
    )]
    pub owner_collateral_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

/// Read-only access to one option record.
#[derive(Accounts)]
pub struct QuoteOption<'info> {
    #[account(seeds = [OPTION_SEED, option.id.to_le_bytes().as_ref()], bump = option.bump)]
    pub option: Box<Account<'info, CreditOption>>,
}

#[event]
pub struct OptionCreated {
    pub id: u64,
    pub owner: Pubkey,
    pub collateral_mint: Pubkey,
    pub collection: Pubkey,
    pub rate: u64,
    pub ceiling: u64,
    pub expiry: i64,
    pub timestamp: i64,
}

#[event]
pub struct OptionCancelled {
    pub id: u64,
    pub owner: Pubkey,
    pub timestamp: i64,
}
