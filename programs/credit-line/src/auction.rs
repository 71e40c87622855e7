use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::accrual::premium_accrued;
use crate::bank;
use crate::custody;
use crate::guard;
use crate::state::{Bank, CreditError, CreditOption, BANK_SEED, FUND_VAULT_SEED, OPTION_SEED};

/// What a displaced underwriter is owed: their principal back plus the
/// premium for the time they held the top bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payoff {
    pub underwriter: Pubkey,
    pub principal: u64,
    pub premium: u64,
}

impl Payoff {
    pub fn total(&self) -> Result<u64> {
        self.principal
            .checked_add(self.premium)
            .ok_or(ProgramError::ArithmeticOverflow.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidOutcome {
    pub capacity: u64,
    pub displaced: Option<Payoff>,
}

/// Accepts a funded bid and rotates the underwriter.
///
/// A first bid turns all `funds` into capacity. A replacing bid first
/// covers the premium the current underwriter has earned since their bid;
/// the remainder becomes the new capacity and must strictly exceed the old
/// one. The old principal is already escrowed (or drawn against the new
/// funds), so the displaced party is paid `capacity + premium` out of the
/// vault once the new funds arrive.
pub fn apply_bid(option: &mut CreditOption, bidder: Pubkey, funds: u64, now: i64) -> Result<BidOutcome> {
    guard::require_open(option)?;
    guard::require_before_expiry(option, now)?;
    require!(funds > 0, CreditError::ZeroBid);

    let replacing = option.has_bids();
    let premium = if replacing {
        premium_accrued(
            option.capacity,
            option.rate,
            option.last_bid_at,
            now,
            option.first_bid_at,
            option.expiry,
        )?
    } else {
        0
    };

    let new_capacity = funds
        .checked_sub(premium)
        .ok_or(CreditError::InsufficientBid)?;
    require!(new_capacity <= option.ceiling, CreditError::OverCeiling);
    if replacing {
        require!(new_capacity > option.capacity, CreditError::InsufficientBid);
    }

    let displaced = if replacing {
        option.historic_premium = option
            .historic_premium
            .checked_add(premium)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        Some(Payoff {
            underwriter: option.underwriter,
            principal: option.capacity,
            premium,
        })
    } else {
        option.first_bid_at = now;
        None
    };

    option.underwriter = bidder;
    option.capacity = new_capacity;
    option.last_bid_at = now;

    Ok(BidOutcome {
        capacity: new_capacity,
        displaced,
    })
}

pub fn bid(ctx: Context<Bid>, funds: u64) -> Result<()> {
    bank::require_active(&ctx.accounts.bank)?;
    let now = Clock::get()?.unix_timestamp;
    let bidder = ctx.accounts.bidder.key();

    // The displaced underwriter's account must be supplied whenever a bid exists
    if ctx.accounts.option.has_bids() {
        let displaced_account = ctx
            .accounts
            .displaced_fund_account
            .as_ref()
            .ok_or(CreditError::InvalidPayoutAccount)?;
        require_keys_eq!(
            displaced_account.owner,
            ctx.accounts.option.underwriter,
            CreditError::InvalidPayoutAccount
        );
    }

    let option = &mut ctx.accounts.option;
    let outcome = apply_bid(option, bidder, funds, now)?;
    let (id, bump) = (option.id, option.bump);

    custody::deposit(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.bidder_fund_account.to_account_info(),
        ctx.accounts.fund_vault.to_account_info(),
        ctx.accounts.bidder.to_account_info(),
        funds,
    )?;

    if let Some(payoff) = outcome.displaced {
        let displaced_account = ctx
            .accounts
            .displaced_fund_account
            .as_ref()
            .ok_or(CreditError::InvalidPayoutAccount)?;
        custody::release(
            ctx.accounts.token_program.to_account_info(),
            ctx.accounts.fund_vault.to_account_info(),
            displaced_account.to_account_info(),
            ctx.accounts.option.to_account_info(),
            id,
            bump,
            payoff.total()?,
        )?;
    }

    let (displaced, payoff, premium) = match outcome.displaced {
        Some(p) => (p.underwriter, p.total()?, p.premium),
        None => (Pubkey::default(), 0, 0),
    };
    emit!(OptionUnderwritten {
        id,
        underwriter: bidder,
        displaced,
        funds,
        capacity: outcome.capacity,
        payoff,
        premium,
        timestamp: now,
    });

    msg!("Option {} underwritten by {} at capacity {}", id, bidder, outcome.capacity);
    Ok(())
}

#[derive(Accounts)]
pub struct Bid<'info> {
    #[account(mut)]
    pub bidder: Signer<'info>,

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
        constraint = bidder_fund_account.owner == bidder.key() @ CreditError::InvalidPayoutAccount,
        constraint = bidder_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub bidder_fund_account: Box<Account<'info, TokenAccount>>,

    /// Receives the displaced underwriter's payoff; omitted on a first bid
    #[account(
        mut,
        constraint = displaced_fund_account.mint == bank.quote_mint @ CreditError::InvalidPayoutAccount,
    )]
    pub displaced_fund_account: Option<Box<Account<'info, TokenAccount>>>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct OptionUnderwritten {
    pub id: u64,
    pub underwriter: Pubkey,
    pub displaced: Pubkey,
    pub funds: u64,
    pub capacity: u64,
    pub payoff: u64,
    pub premium: u64,
    pub timestamp: i64,
}
