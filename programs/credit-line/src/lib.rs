// Summary: Anchor program for NFT-collateralized credit lines structured as a put
// option. An owner escrows an NFT; underwriters outbid each other with funded bids
// to earn a premium prorated over the option's life. The owner draws against the
// raised capacity and repays before expiry, otherwise anyone can hand the
// collateral to the current underwriter.
//
// NOTE: Funds are in the bank's quote mint. Each option holds its own fund and
// collateral vaults, both owned by the option PDA.

use anchor_lang::prelude::*;

pub mod accrual;
pub mod auction;
pub mod bank;
pub mod custody;
pub mod guard;
pub mod ledger;
pub mod metadata;
pub mod seizure;
pub mod settlement;
pub mod state;

#[cfg(test)]
mod test_utils;

use auction::*;
use bank::*;
use ledger::*;
use seizure::*;
use settlement::*;
use state::*;

declare_id!("CrdtLn1PutXq8vGm3sY7oZfJ4aHbN2wKeTd6RuVcP9Ei");

#[program]
pub mod credit_line {
    use super::*;

    /// Create the singleton bank holding the quote mint and option bounds
    pub fn initialize_bank(ctx: Context<InitializeBank>, params: BankParams) -> Result<()> {
        bank::initialize_bank(ctx, params)
    }

    pub fn update_bank_config(ctx: Context<UpdateBankConfig>, params: BankParams) -> Result<()> {
        bank::update_bank_config(ctx, params)
    }

    pub fn set_paused(ctx: Context<SetPaused>, paused: bool) -> Result<()> {
        bank::set_paused(ctx, paused)
    }

    /// Escrow an NFT and open an option with no capacity
    pub fn create_option(ctx: Context<CreateOption>, params: CreateOptionParams) -> Result<()> {
        ledger::create_option(ctx, params)
    }

    /// Return the collateral of an option nobody has bid on
    pub fn cancel_option(ctx: Context<CancelOption>) -> Result<()> {
        ledger::cancel_option(ctx)
    }

    /// Outbid the current underwriter with `funds` of the quote mint
    pub fn bid(ctx: Context<Bid>, funds: u64) -> Result<()> {
        auction::bid(ctx, funds)
    }

    pub fn draw(ctx: Context<Draw>) -> Result<()> {
        settlement::draw(ctx)
    }

    /// Repay drawn capacity plus premium. Anyone may pay on the owner's behalf
    pub fn repay(ctx: Context<Repay>, funds: u64) -> Result<()> {
        settlement::repay(ctx, funds)
    }

    /// Hand the collateral of an expired, unpaid option to its underwriter
    pub fn seize(ctx: Context<Seize>) -> Result<()> {
        seizure::seize(ctx)
    }

    pub fn get_option(ctx: Context<QuoteOption>) -> Result<OptionSnapshot> {
        ledger::get_option(ctx)
    }

    /// Premium the current underwriter will have earned `lookahead` seconds from now
    pub fn premium_accrued(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
        settlement::premium_accrued_quote(ctx, lookahead)
    }

    pub fn total_premium(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
        settlement::total_premium_quote(ctx, lookahead)
    }

    pub fn required_repayment(ctx: Context<QuoteOption>, lookahead: u64) -> Result<u64> {
        settlement::required_repayment_quote(ctx, lookahead)
    }
}
