//! End-to-end option lifecycles driven through the program's core functions.
//!
//! The harness mirrors the token movements each instruction handler performs,
//! so every scenario also checks that the fund vault always holds exactly the
//! undrawn capacity of an open option and nothing once it is closed.

use std::collections::HashMap;

use anchor_lang::prelude::*;
use credit_line::accrual::premium_accrued;
use credit_line::auction::apply_bid;
use credit_line::bank::{apply_set_paused, require_active};
use credit_line::guard;
use credit_line::ledger::{
    allocate_id, apply_cancel, open_option, validate_option_params, CreateOptionParams,
};
use credit_line::seizure::apply_seize;
use credit_line::settlement::{
    apply_draw, apply_repay, quote_required_repayment, quote_total_premium,
};
use credit_line::state::{Bank, CollateralRef, CreditError, CreditOption, OptionStatus};

const ONE: u64 = 1_000_000_000;
const START: i64 = 1_626_805_000;
const HOUR: i64 = 3_600;

const OWNER: Pubkey = Pubkey::new_from_array([1; 32]);
const ALICE: Pubkey = Pubkey::new_from_array([2; 32]);
const BOB: Pubkey = Pubkey::new_from_array([3; 32]);
const CAROL: Pubkey = Pubkey::new_from_array([4; 32]);

// --- Harness ---

struct Harness {
    bank: Bank,
    option: CreditOption,
    /// Quote token balances outside the program
    wallets: HashMap<Pubkey, u64>,
    fund_vault: u64,
    /// Who holds the NFT; `None` while it sits in the collateral vault
    collateral_holder: Option<Pubkey>,
}

impl Harness {
    fn new() -> Self {
        let bank = Bank {
            authority: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            option_count: 0,
            max_premium_rate: 100,
            max_duration: 30 * 86_400,
            paused: false,
            created_at: START,
            bump: 255,
        };
        let wallets = [(OWNER, 0), (ALICE, 100 * ONE), (BOB, 100 * ONE), (CAROL, 100 * ONE)]
            .into_iter()
            .collect();
        Self {
            bank,
            option: CreditOption::default(),
            wallets,
            fund_vault: 0,
            collateral_holder: Some(OWNER),
        }
    }

    /// Rate 5%, ceiling 10 units, one hour to expiry.
    fn create(&mut self) -> u64 {
        self.try_create().unwrap()
    }

    fn try_create(&mut self) -> Result<u64> {
        require_active(&self.bank)?;
        let params = CreateOptionParams { rate: 5, ceiling: 10 * ONE, expiry: START + HOUR };
        validate_option_params(&self.bank, &params, START)?;
        let id = allocate_id(&mut self.bank)?;
        let collateral = CollateralRef {
            collection: Pubkey::new_from_array([9; 32]),
            mint: Pubkey::new_from_array([8; 32]),
        };
        open_option(&mut self.option, id, OWNER, collateral, &params, START);
        self.collateral_holder = None;
        Ok(id)
    }

    fn pause(&mut self, paused: bool) {
        let authority = self.bank.authority;
        apply_set_paused(&mut self.bank, &authority, paused).unwrap();
    }

    fn balance(&self, who: Pubkey) -> u64 {
        self.wallets.get(&who).copied().unwrap_or_default()
    }

    fn debit(&mut self, who: Pubkey, amount: u64) {
        let balance = self.wallets.entry(who).or_default();
        *balance = balance.checked_sub(amount).expect("wallet underflow");
    }

    fn credit(&mut self, who: Pubkey, amount: u64) {
        *self.wallets.entry(who).or_default() += amount;
    }

    fn pay_out(&mut self, to: Pubkey, amount: u64) {
        self.fund_vault = self.fund_vault.checked_sub(amount).expect("vault underflow");
        self.credit(to, amount);
    }

    fn bid(&mut self, bidder: Pubkey, funds: u64, now: i64) -> Result<()> {
        require_active(&self.bank)?;
        let outcome = apply_bid(&mut self.option, bidder, funds, now)?;
        self.debit(bidder, funds);
        self.fund_vault += funds;
        if let Some(payoff) = outcome.displaced {
            self.pay_out(payoff.underwriter, payoff.total()?);
        }
        self.assert_escrow_balanced();
        Ok(())
    }

    fn draw(&mut self, caller: Pubkey) -> Result<u64> {
        let amount = apply_draw(&mut self.option, &caller)?;
        self.pay_out(caller, amount);
        self.assert_escrow_balanced();
        Ok(amount)
    }

    fn repay(&mut self, payer: Pubkey, funds: u64, now: i64) -> Result<u64> {
        let settlement = apply_repay(&mut self.option, funds, now)?;
        self.debit(payer, settlement.required);
        self.fund_vault += settlement.required;
        self.pay_out(settlement.underwriter, settlement.underwriter_payout);
        self.collateral_holder = Some(settlement.owner);
        self.assert_escrow_balanced();
        Ok(settlement.refund)
    }

    fn seize(&mut self, now: i64) -> Result<()> {
        let seizure = apply_seize(&mut self.option, now)?;
        if seizure.pays_owner() {
            self.pay_out(seizure.former_owner, seizure.undrawn);
        }
        self.collateral_holder = Some(seizure.underwriter);
        self.assert_escrow_balanced();
        Ok(())
    }

    fn cancel(&mut self, caller: Pubkey) -> Result<()> {
        let owner = apply_cancel(&mut self.option, &caller)?;
        self.collateral_holder = Some(owner);
        Ok(())
    }

    fn assert_escrow_balanced(&self) {
        if guard::is_closed(&self.option) {
            assert_eq!(self.fund_vault, 0, "closed option left funds in escrow");
        } else {
            assert_eq!(self.fund_vault, self.option.undrawn());
        }
    }

    fn accrued(&self, capacity: u64, since: i64, until: i64) -> u64 {
        premium_accrued(capacity, 5, since, until, self.option.first_bid_at, self.option.expiry).unwrap()
    }
}

// --- Scenarios ---

#[test]
fn outbid_underwriter_is_paid_principal_and_premium() {
    let mut h = Harness::new();
    h.create();

    h.bid(ALICE, ONE, START).unwrap();
    assert_eq!((h.option.capacity, h.option.underwriter), (ONE, ALICE));

    let err = h.bid(BOB, ONE / 2, START + 60).unwrap_err();
    assert_eq!(err, CreditError::InsufficientBid.into());

    let now = START + 900;
    let premium = h.accrued(ONE, START, now);
    h.bid(BOB, 6 * ONE + premium, now).unwrap();

    assert_eq!(h.option.underwriter, BOB);
    assert_eq!(h.option.capacity, 6 * ONE);
    assert_eq!(h.balance(ALICE), 100 * ONE + premium);
    assert_eq!(h.balance(BOB), 94 * ONE - premium);
}

#[test]
fn second_draw_yields_only_new_capacity() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 2 * ONE, START).unwrap();

    assert_eq!(h.draw(OWNER).unwrap(), 2 * ONE);
    assert_eq!(h.draw(OWNER).unwrap_err(), CreditError::NoCapacity.into());

    let now = START + 300;
    let premium = h.accrued(2 * ONE, START, now);
    h.bid(BOB, 3 * ONE + premium, now).unwrap();

    assert_eq!(h.draw(OWNER).unwrap(), ONE);
    assert_eq!(h.option.drawn, h.option.capacity);
    assert_eq!(h.balance(OWNER), 3 * ONE);
}

#[test]
fn third_party_repay_returns_collateral_to_owner() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 4 * ONE, START).unwrap();
    h.draw(OWNER).unwrap();

    let now = START + HOUR / 2;
    let required = quote_required_repayment(&h.option, now, 0).unwrap();
    let premium = required - 4 * ONE;
    assert_eq!(premium, h.accrued(4 * ONE, START, now));

    let refund = h.repay(CAROL, required + ONE, now).unwrap();

    assert_eq!(refund, ONE);
    assert_eq!(h.balance(CAROL), 100 * ONE - required);
    assert_eq!(h.balance(ALICE), 100 * ONE + premium);
    assert_eq!(h.collateral_holder, Some(OWNER));
    assert_eq!(h.option.status, OptionStatus::Repaid);
    assert_eq!(h.option.owner, Pubkey::default());
}

#[test]
fn repay_after_rotation_settles_with_current_underwriter() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, ONE, START).unwrap();
    h.draw(OWNER).unwrap();

    let p1 = h.accrued(ONE, START, START + 600);
    h.bid(BOB, 2 * ONE + p1, START + 600).unwrap();

    let now = START + 1_200;
    let p2 = h.accrued(2 * ONE, START + 600, now);
    assert_eq!(quote_total_premium(&h.option, now, 0).unwrap(), p1 + p2);

    h.credit(OWNER, p2);
    h.repay(OWNER, ONE + p2, now).unwrap();

    // Bob gets his full two units back: one repaid, one never drawn
    assert_eq!(h.balance(BOB), 100 * ONE - p1 + p2);
    assert_eq!(h.balance(ALICE), 100 * ONE + p1);
    assert_eq!(h.collateral_holder, Some(OWNER));
}

#[test]
fn short_repayment_leaves_option_open() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 4 * ONE, START).unwrap();
    h.draw(OWNER).unwrap();

    let err = h.repay(OWNER, 4 * ONE, START + 600).unwrap_err();

    assert_eq!(err, CreditError::InsufficientFunds.into());
    assert_eq!(h.option.owner, OWNER);
    assert_eq!(h.collateral_holder, None);
}

#[test]
fn unpaid_option_is_seized_after_expiry() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 4 * ONE, START).unwrap();
    h.draw(OWNER).unwrap();

    let early = h.seize(START + HOUR - 1).unwrap_err();
    assert_eq!(early, CreditError::NotExpired.into());

    let late = h.repay(OWNER, 10 * ONE, START + HOUR).unwrap_err();
    assert_eq!(late, CreditError::Expired.into());

    h.seize(START + HOUR).unwrap();

    assert_eq!(h.collateral_holder, Some(ALICE));
    assert_eq!(h.option.status, OptionStatus::Seized);
    assert_eq!(h.seize(START + 2 * HOUR).unwrap_err(), CreditError::AlreadyClosed.into());
}

#[test]
fn seizure_returns_undrawn_capacity_to_owner() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 2 * ONE, START).unwrap();
    h.draw(OWNER).unwrap();
    let premium = h.accrued(2 * ONE, START, START + 60);
    h.bid(BOB, 5 * ONE + premium, START + 60).unwrap();

    h.seize(START + HOUR).unwrap();

    assert_eq!(h.balance(OWNER), 5 * ONE);
    assert_eq!(h.collateral_holder, Some(BOB));
}

#[test]
fn repaid_option_cannot_be_seized() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, ONE, START).unwrap();
    h.repay(ALICE, ONE, START + 10).unwrap();

    assert_eq!(h.seize(START + HOUR).unwrap_err(), CreditError::AlreadyClosed.into());
}

#[test]
fn cancel_before_any_bid_returns_collateral() {
    let mut h = Harness::new();
    let id = h.create();

    assert_eq!(h.cancel(ALICE).unwrap_err(), CreditError::NotOwner.into());
    h.cancel(OWNER).unwrap();

    assert_eq!(h.collateral_holder, Some(OWNER));
    assert_eq!(h.option.id, id);
    assert_eq!(h.option.status, OptionStatus::Cancelled);
    assert_eq!(h.bid(ALICE, ONE, START).unwrap_err(), CreditError::OptionClosed.into());
}

#[test]
fn cancel_after_bid_fails() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, ONE, START).unwrap();

    assert_eq!(h.cancel(OWNER).unwrap_err(), CreditError::BidsExist.into());
    assert_eq!(h.collateral_holder, None);
}

#[test]
fn ids_are_never_reused() {
    let mut h = Harness::new();
    let first = h.create();
    h.cancel(OWNER).unwrap();
    let second = h.create();
    assert_eq!((first, second), (1, 2));
}

#[test]
fn paused_bank_blocks_entry_but_not_exits() {
    let mut h = Harness::new();
    h.create();
    h.bid(ALICE, 2 * ONE, START).unwrap();

    h.pause(true);

    assert_eq!(h.bid(BOB, 5 * ONE, START + 60).unwrap_err(), CreditError::BankPaused.into());
    assert_eq!(h.option.underwriter, ALICE);
    assert_eq!(h.balance(BOB), 100 * ONE);

    assert_eq!(h.draw(OWNER).unwrap(), 2 * ONE);
    let required = quote_required_repayment(&h.option, START + 120, 0).unwrap();
    h.credit(OWNER, required - 2 * ONE);
    h.repay(OWNER, required, START + 120).unwrap();
    assert_eq!(h.collateral_holder, Some(OWNER));

    assert_eq!(h.try_create().unwrap_err(), CreditError::BankPaused.into());
    assert_eq!(h.bank.option_count, 1);
}

#[test]
fn paused_bank_still_allows_cancel_and_seize() {
    let mut h = Harness::new();
    h.create();
    h.pause(true);
    h.cancel(OWNER).unwrap();
    assert_eq!(h.collateral_holder, Some(OWNER));

    h.pause(false);
    h.create();
    h.bid(ALICE, ONE, START).unwrap();
    h.pause(true);
    h.seize(START + HOUR).unwrap();
    assert_eq!(h.collateral_holder, Some(ALICE));
    assert_eq!(h.balance(OWNER), ONE);
}
