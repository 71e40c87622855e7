use anchor_lang::prelude::*;

pub const BANK_SEED: &[u8] = b"bank";
pub const OPTION_SEED: &[u8] = b"option";
pub const COLLATERAL_VAULT_SEED: &[u8] = b"collateral_vault";
pub const FUND_VAULT_SEED: &[u8] = b"fund_vault";

/// Premium rates are whole percentages of capacity over the option's life.
pub const RATE_DENOMINATOR: u128 = 100;
/// Upper bound accepted for `BankParams::max_premium_rate` (100x capacity).
pub const MAX_PREMIUM_RATE_LIMIT: u64 = 10_000;
/// Collateral is a single NFT unit.
pub const COLLATERAL_AMOUNT: u64 = 1;

#[account]
pub struct Bank {
    pub authority: Pubkey,
    pub quote_mint: Pubkey,
    pub option_count: u64, // last allocated id; ids start at 1
    pub max_premium_rate: u64,
    pub max_duration: i64, // seconds between creation and expiry
    pub paused: bool,
    pub created_at: i64,
    pub bump: u8,
}

impl Bank {
    pub const LEN: usize = 8 + // discriminator
        32 + // authority
        32 + // quote_mint
        8 +  // option_count
        8 +  // max_premium_rate
        8 +  // max_duration
        1 +  // paused
        8 +  // created_at
        1;   // bump
}

/// Identity of the escrowed NFT.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollateralRef {
    /// Verified Metaplex collection, `Pubkey::default()` when there is none
    pub collection: Pubkey,
    pub mint: Pubkey,
}

impl CollateralRef {
    pub const LEN: usize = 32 + 32;

    /// Key used by the off-chain metadata store: `lowercase(contract)-token`.
    pub fn cache_key(&self) -> String {
        let contract = if self.collection == Pubkey::default() {
            self.mint
        } else {
            self.collection
        };
        format!("{}-{}", contract.to_string().to_lowercase(), self.mint)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionStatus {
    Open,
    Repaid,
    Seized,
    Cancelled,
}

/// One credit line backed by one escrowed NFT.
///
/// `owner == Pubkey::default()` marks a closed record (repaid, seized or
/// cancelled); `status` mirrors that for indexers but is never consulted by
/// the settlement logic.
#[account]
#[derive(Debug, PartialEq)]
pub struct CreditOption {
    pub id: u64,
    pub collateral: CollateralRef,
    pub owner: Pubkey,
    pub underwriter: Pubkey,
    pub rate: u64,
    pub capacity: u64,
    pub ceiling: u64,
    pub drawn: u64,
    pub first_bid_at: i64,
    pub last_bid_at: i64,
    pub historic_premium: u64,
    pub expiry: i64,
    pub status: OptionStatus,
    pub created_at: i64,
    pub bump: u8,
    pub collateral_vault_bump: u8,
    pub fund_vault_bump: u8,
}

impl CreditOption {
    pub const LEN: usize = 8 + // discriminator
        8 +  // id
        CollateralRef::LEN +
        32 + // owner
        32 + // underwriter
        8 +  // rate
        8 +  // capacity
        8 +  // ceiling
        8 +  // drawn
        8 +  // first_bid_at
        8 +  // last_bid_at
        8 +  // historic_premium
        8 +  // expiry
        1 +  // status
        8 +  // created_at
        1 +  // bump
        1 +  // collateral_vault_bump
        1;   // fund_vault_bump

    /// Escrowed funds the owner has not drawn yet.
    pub fn undrawn(&self) -> u64 {
        self.capacity.saturating_sub(self.drawn)
    }

    pub fn has_bids(&self) -> bool {
        self.first_bid_at != 0
    }
}

impl Default for CreditOption {
    fn default() -> Self {
        Self {
            id: 0,
            collateral: CollateralRef::default(),
            owner: Pubkey::default(),
            underwriter: Pubkey::default(),
            rate: 0,
            capacity: 0,
            ceiling: 0,
            drawn: 0,
            first_bid_at: 0,
            last_bid_at: 0,
            historic_premium: 0,
            expiry: 0,
            status: OptionStatus::Open,
            created_at: 0,
            bump: 0,
            collateral_vault_bump: 0,
            fund_vault_bump: 0,
        }
    }
}

/// Read-only copy of a record returned by `get_option`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct OptionSnapshot {
    pub id: u64,
    pub collateral: CollateralRef,
    pub owner: Pubkey,
    pub underwriter: Pubkey,
    pub rate: u64,
    pub capacity: u64,
    pub ceiling: u64,
    pub drawn: u64,
    pub first_bid_at: i64,
    pub last_bid_at: i64,
    pub historic_premium: u64,
    pub expiry: i64,
    pub status: OptionStatus,
}

impl From<&CreditOption> for OptionSnapshot {
    fn from(option: &CreditOption) -> Self {
        Self {
            id: option.id,
            collateral: option.collateral,
            owner: option.owner,
            underwriter: option.underwriter,
            rate: option.rate,
            capacity: option.capacity,
            ceiling: option.ceiling,
            drawn: option.drawn,
            first_bid_at: option.first_bid_at,
            last_bid_at: option.last_bid_at,
            historic_premium: option.historic_premium,
            expiry: option.expiry,
            status: option.status,
        }
    }
}

#[error_code]
pub enum CreditError {
    #[msg("Caller is not the option owner")]
    NotOwner,
    #[msg("Option is closed")]
    OptionClosed,
    #[msg("Option was already repaid or seized")]
    AlreadyClosed,
    #[msg("Option has no bids")]
    NoBids,
    #[msg("Option has bids and cannot be cancelled")]
    BidsExist,
    #[msg("Option has expired")]
    Expired,
    #[msg("Option has not expired yet")]
    NotExpired,
    #[msg("Expiry must be in the future and within the bank's maximum duration")]
    InvalidExpiry,
    #[msg("Bid must carry funds")]
    ZeroBid,
    #[msg("Bid exceeds the option ceiling")]
    OverCeiling,
    #[msg("Bid does not increase capacity")]
    InsufficientBid,
    #[msg("Repayment does not cover the required amount")]
    InsufficientFunds,
    #[msg("No undrawn capacity")]
    NoCapacity,
    #[msg("Invalid accrual interval")]
    InvalidInterval,
    #[msg("Bank is paused")]
    BankPaused,
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Invalid parameters")]
    InvalidParams,
    #[msg("Premium rate outside the bank's bounds")]
    InvalidRate,
    #[msg("Collateral must be a non-fungible mint")]
    InvalidCollateral,
    #[msg("Payout account does not belong to the expected party")]
    InvalidPayoutAccount,
}
