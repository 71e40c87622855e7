use anchor_lang::prelude::*;
use anchor_spl::token::Mint;
use mpl_token_metadata::accounts::Metadata;
use mpl_token_metadata::types::Collection;

use crate::state::{CollateralRef, CreditError};

/// Builds the collateral reference for an NFT mint.
///
/// The metadata account is optional context: when it is missing, is not the
/// mint's Metaplex PDA, or fails to decode, the collateral simply has no
/// collection.
pub fn resolve_collateral(mint: &Account<Mint>, metadata: &AccountInfo) -> Result<CollateralRef> {
    require_non_fungible(mint.decimals, mint.supply)?;

    let collection = read_metadata(&mint.key(), metadata)
        .and_then(|m| verified_collection(m.collection))
        .unwrap_or_default();

    Ok(CollateralRef {
        collection,
        mint: mint.key(),
    })
}

pub fn require_non_fungible(decimals: u8, supply: u64) -> Result<()> {
    require!(decimals == 0 && supply == 1, CreditError::InvalidCollateral);
    Ok(())
}

pub fn verified_collection(collection: Option<Collection>) -> Option<Pubkey> {
    collection.filter(|c| c.verified).map(|c| c.key)
}

fn read_metadata(mint: &Pubkey, metadata: &AccountInfo) -> Option<Metadata> {
    // Seeds: ["metadata", TOKEN_METADATA_PROGRAM_ID, mint]
    let (metadata_pda, _bump) = Pubkey::find_program_address(
        &[b"metadata", mpl_token_metadata::ID.as_ref(), mint.as_ref()],
        &mpl_token_metadata::ID,
    );
    if *metadata.key != metadata_pda || *metadata.owner != mpl_token_metadata::ID {
        return None;
    }

    let data = metadata.try_borrow_data().ok()?;
    if data.is_empty() {
        return None;
    }
    let decoded = Metadata::from_bytes(&data).ok()?;
    if decoded.mint != *mint {
        msg!("Metadata mint mismatch for {}", mint);
        return None;
    }
    Some(decoded)
}
