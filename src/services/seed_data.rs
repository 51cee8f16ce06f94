use crate::error::WalletResult;
use crate::models::{Bank, PAKISTANI_BANKS};
use crate::store::LedgerStore;

/// Seeds the bank catalog when it is empty. Safe to call on every start.
///
/// Returns the number of banks inserted.
pub async fn initialize_banks(store: &dyn LedgerStore) -> WalletResult<usize> {
    let count = store.count_banks().await?;
    if count > 0 {
        tracing::info!("Bank catalog already has {} entries, skipping seed", count);
        return Ok(0);
    }

    tracing::info!("Seeding {} banks...", PAKISTANI_BANKS.len());

    let banks: Vec<Bank> = PAKISTANI_BANKS
        .iter()
        .map(|(name, code)| Bank::new(name, code))
        .collect();
    store.insert_banks(&banks).await?;

    tracing::info!("Bank catalog seeded");
    Ok(banks.len())
}
