use crate::config::LedgerMode;
use crate::error::WalletResult;
use crate::store::{DynStore, LedgerWrite};

/// Boundary around the writes of one balance mutation.
///
/// In [`LedgerMode::Sequential`] every [`write`](Self::write) reaches the
/// store immediately and a later failure leaves earlier writes in place. In
/// [`LedgerMode::Atomic`] writes are staged and [`commit`](Self::commit)
/// applies them as one batch.
pub struct LedgerTransaction {
    store: DynStore,
    mode: LedgerMode,
    staged: Vec<LedgerWrite>,
    applied: usize,
}

impl LedgerTransaction {
    pub fn begin(store: DynStore, mode: LedgerMode) -> Self {
        Self {
            store,
            mode,
            staged: Vec::new(),
            applied: 0,
        }
    }

    pub async fn write(&mut self, write: LedgerWrite) -> WalletResult<()> {
        match self.mode {
            LedgerMode::Sequential => {
                if let Err(e) = self.store.apply(&write).await {
                    if self.applied > 0 {
                        tracing::warn!(
                            "Ledger write {} failed after {} applied write(s); partial state kept",
                            write.label(),
                            self.applied
                        );
                    }
                    return Err(e);
                }
                self.applied += 1;
            }
            LedgerMode::Atomic => self.staged.push(write),
        }
        Ok(())
    }

    /// Makes the mutation durable. Returns the number of writes the call applied.
    pub async fn commit(self) -> WalletResult<usize> {
        match self.mode {
            LedgerMode::Sequential => Ok(self.applied),
            LedgerMode::Atomic => {
                if self.staged.is_empty() {
                    return Ok(0);
                }
                self.store.apply_batch(&self.staged).await?;
                Ok(self.staged.len())
            }
        }
    }

    /// Drops staged writes. Writes already applied in sequential mode stay.
    pub fn rollback(self) -> usize {
        if self.applied > 0 {
            tracing::warn!(
                "Rollback requested after {} sequential write(s); they remain applied",
                self.applied
            );
        }
        self.staged.len()
    }

    /// Writes each entry in order and commits. The first failed write rolls
    /// the transaction back and is returned.
    pub async fn write_all(mut self, writes: Vec<LedgerWrite>) -> WalletResult<usize> {
        for write in writes {
            if let Err(e) = self.write(write).await {
                let discarded = self.rollback();
                tracing::debug!("Ledger rolled back, {} staged write(s) discarded", discarded);
                return Err(e);
            }
        }
        self.commit().await
    }
}
