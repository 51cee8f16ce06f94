pub mod accounts;
pub mod autopayment;
pub mod directory;
pub mod ledger;
pub mod mutation;
pub mod seed_data;

pub use accounts::AccountService;
pub use autopayment::{AutopaymentEngine, DueItemScanner, StoreScanner, TickReport};
pub use directory::DirectoryResolver;
pub use ledger::LedgerTransaction;
pub use mutation::{MutationEngine, MutationOutcome, MutationRequest};
