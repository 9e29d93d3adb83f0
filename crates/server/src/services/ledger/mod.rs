pub mod catalog;
pub mod ledger_service;

#[cfg(test)]
pub mod ledger_tests;

pub use catalog::{package_info, total_with_gst, PackageInfo, PACKAGE_CATALOG};
pub use ledger_service::{
    Checkout, CompletionOutcome, DynLedgerService, LedgerService, LedgerServiceTrait, OpenTransaction, PaymentProof,
    MAX_TRANSACTION_AMOUNT,
};
