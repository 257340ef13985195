//! Credit ledger adapters.

pub mod http;
pub mod memory;

pub use http::HttpCreditLedger;
pub use memory::InMemoryCreditLedger;
