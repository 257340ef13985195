pub mod anthropic;
pub mod ledger;
