//! Linking banks through Plaid Link.

mod endpoint;
mod workflow;

pub use endpoint::{BANK_ACCOUNTS_CHANGED_EVENT, link_bank_endpoint};
pub use workflow::{LinkStage, LinkedBank, link_bank};
