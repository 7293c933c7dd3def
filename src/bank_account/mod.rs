//! Storage and display of the accounts under each linked bank.

mod core;
mod list_fragment;

pub use core::{
    AccountType, BankAccount, NewBankAccount, create_bank_account_table, list_all_bank_accounts,
    list_bank_accounts_for_connection, save_bank_account,
};
pub(crate) use core::parse_stored_decimal;
pub use list_fragment::get_bank_accounts_fragment;
pub(crate) use list_fragment::bank_accounts_table;
