//! Accounts group transactions by where the money is held or where it came from.

mod core;

pub use core::{
    Account, account_balance, create_account_table, default_account_for, get_account,
    get_all_accounts, seed_default_accounts,
};
#[cfg(test)]
pub(crate) use core::{AccountType, NewAccount, create_account};
