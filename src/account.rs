// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of OpenEthereum.

// OpenEthereum is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// OpenEthereum is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with OpenEthereum.  If not, see <http://www.gnu.org/licenses/>.

//! Account records as seen by the state cache.

use crate::error::{Error, Result};
use ethereum_types::H256;
use keccak_hash::keccak;
use parity_bytes::Bytes;
use std::sync::Arc;

/// A single account's balance, nonce, and code. Storage is tracked separately by
/// `StateCache`, which keys on the account's address rather than embedding it here.
#[derive(Debug, Clone)]
pub struct Account {
    balance: u64,
    nonce: u64,
    code: Arc<Bytes>,
}

impl Account {
    pub fn new() -> Account {
        Account {
            balance: 0,
            nonce: 0,
            code: Arc::new(Vec::new()),
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn code(&self) -> &Arc<Bytes> {
        &self.code
    }

    pub fn code_hash(&self) -> H256 {
        keccak(self.code.as_slice())
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.code = Arc::new(code);
    }

    pub fn increment_nonce(&mut self) {
        self.nonce += 1;
    }

    pub fn add_balance(&mut self, amount: u64) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(Error::IntegerOverflow)?;
        Ok(())
    }

    pub fn sub_balance(&mut self, amount: u64) -> Result<()> {
        self.balance = self.balance.checked_sub(amount).ok_or(Error::InsufficientBalance {
            balance: self.balance,
            needed: amount,
        })?;
        Ok(())
    }

    /// An account is "empty" per EIP-161 if it has no code, zero nonce, and zero balance;
    /// such accounts are not charged `call_new_account_gas` and may be pruned on touch.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.nonce == 0 && self.code.is_empty()
    }

    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

impl Default for Account {
    fn default() -> Self {
        Account::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_account_is_empty() {
        assert!(Account::new().is_empty());
    }

    #[test]
    fn balance_overflow_errors() {
        let mut a = Account::new();
        a.add_balance(u64::max_value()).unwrap();
        assert_eq!(a.add_balance(1).unwrap_err(), Error::IntegerOverflow);
    }

    #[test]
    fn balance_underflow_errors() {
        let mut a = Account::new();
        assert!(matches!(
            a.sub_balance(1),
            Err(Error::InsufficientBalance { balance: 0, needed: 1 })
        ));
    }

    #[test]
    fn code_makes_account_non_empty() {
        let mut a = Account::new();
        a.set_code(vec![0x60, 0x00]);
        assert!(!a.is_empty());
        assert!(a.is_contract());
    }
}
