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

//! Write-buffering cache over the host `Store`: the transactional view a single top-level
//! call sees, materialised lazily and committed (or discarded) as a unit.
//!
//! Nested calls share one `StateCache` so a callee's writes are visible to its caller
//! immediately, but a `REVERT` or a failed sub-call must undo only its own subtree without
//! disturbing whatever the enclosing frame already committed to the cache. `checkpoint`/
//! `revert_to` implement that with a linear undo journal, the standard technique for
//! nested-transaction state caches (there is no counterpart to this in the single-shot
//! `Sync`-only cache this module is otherwise grounded on; the journal is added because the
//! specification requires frame-local rollback and a flat commit/discard cannot express it).

use crate::account::Account;
use crate::error::{Error, Result};
use crate::interfaces::Store;
use crate::log::LogEntry;
use ethereum_types::{Address, H256};
use std::collections::HashMap;

/// A storage slot's value at three points: as it stood before this top-level call began,
/// as it stands now, and whether it has been written at all in this call. `original` is
/// what EIP-2200 refund accounting compares `new` against.
#[derive(Debug, Clone, Copy)]
struct SlotState {
    original: H256,
    current: H256,
    dirty: bool,
}

struct AccountEntry {
    account: Account,
    storage: HashMap<H256, SlotState>,
    updated: bool,
    suicided: bool,
}

impl AccountEntry {
    fn fresh(account: Account) -> AccountEntry {
        AccountEntry {
            account,
            storage: HashMap::new(),
            updated: false,
            suicided: false,
        }
    }
}

enum JournalEntry {
    AccountCreated { address: Address },
    AccountChanged { address: Address, prev_account: Account, prev_updated: bool },
    SuicideSet { address: Address, prev: bool },
    StorageChanged { address: Address, key: H256, prev: SlotState },
    LogAdded,
}

/// Opaque marker returned by `checkpoint`, passed back to `revert_to`.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    journal_len: usize,
    refund: i64,
}

/// The per-call cache. Borrowed from the host `Store` for reads that miss; never talks to
/// the store for writes until `commit`.
pub struct StateCache<'a> {
    store: &'a dyn Store,
    accounts: HashMap<Address, AccountEntry>,
    logs: Vec<LogEntry>,
    journal: Vec<JournalEntry>,
    /// EIP-2200/EIP-3529 refund counter, accumulated across the whole top-level call and
    /// rolled back along with everything else on `revert_to`.
    refund: i64,
}

impl<'a> StateCache<'a> {
    pub fn new(store: &'a dyn Store) -> StateCache<'a> {
        StateCache {
            store,
            accounts: HashMap::new(),
            logs: Vec::new(),
            journal: Vec::new(),
            refund: 0,
        }
    }

    fn entry(&mut self, address: &Address) -> &mut AccountEntry {
        if !self.accounts.contains_key(address) {
            let account = self.store.account(address);
            self.accounts.insert(*address, AccountEntry::fresh(account));
            self.journal.push(JournalEntry::AccountCreated { address: *address });
        }
        self.accounts.get_mut(address).expect("just inserted")
    }

    /// True if the cache has a live (non-suicided, updated) view of the account, or the
    /// host store already has one. A suicided account still reports `true` until commit:
    /// within the same top-level call it is still addressable (e.g. `BALANCE` after
    /// `SELFDESTRUCT` targeting it).
    pub fn exists(&self, address: &Address) -> bool {
        if let Some(entry) = self.accounts.get(address) {
            if entry.updated || entry.suicided {
                return true;
            }
        }
        self.store.exists(address)
    }

    pub fn get_account(&mut self, address: &Address) -> Account {
        self.entry(address).account.clone()
    }

    /// Replaces the working copy of an account. Fails if the account has already been
    /// suicided in this call — once marked, it must not be resurrected before commit.
    pub fn update_account(&mut self, address: &Address, account: Account) -> Result<()> {
        let entry = self.entry(address);
        if entry.suicided {
            return Err(Error::Internal(format!(
                "update_account on suicided account {address:?}"
            )));
        }
        let prev_account = entry.account.clone();
        let prev_updated = entry.updated;
        entry.account = account;
        entry.updated = true;
        self.journal.push(JournalEntry::AccountChanged {
            address: *address,
            prev_account,
            prev_updated,
        });
        Ok(())
    }

    pub fn suicide(&mut self, address: &Address) {
        let entry = self.entry(address);
        let prev = entry.suicided;
        entry.suicided = true;
        entry.updated = true;
        self.journal.push(JournalEntry::SuicideSet { address: *address, prev });
    }

    pub fn has_suicide(&self, address: &Address) -> bool {
        self.accounts.get(address).map_or(false, |e| e.suicided)
    }

    /// Lazily loads and caches a slot's original-at-top-of-call value, returning the
    /// current (possibly already-dirtied) value.
    pub fn get_storage(&mut self, address: &Address, key: &H256) -> H256 {
        let store = self.store;
        let entry = self.entry(address);
        if let Some(slot) = entry.storage.get(key) {
            return slot.current;
        }
        let value = store.storage_at(address, key);
        entry.storage.insert(
            *key,
            SlotState {
                original: value,
                current: value,
                dirty: false,
            },
        );
        value
    }

    /// The value the slot held at the top of this call, used by EIP-2200 refund
    /// accounting. Implies a `get_storage` to materialise the slot if it is not cached yet.
    pub fn original_storage(&mut self, address: &Address, key: &H256) -> H256 {
        self.get_storage(address, key);
        self.accounts[address].storage[key].original
    }

    /// Writing zero is how a slot is deleted; it is a perfectly ordinary write here, the
    /// refund consequence is computed by the gasometer, not by this cache.
    pub fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
        // Ensure original is captured before we overwrite current.
        self.get_storage(address, &key);
        let entry = self.accounts.get_mut(address).expect("just materialised");
        let slot = entry.storage.get_mut(&key).expect("just materialised");
        let prev = *slot;
        slot.current = value;
        slot.dirty = true;
        entry.updated = true;
        self.journal.push(JournalEntry::StorageChanged {
            address: *address,
            key,
            prev,
        });
    }

    pub fn add_log(&mut self, log: LogEntry) {
        self.logs.push(log);
        self.journal.push(JournalEntry::LogAdded);
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn add_refund(&mut self, delta: i64) {
        self.refund += delta;
    }

    /// Never negative in practice (the gasometer keeps debits and credits balanced per
    /// slot), clamped defensively so a host can't observe an impossible negative refund.
    pub fn refund(&self) -> u64 {
        self.refund.max(0) as u64
    }

    /// Marks the current point in the journal so a later `revert_to` can undo everything
    /// since. Taken before entering a nested call/create frame or a `REVERT`-capable block.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal_len: self.journal.len(),
            refund: self.refund,
        }
    }

    /// Undoes every mutation recorded since `checkpoint`, in reverse order, restoring
    /// accounts, storage, suicide flags, logs, and the refund counter to that point.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.journal_len {
            match self.journal.pop().expect("checked len above") {
                JournalEntry::AccountCreated { address } => {
                    self.accounts.remove(&address);
                }
                JournalEntry::AccountChanged {
                    address,
                    prev_account,
                    prev_updated,
                } => {
                    if let Some(entry) = self.accounts.get_mut(&address) {
                        entry.account = prev_account;
                        entry.updated = prev_updated;
                    }
                }
                JournalEntry::SuicideSet { address, prev } => {
                    if let Some(entry) = self.accounts.get_mut(&address) {
                        entry.suicided = prev;
                    }
                }
                JournalEntry::StorageChanged { address, key, prev } => {
                    if let Some(entry) = self.accounts.get_mut(&address) {
                        entry.storage.insert(key, prev);
                    }
                }
                JournalEntry::LogAdded => {
                    self.logs.pop();
                }
            }
        }
        self.refund = checkpoint.refund;
    }

    /// Applies every buffered mutation to a fresh write batch. Only ever called once, at
    /// the top level, after a successful call.
    pub fn commit(&self, batch: &mut dyn crate::interfaces::WriteBatch) {
        for (address, entry) in &self.accounts {
            if entry.suicided {
                batch.remove_account(address);
                continue;
            }
            if entry.updated {
                batch.update_account(address, &entry.account);
            }
            for (key, slot) in &entry.storage {
                if slot.dirty {
                    batch.set_storage(address, *key, slot.current);
                }
            }
        }
        for log in &self.logs {
            batch.add_log(log.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::WriteBatch;
    use std::cell::RefCell;
    use std::collections::HashMap as Map;

    #[derive(Default)]
    struct FakeStore {
        accounts: Map<Address, Account>,
        storage: Map<(Address, H256), H256>,
    }

    impl Store for FakeStore {
        fn exists(&self, address: &Address) -> bool {
            self.accounts.contains_key(address)
        }
        fn account(&self, address: &Address) -> Account {
            self.accounts.get(address).cloned().unwrap_or_default()
        }
        fn storage_at(&self, address: &Address, key: &H256) -> H256 {
            self.storage.get(&(*address, *key)).copied().unwrap_or_default()
        }
        fn new_write_batch(&self) -> Box<dyn WriteBatch> {
            Box::new(FakeBatch::default())
        }
    }

    #[derive(Default)]
    struct FakeBatch {
        updated: RefCell<Vec<Address>>,
        removed: RefCell<Vec<Address>>,
        storage: RefCell<Vec<(Address, H256, H256)>>,
        logs: RefCell<Vec<LogEntry>>,
    }

    impl WriteBatch for FakeBatch {
        fn update_account(&mut self, address: &Address, _account: &Account) {
            self.updated.borrow_mut().push(*address);
        }
        fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
            self.storage.borrow_mut().push((*address, key, value));
        }
        fn remove_account(&mut self, address: &Address) {
            self.removed.borrow_mut().push(*address);
        }
        fn add_log(&mut self, log: LogEntry) {
            self.logs.borrow_mut().push(log);
        }
    }

    #[test]
    fn missing_slot_reads_zero() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        assert_eq!(cache.get_storage(&addr, &H256::zero()), H256::zero());
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        let key = H256::from_low_u64_be(7);
        cache.set_storage(&addr, key, H256::from_low_u64_be(1));
        assert_eq!(cache.get_storage(&addr, &key), H256::from_low_u64_be(1));
        assert_eq!(cache.original_storage(&addr, &key), H256::zero());
    }

    #[test]
    fn suicide_marks_flag_and_blocks_update() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        cache.suicide(&addr);
        assert!(cache.has_suicide(&addr));
        assert!(cache.update_account(&addr, Account::new()).is_err());
    }

    #[test]
    fn commit_skips_suicided_storage() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        cache.set_storage(&addr, H256::from_low_u64_be(1), H256::from_low_u64_be(2));
        cache.suicide(&addr);
        let mut batch = FakeBatch::default();
        cache.commit(&mut batch);
        assert_eq!(batch.removed.borrow().len(), 1);
        assert_eq!(batch.storage.borrow().len(), 0);
    }

    #[test]
    fn revert_undoes_storage_write_and_keeps_earlier_state() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        let key = H256::from_low_u64_be(7);
        cache.set_storage(&addr, key, H256::from_low_u64_be(1));
        let checkpoint = cache.checkpoint();
        cache.set_storage(&addr, key, H256::from_low_u64_be(2));
        assert_eq!(cache.get_storage(&addr, &key), H256::from_low_u64_be(2));
        cache.revert_to(checkpoint);
        assert_eq!(cache.get_storage(&addr, &key), H256::from_low_u64_be(1));
    }

    #[test]
    fn revert_undoes_suicide_and_logs_and_refund() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::zero();
        let checkpoint = cache.checkpoint();
        cache.suicide(&addr);
        cache.add_log(LogEntry::new(addr, vec![], vec![]));
        cache.add_refund(24000);
        cache.revert_to(checkpoint);
        assert!(!cache.has_suicide(&addr));
        assert_eq!(cache.logs().len(), 0);
        assert_eq!(cache.refund(), 0);
    }

    #[test]
    fn revert_removes_account_created_after_checkpoint() {
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let addr = Address::from_low_u64_be(9);
        let checkpoint = cache.checkpoint();
        cache.update_account(&addr, Account::new()).unwrap();
        assert!(cache.exists(&addr));
        cache.revert_to(checkpoint);
        assert!(!cache.exists(&addr));
    }
}
