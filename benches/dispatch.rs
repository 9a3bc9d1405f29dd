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

//! Microbenchmarks for the fetch/decode/dispatch loop: a tight arithmetic/jump loop, a
//! storage-heavy loop (dominated by `SSTORE`'s EIP-2200 accounting), and memory growth.

use criterion::{criterion_group, criterion_main, Criterion};
use ethereum_types::{Address, H256, U256};
use rustc_hex::FromHex;
use std::cell::RefCell;
use std::collections::HashMap as Map;
use vm_engine::interfaces::NoPrecompiles;
use vm_engine::{Account, Blockchain, Context, Engine, Machine, Schedule, Store, WriteBatch};

struct BenchChain;
impl Blockchain for BenchChain {
    fn block_hash(&self, _number: u64) -> H256 {
        H256::zero()
    }
}

#[derive(Default)]
struct BenchStore {
    accounts: RefCell<Map<Address, Account>>,
}

impl Store for BenchStore {
    fn exists(&self, address: &Address) -> bool {
        self.accounts.borrow().contains_key(address)
    }
    fn account(&self, address: &Address) -> Account {
        self.accounts.borrow().get(address).cloned().unwrap_or_default()
    }
    fn storage_at(&self, _address: &Address, _key: &H256) -> H256 {
        H256::zero()
    }
    fn new_write_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(BenchBatch::default())
    }
}

#[derive(Default)]
struct BenchBatch;
impl WriteBatch for BenchBatch {
    fn update_account(&mut self, _address: &Address, _account: &Account) {}
    fn set_storage(&mut self, _address: &Address, _key: H256, _value: H256) {}
    fn remove_account(&mut self, _address: &Address) {}
    fn add_log(&mut self, _log: vm_engine::LogEntry) {}
}

fn run(code: &str, gas: u64) {
    let schedule = Schedule::new_istanbul();
    let context = Context::new(1, 0, U256::from(30_000_000u64), Address::zero(), 1, U256::from(1u64));
    let chain = BenchChain;
    let precompiles = NoPrecompiles;
    let machine = Machine {
        schedule: &schedule,
        context: &context,
        blockchain: &chain,
        precompiles: &precompiles,
    };
    let store = BenchStore::default();
    let code: Vec<u8> = code.from_hex().expect("valid hex fixture");
    let sender = Address::from_low_u64_be(1);
    let target = Address::from_low_u64_be(2);
    {
        let mut accounts = store.accounts.borrow_mut();
        let mut account = Account::new();
        account.set_code(code);
        accounts.insert(target, account);
    }
    Engine::call(&machine, &store, sender, target, U256::zero(), Vec::new(), gas);
}

/// `PUSH1 0 JUMPDEST PUSH1 1 ADD DUP1 PUSH3 100000 GT PUSH1 2 JUMPI` — a tight counting loop
/// exercising stack arithmetic, comparisons, and conditional jumps.
fn bench_arithmetic_loop(c: &mut Criterion) {
    let code = "60005b60010180620186a01160025700";
    c.bench_function("arithmetic_loop", |b| b.iter(|| run(code, 10_000_000)));
}

/// `PUSH1 0 PUSH1 0 SSTORE` repeated — dominated by EIP-2200's dirty/clean slot accounting.
fn bench_sstore_loop(c: &mut Criterion) {
    let code = "6000600055600160015560026002556003600355";
    c.bench_function("sstore_burst", |b| b.iter(|| run(code, 1_000_000)));
}

/// `PUSH1 0 PUSH2 0x1000 MSTORE8` — forces a single large memory expansion.
fn bench_memory_expansion(c: &mut Criterion) {
    let code = "600061100053";
    c.bench_function("memory_expansion", |b| b.iter(|| run(code, 1_000_000)));
}

criterion_group!(dispatch, bench_arithmetic_loop, bench_sstore_loop, bench_memory_expansion);
criterion_main!(dispatch);
