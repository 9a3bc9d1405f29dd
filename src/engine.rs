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

//! Top-level `call`/`create` entry points: value transfer, code deployment, precompile
//! dispatch, and the recursion point nested `CALL`/`CREATE` opcodes call back into.

use crate::account::Account;
use crate::call_frame::{CallFrame, CallKind};
use crate::context::Context;
use crate::error::Error;
use crate::interfaces::{word_to_u64_saturating, Blockchain, Precompiles, Store, WriteBatch};
use crate::interpreter::Interpreter;
use crate::schedule::Schedule;
use crate::state_cache::StateCache;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use parity_bytes::Bytes;
use std::sync::Arc;

/// The read-only environment shared by every frame of one top-level call: gas schedule,
/// block context, and the two host capabilities the interpreter consults for facts it
/// can't derive on its own.
pub struct Machine<'a> {
    pub schedule: &'a Schedule,
    pub context: &'a Context,
    pub blockchain: &'a dyn Blockchain,
    pub precompiles: &'a dyn Precompiles,
}

/// Outcome of running one frame to completion: `error` is `None` for normal `STOP`/`RETURN`,
/// `Some(ExecutionReverted)` for `REVERT` (state still rolled back, but output and remaining
/// gas are preserved), and any other `Some(_)` for a hard failure (all forwarded gas lost,
/// output empty).
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub gas_left: u64,
    pub output: Bytes,
    pub error: Option<Error>,
}

impl FrameResult {
    fn hard_failure(error: Error) -> FrameResult {
        FrameResult {
            gas_left: 0,
            output: Vec::new(),
            error: Some(error),
        }
    }
}

/// Parameters for one `CALL`/`CALLCODE`/`DELEGATECALL`/`STATICCALL`, with callee identity
/// and storage context already resolved by the caller per the opcode's semantics (see
/// `interpreter.rs`'s call-family arm).
pub struct CallRequest {
    /// Address whose code actually runs (and whose account is checked for a precompile).
    pub code_address: Address,
    /// `ADDRESS` value inside the new frame.
    pub address: Address,
    /// Storage context of the new frame.
    pub storage_address: Address,
    pub sender: Address,
    pub origin: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas: u64,
    pub depth: usize,
    pub is_static: bool,
    /// `Some((from, to, value))` when this call actually moves a balance (plain `CALL` with
    /// non-zero value); `None` for `CALLCODE`/`DELEGATECALL`/`STATICCALL`, which never
    /// transfer a balance even though `CALLCODE` carries a nonzero `value` field.
    pub transfer: Option<(Address, Address, U256)>,
}

/// Parameters for a `CREATE`/`CREATE2`.
pub struct CreateRequest {
    pub caller: Address,
    pub origin: Address,
    pub value: U256,
    pub init_code: Bytes,
    /// `Some` for `CREATE2`.
    pub salt: Option<H256>,
    pub gas: u64,
    pub depth: usize,
    pub is_static: bool,
}

pub struct CreateOutcome {
    pub frame: FrameResult,
    /// `None` when creation failed before an address was even assigned (e.g. depth limit).
    pub address: Option<Address>,
}

/// Runs one `CALL`-family invocation: resolves precompiles, applies value transfer, and
/// either runs the callee's code through the interpreter or returns immediately for an
/// empty (non-contract) account.
pub fn perform_call(machine: &Machine, cache: &mut StateCache, req: CallRequest) -> FrameResult {
    if req.depth > machine.schedule.max_depth {
        return FrameResult::hard_failure(Error::CallStackOverflow);
    }

    let checkpoint = cache.checkpoint();

    if let Some((from, to, value)) = req.transfer {
        if let Err(err) = transfer_balance(cache, from, to, value) {
            cache.revert_to(checkpoint);
            return FrameResult::hard_failure(err);
        }
    }

    if let Some(precompile) = machine.precompiles.get(&req.code_address) {
        let required = precompile.required_gas(&req.input);
        if required > req.gas {
            cache.revert_to(checkpoint);
            return FrameResult::hard_failure(Error::InsufficientGas);
        }
        return match precompile.run(&req.input) {
            Ok(output) => FrameResult {
                gas_left: req.gas - required,
                output,
                error: None,
            },
            Err(err) => {
                cache.revert_to(checkpoint);
                FrameResult::hard_failure(err)
            }
        };
    }

    let code = cache.get_account(&req.code_address).code().clone();
    if code.is_empty() {
        return FrameResult {
            gas_left: req.gas,
            output: Vec::new(),
            error: None,
        };
    }

    let frame = CallFrame::new(
        CallKind::Call,
        req.address,
        req.storage_address,
        req.sender,
        req.origin,
        code,
        req.input,
        req.value,
        req.gas,
        req.depth,
        req.is_static,
    );

    let result = Interpreter::new(machine, frame).run(cache);
    if result.error.is_some() {
        cache.revert_to(checkpoint);
    }
    result
}

/// Runs a `CREATE`/`CREATE2`: derives the new address, checks it's unoccupied, transfers
/// the endowment, runs the init code, and — on success — charges and stores the deployed
/// code, enforcing the EIP-3541/max-code-size rules on the returned bytes.
pub fn perform_create(machine: &Machine, cache: &mut StateCache, req: CreateRequest) -> CreateOutcome {
    if req.depth > machine.schedule.max_depth {
        return CreateOutcome {
            frame: FrameResult::hard_failure(Error::CallStackOverflow),
            address: None,
        };
    }

    let checkpoint = cache.checkpoint();

    let mut caller_account = cache.get_account(&req.caller);
    let nonce = caller_account.nonce();
    caller_account.increment_nonce();
    if cache.update_account(&req.caller, caller_account).is_err() {
        cache.revert_to(checkpoint);
        return CreateOutcome {
            frame: FrameResult::hard_failure(Error::Internal("caller already suicided".into())),
            address: None,
        };
    }

    let new_address = match req.salt {
        Some(salt) => machine
            .blockchain
            .create2_address(req.caller, salt, &req.init_code)
            .unwrap_or_else(|| default_create2_address(req.caller, salt, &req.init_code)),
        None => machine
            .blockchain
            .create_address(req.caller, nonce)
            .unwrap_or_else(|| default_create_address(req.caller, nonce)),
    };

    let existing = cache.get_account(&new_address);
    if existing.is_contract() || existing.nonce() != 0 {
        cache.revert_to(checkpoint);
        return CreateOutcome {
            frame: FrameResult::hard_failure(Error::InvalidAddress),
            address: None,
        };
    }

    if !req.value.is_zero() {
        if let Err(err) = transfer_balance(cache, req.caller, new_address, req.value) {
            cache.revert_to(checkpoint);
            return CreateOutcome {
                frame: FrameResult::hard_failure(err),
                address: None,
            };
        }
    }

    let mut new_account = cache.get_account(&new_address);
    new_account.increment_nonce();
    let _ = cache.update_account(&new_address, new_account);

    let frame = CallFrame::new(
        CallKind::Call,
        new_address,
        new_address,
        req.caller,
        req.origin,
        Arc::new(req.init_code),
        Vec::new(),
        req.value,
        req.gas,
        req.depth,
        req.is_static,
    );

    let mut result = Interpreter::new(machine, frame).run(cache);
    if result.error.is_some() {
        cache.revert_to(checkpoint);
        return CreateOutcome {
            frame: result,
            address: None,
        };
    }

    if let Err(err) = validate_and_deposit_code(machine, cache, &new_address, &result.output, &mut result.gas_left) {
        cache.revert_to(checkpoint);
        return CreateOutcome {
            frame: FrameResult::hard_failure(err),
            address: None,
        };
    }

    CreateOutcome {
        frame: result,
        address: Some(new_address),
    }
}

fn validate_and_deposit_code(
    machine: &Machine,
    cache: &mut StateCache,
    address: &Address,
    code: &[u8],
    gas_left: &mut u64,
) -> crate::error::Result<()> {
    if code.len() > machine.schedule.max_code_size {
        return Err(Error::InvalidContractCode);
    }
    if code.first() == Some(&0xef) {
        return Err(Error::InvalidContractCode);
    }
    let deposit_cost = machine.schedule.create_data_gas as u64 * code.len() as u64;
    if deposit_cost > *gas_left {
        return Err(Error::InsufficientGas);
    }
    *gas_left -= deposit_cost;
    let mut account = cache.get_account(address);
    account.set_code(code.to_vec());
    cache.update_account(address, account)
}

fn transfer_balance(cache: &mut StateCache, from: Address, to: Address, value: U256) -> crate::error::Result<()> {
    let amount = word_to_u64_saturating(value);
    let mut sender = cache.get_account(&from);
    sender.sub_balance(amount)?;
    cache.update_account(&from, sender)?;
    let mut recipient = cache.get_account(&to);
    recipient.add_balance(amount)?;
    cache.update_account(&to, recipient)?;
    Ok(())
}

/// `keccak256(rlp([caller, nonce]))`, low 20 bytes — the default `CREATE` address.
fn default_create_address(caller: Address, nonce: u64) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&caller);
    stream.append(&nonce);
    let hash = keccak(stream.out());
    Address::from_slice(&hash.as_bytes()[12..])
}

/// `keccak256(0xff || caller || salt || keccak256(init_code))`, low 20 bytes — the default
/// `CREATE2` address (EIP-1014).
fn default_create2_address(caller: Address, salt: H256, init_code: &[u8]) -> Address {
    let init_code_hash = keccak(init_code);
    let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
    buf.push(0xff);
    buf.extend_from_slice(caller.as_bytes());
    buf.extend_from_slice(salt.as_bytes());
    buf.extend_from_slice(init_code_hash.as_bytes());
    let hash = keccak(buf);
    Address::from_slice(&hash.as_bytes()[12..])
}

/// Final result of a top-level `Engine::call`/`Engine::create`: what the host needs to
/// either persist (on success) or discard (on failure), plus accounting for the enclosing
/// transaction's gas refund.
pub struct ExecutionOutcome {
    pub gas_left: u64,
    pub refund: u64,
    pub output: Bytes,
    pub error: Option<Error>,
    pub write_batch: Option<Box<dyn WriteBatch>>,
}

/// Owns nothing beyond borrowed references; a thin namespace for the two top-level
/// entry points a host actually calls; everything else recurses through `perform_call`/
/// `perform_create` directly.
pub struct Engine;

impl Engine {
    /// Executes a top-level message call against `store`, returning either a write batch
    /// ready to persist (on success) or no batch at all (on any failure, including
    /// `REVERT` — the specification draws no distinction between a top-level revert and a
    /// top-level hard failure, since both leave nothing to commit).
    #[allow(clippy::too_many_arguments)]
    pub fn call(
        machine: &Machine,
        store: &dyn Store,
        sender: Address,
        address: Address,
        value: U256,
        input: Bytes,
        gas: u64,
    ) -> ExecutionOutcome {
        let mut cache = StateCache::new(store);
        let transfer = if value.is_zero() { None } else { Some((sender, address, value)) };
        let result = perform_call(
            machine,
            &mut cache,
            CallRequest {
                code_address: address,
                address,
                storage_address: address,
                sender,
                origin: sender,
                value,
                input,
                gas,
                depth: 1,
                is_static: false,
                transfer,
            },
        );
        finish(&mut cache, store, result)
    }

    /// Executes a top-level contract creation, returning the deployed address alongside
    /// the same outcome shape as `call`.
    pub fn create(
        machine: &Machine,
        store: &dyn Store,
        sender: Address,
        value: U256,
        init_code: Bytes,
        gas: u64,
    ) -> (ExecutionOutcome, Option<Address>) {
        let mut cache = StateCache::new(store);
        let outcome = perform_create(
            machine,
            &mut cache,
            CreateRequest {
                caller: sender,
                origin: sender,
                value,
                init_code,
                salt: None,
                gas,
                depth: 1,
                is_static: false,
            },
        );
        let address = outcome.address;
        (finish(&mut cache, store, outcome.frame), address)
    }
}

fn finish(cache: &mut StateCache, store: &dyn Store, result: FrameResult) -> ExecutionOutcome {
    match &result.error {
        None => {
            let mut batch = store.new_write_batch();
            cache.commit(batch.as_mut());
            ExecutionOutcome {
                gas_left: result.gas_left,
                refund: cache.refund(),
                output: result.output,
                error: None,
                write_batch: Some(batch),
            }
        }
        Some(err) => ExecutionOutcome {
            gas_left: result.gas_left,
            refund: 0,
            output: result.output,
            error: Some(err.clone()),
            write_batch: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::NoPrecompiles;
    use rustc_hex::FromHex;
    use std::cell::RefCell;
    use std::collections::HashMap as Map;

    struct FakeChain;
    impl Blockchain for FakeChain {
        fn block_hash(&self, _number: u64) -> H256 {
            H256::zero()
        }
    }

    #[derive(Default)]
    struct FakeStore {
        accounts: RefCell<Map<Address, Account>>,
    }

    impl FakeStore {
        fn with_balance(address: Address, balance: u64) -> FakeStore {
            let mut account = Account::new();
            account.add_balance(balance).unwrap();
            let mut accounts = Map::new();
            accounts.insert(address, account);
            FakeStore {
                accounts: RefCell::new(accounts),
            }
        }
    }

    impl Store for FakeStore {
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
            Box::new(FakeBatch::default())
        }
    }

    #[derive(Default)]
    struct FakeBatch {
        updated: Vec<Address>,
    }
    impl WriteBatch for FakeBatch {
        fn update_account(&mut self, address: &Address, _account: &Account) {
            self.updated.push(*address);
        }
        fn set_storage(&mut self, _address: &Address, _key: H256, _value: H256) {}
        fn remove_account(&mut self, _address: &Address) {}
        fn add_log(&mut self, _log: crate::log::LogEntry) {}
    }

    fn machine<'a>(schedule: &'a Schedule, context: &'a Context, chain: &'a FakeChain, precompiles: &'a NoPrecompiles) -> Machine<'a> {
        #[cfg(feature = "tests")]
        let _ = env_logger::try_init();

        Machine {
            schedule,
            context,
            blockchain: chain,
            precompiles,
        }
    }

    #[test]
    fn create_deploys_returned_code_and_derives_address() {
        let schedule = Schedule::new_istanbul();
        let context = Context::new(1, 0, U256::from(30_000_000), Address::zero(), 1, U256::one());
        let chain = FakeChain;
        let precompiles = NoPrecompiles;
        let m = machine(&schedule, &context, &chain, &precompiles);
        let sender = Address::from_low_u64_be(0xaa);
        let store = FakeStore::with_balance(sender, 1_000_000);

        // init code: PUSH1 1 PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN  (deploys 32 bytes of "1")
        let init_code: Vec<u8> = "6001600052602060006000f3".from_hex().unwrap();
        let (outcome, address) = Engine::create(&m, &store, sender, U256::zero(), init_code, 1_000_000);
        assert!(outcome.error.is_none());
        assert!(address.is_some());
        assert!(outcome.write_batch.is_some());
    }

    #[test]
    fn call_to_empty_account_succeeds_with_no_output() {
        let schedule = Schedule::new_istanbul();
        let context = Context::new(1, 0, U256::from(30_000_000), Address::zero(), 1, U256::one());
        let chain = FakeChain;
        let precompiles = NoPrecompiles;
        let m = machine(&schedule, &context, &chain, &precompiles);
        let sender = Address::from_low_u64_be(0xaa);
        let target = Address::from_low_u64_be(0xbb);
        let store = FakeStore::with_balance(sender, 1_000_000);
        let outcome = Engine::call(&m, &store, sender, target, U256::zero(), Vec::new(), 100_000);
        assert!(outcome.error.is_none());
        assert!(outcome.output.is_empty());
    }

    #[test]
    fn call_stack_overflow_past_max_depth() {
        let schedule = Schedule::new_istanbul();
        let context = Context::new(1, 0, U256::from(30_000_000), Address::zero(), 1, U256::one());
        let chain = FakeChain;
        let precompiles = NoPrecompiles;
        let m = machine(&schedule, &context, &chain, &precompiles);
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let result = perform_call(
            &m,
            &mut cache,
            CallRequest {
                code_address: Address::zero(),
                address: Address::zero(),
                storage_address: Address::zero(),
                sender: Address::zero(),
                origin: Address::zero(),
                value: U256::zero(),
                input: Vec::new(),
                gas: 1000,
                depth: schedule.max_depth + 1,
                is_static: false,
                transfer: None,
            },
        );
        assert_eq!(result.error, Some(Error::CallStackOverflow));
    }
}
