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

//! The fetch/decode/dispatch loop: runs one call frame's code to completion.

use crate::call_frame::{CallFrame, CallKind};
use crate::engine::{perform_call, perform_create, CallRequest, CreateRequest, FrameResult, Machine};
use crate::error::{Error, Result};
use crate::gasometer;
use crate::memory::Memory;
use crate::opcodes::{self, *};
use crate::stack::Stack;
use crate::state_cache::StateCache;
use crate::word;
use bit_set::BitSet;
use ethereum_types::{H256, U256};
use keccak_hash::keccak;
use lazy_static::lazy_static;
use parity_bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    /// Valid-`JUMPDEST` bitsets keyed by code hash, shared across every frame that runs the
    /// same code body (mirrors the teacher's `Arc<SharedCache>`-wrapped jump destination
    /// cache, scoped to a process-wide map here since this crate has no single long-lived
    /// client object to own it).
    static ref JUMPDEST_CACHE: Mutex<HashMap<H256, Arc<BitSet>>> = Mutex::new(HashMap::new());
}

fn valid_jump_destinations(code_hash: H256, code: &[u8]) -> Arc<BitSet> {
    if let Some(cached) = JUMPDEST_CACHE.lock().get(&code_hash) {
        return cached.clone();
    }
    let mut set = BitSet::with_capacity(code.len());
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        if op == JUMPDEST {
            set.insert(pc);
            pc += 1;
        } else if (PUSH1..=PUSH32).contains(&op) {
            pc += 1 + (op - PUSH1 + 1) as usize;
        } else {
            pc += 1;
        }
    }
    let set = Arc::new(set);
    JUMPDEST_CACHE.lock().insert(code_hash, set.clone());
    set
}

/// Running state for one frame's execution.
pub struct Interpreter<'a> {
    machine: &'a Machine<'a>,
    frame: CallFrame,
    stack: Stack,
    memory: Memory,
    pc: usize,
    return_data: Bytes,
    jump_destinations: Arc<BitSet>,
}

enum Step {
    Continue,
    Stop,
    Return(Bytes),
    Revert(Bytes),
}

impl<'a> Interpreter<'a> {
    pub fn new(machine: &'a Machine<'a>, frame: CallFrame) -> Interpreter<'a> {
        let code_hash = keccak(frame.code.as_slice());
        let jump_destinations = valid_jump_destinations(code_hash, frame.code.as_slice());
        Interpreter {
            machine,
            frame,
            stack: Stack::with_limit(machine.schedule.stack_limit),
            memory: Memory::new(),
            pc: 0,
            return_data: Vec::new(),
            jump_destinations,
        }
    }

    pub fn run(mut self, cache: &mut StateCache) -> FrameResult {
        loop {
            match self.step(cache) {
                Ok(Step::Continue) => continue,
                Ok(Step::Stop) => {
                    return FrameResult {
                        gas_left: self.frame.gas,
                        output: Vec::new(),
                        error: None,
                    }
                }
                Ok(Step::Return(output)) => {
                    return FrameResult {
                        gas_left: self.frame.gas,
                        output,
                        error: None,
                    }
                }
                Ok(Step::Revert(output)) => {
                    return FrameResult {
                        gas_left: self.frame.gas,
                        output,
                        error: Some(Error::ExecutionReverted),
                    }
                }
                Err(Error::ExecutionAborted) => {
                    return FrameResult {
                        gas_left: 0,
                        output: Vec::new(),
                        error: Some(Error::ExecutionAborted),
                    }
                }
                Err(err) => {
                    return FrameResult {
                        gas_left: 0,
                        output: Vec::new(),
                        error: Some(err),
                    }
                }
            }
        }
    }

    fn code(&self) -> &[u8] {
        self.frame.code.as_slice()
    }

    fn current_op(&self) -> u8 {
        self.code().get(self.pc).copied().unwrap_or(STOP)
    }

    fn charge(&mut self, amount: u64) -> Result<()> {
        if self.frame.gas < amount {
            self.frame.gas = 0;
            return Err(Error::InsufficientGas);
        }
        self.frame.gas -= amount;
        Ok(())
    }

    fn charge_memory(&mut self, offset: U256, len: U256) -> Result<()> {
        let gas = self.memory.expansion_gas(offset, len, self.machine.schedule)?;
        self.charge(gas)
    }

    fn require_not_static(&self) -> Result<()> {
        if self.frame.is_static {
            Err(Error::IllegalWrite)
        } else {
            Ok(())
        }
    }

    fn step(&mut self, cache: &mut StateCache) -> Result<Step> {
        let op = self.current_op();
        let name = opcodes::name(op);

        self.charge(self.static_cost(op)?)?;

        log::trace!("{:#06x}: {} (gas {})", self.pc, name, self.frame.gas);

        match op {
            STOP => return Ok(Step::Stop),

            ADD | MUL | SUB | DIV | SDIV | MOD | SMOD | EXP | SIGNEXTEND => {
                self.stack.require(name, 2)?;
                let a = self.stack.pop(name)?;
                let b = self.stack.pop(name)?;
                let result = match op {
                    ADD => a.overflowing_add(b).0,
                    MUL => a.overflowing_mul(b).0,
                    SUB => a.overflowing_sub(b).0,
                    DIV => {
                        if b.is_zero() {
                            U256::zero()
                        } else {
                            a / b
                        }
                    }
                    SDIV => word::sdiv(a, b),
                    MOD => {
                        if b.is_zero() {
                            U256::zero()
                        } else {
                            a % b
                        }
                    }
                    SMOD => word::smod(a, b),
                    EXP => {
                        self.charge(gasometer::exp_byte_cost(self.machine.schedule, b))?;
                        a.overflowing_pow(b).0
                    }
                    SIGNEXTEND => word::signextend(a, b),
                    _ => unreachable!(),
                };
                self.stack.push(name, result)?;
            }

            ADDMOD | MULMOD => {
                self.stack.require(name, 3)?;
                let a = self.stack.pop(name)?;
                let b = self.stack.pop(name)?;
                let m = self.stack.pop(name)?;
                let result = if m.is_zero() {
                    U256::zero()
                } else {
                    let a = to_biguint(a);
                    let b = to_biguint(b);
                    let m = to_biguint(m);
                    let result = if op == ADDMOD { (a + b) % m } else { (a * b) % m };
                    from_biguint(result)
                };
                self.stack.push(name, result)?;
            }

            LT | GT | SLT | SGT | EQ => {
                self.stack.require(name, 2)?;
                let a = self.stack.pop(name)?;
                let b = self.stack.pop(name)?;
                let result = match op {
                    LT => a < b,
                    GT => a > b,
                    SLT => word::slt(a, b),
                    SGT => word::sgt(a, b),
                    EQ => a == b,
                    _ => unreachable!(),
                };
                self.stack.push(name, word::bool_to_word(result))?;
            }

            ISZERO => {
                self.stack.require(name, 1)?;
                let a = self.stack.pop(name)?;
                self.stack.push(name, word::bool_to_word(a.is_zero()))?;
            }

            AND | OR | XOR => {
                self.stack.require(name, 2)?;
                let a = self.stack.pop(name)?;
                let b = self.stack.pop(name)?;
                let result = match op {
                    AND => a & b,
                    OR => a | b,
                    XOR => a ^ b,
                    _ => unreachable!(),
                };
                self.stack.push(name, result)?;
            }

            NOT => {
                self.stack.require(name, 1)?;
                let a = self.stack.pop(name)?;
                self.stack.push(name, !a)?;
            }

            BYTE => {
                self.stack.require(name, 2)?;
                let i = self.stack.pop(name)?;
                let x = self.stack.pop(name)?;
                self.stack.push(name, word::byte(i, x))?;
            }

            SHL | SHR | SAR => {
                if !self.machine.schedule.have_bitwise_shifting {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.require(name, 2)?;
                let shift = self.stack.pop(name)?;
                let value = self.stack.pop(name)?;
                let result = match op {
                    SHL => word::shl(shift, value),
                    SHR => word::shr(shift, value),
                    SAR => word::sar(shift, value),
                    _ => unreachable!(),
                };
                self.stack.push(name, result)?;
            }

            SHA3 => {
                self.stack.require(name, 2)?;
                let offset = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_memory(offset, len)?;
                let words = (len.low_u64() as usize + 31) / 32;
                self.charge(self.machine.schedule.sha3_word_gas as u64 * words as u64)?;
                let data = self.memory.read_slice(offset, len)?;
                let hash = keccak(data);
                self.stack.push(name, U256::from_big_endian(hash.as_bytes()))?;
            }

            ADDRESS => self.stack.push_address(name, self.frame.storage_address)?,

            BALANCE => {
                self.stack.require(name, 1)?;
                let addr = self.stack.pop_address(name)?;
                let account = cache.get_account(&addr);
                self.stack.push_u64(name, account.balance())?;
            }

            ORIGIN => self.stack.push_address(name, self.frame.origin)?,
            CALLER => self.stack.push_address(name, self.frame.sender)?,
            CALLVALUE => self.stack.push(name, self.frame.value)?,

            CALLDATALOAD => {
                self.stack.require(name, 1)?;
                let offset = self.stack.pop(name)?;
                let offset = offset.min(U256::from(usize::max_value())).low_u64() as usize;
                let mut bytes = [0u8; 32];
                if offset < self.frame.input.len() {
                    let available = (self.frame.input.len() - offset).min(32);
                    bytes[..available].copy_from_slice(&self.frame.input[offset..offset + available]);
                }
                self.stack.push(name, U256::from_big_endian(&bytes))?;
            }

            CALLDATASIZE => self.stack.push_u64(name, self.frame.input.len() as u64)?,

            CALLDATACOPY => {
                self.stack.require(name, 3)?;
                let dest = self.stack.pop(name)?;
                let src = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_copy(len)?;
                self.charge_memory(dest, len)?;
                let src = src.min(U256::from(usize::max_value())).low_u64() as usize;
                let input = self.frame.input.clone();
                self.memory.copy_from(dest, &input, src, len)?;
            }

            CODESIZE => self.stack.push_u64(name, self.code().len() as u64)?,

            CODECOPY => {
                self.stack.require(name, 3)?;
                let dest = self.stack.pop(name)?;
                let src = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_copy(len)?;
                self.charge_memory(dest, len)?;
                let src = src.min(U256::from(usize::max_value())).low_u64() as usize;
                let code = self.frame.code.clone();
                self.memory.copy_from(dest, &code, src, len)?;
            }

            GASPRICE => self.stack.push(name, self.machine.context.gas_price)?,

            EXTCODESIZE => {
                self.stack.require(name, 1)?;
                let addr = self.stack.pop_address(name)?;
                let account = cache.get_account(&addr);
                self.stack.push_u64(name, account.code().len() as u64)?;
            }

            EXTCODECOPY => {
                self.stack.require(name, 4)?;
                let addr = self.stack.pop_address(name)?;
                let dest = self.stack.pop(name)?;
                let src = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_copy(len)?;
                self.charge_memory(dest, len)?;
                let src = src.min(U256::from(usize::max_value())).low_u64() as usize;
                let account = cache.get_account(&addr);
                let code = account.code().clone();
                self.memory.copy_from(dest, &code, src, len)?;
            }

            RETURNDATASIZE => {
                if !self.machine.schedule.have_return_data {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.push_u64(name, self.return_data.len() as u64)?;
            }

            RETURNDATACOPY => {
                if !self.machine.schedule.have_return_data {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.require(name, 3)?;
                let dest = self.stack.pop(name)?;
                let src = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                let src_usize = src.min(U256::from(usize::max_value())).low_u64() as usize;
                let len_usize = len.min(U256::from(usize::max_value())).low_u64() as usize;
                if src_usize.checked_add(len_usize).map_or(true, |end| end > self.return_data.len()) {
                    return Err(Error::ReturnDataOutOfBounds);
                }
                self.charge_copy(len)?;
                self.charge_memory(dest, len)?;
                let return_data = self.return_data.clone();
                self.memory.copy_from(dest, &return_data, src_usize, len)?;
            }

            EXTCODEHASH => {
                if !self.machine.schedule.have_extcodehash {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.require(name, 1)?;
                let addr = self.stack.pop_address(name)?;
                let hash = if cache.exists(&addr) {
                    let account = cache.get_account(&addr);
                    if account.is_empty() {
                        H256::zero()
                    } else {
                        account.code_hash()
                    }
                } else {
                    H256::zero()
                };
                self.stack.push(name, U256::from_big_endian(hash.as_bytes()))?;
            }

            BLOCKHASH => {
                self.stack.require(name, 1)?;
                let number = self.stack.pop(name)?;
                if number > U256::from(u64::max_value()) {
                    self.stack.push(name, U256::zero())?;
                } else {
                    let number = number.low_u64();
                    let hash = if crate::context::blockhash_in_range(self.machine.context.number, number) {
                        self.machine.blockchain.block_hash(number)
                    } else {
                        H256::zero()
                    };
                    self.stack.push(name, U256::from_big_endian(hash.as_bytes()))?;
                }
            }

            COINBASE => self.stack.push_address(name, self.machine.context.coinbase)?,
            TIMESTAMP => self.stack.push_u64(name, self.machine.context.timestamp)?,
            NUMBER => self.stack.push_u64(name, self.machine.context.number)?,
            DIFFICULTY => self.stack.push(name, self.machine.context.difficulty)?,
            GASLIMIT => self.stack.push(name, self.machine.context.gas_limit)?,

            CHAINID => {
                if !self.machine.schedule.have_chain_id {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.push_u64(name, self.machine.context.chain_id)?;
            }

            SELFBALANCE => {
                if !self.machine.schedule.have_selfbalance {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                let account = cache.get_account(&self.frame.storage_address);
                self.stack.push_u64(name, account.balance())?;
            }

            BASEFEE => {
                if !self.machine.schedule.have_basefee {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.push(name, self.machine.context.base_fee)?;
            }

            POP => {
                self.stack.pop(name)?;
            }

            MLOAD => {
                self.stack.require(name, 1)?;
                let offset = self.stack.pop(name)?;
                self.charge_memory(offset, U256::from(32))?;
                let value = self.memory.read32(offset)?;
                self.stack.push(name, value)?;
            }

            MSTORE => {
                self.stack.require(name, 2)?;
                let offset = self.stack.pop(name)?;
                let value = self.stack.pop(name)?;
                self.charge_memory(offset, U256::from(32))?;
                self.memory.write32(offset, value)?;
            }

            MSTORE8 => {
                self.stack.require(name, 2)?;
                let offset = self.stack.pop(name)?;
                let value = self.stack.pop(name)?;
                self.charge_memory(offset, U256::from(1))?;
                self.memory.write_byte(offset, value.low_u32() as u8)?;
            }

            SLOAD => {
                self.stack.require(name, 1)?;
                let key = self.stack.pop(name)?;
                let value = cache.get_storage(&self.frame.storage_address, &u256_to_h256(key));
                self.stack.push(name, h256_to_u256(value))?;
            }

            SSTORE => {
                self.require_not_static()?;
                self.stack.require(name, 2)?;
                let key = self.stack.pop(name)?;
                let value = self.stack.pop(name)?;
                let key = u256_to_h256(key);
                let value = u256_to_h256(value);
                let addr = self.frame.storage_address;
                let orig = cache.original_storage(&addr, &key);
                let curr = cache.get_storage(&addr, &key);
                let outcome = gasometer::sstore_outcome(self.machine.schedule, self.frame.gas, orig, curr, value)?;
                self.charge(outcome.gas_cost)?;
                cache.set_storage(&addr, key, value);
                cache.add_refund(outcome.refund_delta);
            }

            JUMP => {
                self.stack.require(name, 1)?;
                let dest = self.stack.pop(name)?;
                self.pc = self.verify_jump(dest)?;
                return Ok(Step::Continue);
            }

            JUMPI => {
                self.stack.require(name, 2)?;
                let dest = self.stack.pop(name)?;
                let cond = self.stack.pop(name)?;
                if !cond.is_zero() {
                    self.pc = self.verify_jump(dest)?;
                    return Ok(Step::Continue);
                }
            }

            PC => self.stack.push_u64(name, self.pc as u64)?,
            MSIZE => self.stack.push_u64(name, self.memory.size() as u64)?,
            GAS => self.stack.push_u64(name, self.frame.gas)?,
            JUMPDEST => {}

            PUSH1..=PUSH32 => {
                let n = (op - PUSH1 + 1) as usize;
                let value = read_push(self.code(), self.pc + 1, n);
                self.stack.push("PUSHn", value)?;
                self.pc += 1 + n;
                return Ok(Step::Continue);
            }

            DUP1..=DUP16 => self.stack.dup((op - DUP1 + 1) as usize)?,
            SWAP1..=SWAP16 => self.stack.swap((op - SWAP1 + 1) as usize)?,

            LOG0..=LOG4 => {
                self.require_not_static()?;
                let n_topics = (op - LOG0) as usize;
                self.stack.require(name, 2 + n_topics)?;
                let offset = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_memory(offset, len)?;
                self.charge(self.machine.schedule.log_data_gas as u64 * len.low_u64())?;
                self.charge(self.machine.schedule.log_topic_gas as u64 * n_topics as u64)?;
                let mut topics = Vec::with_capacity(n_topics);
                for _ in 0..n_topics {
                    topics.push(u256_to_h256(self.stack.pop(name)?));
                }
                let data = self.memory.read_slice(offset, len)?.to_vec();
                cache.add_log(crate::log::LogEntry::new(self.frame.storage_address, topics, data));
            }

            CREATE | CREATE2 => {
                self.require_not_static()?;
                if op == CREATE2 && !self.machine.schedule.have_create2 {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                let n = if op == CREATE2 { 4 } else { 3 };
                self.stack.require(name, n)?;
                let value = self.stack.pop(name)?;
                let offset = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                let salt = if op == CREATE2 { Some(self.stack.pop(name)?) } else { None };
                self.charge_memory(offset, len)?;
                let init_code = self.memory.read_slice(offset, len)?.to_vec();
                if op == CREATE2 {
                    let words = (init_code.len() + 31) / 32;
                    self.charge(self.machine.schedule.sha3_word_gas as u64 * words as u64)?;
                }
                let forwarded = gasometer::call_gas_forwarded(self.machine.schedule, U256::from(self.frame.gas), self.frame.gas);
                self.charge(forwarded)?;
                let outcome = perform_create(
                    self.machine,
                    cache,
                    CreateRequest {
                        caller: self.frame.storage_address,
                        origin: self.frame.origin,
                        value,
                        init_code,
                        salt: salt.map(u256_to_h256),
                        gas: forwarded,
                        depth: self.frame.depth + 1,
                        is_static: self.frame.is_static,
                    },
                );
                self.frame.gas += outcome.frame.gas_left;
                self.return_data = outcome.frame.output.clone();
                match outcome.address {
                    Some(addr) if outcome.frame.error.is_none() => {
                        self.stack.push_address(name, addr)?;
                    }
                    _ => {
                        self.stack.push(name, U256::zero())?;
                    }
                }
            }

            CALL | CALLCODE | DELEGATECALL | STATICCALL => {
                if op == DELEGATECALL && !self.machine.schedule.have_delegate_call {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                if op == STATICCALL && !self.machine.schedule.have_static_call {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                let has_value = op == CALL || op == CALLCODE;
                let n = if has_value { 7 } else { 6 };
                self.stack.require(name, n)?;
                let gas_requested = self.stack.pop(name)?;
                let addr = self.stack.pop_address(name)?;
                let value = if has_value { self.stack.pop(name)? } else { U256::zero() };
                let in_off = self.stack.pop(name)?;
                let in_len = self.stack.pop(name)?;
                let out_off = self.stack.pop(name)?;
                let out_len = self.stack.pop(name)?;

                if op == CALL && self.frame.is_static && !value.is_zero() {
                    return Err(Error::IllegalWrite);
                }

                self.charge_memory(in_off, in_len)?;
                self.charge_memory(out_off, out_len)?;

                let target_exists = cache.exists(&addr);
                let mut call_gas = self.machine.schedule.call_gas as u64;
                if !value.is_zero() {
                    call_gas += self.machine.schedule.call_value_transfer_gas as u64;
                }
                if op == CALL && !target_exists && (!value.is_zero() || !self.machine.schedule.no_empty) {
                    call_gas += self.machine.schedule.call_new_account_gas as u64;
                }
                self.charge(call_gas)?;

                let forwarded = gasometer::call_gas_forwarded(self.machine.schedule, gas_requested, self.frame.gas);
                self.charge(forwarded)?;
                let stipend = if !value.is_zero() { self.machine.schedule.call_stipend as u64 } else { 0 };

                let kind = match op {
                    CALL => CallKind::Call,
                    CALLCODE => CallKind::CallCode,
                    DELEGATECALL => CallKind::DelegateCall,
                    STATICCALL => CallKind::StaticCall,
                    _ => unreachable!(),
                };

                let input = self.memory.read_slice(in_off, in_len)?.to_vec();

                // CALL gives the callee its own identity and storage; CALLCODE/DELEGATECALL
                // run the callee's code against the caller's own address and storage.
                // DELEGATECALL additionally passes the grandparent's sender/value through
                // unchanged rather than substituting the immediate caller's.
                let (frame_address, frame_sender, frame_value) = match kind {
                    CallKind::Call | CallKind::StaticCall => (addr, self.frame.storage_address, value),
                    CallKind::CallCode => (self.frame.storage_address, self.frame.storage_address, value),
                    CallKind::DelegateCall => (self.frame.storage_address, self.frame.sender, self.frame.value),
                };
                let transfer = match kind {
                    CallKind::Call if !value.is_zero() => Some((self.frame.storage_address, addr, value)),
                    _ => None,
                };

                let outcome = perform_call(
                    self.machine,
                    cache,
                    CallRequest {
                        code_address: addr,
                        address: frame_address,
                        storage_address: frame_address,
                        sender: frame_sender,
                        origin: self.frame.origin,
                        value: frame_value,
                        input,
                        gas: forwarded + stipend,
                        depth: self.frame.depth + 1,
                        is_static: self.frame.is_static || op == STATICCALL,
                        transfer,
                    },
                );

                self.frame.gas += outcome.gas_left;
                self.return_data = outcome.output.clone();
                let len = (out_len.low_u64() as usize).min(self.return_data.len());
                self.memory.write_slice(out_off, &self.return_data[..len])?;
                match &outcome.error {
                    None => self.stack.push(name, U256::one())?,
                    Some(Error::ExecutionReverted) => self.stack.push(name, U256::zero())?,
                    Some(_) => self.stack.push(name, U256::zero())?,
                }
            }

            RETURN => {
                self.stack.require(name, 2)?;
                let offset = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_memory(offset, len)?;
                let output = self.memory.read_slice(offset, len)?.to_vec();
                return Ok(Step::Return(output));
            }

            REVERT => {
                if !self.machine.schedule.have_revert {
                    return Err(Error::UnknownOpcode { opcode: op });
                }
                self.stack.require(name, 2)?;
                let offset = self.stack.pop(name)?;
                let len = self.stack.pop(name)?;
                self.charge_memory(offset, len)?;
                let output = self.memory.read_slice(offset, len)?.to_vec();
                return Ok(Step::Revert(output));
            }

            INVALID => return Err(Error::ExecutionAborted),

            SELFDESTRUCT => {
                self.require_not_static()?;
                self.stack.require(name, 1)?;
                let beneficiary = self.stack.pop_address(name)?;
                let me = self.frame.storage_address;
                let account = cache.get_account(&me);
                let balance = account.balance();
                let beneficiary_exists = cache.exists(&beneficiary);
                if !beneficiary_exists && balance > 0 {
                    self.charge(self.machine.schedule.suicide_to_new_account_cost as u64)?;
                }
                if !beneficiary_exists || balance > 0 {
                    let mut beneficiary_account = cache.get_account(&beneficiary);
                    beneficiary_account.add_balance(balance).map_err(|_| Error::IntegerOverflow)?;
                    cache.update_account(&beneficiary, beneficiary_account)?;
                }
                if !cache.has_suicide(&me) {
                    cache.add_refund(self.machine.schedule.suicide_refund_gas as i64);
                }
                cache.suicide(&me);
                return Ok(Step::Stop);
            }

            _ => return Err(Error::UnknownOpcode { opcode: op }),
        }

        self.pc += 1;
        Ok(Step::Continue)
    }

    fn charge_copy(&mut self, len: U256) -> Result<()> {
        let words = (len.low_u64() as u64 + 31) / 32;
        self.charge(self.machine.schedule.copy_gas as u64 * words)
    }

    fn static_cost(&self, op: u8) -> Result<u64> {
        let schedule = self.machine.schedule;
        let cost = match op {
            STOP | RETURN | REVERT => 0,
            ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE | COINBASE | TIMESTAMP
            | NUMBER | DIFFICULTY | GASLIMIT | POP | PC | MSIZE | GAS | CHAINID | RETURNDATASIZE | BASEFEE => {
                schedule.tier_step_gas[1] as u64
            }
            ADD | SUB | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | NOT | BYTE | SHL | SHR | SAR
            | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | PUSH1..=PUSH32 | DUP1..=DUP16 | SWAP1..=SWAP16 => {
                schedule.tier_step_gas[2] as u64
            }
            MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => schedule.tier_step_gas[3] as u64,
            ADDMOD | MULMOD | JUMP => schedule.tier_step_gas[4] as u64,
            EXP => schedule.exp_gas as u64,
            JUMPI => schedule.tier_step_gas[5] as u64,
            JUMPDEST => schedule.jumpdest_gas as u64,
            SLOAD => schedule.sload_gas as u64,
            SSTORE => 0, // charged precisely by the SSTORE handler itself
            SHA3 => schedule.sha3_gas as u64,
            BALANCE => schedule.balance_gas as u64,
            EXTCODESIZE => schedule.extcodesize_gas as u64,
            EXTCODECOPY => schedule.extcodecopy_base_gas as u64,
            EXTCODEHASH => schedule.extcodehash_gas as u64,
            CALLDATACOPY | CODECOPY | RETURNDATACOPY => schedule.copy_gas as u64,
            BLOCKHASH => schedule.blockhash_gas as u64,
            LOG0..=LOG4 => schedule.log_gas as u64,
            CREATE | CREATE2 => schedule.create_gas as u64,
            CALL | CALLCODE | DELEGATECALL | STATICCALL => 0, // charged precisely by the CALL handler itself
            SELFDESTRUCT => schedule.suicide_gas as u64,
            INVALID => 0,
            _ if op >= PUSH1 && op <= PUSH32 => schedule.tier_step_gas[2] as u64,
            _ => return Err(Error::UnknownOpcode { opcode: op }),
        };
        Ok(cost)
    }

    fn verify_jump(&self, dest: U256) -> Result<usize> {
        if dest > U256::from(usize::max_value()) {
            return Err(Error::InvalidJumpDest { destination: usize::max_value() });
        }
        let dest = dest.low_u64() as usize;
        if self.jump_destinations.contains(dest) {
            Ok(dest)
        } else {
            Err(Error::InvalidJumpDest { destination: dest })
        }
    }
}

fn read_push(code: &[u8], start: usize, n: usize) -> U256 {
    let mut bytes = [0u8; 32];
    for i in 0..n {
        let idx = start + i;
        bytes[32 - n + i] = if idx < code.len() { code[idx] } else { 0 };
    }
    U256::from_big_endian(&bytes)
}

fn u256_to_h256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from(bytes)
}

fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

fn to_biguint(value: U256) -> num_bigint::BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    num_bigint::BigUint::from_bytes_be(&bytes)
}

fn from_biguint(value: num_bigint::BigUint) -> U256 {
    let bytes = value.to_bytes_be();
    U256::from_big_endian(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::context::Context;
    use crate::interfaces::{Blockchain, NoPrecompiles, Store, WriteBatch};
    use crate::schedule::Schedule;
    use ethereum_types::Address;
    use std::collections::HashMap as Map;

    struct FakeChain;
    impl Blockchain for FakeChain {
        fn block_hash(&self, _number: u64) -> H256 {
            H256::zero()
        }
    }

    #[derive(Default)]
    struct FakeStore {
        accounts: Map<Address, Account>,
    }
    impl Store for FakeStore {
        fn exists(&self, address: &Address) -> bool {
            self.accounts.contains_key(address)
        }
        fn account(&self, address: &Address) -> Account {
            self.accounts.get(address).cloned().unwrap_or_default()
        }
        fn storage_at(&self, _address: &Address, _key: &H256) -> H256 {
            H256::zero()
        }
        fn new_write_batch(&self) -> Box<dyn WriteBatch> {
            unimplemented!("not exercised by these tests")
        }
    }

    fn run_code(code: Vec<u8>, gas: u64) -> FrameResult {
        #[cfg(feature = "tests")]
        let _ = env_logger::try_init();

        let schedule = Schedule::new_istanbul();
        let context = Context::new(1, 0, U256::from(30_000_000), Address::zero(), 1, U256::one());
        let chain = FakeChain;
        let precompiles = NoPrecompiles;
        let machine = Machine {
            schedule: &schedule,
            context: &context,
            blockchain: &chain,
            precompiles: &precompiles,
        };
        let store = FakeStore::default();
        let mut cache = StateCache::new(&store);
        let frame = CallFrame::new(
            CallKind::Call,
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            Address::from_low_u64_be(2),
            Arc::new(code),
            Vec::new(),
            U256::zero(),
            gas,
            1,
            false,
        );
        Interpreter::new(&machine, frame).run(&mut cache)
    }

    #[test]
    fn push_add_return() {
        // PUSH1 1 PUSH1 2 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let code = vec![
            0x60, 0x01, 0x60, 0x02, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
        ];
        let result = run_code(code, 100_000);
        assert!(result.error.is_none());
        assert_eq!(U256::from_big_endian(&result.output), U256::from(3));
    }

    #[test]
    fn invalid_jump_fails() {
        let code = vec![0x60, 0x05, 0x56]; // PUSH1 5; JUMP to a non-JUMPDEST
        let result = run_code(code, 100_000);
        assert_eq!(result.error, Some(Error::InvalidJumpDest { destination: 5 }));
    }

    #[test]
    fn division_by_zero_is_zero_not_error() {
        // PUSH1 0 PUSH1 5 DIV PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let code = vec![
            0x60, 0x00, 0x60, 0x05, 0x04, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
        ];
        let result = run_code(code, 100_000);
        assert!(result.error.is_none());
        assert_eq!(U256::from_big_endian(&result.output), U256::zero());
    }

    #[test]
    fn running_out_of_gas_fails_with_insufficient_gas() {
        let code = vec![0x60, 0x01, 0x60, 0x02, 0x01];
        let result = run_code(code, 1);
        assert_eq!(result.error, Some(Error::InsufficientGas));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn invalid_opcode_consumes_all_gas() {
        let code = vec![0xfe];
        let result = run_code(code, 1000);
        assert_eq!(result.error, Some(Error::ExecutionAborted));
        assert_eq!(result.gas_left, 0);
    }
}
