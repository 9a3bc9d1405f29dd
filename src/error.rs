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

//! Engine errors.

use std::fmt;

/// Errors surfaced by the stack, memory, interpreter, state cache, and engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Reference to an address the store has never seen and the call did not create.
    UnknownAddress,
    /// Value transfer requested more than the sender's balance.
    InsufficientBalance {
        /// Balance at the time of the transfer.
        balance: u64,
        /// Amount requested.
        needed: u64,
    },
    /// `JUMP`/`JUMPI` target byte is not `JUMPDEST`.
    InvalidJumpDest {
        /// Destination the code tried to jump to.
        destination: usize,
    },
    /// Not enough gas remaining to pay for an operation.
    InsufficientGas,
    /// Memory access beyond what the host allows.
    MemoryOutOfBounds,
    /// Code read beyond the code buffer (never actually raised — overruns zero-pad instead,
    /// kept for hosts that want to treat a defensive check as an error).
    CodeOutOfBounds,
    /// `CALLDATACOPY`/`CALLDATALOAD` source is out of range of the host's declared input size.
    InputOutOfBounds,
    /// `RETURNDATACOPY` source is out of range of the last call's return buffer.
    ReturnDataOutOfBounds,
    /// Nested call/create depth exceeded `Schedule::max_depth`.
    CallStackOverflow,
    /// Attempted to return from a call frame with no parent.
    CallStackUnderflow,
    /// Evaluation stack push would exceed `Schedule::stack_limit`.
    DataStackOverflow {
        /// Invoked instruction.
        instruction: &'static str,
        /// How many elements the instruction wanted to push.
        wanted: usize,
        /// Current stack limit.
        limit: usize,
    },
    /// Evaluation stack pop/peek on an empty or too-shallow stack.
    DataStackUnderflow {
        /// Invoked instruction.
        instruction: &'static str,
        /// How many elements the instruction wanted to pop.
        wanted: usize,
        /// How many elements were actually on the stack.
        on_stack: usize,
    },
    /// Callee address has no code and is not a precompile.
    InvalidContract,
    /// Code returned from `CREATE`/`CREATE2` init code failed validation (e.g. starts with
    /// the EIP-3541 `0xEF` byte, or exceeds the maximum code size).
    InvalidContractCode,
    /// Storage write, log emission, or sub-creation attempted inside a static call.
    PermissionDenied,
    /// `INVALID` opcode executed; all remaining gas is consumed.
    ExecutionAborted,
    /// `REVERT` opcode executed; remaining gas and output are preserved, state is rolled back.
    ExecutionReverted,
    /// Derived contract address malformed or already occupied.
    InvalidAddress,
    /// A conversion (e.g. `Word` to `u64`) would lose information.
    IntegerOverflow,
    /// Storage write, log, `CREATE`/`CREATE2`, or `SELFDESTRUCT` attempted in a static context.
    IllegalWrite,
    /// `BLOCKHASH` argument is not a `u64`.
    InvalidBlockNumber,
    /// `BLOCKHASH` argument refers to the current block or one more than 256 blocks behind it.
    BlockNumberOutOfRange,
    /// Opcode byte does not correspond to any known instruction.
    UnknownOpcode {
        /// The unrecognised byte.
        opcode: u8,
    },
    /// A built-in (precompiled) contract failed on its given input.
    BuiltIn(&'static str),
    /// Likely to cause consensus issues if observed; never expected in correct code.
    Internal(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            UnknownAddress => write!(f, "unknown address"),
            InsufficientBalance { balance, needed } => {
                write!(f, "insufficient balance: {balance} available, {needed} needed")
            }
            InvalidJumpDest { destination } => write!(f, "bad jump destination {destination:x}"),
            InsufficientGas => write!(f, "out of gas"),
            MemoryOutOfBounds => write!(f, "memory access out of bounds"),
            CodeOutOfBounds => write!(f, "code access out of bounds"),
            InputOutOfBounds => write!(f, "input data access out of bounds"),
            ReturnDataOutOfBounds => write!(f, "return data access out of bounds"),
            CallStackOverflow => write!(f, "call stack overflow"),
            CallStackUnderflow => write!(f, "call stack underflow"),
            DataStackOverflow {
                instruction,
                wanted,
                limit,
            } => write!(f, "out of stack {instruction} {wanted}/{limit}"),
            DataStackUnderflow {
                instruction,
                wanted,
                on_stack,
            } => write!(f, "stack underflow {instruction} {wanted}/{on_stack}"),
            InvalidContract => write!(f, "no code at address"),
            InvalidContractCode => write!(f, "invalid code to deploy as a contract"),
            PermissionDenied => write!(f, "permission denied"),
            ExecutionAborted => write!(f, "invalid instruction"),
            ExecutionReverted => write!(f, "reverted"),
            InvalidAddress => write!(f, "invalid or occupied contract address"),
            IntegerOverflow => write!(f, "integer overflow"),
            IllegalWrite => write!(f, "mutable operation in static context"),
            InvalidBlockNumber => write!(f, "invalid block number"),
            BlockNumberOutOfRange => write!(f, "block number out of range"),
            UnknownOpcode { opcode } => write!(f, "bad instruction {opcode:x}"),
            BuiltIn(name) => write!(f, "built-in failed: {name}"),
            Internal(ref msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
