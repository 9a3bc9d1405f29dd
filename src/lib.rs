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

//! An EVM bytecode execution engine: a 140-odd-opcode interpreter over 256-bit words, gas
//! metered per EIP-150/EIP-2200, with nested call frames and a write-buffering state cache.
//!
//! The host supplies persistence and chain facts through the capability traits in
//! [`interfaces`] and drives execution through [`engine::Engine::call`]/
//! [`engine::Engine::create`]; everything else — arithmetic, stack/memory discipline, gas
//! accounting, nested calls — is internal to this crate.

pub mod account;
pub mod call_frame;
pub mod context;
pub mod engine;
pub mod error;
pub mod gasometer;
pub mod interfaces;
pub mod interpreter;
pub mod log;
pub mod memory;
mod opcodes;
pub mod precompiles;
pub mod schedule;
pub mod stack;
pub mod state_cache;
pub mod word;

pub use account::Account;
pub use call_frame::{CallFrame, CallKind};
pub use context::Context;
pub use engine::{Engine, ExecutionOutcome, Machine};
pub use error::{Error, Result};
pub use interfaces::{Blockchain, Precompile, Precompiles, Store, WriteBatch};
pub use log::LogEntry;
pub use schedule::Schedule;
pub use state_cache::StateCache;
