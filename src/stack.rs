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

//! The EVM evaluation stack: a bounded LIFO of 256-bit words.

use crate::error::{Error, Result};
use ethereum_types::{Address, U256};

/// Hard ceiling independent of the configured `Schedule::stack_limit`; no schedule may
/// request a larger stack than this.
pub const HARD_CAPACITY: usize = 32 * 1024;

pub struct Stack {
    limit: usize,
    data: Vec<U256>,
}

impl Stack {
    pub fn with_limit(limit: usize) -> Stack {
        Stack {
            limit: limit.min(HARD_CAPACITY),
            data: Vec::with_capacity(64),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, instruction: &'static str, value: U256) -> Result<()> {
        if self.data.len() >= self.limit {
            return Err(Error::DataStackOverflow {
                instruction,
                wanted: 1,
                limit: self.limit,
            });
        }
        self.data.push(value);
        Ok(())
    }

    pub fn pop(&mut self, instruction: &'static str) -> Result<U256> {
        self.data.pop().ok_or(Error::DataStackUnderflow {
            instruction,
            wanted: 1,
            on_stack: 0,
        })
    }

    pub fn peek(&self, instruction: &'static str, n_from_top: usize) -> Result<U256> {
        let len = self.data.len();
        if n_from_top >= len {
            return Err(Error::DataStackUnderflow {
                instruction,
                wanted: n_from_top + 1,
                on_stack: len,
            });
        }
        Ok(self.data[len - 1 - n_from_top])
    }

    /// Ensures at least `n` elements are present, for the arity check done once per opcode
    /// before any stack mutation.
    pub fn require(&self, instruction: &'static str, n: usize) -> Result<()> {
        if self.data.len() < n {
            Err(Error::DataStackUnderflow {
                instruction,
                wanted: n,
                on_stack: self.data.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Ensures pushing `n` more elements would not exceed the limit.
    pub fn require_capacity(&self, instruction: &'static str, n: usize) -> Result<()> {
        if self.data.len() + n > self.limit {
            Err(Error::DataStackOverflow {
                instruction,
                wanted: n,
                limit: self.limit,
            })
        } else {
            Ok(())
        }
    }

    /// `DUPn`: duplicates the element `n` positions from the top (1-indexed) onto the top.
    pub fn dup(&mut self, n: usize) -> Result<()> {
        self.require("DUP", n)?;
        self.require_capacity("DUP", 1)?;
        let value = self.data[self.data.len() - n];
        self.data.push(value);
        Ok(())
    }

    /// `SWAPn`: exchanges the top element with the one `n` positions below it.
    pub fn swap(&mut self, n: usize) -> Result<()> {
        self.require("SWAP", n + 1)?;
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    pub fn push_address(&mut self, instruction: &'static str, address: Address) -> Result<()> {
        self.push(instruction, crate::word::address_to_word(address))
    }

    pub fn pop_address(&mut self, instruction: &'static str) -> Result<Address> {
        self.pop(instruction).map(crate::word::word_to_address)
    }

    pub fn push_u64(&mut self, instruction: &'static str, value: u64) -> Result<()> {
        self.push(instruction, U256::from(value))
    }

    pub fn pop_u64(&mut self, instruction: &'static str) -> Result<u64> {
        let word = self.pop(instruction)?;
        if word > U256::from(u64::max_value()) {
            Err(Error::IntegerOverflow)
        } else {
            Ok(word.low_u64())
        }
    }

    pub fn pop_usize(&mut self, instruction: &'static str) -> Result<usize> {
        let word = self.pop(instruction)?;
        if word > U256::from(usize::max_value()) {
            Err(Error::IntegerOverflow)
        } else {
            Ok(word.low_u64() as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut s = Stack::with_limit(1024);
        s.push("PUSH1", U256::from(42)).unwrap();
        assert_eq!(s.pop("POP").unwrap(), U256::from(42));
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut s = Stack::with_limit(1024);
        assert_eq!(
            s.pop("POP").unwrap_err(),
            Error::DataStackUnderflow {
                instruction: "POP",
                wanted: 1,
                on_stack: 0,
            }
        );
    }

    #[test]
    fn push_past_limit_overflows() {
        let mut s = Stack::with_limit(1);
        s.push("PUSH1", U256::one()).unwrap();
        assert!(matches!(
            s.push("PUSH1", U256::one()),
            Err(Error::DataStackOverflow { .. })
        ));
    }

    #[test]
    fn dup_and_swap() {
        let mut s = Stack::with_limit(1024);
        s.push("PUSH1", U256::from(1)).unwrap();
        s.push("PUSH1", U256::from(2)).unwrap();
        s.dup(2).unwrap();
        assert_eq!(s.pop("POP").unwrap(), U256::from(1));
        s.swap(1).unwrap();
        assert_eq!(s.pop("POP").unwrap(), U256::from(1));
        assert_eq!(s.pop("POP").unwrap(), U256::from(2));
    }

    #[test]
    fn hard_capacity_caps_any_schedule_limit() {
        let s = Stack::with_limit(usize::max_value());
        assert_eq!(s.limit, HARD_CAPACITY);
    }
}
