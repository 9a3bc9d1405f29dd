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

//! 256-bit word arithmetic as seen by the interpreter's stack: two's-complement signed
//! views, sign extension, and address conversion on top of `ethereum_types::U256`.

use ethereum_types::{Address, U256};

/// Bit 255 is the sign bit under two's-complement interpretation.
const SIGN_BIT: U256 = U256([0, 0, 0, 0x8000_0000_0000_0000]);

/// Whether `x`, read as a two's-complement signed 256-bit integer, is negative.
pub fn is_negative(x: U256) -> bool {
    x & SIGN_BIT == SIGN_BIT
}

/// Two's-complement negation.
pub fn neg(x: U256) -> U256 {
    (!x).overflowing_add(U256::one()).0
}

/// Signed division, rounding toward zero. Division by zero yields zero, matching the
/// unsigned `DIV` opcode rather than raising an error.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let a_neg = is_negative(a);
    let b_neg = is_negative(b);
    let a_abs = if a_neg { neg(a) } else { a };
    let b_abs = if b_neg { neg(b) } else { b };
    let result = a_abs / b_abs;
    if a_neg != b_neg {
        neg(result)
    } else {
        result
    }
}

/// Signed modulo; result takes the sign of the dividend. Division by zero yields zero.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let a_neg = is_negative(a);
    let b_neg = is_negative(b);
    let a_abs = if a_neg { neg(a) } else { a };
    let b_abs = if b_neg { neg(b) } else { b };
    let result = a_abs % b_abs;
    if a_neg {
        neg(result)
    } else {
        result
    }
}

/// Signed less-than.
pub fn slt(a: U256, b: U256) -> bool {
    let a_neg = is_negative(a);
    let b_neg = is_negative(b);
    if a_neg != b_neg {
        a_neg
    } else {
        a < b
    }
}

/// Signed greater-than.
pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// Sign-extends the byte at 0-indexed position `k` (0 = least significant byte) of `x`
/// into all higher bytes. For `k >= 31` the value is returned unchanged.
pub fn signextend(k: U256, x: U256) -> U256 {
    if k >= U256::from(32) {
        return x;
    }
    let k = k.low_u32() as usize;
    let bit_index = 8 * k + 7;
    let bit = (x >> bit_index) & U256::one();
    let mask = (U256::one() << bit_index) - U256::one();
    if bit.is_zero() {
        x & mask
    } else {
        x | !mask
    }
}

/// Returns byte `i` of `x` in big-endian order (0 = most significant byte), or zero if
/// `i >= 32`.
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32) {
        return U256::zero();
    }
    let i = i.low_u32() as usize;
    let mut bytes = [0u8; 32];
    x.to_big_endian(&mut bytes);
    U256::from(bytes[i])
}

/// Arithmetic shift left. Shifting by 256 or more yields zero.
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << (shift.low_u32() as usize)
    }
}

/// Logical shift right. Shifting by 256 or more yields zero.
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> (shift.low_u32() as usize)
    }
}

/// Arithmetic shift right, preserving the sign bit. Shifting by 256 or more yields zero
/// for non-negative input and all-ones for negative input.
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::max_value() } else { U256::zero() };
    }
    let shift = shift.low_u32() as usize;
    if !negative {
        return value >> shift;
    }
    // Fill in ones from the top as the value shifts down.
    let shifted = value >> shift;
    let mask = if shift == 0 {
        U256::zero()
    } else {
        U256::max_value() << (256 - shift)
    };
    shifted | mask
}

/// Converts a word to an address by keeping its low-order `Address::len_bytes()` bytes.
pub fn word_to_address(word: U256) -> Address {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    Address::from_slice(&bytes[12..32])
}

/// Converts an address to a word, left-padding with zeros.
pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// Converts a boolean opcode result to the canonical `0`/`1` word.
pub fn bool_to_word(b: bool) -> U256 {
    if b {
        U256::one()
    } else {
        U256::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdiv_rounds_toward_zero() {
        let a = neg(U256::from(7));
        let b = U256::from(2);
        assert_eq!(sdiv(a, b), neg(U256::from(3)));
    }

    #[test]
    fn sdiv_by_zero_is_zero() {
        assert_eq!(sdiv(U256::from(5), U256::zero()), U256::zero());
    }

    #[test]
    fn smod_takes_dividend_sign() {
        let a = neg(U256::from(7));
        let b = U256::from(3);
        assert_eq!(smod(a, b), neg(U256::from(1)));
    }

    #[test]
    fn signextend_past_31_is_noop() {
        let x = U256::from(0x7f);
        assert_eq!(signextend(U256::from(31), x), x);
        assert_eq!(signextend(U256::from(100), x), x);
    }

    #[test]
    fn signextend_sets_high_bits() {
        let x = U256::from(0xff); // byte 0 = 0xff, sign bit set
        let extended = signextend(U256::zero(), x);
        assert_eq!(extended, U256::max_value());
    }

    #[test]
    fn shifts_saturate_past_256() {
        assert_eq!(shl(U256::from(256), U256::from(1)), U256::zero());
        assert_eq!(shr(U256::from(256), U256::from(1)), U256::zero());
        assert_eq!(sar(U256::from(256), U256::from(1)), U256::zero());
        assert_eq!(sar(U256::from(256), neg(U256::from(1))), U256::max_value());
    }

    #[test]
    fn sar_preserves_sign() {
        let negative_one = neg(U256::from(1));
        assert_eq!(sar(U256::from(4), negative_one), negative_one);
    }

    #[test]
    fn byte_reads_big_endian() {
        let x = U256::from(0x1122u64);
        assert_eq!(byte(U256::from(30), x), U256::from(0x11));
        assert_eq!(byte(U256::from(31), x), U256::from(0x22));
        assert_eq!(byte(U256::from(32), x), U256::zero());
    }

    #[test]
    fn address_round_trip() {
        let addr = Address::from_low_u64_be(0x6ac7_ea33_f883_1ea9);
        assert_eq!(word_to_address(address_to_word(addr)), addr);
    }
}
