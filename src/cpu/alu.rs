//! 16-bit ALU helpers.
//!
//! Arithmetic is carried out at 32-bit precision so the carry out of
//! bit 15 is visible before the result is truncated.

/// Result of an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    /// Truncated 16-bit result.
    pub value: u16,
    /// Unsigned carry (add) or borrow (sub).
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

#[inline]
fn sign_bit(value: u32) -> bool {
    value & 0x8000 != 0
}

/// `a + b`. Carry when the unsigned sum exceeds 0xFFFF; overflow when
/// both operands share a sign and the result's sign differs.
pub fn add(a: u16, b: u16) -> AluResult {
    let sum = a as u32 + b as u32;
    let (sa, sb, sr) = (sign_bit(a as u32), sign_bit(b as u32), sign_bit(sum));

    AluResult {
        value: sum as u16,
        carry: sum > 0xFFFF,
        overflow: sa == sb && sa != sr,
    }
}

/// `a - b`. Carry on unsigned borrow (`a < b`); overflow when the
/// operands differ in sign and the result's sign differs from `a`.
pub fn sub(a: u16, b: u16) -> AluResult {
    let diff = (a as u32).wrapping_sub(b as u32);
    let (sa, sb, sr) = (sign_bit(a as u32), sign_bit(b as u32), sign_bit(diff));

    AluResult {
        value: diff as u16,
        carry: a < b,
        overflow: sa != sb && sa != sr,
    }
}
