use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Reagent quantity. Same representation as [`Fixed64`].
pub type Volume = Fixed64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Multiply, saturating at the representable range instead of wrapping.
#[inline]
pub fn saturating_mul(a: Fixed64, b: Fixed64) -> Fixed64 {
    a.saturating_mul(b)
}
