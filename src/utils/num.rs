//! Numeric utilities: centralized integer conversions for log and bench output.
//!
//! Saturating conversions are used where clamping is preferable to a panic or
//! a silent truncation, e.g. turning a duration into a metric value.

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
