//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the closed range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Arithmetic mean of a slice, or `None` if the slice is empty.
pub fn mean<T>(values: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    if values.is_empty() {
        return None;
    }

    let mut sum = T::zero();
    for v in values {
        sum += *v;
    }

    T::from(values.len()).map(|n| sum / n)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Returns true if an attitude angle in degrees is within `tol_deg` of level, accounting for
/// wrapping around 360.
pub fn is_level_deg<T>(angle_deg: T, tol_deg: T) -> bool
where
    T: Float
{
    let full = match T::from(360.0) {
        Some(f) => f,
        None => return false
    };
    let a = rem_euclid(angle_deg, full);

    a <= tol_deg || a >= full - tol_deg
}
