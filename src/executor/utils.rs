use std::cmp::Ordering;

use num_traits::{NumCast, PrimInt, Signed, WrappingAdd, WrappingMul, WrappingSub};

use crate::executor::symbolic_value::{Operator, Sort};

pub fn italic(s: &str) -> String {
    format!("\x1b[3m{}\x1b[0m", s)
}

/// Applies a binary integer operator with the two's-complement semantics of
/// the concrete machine for integer type `T`.
///
/// Returns `None` for a zero divisor.
///
/// # Examples
/// ```
/// use concolic::executor::symbolic_value::Operator;
/// use concolic::executor::utils::integer_binary;
///
/// assert_eq!(integer_binary(Operator::Div, -7i32, 2), Some(-3));
/// assert_eq!(integer_binary(Operator::Rem, -7i32, 2), Some(-1));
/// assert_eq!(integer_binary(Operator::Add, i32::MAX, 1), Some(i32::MIN));
/// assert_eq!(integer_binary(Operator::Shl, 1i32, 33), Some(2));
/// assert_eq!(integer_binary(Operator::Div, 1i32, 0), None);
/// ```
pub fn integer_binary<T>(op: Operator, a: T, b: T) -> Option<T>
where
    T: PrimInt + Signed + WrappingAdd + WrappingSub + WrappingMul,
{
    let bits = T::zero().count_zeros();
    let minus_one = T::zero() - T::one();
    let v = match op {
        Operator::Add => a.wrapping_add(&b),
        Operator::Sub => a.wrapping_sub(&b),
        Operator::Mul => a.wrapping_mul(&b),
        Operator::Div => {
            if b.is_zero() {
                return None;
            }
            if a == T::min_value() && b == minus_one {
                a
            } else {
                a / b
            }
        }
        Operator::Rem => {
            if b.is_zero() {
                return None;
            }
            if b == minus_one {
                T::zero()
            } else {
                a % b
            }
        }
        Operator::Shl => a.signed_shl(shift_distance(b, bits)),
        Operator::Shr => a.signed_shr(shift_distance(b, bits)),
        Operator::UShr => a.unsigned_shr(shift_distance(b, bits)),
        Operator::And => a & b,
        Operator::Or => a | b,
        Operator::Xor => a ^ b,
        Operator::Cmp => match a.cmp(&b) {
            Ordering::Less => minus_one,
            Ordering::Equal => T::zero(),
            Ordering::Greater => T::one(),
        },
        _ => return None,
    };
    Some(v)
}

fn shift_distance<T: PrimInt>(b: T, bits: u32) -> u32 {
    let mask: T = NumCast::from(bits - 1).unwrap_or_else(T::zero);
    (b & mask).to_u32().unwrap_or(0)
}

/// Integer operator on `i64` shadows, wrapped to the width of `sort`.
pub fn eval_integer(op: Operator, sort: Sort, a: i64, b: i64) -> Option<i64> {
    match sort {
        Sort::Int32 => integer_binary(op, a as i32, b as i32).map(|v| v as i64),
        _ => integer_binary(op, a, b),
    }
}

/// Real operator on `f64` shadows. `Real32` results are computed in single
/// precision and widened.
pub fn eval_real(op: Operator, sort: Sort, a: f64, b: f64) -> f64 {
    if sort == Sort::Real32 {
        let (a, b) = (a as f32, b as f32);
        let v = match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
            Operator::Rem => a % b,
            _ => return real_compare(a as f64, b as f64) as f64,
        };
        v as f64
    } else {
        match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
            Operator::Rem => a % b,
            _ => real_compare(a, b) as f64,
        }
    }
}

/// Three-way real comparison. A `NaN` operand compares as greater.
pub fn real_compare(a: f64, b: f64) -> i64 {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) | None => 1,
    }
}

/// Real to integer conversion with the saturating semantics of the concrete
/// machine (`NaN` becomes zero).
pub fn real_to_integer(v: f64, target: Sort) -> i64 {
    match target {
        Sort::Int32 => (v as i32) as i64,
        _ => v as i64,
    }
}

pub fn integer_to_real(v: i64, target: Sort) -> f64 {
    match target {
        Sort::Real32 => (v as f32) as f64,
        _ => v as f64,
    }
}

pub fn narrow(op: Operator, v: i64) -> i64 {
    match op {
        Operator::ToByte => (v as i8) as i64,
        Operator::ToChar => (v as u16) as i64,
        Operator::ToShort => (v as i16) as i64,
        Operator::ToInt => (v as i32) as i64,
        _ => v,
    }
}

/// Absolute value with the wrapping semantics of the concrete machine: the
/// minimum value of `sort` stays negative.
pub fn integer_abs(v: i64, sort: Sort) -> i64 {
    match sort {
        Sort::Int32 => (v as i32).wrapping_abs() as i64,
        _ => v.wrapping_abs(),
    }
}

/// Real minimum or maximum. A `NaN` operand yields `NaN` and `-0.0` orders
/// below `0.0`.
///
/// ```
/// use concolic::executor::symbolic_value::Operator;
/// use concolic::executor::utils::real_min_max;
///
/// assert!(real_min_max(Operator::Min, -0.0, 0.0).is_sign_negative());
/// assert_eq!(real_min_max(Operator::Max, 1.5, -2.0), 1.5);
/// assert!(real_min_max(Operator::Max, f64::NAN, 1.0).is_nan());
/// ```
pub fn real_min_max(op: Operator, a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    let a_is_smaller = match a.partial_cmp(&b) {
        Some(Ordering::Less) => true,
        Some(Ordering::Greater) => false,
        _ => a.is_sign_negative(),
    };
    match (op, a_is_smaller) {
        (Operator::Min, true) | (Operator::Max, false) => a,
        _ => b,
    }
}
