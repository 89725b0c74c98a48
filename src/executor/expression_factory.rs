//! Normalizing expression builders.
//!
//! Every builder folds applications without a variable operand into a
//! constant, so a variable-free `Operation` node never exists.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::executor::error::{ExecutionError, ExecutionResult};
use crate::executor::symbolic_value::{
    Comparator, Concrete, Constraint, ExprRef, Expression, ObjectReference, Operation, Operator,
    Sort, Variable,
};
use crate::executor::utils::{
    eval_integer, eval_real, integer_abs, integer_to_real as i2r, narrow as narrow_value,
    real_compare, real_min_max, real_to_integer as r2i,
};

pub const SMALL_INTEGER_MIN: i64 = -1;
pub const SMALL_INTEGER_MAX: i64 = 5;

lazy_static! {
    static ref SMALL_INTEGERS: Vec<ExprRef> = (SMALL_INTEGER_MIN..=SMALL_INTEGER_MAX)
        .map(|v| Arc::new(Expression::Constant(Concrete::Integer(v))))
        .collect();
    static ref SMALL_REALS: Vec<ExprRef> = [0.0f64, 1.0, 2.0]
        .iter()
        .map(|v| Arc::new(Expression::Constant(Concrete::Real(*v))))
        .collect();
    static ref NULL_REFERENCE: ExprRef = Arc::new(Expression::NullReference);
}

/// Integer constant; values in `-1..=5` come from a shared table.
///
/// ```
/// use std::sync::Arc;
/// use concolic::executor::expression_factory::build_integer;
///
/// assert!(Arc::ptr_eq(&build_integer(3), &build_integer(3)));
/// assert!(!Arc::ptr_eq(&build_integer(6), &build_integer(6)));
/// ```
pub fn build_integer(value: i64) -> ExprRef {
    if (SMALL_INTEGER_MIN..=SMALL_INTEGER_MAX).contains(&value) {
        SMALL_INTEGERS[(value - SMALL_INTEGER_MIN) as usize].clone()
    } else {
        Arc::new(Expression::Constant(Concrete::Integer(value)))
    }
}

/// Real constant; `0.0`, `1.0` and `2.0` come from a shared table.
pub fn build_real(value: f64) -> ExprRef {
    let bits = value.to_bits();
    if bits == 0.0f64.to_bits() {
        SMALL_REALS[0].clone()
    } else if bits == 1.0f64.to_bits() {
        SMALL_REALS[1].clone()
    } else if bits == 2.0f64.to_bits() {
        SMALL_REALS[2].clone()
    } else {
        Arc::new(Expression::Constant(Concrete::Real(value)))
    }
}

pub fn build_string(value: &str) -> ExprRef {
    Arc::new(Expression::Constant(Concrete::Str(Arc::from(value))))
}

pub fn build_constant(value: Concrete) -> ExprRef {
    match value {
        Concrete::Integer(v) => build_integer(v),
        Concrete::Real(v) => build_real(v),
        Concrete::Reference(None) => null_reference(),
        c => Arc::new(Expression::Constant(c)),
    }
}

/// The canonical null reference.
pub fn null_reference() -> ExprRef {
    NULL_REFERENCE.clone()
}

pub fn build_reference(type_name: Arc<str>, instance_id: usize) -> ExprRef {
    Arc::new(Expression::Reference(ObjectReference::new(
        type_name,
        instance_id,
    )))
}

/// Integer variable ranging over the full domain of `sort`.
pub fn integer_variable(name: &str, sort: Sort, concrete: i64) -> ExprRef {
    let (min, max) = match sort {
        Sort::Int32 => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    };
    integer_variable_with_bounds(name, sort, concrete, min, max)
}

pub fn integer_variable_with_bounds(
    name: &str,
    sort: Sort,
    concrete: i64,
    min: i64,
    max: i64,
) -> ExprRef {
    Arc::new(Expression::Variable(Variable {
        name: Arc::from(name),
        sort,
        concrete: Concrete::Integer(concrete),
        min: Some(Concrete::Integer(min)),
        max: Some(Concrete::Integer(max)),
    }))
}

pub fn real_variable(name: &str, sort: Sort, concrete: f64) -> ExprRef {
    let (min, max) = match sort {
        Sort::Real32 => (f32::MIN as f64, f32::MAX as f64),
        _ => (f64::MIN, f64::MAX),
    };
    Arc::new(Expression::Variable(Variable {
        name: Arc::from(name),
        sort,
        concrete: Concrete::Real(concrete),
        min: Some(Concrete::Real(min)),
        max: Some(Concrete::Real(max)),
    }))
}

pub fn string_variable(name: &str, concrete: &str) -> ExprRef {
    Arc::new(Expression::Variable(Variable {
        name: Arc::from(name),
        sort: Sort::Str,
        concrete: Concrete::Str(Arc::from(concrete)),
        min: None,
        max: None,
    }))
}

fn operation(op: Operator, sort: Sort, operands: Vec<ExprRef>, concrete: Concrete) -> ExprRef {
    if operands.iter().any(|x| x.contains_variable()) {
        Arc::new(Expression::Operation(Operation {
            op,
            operands,
            sort,
            concrete,
        }))
    } else {
        build_constant(concrete)
    }
}

fn integer_of(e: &ExprRef) -> ExecutionResult<i64> {
    e.integer_value()
        .ok_or_else(|| ExecutionError::ExpressionKind {
            expected: "integer",
            found: e.to_string(),
        })
}

fn real_of(e: &ExprRef) -> ExecutionResult<f64> {
    e.real_value().ok_or_else(|| ExecutionError::ExpressionKind {
        expected: "real",
        found: e.to_string(),
    })
}

fn binary_concrete(op: Operator, sort: Sort, l: &ExprRef, r: &ExprRef) -> ExecutionResult<Option<Concrete>> {
    if sort.is_integer() {
        Ok(eval_integer(op, sort, integer_of(l)?, integer_of(r)?).map(Concrete::Integer))
    } else if sort.is_real() {
        Ok(Some(Concrete::Real(eval_real(op, sort, real_of(l)?, real_of(r)?))))
    } else {
        Err(ExecutionError::ExpressionKind {
            expected: "numeric",
            found: sort.name().to_string(),
        })
    }
}

fn is_constant_value(e: &ExprRef, v: i64) -> bool {
    match e.as_ref() {
        Expression::Constant(Concrete::Integer(c)) => *c == v,
        Expression::Constant(Concrete::Real(c)) => *c == v as f64,
        _ => false,
    }
}

/// `left + right`, with the constant operand moved to the left.
pub fn add(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<ExprRef> {
    let (left, right) = if !left.is_constant() && right.is_constant() {
        (right, left)
    } else {
        (left, right)
    };
    let concrete = binary_concrete(Operator::Add, sort, left, right)?;
    let concrete = concrete.unwrap_or(Concrete::Integer(0));

    if left.is_constant() && right.is_constant() {
        return Ok(build_constant(concrete));
    }
    if is_constant_value(left, 0) {
        return Ok(right.clone());
    }
    // c + (d + x) => (c + d) + x
    if sort.is_integer() && left.is_constant() {
        if let Expression::Operation(inner) = right.as_ref() {
            if inner.op == Operator::Add && inner.operands[0].is_constant() {
                let head = add(sort, left, &inner.operands[0])?;
                return add(sort, &head, &inner.operands[1]);
            }
        }
    }
    Ok(operation(
        Operator::Add,
        sort,
        vec![left.clone(), right.clone()],
        concrete,
    ))
}

pub fn sub(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<ExprRef> {
    let concrete = binary_concrete(Operator::Sub, sort, left, right)?.unwrap_or(Concrete::Integer(0));
    Ok(operation(
        Operator::Sub,
        sort,
        vec![left.clone(), right.clone()],
        concrete,
    ))
}

/// `left * right`, with the constant operand moved to the left.
pub fn mul(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<ExprRef> {
    let (left, right) = if !left.is_constant() && right.is_constant() {
        (right, left)
    } else {
        (left, right)
    };
    let concrete = binary_concrete(Operator::Mul, sort, left, right)?.unwrap_or(Concrete::Integer(0));

    if left.is_constant() && right.is_constant() {
        return Ok(build_constant(concrete));
    }
    if sort.is_integer() && is_constant_value(left, 0) {
        return Ok(build_integer(0));
    }
    if is_constant_value(left, 1) {
        return Ok(right.clone());
    }
    Ok(operation(
        Operator::Mul,
        sort,
        vec![left.clone(), right.clone()],
        concrete,
    ))
}

fn quotient(
    op: Operator,
    sort: Sort,
    left: &ExprRef,
    right: &ExprRef,
) -> ExecutionResult<Option<ExprRef>> {
    let concrete = match binary_concrete(op, sort, left, right)? {
        Some(c) => c,
        None => return Ok(None),
    };
    if sort.is_integer() && is_constant_value(left, 0) {
        return Ok(Some(build_integer(0)));
    }
    Ok(Some(operation(
        op,
        sort,
        vec![left.clone(), right.clone()],
        concrete,
    )))
}

/// Truncating quotient. `None` when the integer divisor is concretely zero;
/// the caller records the violation.
pub fn div(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<Option<ExprRef>> {
    quotient(Operator::Div, sort, left, right)
}

/// Remainder whose sign follows the dividend. `None` for a zero integer divisor.
pub fn rem(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<Option<ExprRef>> {
    quotient(Operator::Rem, sort, left, right)
}

pub fn neg(sort: Sort, operand: &ExprRef) -> ExecutionResult<ExprRef> {
    let concrete = if sort.is_integer() {
        let v = integer_of(operand)?;
        Concrete::Integer(eval_integer(Operator::Sub, sort, 0, v).unwrap_or(0))
    } else {
        Concrete::Real(-real_of(operand)?)
    };
    Ok(operation(Operator::Neg, sort, vec![operand.clone()], concrete))
}

pub fn abs(sort: Sort, operand: &ExprRef) -> ExecutionResult<ExprRef> {
    let concrete = if sort.is_integer() {
        Concrete::Integer(integer_abs(integer_of(operand)?, sort))
    } else {
        Concrete::Real(real_of(operand)?.abs())
    };
    Ok(operation(Operator::Abs, sort, vec![operand.clone()], concrete))
}

/// `Operator::Min` or `Operator::Max` over two operands of `sort`.
pub fn min_max(
    op: Operator,
    sort: Sort,
    left: &ExprRef,
    right: &ExprRef,
) -> ExecutionResult<ExprRef> {
    let concrete = if sort.is_integer() {
        let (a, b) = (integer_of(left)?, integer_of(right)?);
        Concrete::Integer(if op == Operator::Min { a.min(b) } else { a.max(b) })
    } else {
        Concrete::Real(real_min_max(op, real_of(left)?, real_of(right)?))
    };
    Ok(operation(
        op,
        sort,
        vec![left.clone(), right.clone()],
        concrete,
    ))
}

/// Shifts and bitwise operators. Shift distances are masked to the operand width.
pub fn bitwise(
    op: Operator,
    sort: Sort,
    left: &ExprRef,
    right: &ExprRef,
) -> ExecutionResult<ExprRef> {
    let v = eval_integer(op, sort, integer_of(left)?, integer_of(right)?).ok_or_else(|| {
        ExecutionError::ExpressionKind {
            expected: "bitwise operator",
            found: op.symbol().to_string(),
        }
    })?;
    Ok(operation(
        op,
        sort,
        vec![left.clone(), right.clone()],
        Concrete::Integer(v),
    ))
}

/// Three-way comparison of two operands of `sort`, an int32 in `{-1, 0, 1}`.
pub fn cmp(sort: Sort, left: &ExprRef, right: &ExprRef) -> ExecutionResult<ExprRef> {
    let v = if sort.is_integer() {
        integer_of(left)?.cmp(&integer_of(right)?) as i64
    } else {
        real_compare(real_of(left)?, real_of(right)?)
    };
    Ok(operation(
        Operator::Cmp,
        Sort::Int32,
        vec![left.clone(), right.clone()],
        Concrete::Integer(v),
    ))
}

pub fn integer_to_real(operand: &ExprRef, target: Sort) -> ExecutionResult<ExprRef> {
    let v = i2r(integer_of(operand)?, target);
    Ok(operation(
        Operator::IntegerToReal,
        target,
        vec![operand.clone()],
        Concrete::Real(v),
    ))
}

pub fn real_to_integer(operand: &ExprRef, target: Sort) -> ExecutionResult<ExprRef> {
    let v = r2i(real_of(operand)?, target);
    Ok(operation(
        Operator::RealToInteger,
        target,
        vec![operand.clone()],
        Concrete::Integer(v),
    ))
}

/// Narrowing int32 conversion (`ToByte`, `ToChar`, `ToShort`).
pub fn narrow(op: Operator, operand: &ExprRef) -> ExecutionResult<ExprRef> {
    let v = narrow_value(op, integer_of(operand)?);
    Ok(operation(
        op,
        Sort::Int32,
        vec![operand.clone()],
        Concrete::Integer(v),
    ))
}

/// String concatenation. The right operand may be of any scalar kind.
pub fn concat(left: &ExprRef, right: &ExprRef) -> ExecutionResult<ExprRef> {
    let head = match left.concrete() {
        Concrete::Str(s) => s,
        _ => {
            return Err(ExecutionError::ExpressionKind {
                expected: "string",
                found: left.to_string(),
            })
        }
    };
    let tail = match right.concrete() {
        Concrete::Str(s) => s.to_string(),
        Concrete::Integer(v) => v.to_string(),
        Concrete::Real(v) => format!("{:?}", v),
        Concrete::Reference(None) => "null".to_string(),
        Concrete::Reference(Some(id)) => id.to_string(),
    };
    Ok(operation(
        Operator::Concat,
        Sort::Str,
        vec![left.clone(), right.clone()],
        Concrete::Str(Arc::from(format!("{}{}", head, tail).as_str())),
    ))
}

pub fn constraint(left: &ExprRef, comparator: Comparator, right: &ExprRef) -> Constraint {
    Constraint::new(left.clone(), comparator, right.clone())
}

pub fn eq(left: &ExprRef, right: &ExprRef) -> Constraint {
    constraint(left, Comparator::Eq, right)
}

pub fn ne(left: &ExprRef, right: &ExprRef) -> Constraint {
    constraint(left, Comparator::Ne, right)
}

pub fn lt(left: &ExprRef, right: &ExprRef) -> Constraint {
    constraint(left, Comparator::Lt, right)
}

pub fn ge(left: &ExprRef, right: &ExprRef) -> Constraint {
    constraint(left, Comparator::Ge, right)
}
