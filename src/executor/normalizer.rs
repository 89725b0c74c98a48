use crate::executor::error::NormalizationError;
use crate::executor::symbolic_value::{Comparator, Constraint, ExprRef, Expression, Operator};

/// Relational operator equivalent to `cmp(a, b) OP k`, if any.
///
/// | k  | supported                                                  |
/// |----|------------------------------------------------------------|
/// | 0  | every comparator maps onto itself                          |
/// | 1  | `==` becomes `>`, `!=` becomes `<=`                        |
/// | -1 | `==` and `<=` become `<`, `!=` and `>` become `>=`         |
///
/// Every other pair is rejected, including tautologies such as
/// `cmp(a, b) >= -1` and contradictions such as `cmp(a, b) < -1`.
pub fn relational_operator(comparator: Comparator, k: i64) -> Result<Comparator, NormalizationError> {
    let op = match (k, comparator) {
        (0, c) => Some(c),
        (1, Comparator::Eq) => Some(Comparator::Gt),
        (1, Comparator::Ne) => Some(Comparator::Le),
        (-1, Comparator::Eq) => Some(Comparator::Lt),
        (-1, Comparator::Ne) => Some(Comparator::Ge),
        (-1, Comparator::Le) => Some(Comparator::Lt),
        (-1, Comparator::Gt) => Some(Comparator::Ge),
        _ => None,
    };
    op.ok_or(NormalizationError::Unsupported {
        comparator,
        literal: k,
    })
}

fn comparison_operands(e: &ExprRef) -> Option<(&ExprRef, &ExprRef)> {
    match e.as_ref() {
        Expression::Operation(o) if o.op == Operator::Cmp && o.operands.len() == 2 => {
            Some((&o.operands[0], &o.operands[1]))
        }
        _ => None,
    }
}

fn literal(e: &ExprRef) -> Option<i64> {
    match e.as_ref() {
        Expression::Constant(c) => c.as_integer(),
        _ => None,
    }
}

/// Rewrites `cmp(a, b) OP k` (or `k OP cmp(a, b)`) into a relational
/// constraint over `a` and `b`. Other constraints are returned unchanged.
pub fn normalize(constraint: Constraint) -> Result<Constraint, NormalizationError> {
    if let (Some((a, b)), Some(k)) = (
        comparison_operands(&constraint.left),
        literal(&constraint.right),
    ) {
        let op = relational_operator(constraint.comparator, k)?;
        return Ok(Constraint::new(a.clone(), op, b.clone()));
    }
    // k OP cmp(a, b)  <=>  cmp(b, a) OP -k
    if let (Some(k), Some((a, b))) = (
        literal(&constraint.left),
        comparison_operands(&constraint.right),
    ) {
        let op = relational_operator(constraint.comparator, k.wrapping_neg())?;
        return Ok(Constraint::new(b.clone(), op, a.clone()));
    }
    Ok(constraint)
}
