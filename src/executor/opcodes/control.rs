use log::trace;

use crate::executor::callback::JumpOp;
use crate::executor::error::ExecutionResult;
use crate::executor::expression_factory::{build_integer, constraint, eq, ne};
use crate::executor::path_condition::{BranchDiscriminator, BranchSite};
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::symbolic_value::{Comparator, ExprRef};

pub fn handle_jump(state: &mut SymbolicState, op: &JumpOp) -> ExecutionResult<()> {
    match op {
        JumpOp::Goto => {}
        JumpOp::If {
            comparator,
            site,
            value,
        } => {
            let operand = state.stack()?.pop_bv32()?;
            let zero = build_integer(0);
            let (v, z) = (*value as i64, 0);
            match comparator {
                Comparator::Eq | Comparator::Ne => {
                    primitive(state, site, Comparator::Eq, (&operand, v), (&zero, z))?
                }
                Comparator::Lt | Comparator::Ge => {
                    primitive(state, site, Comparator::Lt, (&operand, v), (&zero, z))?
                }
                Comparator::Gt | Comparator::Le => {
                    primitive(state, site, Comparator::Lt, (&zero, z), (&operand, v))?
                }
            }
        }
        JumpOp::IfCompare {
            comparator,
            site,
            left,
            right,
        } => {
            let (l, r) = {
                let stack = state.stack()?;
                let r = stack.pop_bv32()?;
                let l = stack.pop_bv32()?;
                (l, r)
            };
            let (lv, rv) = (*left as i64, *right as i64);
            match comparator {
                Comparator::Eq | Comparator::Ne => {
                    primitive(state, site, Comparator::Eq, (&l, lv), (&r, rv))?
                }
                Comparator::Lt | Comparator::Ge => {
                    primitive(state, site, Comparator::Lt, (&l, lv), (&r, rv))?
                }
                Comparator::Gt | Comparator::Le => {
                    primitive(state, site, Comparator::Lt, (&r, rv), (&l, lv))?
                }
            }
        }
        JumpOp::IfReferenceCompare { left, right } => {
            let (l, r) = {
                let stack = state.stack()?;
                let r = stack.pop_ref()?;
                let l = stack.pop_ref()?;
                (l, r)
            };
            state.heap.initialize_reference(left.as_ref(), &l);
            state.heap.initialize_reference(right.as_ref(), &r);
        }
        JumpOp::IfNull { value } => {
            let reference = state.stack()?.pop_ref()?;
            state.heap.initialize_reference(value.as_ref(), &reference);
        }
        JumpOp::TableSwitch {
            site,
            value,
            min,
            max,
        } => {
            switch(state, site, *value, *min..=*max)?;
        }
        JumpOp::LookupSwitch { site, value, keys } => {
            let mut labels = keys.clone();
            labels.sort_unstable();
            switch(state, site, *value, labels)?;
        }
        JumpOp::Throw => {
            state.stack()?.pop_ref()?;
        }
    }
    Ok(())
}

/// Records one of the two branch primitives, `left == right` or
/// `left < right`, in the direction the concrete operands took.
fn primitive(
    state: &mut SymbolicState,
    site: &BranchSite,
    comparator: Comparator,
    (left, left_value): (&ExprRef, i64),
    (right, right_value): (&ExprRef, i64),
) -> ExecutionResult<()> {
    let held = comparator.evaluate(Some(left_value.cmp(&right_value)));
    let comparator = if held {
        comparator
    } else {
        comparator.negate()
    };
    trace!("branch {} {} {} {}", site, left, comparator, right);
    state.path.append_branch(
        site.clone(),
        constraint(left, comparator, right),
        BranchDiscriminator::Bool(held),
    )?;
    Ok(())
}

/// Labels are visited in ascending order and the walk stops at the selected
/// one. Every label checked before it contributes a `!=` side condition.
/// Falling through to the default commits the last `!=` as the branch itself.
fn switch<I>(
    state: &mut SymbolicState,
    site: &BranchSite,
    value: i32,
    labels: I,
) -> ExecutionResult<()>
where
    I: IntoIterator<Item = i32>,
{
    let operand = state.stack()?.pop_bv32()?;
    if !operand.contains_variable() {
        return Ok(());
    }
    let mut labels = labels.into_iter().peekable();
    while let Some(label) = labels.next() {
        let label_expr = build_integer(label as i64);
        if label == value {
            state.path.append_branch(
                site.clone(),
                eq(&operand, &label_expr),
                BranchDiscriminator::Label(label),
            )?;
            return Ok(());
        }
        if labels.peek().is_none() {
            state.path.append_branch(
                site.clone(),
                ne(&operand, &label_expr),
                BranchDiscriminator::Default,
            )?;
            return Ok(());
        }
        state.path.append_supporting(ne(&operand, &label_expr))?;
    }
    Ok(())
}
