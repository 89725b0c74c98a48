use crate::executor::callback::LocalOp;
use crate::executor::error::{ExecutionResult, StackError};
use crate::executor::expression_factory::{add, build_integer};
use crate::executor::operand_stack::Operand;
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::symbolic_value::Sort;
use crate::pop_sorted;

pub fn handle_local(state: &mut SymbolicState, op: &LocalOp) -> ExecutionResult<()> {
    let frame = state.top_frame_mut()?;
    match op {
        LocalOp::Load { sort, index } => {
            let operand = frame.locals.get(*index)?.clone();
            let expected = Operand::of_sort(*sort, operand.expression().clone());
            if std::mem::discriminant(&expected) != std::mem::discriminant(&operand) {
                return Err(StackError::KindMismatch {
                    expected: expected.kind_name(),
                    found: operand.kind_name(),
                }
                .into());
            }
            frame.operand_stack.push(operand);
        }
        LocalOp::Store { sort, index } => {
            let value = pop_sorted!(frame.operand_stack, *sort)?;
            frame.locals.set(*index, Operand::of_sort(*sort, value))?;
        }
        LocalOp::Increment { index, delta } => {
            let current = match frame.locals.get(*index)? {
                Operand::Bv32(e) => e.clone(),
                other => {
                    return Err(StackError::KindMismatch {
                        expected: "bv32",
                        found: other.kind_name(),
                    }
                    .into())
                }
            };
            let updated = add(Sort::Int32, &build_integer(*delta as i64), &current)?;
            frame.locals.set(*index, Operand::Bv32(updated))?;
        }
    }
    Ok(())
}
