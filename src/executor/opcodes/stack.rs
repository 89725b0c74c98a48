use crate::executor::callback::StackOp;
use crate::executor::concrete::ConcreteValue;
use crate::executor::error::ExecutionResult;
use crate::executor::expression_factory::{build_integer, build_real};
use crate::executor::operand_stack::{Operand, OperandStack};
use crate::executor::symbolic_heap::SymbolicHeap;
use crate::executor::symbolic_state::SymbolicState;

pub fn handle_stack(state: &mut SymbolicState, op: &StackOp) -> ExecutionResult<()> {
    match op {
        StackOp::Nop | StackOp::CheckCast => {}
        StackOp::Push(value) => {
            let operand = constant_operand(&mut state.heap, value);
            state.stack()?.push(operand);
        }
        StackOp::Pop => {
            state.stack()?.pop_slots(1)?;
        }
        StackOp::Pop2 => {
            state.stack()?.pop_slots(2)?;
        }
        StackOp::Dup => dup(state.stack()?, 1, 0)?,
        StackOp::DupX1 => dup(state.stack()?, 1, 1)?,
        StackOp::DupX2 => dup(state.stack()?, 1, 2)?,
        StackOp::Dup2 => dup(state.stack()?, 2, 0)?,
        StackOp::Dup2X1 => dup(state.stack()?, 2, 1)?,
        StackOp::Dup2X2 => dup(state.stack()?, 2, 2)?,
        StackOp::Swap => {
            let stack = state.stack()?;
            let top = stack.pop_slots(1)?;
            let below = stack.pop_slots(1)?;
            top.into_iter().chain(below).for_each(|o| stack.push(o));
        }
        StackOp::InstanceOf { result } => {
            let stack = state.stack()?;
            stack.pop_ref()?;
            stack.push_bv32(build_integer(*result as i64));
        }
        StackOp::MonitorEnter | StackOp::MonitorExit => {
            state.stack()?.pop_ref()?;
        }
    }
    Ok(())
}

/// Duplicates the top `words` slots and inserts the copy below the next
/// `below` slots. Covers every form of `dup`, `dup_x1`, `dup_x2`, `dup2`,
/// `dup2_x1` and `dup2_x2`; a double-word operand straddling a boundary is
/// an error.
pub fn dup(stack: &mut OperandStack, words: usize, below: usize) -> ExecutionResult<()> {
    let top = stack.pop_slots(words)?;
    let under = stack.pop_slots(below)?;
    for o in top.iter().cloned() {
        stack.push(o);
    }
    for o in under {
        stack.push(o);
    }
    for o in top {
        stack.push(o);
    }
    Ok(())
}

/// Symbolic constant for a pushed literal. References go through the
/// reference table so the same object keeps one symbolic reference.
pub fn constant_operand(heap: &mut SymbolicHeap, value: &ConcreteValue) -> Operand {
    match value {
        ConcreteValue::Int(v) => Operand::Bv32(build_integer(*v as i64)),
        ConcreteValue::Long(v) => Operand::Bv64(build_integer(*v)),
        ConcreteValue::Float(v) => Operand::Fp32(build_real(*v as f64)),
        ConcreteValue::Double(v) => Operand::Fp64(build_real(*v)),
        ConcreteValue::Ref(obj) => Operand::Ref(heap.get_reference(obj.as_ref())),
    }
}
