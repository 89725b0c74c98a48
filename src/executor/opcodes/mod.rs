#[macro_use]
pub mod op_macros;

pub mod arithmetic;
pub mod calls;
pub mod control;
pub mod heap;
pub mod locals;
pub mod stack;

use crate::executor::callback::Callback;
use crate::executor::error::ExecutionResult;
use crate::executor::symbolic_state::SymbolicState;

/// Applies one callback to the shadow state.
pub fn dispatch(state: &mut SymbolicState, callback: &Callback) -> ExecutionResult<()> {
    match callback {
        Callback::Arithmetic(op) => arithmetic::handle_arithmetic(state, op),
        Callback::Stack(op) => stack::handle_stack(state, op),
        Callback::Local(op) => locals::handle_local(state, op),
        Callback::Jump(op) => control::handle_jump(state, op),
        Callback::Heap(op) => heap::handle_heap(state, op),
        Callback::Call(op) => calls::handle_call(state, op),
    }
}
