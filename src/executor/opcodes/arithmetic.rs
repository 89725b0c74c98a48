use log::trace;

use crate::executor::callback::ArithmeticOp;
use crate::executor::error::{ExecutionError, ExecutionResult};
use crate::executor::expression_factory::{
    add, bitwise, build_integer, build_real, cmp, div, eq, integer_to_real, mul, narrow, ne, neg,
    real_to_integer, rem, sub,
};
use crate::executor::operand_stack::Operand;
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::symbolic_value::{Expression, Operator, Sort};
use crate::{binary_op, pop_sorted, unary_op};

pub fn handle_arithmetic(state: &mut SymbolicState, op: &ArithmeticOp) -> ExecutionResult<()> {
    match op {
        ArithmeticOp::Binary { op, sort } => match op {
            Operator::Add => binary_op!(state, *sort, add),
            Operator::Sub => binary_op!(state, *sort, sub),
            Operator::Mul => binary_op!(state, *sort, mul),
            Operator::Div | Operator::Rem => divide(state, *op, *sort)?,
            Operator::Shl | Operator::Shr | Operator::UShr => shift(state, *op, *sort)?,
            Operator::And | Operator::Or | Operator::Xor => {
                let sort = *sort;
                let stack = state.stack()?;
                let right = pop_sorted!(stack, sort)?;
                let left = pop_sorted!(stack, sort)?;
                let result = bitwise(*op, sort, &left, &right)?;
                stack.push(Operand::of_sort(sort, result));
            }
            other => {
                return Err(ExecutionError::Protocol(format!(
                    "`{}` is not a binary arithmetic operator",
                    other.symbol()
                )))
            }
        },
        ArithmeticOp::Negate { sort } => unary_op!(state, *sort, neg),
        ArithmeticOp::Compare { sort } => {
            let sort = *sort;
            let stack = state.stack()?;
            let right = pop_sorted!(stack, sort)?;
            let left = pop_sorted!(stack, sort)?;
            stack.push_bv32(cmp(sort, &left, &right)?);
        }
        ArithmeticOp::Convert { from, to } => convert(state, *from, *to)?,
        ArithmeticOp::Narrow { op } => {
            let stack = state.stack()?;
            let operand = stack.pop_bv32()?;
            stack.push_bv32(narrow(*op, &operand)?);
        }
    }
    Ok(())
}

/// Integer division and remainder check the divisor concretely: a zero
/// divisor records `divisor == 0` and pushes nothing, any other divisor
/// records `divisor != 0`. Real division follows IEEE and is unchecked.
fn divide(state: &mut SymbolicState, op: Operator, sort: Sort) -> ExecutionResult<()> {
    let (left, right) = {
        let stack = state.stack()?;
        let right = pop_sorted!(stack, sort)?;
        let left = pop_sorted!(stack, sort)?;
        (left, right)
    };

    if sort.is_integer() {
        let zero = build_integer(0);
        if right.integer_value() == Some(0) {
            trace!("zero divisor {}", right);
            state.path.append_supporting(eq(&right, &zero))?;
            return Ok(());
        }
        state.path.append_supporting(ne(&right, &zero))?;
    }

    let result = if op == Operator::Div {
        div(sort, &left, &right)?
    } else {
        rem(sort, &left, &right)?
    };
    match result {
        Some(result) => state.stack()?.push(Operand::of_sort(sort, result)),
        None => {
            return Err(ExecutionError::Protocol(format!(
                "unchecked zero divisor {}",
                right
            )))
        }
    }
    Ok(())
}

fn shift(state: &mut SymbolicState, op: Operator, sort: Sort) -> ExecutionResult<()> {
    let stack = state.stack()?;
    let distance = stack.pop_bv32()?;
    let value = pop_sorted!(stack, sort)?;
    let result = bitwise(op, sort, &value, &distance)?;
    stack.push(Operand::of_sort(sort, result));
    Ok(())
}

fn convert(state: &mut SymbolicState, from: Sort, to: Sort) -> ExecutionResult<()> {
    let stack = state.stack()?;
    let operand = pop_sorted!(stack, from)?;
    let result = match (from.is_integer(), to.is_integer()) {
        (true, true) => {
            if to == Sort::Int32 && from == Sort::Int64 {
                narrow(Operator::ToInt, &operand)?
            } else {
                operand
            }
        }
        (true, false) => integer_to_real(&operand, to)?,
        (false, true) => real_to_integer(&operand, to)?,
        (false, false) => match operand.as_ref() {
            Expression::Constant(_) if to == Sort::Real32 => {
                let v = operand.real_value().unwrap_or(0.0);
                build_real((v as f32) as f64)
            }
            _ => operand,
        },
    };
    stack.push(Operand::of_sort(to, result));
    Ok(())
}
