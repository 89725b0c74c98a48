use std::sync::Arc;

use log::{debug, trace};

use crate::executor::callback::HeapOp;
use crate::executor::concrete::{ConcreteValue, ObjectRef, JAVA_LANG_STRING};
use crate::executor::error::ExecutionResult;
use crate::executor::expression_factory::{build_integer, build_string, concat, ge, lt};
use crate::executor::operand_stack::Operand;
use crate::executor::symbolic_heap::{ARRAY_LENGTH_FIELD, ARRAY_OWNER, STRING_VALUE_FIELD};
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::symbolic_value::{Concrete, ExprRef, Sort};

/// Placeholder marking an argument position in a concatenation recipe.
const RECIPE_ARGUMENT: char = '\u{1}';

pub fn handle_heap(state: &mut SymbolicState, op: &HeapOp) -> ExecutionResult<()> {
    match op {
        HeapOp::New { type_name } => {
            let reference = state.heap.new_reference(type_name);
            state.stack()?.push_ref(reference);
        }
        HeapOp::NewArray { type_name, length } => {
            let length_expr = state.stack()?.pop_bv32()?;
            if !check_length(state, &length_expr, *length)? {
                return Ok(());
            }
            let array = state.heap.new_reference(type_name);
            state
                .heap
                .put_field(ARRAY_OWNER, ARRAY_LENGTH_FIELD, &array, &length_expr)?;
            state.stack()?.push_ref(array);
        }
        HeapOp::MultiNewArray { type_name, lengths } => {
            let mut length_exprs = Vec::with_capacity(lengths.len());
            for _ in lengths {
                length_exprs.push(state.stack()?.pop_bv32()?);
            }
            length_exprs.reverse();
            for (expr, length) in length_exprs.iter().zip(lengths) {
                if !check_length(state, expr, *length)? {
                    return Ok(());
                }
            }
            let array = state.heap.new_reference(type_name);
            if let Some(outer) = length_exprs.first() {
                state
                    .heap
                    .put_field(ARRAY_OWNER, ARRAY_LENGTH_FIELD, &array, outer)?;
            }
            state.stack()?.push_ref(array);
        }
        HeapOp::ArrayLength { array } => {
            let reference = state.stack()?.pop_ref()?;
            let array = match bind(state, array.as_ref(), &reference) {
                Some(a) => a,
                None => return Ok(()),
            };
            let length = array_length(state, &reference, &array)?;
            state.stack()?.push_bv32(length);
        }
        HeapOp::ArrayLoad {
            sort,
            array,
            index,
            value,
        } => {
            let (reference, index_expr) = {
                let stack = state.stack()?;
                let index_expr = stack.pop_bv32()?;
                (stack.pop_ref()?, index_expr)
            };
            let array = match bind(state, array.as_ref(), &reference) {
                Some(a) => a,
                None => return Ok(()),
            };
            if !check_index(state, &reference, &array, &index_expr, *index)? {
                return Ok(());
            }
            let element = match value {
                ConcreteValue::Ref(obj) => state.heap.get_reference(obj.as_ref()),
                _ => state.heap.array_load(&reference, *index, value.shadow())?,
            };
            state.stack()?.push(Operand::of_sort(*sort, element));
        }
        HeapOp::ArrayStore { array, index } => {
            let (reference, index_expr, element) = {
                let stack = state.stack()?;
                let element = stack.pop_operand()?;
                let index_expr = stack.pop_bv32()?;
                (stack.pop_ref()?, index_expr, element)
            };
            let array = match bind(state, array.as_ref(), &reference) {
                Some(a) => a,
                None => return Ok(()),
            };
            if check_index(state, &reference, &array, &index_expr, *index)? {
                state
                    .heap
                    .array_store(&reference, *index, element.expression())?;
            }
        }
        HeapOp::GetField {
            owner,
            name,
            receiver,
            value,
        } => {
            let reference = state.stack()?.pop_ref()?;
            if bind(state, receiver.as_ref(), &reference).is_none() {
                return Ok(());
            }
            let declaring = declaring_class(state, owner, name)?;
            let loaded = match value {
                ConcreteValue::Ref(obj) => state.heap.get_reference(obj.as_ref()),
                _ => state
                    .heap
                    .get_field(&declaring, name, &reference, value.shadow())?,
            };
            state.stack()?.push(Operand::of_sort(value.sort(), loaded));
        }
        HeapOp::PutField {
            owner,
            name,
            receiver,
        } => {
            let (reference, stored) = {
                let stack = state.stack()?;
                let stored = stack.pop_operand()?;
                (stack.pop_ref()?, stored)
            };
            if bind(state, receiver.as_ref(), &reference).is_none() {
                return Ok(());
            }
            let declaring = declaring_class(state, owner, name)?;
            state
                .heap
                .put_field(&declaring, name, &reference, stored.expression())?;
        }
        HeapOp::GetStatic { owner, name, value } => {
            let declaring = declaring_class(state, owner, name)?;
            let loaded = match value {
                ConcreteValue::Ref(obj) => state.heap.get_reference(obj.as_ref()),
                _ => state.heap.get_static(&declaring, name, value.shadow()),
            };
            state.stack()?.push(Operand::of_sort(value.sort(), loaded));
        }
        HeapOp::PutStatic { owner, name } => {
            let stored = state.stack()?.pop_operand()?;
            let declaring = declaring_class(state, owner, name)?;
            state.heap.put_static(&declaring, name, stored.expression());
        }
        HeapOp::StringConcat { result, recipe } => string_concat(state, result, recipe)?,
    }
    Ok(())
}

/// Binds `reference` to the observed object. A null object means the access
/// faulted and nothing more is recorded.
fn bind(
    state: &mut SymbolicState,
    object: Option<&ObjectRef>,
    reference: &ExprRef,
) -> Option<ObjectRef> {
    state.heap.initialize_reference(object, reference);
    object.cloned()
}

/// Fields of uninstrumented classes nobody described are keyed by the
/// static owner; everything else by the declaring class.
fn declaring_class(state: &SymbolicState, owner: &str, name: &str) -> ExecutionResult<Arc<str>> {
    let registry = &state.registry;
    if registry.is_ignored(owner) && !registry.contains(owner) {
        return Ok(Arc::from(owner));
    }
    Ok(registry.resolve_field(owner, name)?)
}

fn array_length(
    state: &mut SymbolicState,
    reference: &ExprRef,
    array: &ObjectRef,
) -> ExecutionResult<ExprRef> {
    let observed = Concrete::Integer(array.array_length().unwrap_or(0) as i64);
    state
        .heap
        .get_field(ARRAY_OWNER, ARRAY_LENGTH_FIELD, reference, observed)
}

/// Records `length >= 0`, or `length < 0` when the allocation faulted.
fn check_length(state: &mut SymbolicState, length_expr: &ExprRef, length: i32) -> ExecutionResult<bool> {
    let zero = build_integer(0);
    if length < 0 {
        state.path.append_supporting(lt(length_expr, &zero))?;
        return Ok(false);
    }
    state.path.append_supporting(ge(length_expr, &zero))?;
    Ok(true)
}

/// Records the bounds checks of an array access in evaluation order and
/// returns whether the access succeeded.
fn check_index(
    state: &mut SymbolicState,
    reference: &ExprRef,
    array: &ObjectRef,
    index_expr: &ExprRef,
    index: i32,
) -> ExecutionResult<bool> {
    let zero = build_integer(0);
    if index < 0 {
        state.path.append_supporting(lt(index_expr, &zero))?;
        return Ok(false);
    }
    state.path.append_supporting(ge(index_expr, &zero))?;

    let length = array_length(state, reference, array)?;
    if index as i64 >= length.integer_value().unwrap_or(0) {
        state.path.append_supporting(ge(index_expr, &length))?;
        return Ok(false);
    }
    state.path.append_supporting(lt(index_expr, &length))?;
    Ok(true)
}

/// Symbolic contents of one concatenation argument, or `None` when it is an
/// object whose text cannot be tracked.
fn concat_piece(state: &mut SymbolicState, operand: &Operand) -> ExecutionResult<Option<ExprRef>> {
    let expr = operand.expression();
    if !matches!(operand, Operand::Ref(_)) || expr.is_null() {
        return Ok(Some(expr.clone()));
    }
    let object = expr.as_reference().and_then(|r| r.upgrade());
    match object.as_ref().and_then(|o| o.string_value()) {
        Some(text) => {
            let observed = Concrete::Str(text.clone());
            let value = state
                .heap
                .get_field(JAVA_LANG_STRING, STRING_VALUE_FIELD, expr, observed)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn string_concat(state: &mut SymbolicState, result: &ObjectRef, recipe: &str) -> ExecutionResult<()> {
    let arity = recipe.chars().filter(|c| *c == RECIPE_ARGUMENT).count();
    let mut args = Vec::with_capacity(arity);
    {
        let stack = state.stack()?;
        for _ in 0..arity {
            args.push(stack.pop_operand()?);
        }
    }
    args.reverse();

    let observed = result.string_value().cloned().unwrap_or_else(|| Arc::from(""));
    let mut text: Option<ExprRef> = None;
    let mut tracked = true;
    let mut args = args.into_iter();
    for (i, literal) in recipe.split(RECIPE_ARGUMENT).enumerate() {
        if i > 0 {
            let piece = match args.next() {
                Some(operand) => concat_piece(state, &operand)?,
                None => None,
            };
            match piece {
                Some(piece) => text = Some(append(text, &piece)?),
                None => tracked = false,
            }
        }
        if !literal.is_empty() {
            text = Some(append(text, &build_string(literal))?);
        }
    }

    let text = match text {
        Some(t) if tracked && t.concrete().same_value(&Concrete::Str(observed.clone())) => t,
        Some(t) => {
            debug!("untracked concatenation `{}`, keeping `{}`", t, observed);
            build_string(&observed)
        }
        None => build_string(&observed),
    };
    trace!("concat -> {}", text);

    let reference = state.heap.get_reference(Some(result));
    state
        .heap
        .put_field(JAVA_LANG_STRING, STRING_VALUE_FIELD, &reference, &text)?;
    state.stack()?.push(Operand::of_sort(Sort::Ref, reference));
    Ok(())
}

fn append(head: Option<ExprRef>, piece: &ExprRef) -> ExecutionResult<ExprRef> {
    match head {
        None if matches!(piece.concrete(), Concrete::Str(_)) => Ok(piece.clone()),
        None => concat(&build_string(""), piece),
        Some(head) => concat(&head, piece),
    }
}
