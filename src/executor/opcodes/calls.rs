use std::sync::Arc;

use log::{debug, trace};

use crate::executor::callback::CallOp;
use crate::executor::concrete::{ConcreteValue, ObjectRef, JAVA_LANG_STRING};
use crate::executor::descriptor::MethodDescriptor;
use crate::executor::error::ExecutionResult;
use crate::executor::expression_factory::{integer_variable, real_variable, string_variable};
use crate::executor::frame::{Frame, FrameKind};
use crate::executor::opcodes::stack::constant_operand;
use crate::executor::operand_stack::Operand;
use crate::executor::symbolic_function::{FunctionCall, SymbolicFunction};
use crate::executor::symbolic_heap::STRING_VALUE_FIELD;
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::symbolic_value::{ExprRef, Sort};
use crate::executor::type_registry::{CONSTRUCTOR_NAME, STATIC_INITIALIZER_NAME};
use crate::pop_sorted;

/// Type of the exception object a handler starts with.
const THROWABLE: &str = "java.lang.Throwable";

pub fn handle_call(state: &mut SymbolicState, op: &CallOp) -> ExecutionResult<()> {
    match op {
        CallOp::InvokeStatic {
            owner,
            name,
            descriptor,
        } => {
            let instrumented = targets_instrumented(state, owner, name, descriptor)?;
            state.top_frame_mut()?.invoke(false, instrumented);
        }
        CallOp::InvokeSpecial {
            owner,
            name,
            descriptor,
        } => {
            let instrumented = if name == CONSTRUCTOR_NAME {
                !state.registry.is_ignored(owner)
            } else {
                targets_instrumented(state, owner, name, descriptor)?
            };
            state.top_frame_mut()?.invoke(true, instrumented);
        }
        CallOp::InvokeVirtual {
            owner,
            name,
            descriptor,
            receiver,
        }
        | CallOp::InvokeInterface {
            owner,
            name,
            descriptor,
            receiver,
        } => invoke_dynamic(state, owner, name, descriptor, receiver.as_ref())?,
        CallOp::CallerStackParam { nr, value } => {
            let frame = state.frames.top_mut()?;
            let position = frame.next_stack_param();
            trace!("boundary parameter {} at depth {}", position, nr);
            if let Operand::Ref(reference) = frame.operand_stack.peek(*nr)? {
                let reference = reference.clone();
                state.heap.initialize_reference(value.as_object(), &reference);
            }
        }
        CallOp::MethodBegin {
            owner,
            name,
            descriptor,
        } => method_begin(state, owner, name, descriptor)?,
        CallOp::MethodMaxs {
            owner,
            name,
            descriptor,
            max_locals,
        } => {
            if name != STATIC_INITIALIZER_NAME {
                let member = state.registry.resolve_member(owner, name, descriptor)?;
                state.registry.record_max_locals(member, *max_locals);
            }
        }
        CallOp::MethodBeginReceiver { receiver } => {
            if entered_from_instrumented(state)? {
                return Ok(());
            }
            let frame = state.frames.top_mut()?;
            match frame.locals.get(0) {
                Ok(Operand::Ref(this)) => {
                    let this = this.clone();
                    state.heap.initialize_reference(Some(receiver), &this);
                }
                _ => {
                    let this = state.heap.get_reference(Some(receiver));
                    frame.locals.set(0, Operand::Ref(this))?;
                }
            }
        }
        CallOp::MethodBeginParam { nr, index, value } => {
            if entered_from_instrumented(state)? {
                return Ok(());
            }
            trace!("parameter {} -> local {}", nr, index);
            let operand = constant_operand(&mut state.heap, value);
            state.locals()?.set(*index, operand)?;
        }
        CallOp::MethodBeginSymbolicParam {
            nr,
            index,
            value,
            name,
        } => {
            if entered_from_instrumented(state)? {
                return Ok(());
            }
            debug!("symbolic parameter {} `{}` -> local {}", nr, name, index);
            let operand = symbolic_input(state, name, value)?;
            state.locals()?.set(*index, operand)?;
        }
        CallOp::Return { sort } => method_return(state, *sort)?,
        CallOp::CallResult {
            owner,
            name,
            descriptor,
            value,
        } => {
            if state.top_frame()?.invoked_instrumented() {
                return Ok(());
            }
            let parsed = MethodDescriptor::parse(descriptor)?;
            let modelled = match SymbolicFunction::lookup(owner, name, descriptor) {
                Some(function) => call_function(state, function, owner, &parsed, value.as_ref())?,
                None => None,
            };
            let result = match modelled {
                Some(result) => Some(result),
                None => value.as_ref().map(|v| constant_operand(&mut state.heap, v)),
            };
            let frame = state.frames.top_mut()?;
            frame.dispose_invoke_args(&parsed)?;
            if let Some(result) = result {
                frame.operand_stack.push(result);
            }
        }
        CallOp::HandlerBegin {
            owner,
            name,
            descriptor,
        } => handler_begin(state, owner, name, descriptor)?,
    }
    Ok(())
}

/// Runs a library model over the arguments still on the caller's stack. A
/// modelled result whose shadow disagrees with the observed value is dropped
/// in favour of the concrete result.
fn call_function(
    state: &mut SymbolicState,
    function: SymbolicFunction,
    owner: &str,
    descriptor: &MethodDescriptor,
    value: Option<&ConcreteValue>,
) -> ExecutionResult<Option<Operand>> {
    let frame = state.frames.top()?;
    let count = descriptor.params.len();
    let args = (0..count)
        .map(|i| frame.operand_stack.peek(count - 1 - i).cloned())
        .collect::<Result<Vec<Operand>, _>>()?;
    let receiver = if frame.invoke_needs_this() {
        Some(frame.operand_stack.peek(count)?.expression().clone())
    } else {
        None
    };
    let call = FunctionCall {
        owner,
        receiver: receiver.as_ref(),
        args: &args,
        result: value,
    };
    let result = function.execute(&mut state.heap, &call)?;
    match (result, value) {
        (Some(result), Some(observed))
            if !matches!(observed, ConcreteValue::Ref(_))
                && !result.expression().concrete().same_value(&observed.shadow()) =>
        {
            debug!(
                "model of {} yields {}, observed {}; using the observed value",
                owner,
                result.expression().concrete(),
                observed.shadow()
            );
            Ok(None)
        }
        (result, _) => Ok(result),
    }
}

/// Whether a call to `owner.name` lands in instrumented code. Ignored classes
/// nobody described are taken as uninstrumented without resolution.
fn targets_instrumented(
    state: &SymbolicState,
    owner: &str,
    name: &str,
    descriptor: &str,
) -> ExecutionResult<bool> {
    let registry = &state.registry;
    if registry.is_ignored(owner) && !registry.contains(owner) {
        return Ok(false);
    }
    let member = registry.resolve_member(owner, name, descriptor)?;
    Ok(registry.is_instrumented(&member))
}

fn invoke_dynamic(
    state: &mut SymbolicState,
    owner: &str,
    name: &str,
    descriptor: &str,
    receiver: Option<&ObjectRef>,
) -> ExecutionResult<()> {
    let params = MethodDescriptor::parse(descriptor)?.params.len();
    state.top_frame_mut()?.invoke(true, false);

    if let Operand::Ref(reference) = state.stack()?.peek(params)? {
        let reference = reference.clone();
        state.heap.initialize_reference(receiver, &reference);
    }
    let receiver = match receiver {
        Some(r) => r,
        None => return Ok(()),
    };

    let lookup = if state.registry.contains(receiver.type_name()) {
        receiver.type_name().to_string()
    } else {
        owner.to_string()
    };
    let instrumented = targets_instrumented(state, &lookup, name, descriptor)?;
    state.top_frame_mut()?.set_invoked_instrumented(instrumented);
    Ok(())
}

/// Whether the current frame was entered by a call the caller's shadow
/// already accounted for.
fn entered_from_instrumented(state: &SymbolicState) -> ExecutionResult<bool> {
    Ok(state.frames.caller()?.invoked_instrumented())
}

fn method_begin(
    state: &mut SymbolicState,
    owner: &str,
    name: &str,
    descriptor: &str,
) -> ExecutionResult<()> {
    if name == STATIC_INITIALIZER_NAME {
        let frame = Frame::static_initializer(owner, state.setting.max_locals_default);
        state.frames.push(frame);
        return Ok(());
    }

    let member = state.registry.resolve_member(owner, name, descriptor)?;
    let max_locals = state
        .registry
        .max_locals(&member)
        .unwrap_or(state.setting.max_locals_default);
    let mut frame = Frame::method(member.clone(), max_locals);

    let caller = state.frames.top()?;
    if !caller.invoked_instrumented() {
        if member.is_constructor() {
            frame
                .locals
                .set(0, Operand::Ref(state.heap.new_reference(owner)))?;
        }
        state.frames.push(frame);
        return Ok(());
    }

    let params = MethodDescriptor::parse(&member.descriptor)?.params;
    let needs_this = caller.invoke_needs_this();
    let mut index = needs_this as usize;
    for (i, param) in params.iter().enumerate() {
        let operand = caller.operand_stack.peek(params.len() - 1 - i)?.clone();
        frame.locals.set(index, operand)?;
        index += param.slots();
    }
    if needs_this {
        let this = caller.operand_stack.peek(params.len())?.clone();
        frame.locals.set(0, this)?;
    }
    trace!("entering {} with {} locals", member, frame.locals.len());
    state.frames.push(frame);
    Ok(())
}

fn method_return(state: &mut SymbolicState, sort: Option<Sort>) -> ExecutionResult<()> {
    let mut frame = state.frames.pop()?;
    if frame.kind == FrameKind::StaticInitializer {
        return Ok(());
    }
    let result = match sort {
        Some(sort) => Some(Operand::of_sort(
            sort,
            pop_sorted!(frame.operand_stack, sort)?,
        )),
        None => None,
    };

    let caller = state.frames.top_mut()?;
    if !caller.invoked_instrumented() {
        return Ok(());
    }
    if let Some(member) = &frame.member {
        caller.dispose_invoke_args(&MethodDescriptor::parse(&member.descriptor)?)?;
    }
    if let Some(result) = result {
        caller.operand_stack.push(result);
    }
    Ok(())
}

/// Named input bound to a parameter. Strings become string variables held
/// in the object's `$stringValue` field.
fn symbolic_input(
    state: &mut SymbolicState,
    name: &str,
    value: &ConcreteValue,
) -> ExecutionResult<Operand> {
    let operand = match value {
        ConcreteValue::Int(v) => Operand::Bv32(integer_variable(name, Sort::Int32, *v as i64)),
        ConcreteValue::Long(v) => Operand::Bv64(integer_variable(name, Sort::Int64, *v)),
        ConcreteValue::Float(v) => Operand::Fp32(real_variable(name, Sort::Real32, *v as f64)),
        ConcreteValue::Double(v) => Operand::Fp64(real_variable(name, Sort::Real64, *v)),
        ConcreteValue::Ref(obj) => {
            let reference = state.heap.get_reference(obj.as_ref());
            if let Some(text) = obj.as_ref().and_then(|o| o.string_value()) {
                let contents = string_variable(name, text);
                state
                    .heap
                    .put_field(JAVA_LANG_STRING, STRING_VALUE_FIELD, &reference, &contents)?;
            }
            Operand::Ref(reference)
        }
    };
    Ok(operand)
}

fn handler_begin(
    state: &mut SymbolicState,
    owner: &str,
    name: &str,
    descriptor: &str,
) -> ExecutionResult<()> {
    let owner_name: Arc<str> = Arc::from(owner);
    let is_class_init = |f: &Frame| {
        f.kind == FrameKind::StaticInitializer && f.class_name.as_ref() == Some(&owner_name)
    };

    let (discarded, found) = if name == STATIC_INITIALIZER_NAME {
        state.frames.discard_until(is_class_init)
    } else {
        let member = state.registry.resolve_member(owner, name, descriptor)?;
        let is_constructor = name == CONSTRUCTOR_NAME;
        state.frames.discard_until(|f| {
            f.member.as_ref() == Some(&member) || (is_constructor && is_class_init(f))
        })
    };
    debug!(
        "handler in {}.{}: unwound {} frame(s){}",
        owner,
        name,
        discarded,
        if found { "" } else { ", reached bottom" }
    );

    let exception: ExprRef = state.heap.new_reference(THROWABLE);
    let stack = state.stack()?;
    stack.clear();
    stack.push_ref(exception);
    Ok(())
}
