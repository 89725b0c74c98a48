#![allow(dead_code)]

use concolic::executor::callback::{ArithmeticOp, CallOp, Callback, JumpOp, LocalOp, StackOp};
use concolic::executor::concrete::ConcreteValue;
use concolic::executor::path_condition::BranchSite;
use concolic::executor::symbolic_execution::SymbolicExecutor;
use concolic::executor::symbolic_setting::{
    get_default_setting_for_concolic_execution, ExecutorSetting,
};
use concolic::executor::symbolic_value::{Comparator, ExprRef, Operator, Sort};
use concolic::executor::type_registry::{ClassInfo, TypeRegistry};

pub const MAIN: &str = "demo.Main";

pub fn main_class() -> ClassInfo {
    ClassInfo::new(MAIN)
        .with_method("check", "(I)V", true)
        .with_method("pair", "(II)V", true)
        .with_method("twice", "(J)J", true)
        .with_method("scale", "(ID)D", true)
        .with_method("describe", "(Ljava/lang/String;)Ljava/lang/String;", true)
        .with_method("update", "(I)V", false)
        .with_native_method("hash", "(I)I", true)
        .with_field("count", "I", false)
        .with_field("total", "J", true)
        .with_constructor("()V")
}

pub fn executor_with(classes: Vec<ClassInfo>, setting: ExecutorSetting) -> SymbolicExecutor {
    let mut registry = TypeRegistry::new(setting.ignored_prefixes.clone());
    for class in classes {
        registry.register(class);
    }
    SymbolicExecutor::new(registry, setting)
}

pub fn executor() -> SymbolicExecutor {
    executor_with(vec![main_class()], get_default_setting_for_concolic_execution())
}

pub fn site(index: i32) -> BranchSite {
    BranchSite::new(MAIN, "check", index)
}

/// Enters `MAIN.name` from uninstrumented code and binds its parameters as
/// named symbolic inputs, starting at local 0.
pub fn enter(sexe: &mut SymbolicExecutor, name: &str, descriptor: &str, inputs: &[(&str, ConcreteValue)]) {
    assert!(sexe.handle(&Callback::Call(CallOp::MethodBegin {
        owner: MAIN.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    })));
    let mut index = 0;
    for (nr, (input, value)) in inputs.iter().enumerate() {
        assert!(sexe.handle(&Callback::Call(CallOp::MethodBeginSymbolicParam {
            nr,
            index,
            value: value.clone(),
            name: input.to_string(),
        })));
        index += if value.is_double_word() { 2 } else { 1 };
    }
}

pub fn run(sexe: &mut SymbolicExecutor, callbacks: &[Callback]) {
    for (i, c) in callbacks.iter().enumerate() {
        assert!(
            sexe.handle(c),
            "callback #{} {:?} failed: {:?}",
            i,
            c,
            sexe.first_error()
        );
    }
}

pub fn push_int(v: i32) -> Callback {
    Callback::Stack(StackOp::Push(ConcreteValue::Int(v)))
}

pub fn push_long(v: i64) -> Callback {
    Callback::Stack(StackOp::Push(ConcreteValue::Long(v)))
}

pub fn push_double(v: f64) -> Callback {
    Callback::Stack(StackOp::Push(ConcreteValue::Double(v)))
}

pub fn push(value: ConcreteValue) -> Callback {
    Callback::Stack(StackOp::Push(value))
}

pub fn stack(op: StackOp) -> Callback {
    Callback::Stack(op)
}

pub fn load(sort: Sort, index: usize) -> Callback {
    Callback::Local(LocalOp::Load { sort, index })
}

pub fn store(sort: Sort, index: usize) -> Callback {
    Callback::Local(LocalOp::Store { sort, index })
}

pub fn binary(op: Operator, sort: Sort) -> Callback {
    Callback::Arithmetic(ArithmeticOp::Binary { op, sort })
}

pub fn arithmetic(op: ArithmeticOp) -> Callback {
    Callback::Arithmetic(op)
}

pub fn if_zero(comparator: Comparator, index: i32, value: i32) -> Callback {
    Callback::Jump(JumpOp::If {
        comparator,
        site: site(index),
        value,
    })
}

pub fn if_compare(comparator: Comparator, index: i32, left: i32, right: i32) -> Callback {
    Callback::Jump(JumpOp::IfCompare {
        comparator,
        site: site(index),
        left,
        right,
    })
}

pub fn jump(op: JumpOp) -> Callback {
    Callback::Jump(op)
}

/// Expression on top of the current operand stack.
pub fn top(sexe: &mut SymbolicExecutor) -> ExprRef {
    sexe.cur_state
        .stack()
        .unwrap()
        .peek(0)
        .unwrap()
        .expression()
        .clone()
}

pub fn pending(sexe: &SymbolicExecutor) -> Vec<String> {
    sexe.cur_state
        .path
        .pending_supporting()
        .iter()
        .map(|c| c.to_string())
        .collect()
}
