//! Symbolic models of uninstrumented library calls.
//!
//! A call into code the executor does not trace normally yields a fresh
//! constant. For the members listed here the result is rebuilt from the
//! symbolic arguments instead, so that e.g. `Integer.valueOf(x).intValue()`
//! still depends on `x`.

use lazy_static::lazy_static;
use log::trace;
use rustc_hash::FxHashMap;

use crate::executor::concrete::ConcreteValue;
use crate::executor::error::{ExecutionError, ExecutionResult};
use crate::executor::expression_factory::{abs, min_max};
use crate::executor::operand_stack::Operand;
use crate::executor::symbolic_heap::SymbolicHeap;
use crate::executor::symbolic_value::{ExprRef, Operator, Sort};
use crate::executor::type_registry::CONSTRUCTOR_NAME;

const JAVA_LANG_MATH: &str = "java.lang.Math";

/// A boxed primitive class and the synthetic field holding its value.
struct Wrapper {
    class_name: &'static str,
    primitive: &'static str,
    field: &'static str,
    unbox: &'static str,
    sort: Sort,
}

const WRAPPERS: [Wrapper; 8] = [
    Wrapper {
        class_name: "java.lang.Integer",
        primitive: "I",
        field: "$intValue",
        unbox: "intValue",
        sort: Sort::Int32,
    },
    Wrapper {
        class_name: "java.lang.Long",
        primitive: "J",
        field: "$longValue",
        unbox: "longValue",
        sort: Sort::Int64,
    },
    Wrapper {
        class_name: "java.lang.Float",
        primitive: "F",
        field: "$floatValue",
        unbox: "floatValue",
        sort: Sort::Real32,
    },
    Wrapper {
        class_name: "java.lang.Double",
        primitive: "D",
        field: "$doubleValue",
        unbox: "doubleValue",
        sort: Sort::Real64,
    },
    Wrapper {
        class_name: "java.lang.Short",
        primitive: "S",
        field: "$shortValue",
        unbox: "shortValue",
        sort: Sort::Int32,
    },
    Wrapper {
        class_name: "java.lang.Byte",
        primitive: "B",
        field: "$byteValue",
        unbox: "byteValue",
        sort: Sort::Int32,
    },
    Wrapper {
        class_name: "java.lang.Character",
        primitive: "C",
        field: "$charValue",
        unbox: "charValue",
        sort: Sort::Int32,
    },
    Wrapper {
        class_name: "java.lang.Boolean",
        primitive: "Z",
        field: "$booleanValue",
        unbox: "booleanValue",
        sort: Sort::Int32,
    },
];

/// `java.lang.Math` members with a direct operator counterpart.
const MATH: [(&str, &str, Sort); 12] = [
    ("abs", "(I)I", Sort::Int32),
    ("abs", "(J)J", Sort::Int64),
    ("abs", "(F)F", Sort::Real32),
    ("abs", "(D)D", Sort::Real64),
    ("min", "(II)I", Sort::Int32),
    ("min", "(JJ)J", Sort::Int64),
    ("min", "(FF)F", Sort::Real32),
    ("min", "(DD)D", Sort::Real64),
    ("max", "(II)I", Sort::Int32),
    ("max", "(JJ)J", Sort::Int64),
    ("max", "(FF)F", Sort::Real32),
    ("max", "(DD)D", Sort::Real64),
];

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct FunctionKey {
    owner: String,
    name: String,
    descriptor: String,
}

impl FunctionKey {
    fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        FunctionKey {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

/// What a modelled call does to the symbolic state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolicFunction {
    /// Boxing constructor: the argument goes into the receiver's `field`.
    BoxInit { field: &'static str },
    /// Static boxing factory: the argument goes into the returned object's `field`.
    ValueOf { field: &'static str },
    /// Unboxing accessor: the result is read back from the receiver's `field`.
    Unbox { field: &'static str, sort: Sort },
    Abs(Sort),
    MinMax(Operator, Sort),
}

lazy_static! {
    static ref SYMBOLIC_FUNCTIONS: FxHashMap<FunctionKey, SymbolicFunction> = {
        let mut table = FxHashMap::default();
        for w in WRAPPERS.iter() {
            let internal = w.class_name.replace('.', "/");
            table.insert(
                FunctionKey::new(w.class_name, CONSTRUCTOR_NAME, &format!("({})V", w.primitive)),
                SymbolicFunction::BoxInit { field: w.field },
            );
            table.insert(
                FunctionKey::new(
                    w.class_name,
                    "valueOf",
                    &format!("({})L{};", w.primitive, internal),
                ),
                SymbolicFunction::ValueOf { field: w.field },
            );
            table.insert(
                FunctionKey::new(w.class_name, w.unbox, &format!("(){}", w.primitive)),
                SymbolicFunction::Unbox {
                    field: w.field,
                    sort: w.sort,
                },
            );
        }
        for (name, descriptor, sort) in MATH.iter() {
            let function = match *name {
                "abs" => SymbolicFunction::Abs(*sort),
                "min" => SymbolicFunction::MinMax(Operator::Min, *sort),
                _ => SymbolicFunction::MinMax(Operator::Max, *sort),
            };
            table.insert(FunctionKey::new(JAVA_LANG_MATH, name, descriptor), function);
        }
        table
    };
}

/// Operands of a finished uninstrumented call, still on the caller's stack.
pub struct FunctionCall<'a> {
    pub owner: &'a str,
    pub receiver: Option<&'a ExprRef>,
    /// Arguments in declaration order.
    pub args: &'a [Operand],
    pub result: Option<&'a ConcreteValue>,
}

impl<'a> FunctionCall<'a> {
    fn arg(&self, i: usize) -> ExecutionResult<&'a ExprRef> {
        self.args
            .get(i)
            .map(|a| a.expression())
            .ok_or_else(|| ExecutionError::ExpressionKind {
                expected: "call argument",
                found: format!("{} argument(s)", self.args.len()),
            })
    }

    fn receiver(&self) -> ExecutionResult<&'a ExprRef> {
        self.receiver.ok_or_else(|| ExecutionError::ExpressionKind {
            expected: "call receiver",
            found: "static call".to_string(),
        })
    }
}

impl SymbolicFunction {
    pub fn lookup(owner: &str, name: &str, descriptor: &str) -> Option<SymbolicFunction> {
        SYMBOLIC_FUNCTIONS
            .get(&FunctionKey::new(owner, name, descriptor))
            .copied()
    }

    /// Symbolic result of the call, or `None` when the call yields nothing
    /// the caller should push beyond the concrete result.
    pub fn execute(
        &self,
        heap: &mut SymbolicHeap,
        call: &FunctionCall<'_>,
    ) -> ExecutionResult<Option<Operand>> {
        trace!("modelling {}: {:?}", call.owner, self);
        let operand = match *self {
            SymbolicFunction::BoxInit { field } => {
                heap.put_field(call.owner, field, call.receiver()?, call.arg(0)?)?;
                None
            }
            SymbolicFunction::ValueOf { field } => {
                match call.result.and_then(|r| r.as_object()) {
                    Some(boxed) => {
                        let reference = heap.get_reference(Some(boxed));
                        heap.put_field(call.owner, field, &reference, call.arg(0)?)?;
                        Some(Operand::Ref(reference))
                    }
                    None => None,
                }
            }
            SymbolicFunction::Unbox { field, sort } => match call.result {
                Some(value) => {
                    let loaded = heap.get_field(call.owner, field, call.receiver()?, value.shadow())?;
                    Some(Operand::of_sort(sort, loaded))
                }
                None => None,
            },
            SymbolicFunction::Abs(sort) => Some(Operand::of_sort(sort, abs(sort, call.arg(0)?)?)),
            SymbolicFunction::MinMax(op, sort) => Some(Operand::of_sort(
                sort,
                min_max(op, sort, call.arg(0)?, call.arg(1)?)?,
            )),
        };
        Ok(operand)
    }
}
