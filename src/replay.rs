//! Recorded callback streams.
//!
//! A trace file is a JSON document
//!
//! ```json
//! {
//!   "classes": [{ "name": "Main", "methods": [{ "name": "check", "descriptor": "(I)V", "is_static": true }] }],
//!   "objects": [{ "id": 1, "type_name": "java.lang.String", "string": "abc" }],
//!   "events": [{ "op": "push", "value": { "int": 3 } }]
//! }
//! ```
//!
//! where objects are referred to by their trace-local `id`.

use std::fs::File;
use std::io::BufReader;

use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::callback::{
    ArithmeticOp, CallOp, Callback, HeapOp, JumpOp, LocalOp, StackOp,
};
use crate::executor::concrete::{ConcreteObject, ConcreteValue, ObjectRef, JAVA_LANG_STRING};
use crate::executor::path_condition::BranchSite;
use crate::executor::symbolic_execution::SymbolicExecutor;
use crate::executor::symbolic_setting::ExecutorSetting;
use crate::executor::symbolic_value::{Comparator, Operator, Sort};
use crate::executor::type_registry::{ClassInfo, TypeRegistry};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("cannot read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed trace: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event {event} refers to undeclared object {id}")]
    UnknownObject { event: usize, id: u64 },
    #[error("object {0} is declared twice")]
    DuplicateObject(u64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub id: u64,
    pub type_name: String,
    #[serde(default)]
    pub array_length: Option<i32>,
    #[serde(default)]
    pub string: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDecl {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<u64>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteDecl {
    pub class_name: String,
    pub method_name: String,
    pub branch_index: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceEvent {
    Binary { operator: Operator, sort: Sort },
    Negate { sort: Sort },
    Compare { sort: Sort },
    Convert { from: Sort, to: Sort },
    Narrow { operator: Operator },
    Nop,
    Push { value: ValueDecl },
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    CheckCast,
    InstanceOf { result: bool },
    MonitorEnter,
    MonitorExit,
    Load { sort: Sort, index: usize },
    Store { sort: Sort, index: usize },
    Increment { index: usize, delta: i32 },
    Goto,
    If { comparator: Comparator, site: SiteDecl, value: i32 },
    IfCompare { comparator: Comparator, site: SiteDecl, left: i32, right: i32 },
    IfReferenceCompare { left: Option<u64>, right: Option<u64> },
    IfNull { value: Option<u64> },
    TableSwitch { site: SiteDecl, value: i32, min: i32, max: i32 },
    LookupSwitch { site: SiteDecl, value: i32, keys: Vec<i32> },
    Throw,
    New { type_name: String },
    NewArray { type_name: String, length: i32 },
    MultiNewArray { type_name: String, lengths: Vec<i32> },
    ArrayLength { array: Option<u64> },
    ArrayLoad { sort: Sort, array: Option<u64>, index: i32, value: ValueDecl },
    ArrayStore { array: Option<u64>, index: i32 },
    GetField { owner: String, name: String, receiver: Option<u64>, value: ValueDecl },
    PutField { owner: String, name: String, receiver: Option<u64> },
    GetStatic { owner: String, name: String, value: ValueDecl },
    PutStatic { owner: String, name: String },
    StringConcat { result: u64, recipe: String },
    InvokeStatic { owner: String, name: String, descriptor: String },
    InvokeSpecial { owner: String, name: String, descriptor: String },
    InvokeVirtual { owner: String, name: String, descriptor: String, receiver: Option<u64> },
    InvokeInterface { owner: String, name: String, descriptor: String, receiver: Option<u64> },
    CallerStackParam { nr: usize, value: ValueDecl },
    MethodBegin { owner: String, name: String, descriptor: String },
    MethodMaxs { owner: String, name: String, descriptor: String, max_locals: usize },
    MethodBeginReceiver { receiver: u64 },
    MethodBeginParam { nr: usize, index: usize, value: ValueDecl },
    MethodBeginSymbolicParam { nr: usize, index: usize, value: ValueDecl, name: String },
    Return { sort: Option<Sort> },
    CallResult { owner: String, name: String, descriptor: String, value: Option<ValueDecl> },
    HandlerBegin { owner: String, name: String, descriptor: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

impl TraceFile {
    pub fn from_json(text: &str) -> Result<TraceFile, ReplayError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &str) -> Result<TraceFile, ReplayError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// A decoded trace: concrete objects materialized and events turned into
/// callbacks. The replay owns the objects so none of them is collected
/// while the callbacks are handled.
pub struct Replay {
    pub classes: Vec<ClassInfo>,
    pub callbacks: Vec<Callback>,
    objects: FxHashMap<u64, ObjectRef>,
}

impl Replay {
    pub fn new(trace: TraceFile) -> Result<Replay, ReplayError> {
        let mut objects = FxHashMap::default();
        for decl in &trace.objects {
            let object = match (&decl.string, decl.array_length) {
                (Some(text), _) if decl.type_name == JAVA_LANG_STRING => {
                    ConcreteObject::new_string(text)
                }
                (_, Some(length)) => ConcreteObject::new_array(&decl.type_name, length),
                _ => ConcreteObject::new_instance(&decl.type_name),
            };
            if objects.insert(decl.id, object).is_some() {
                return Err(ReplayError::DuplicateObject(decl.id));
            }
        }

        let mut decoder = Decoder {
            objects: &objects,
            event: 0,
        };
        let mut callbacks = Vec::with_capacity(trace.events.len());
        for (i, event) in trace.events.into_iter().enumerate() {
            decoder.event = i;
            callbacks.push(decoder.callback(event)?);
        }
        info!(
            "decoded {} callbacks over {} objects",
            callbacks.len(),
            objects.len()
        );

        Ok(Replay {
            classes: trace.classes,
            callbacks,
            objects,
        })
    }

    pub fn object(&self, id: u64) -> Option<&ObjectRef> {
        self.objects.get(&id)
    }

    pub fn registry(&self, setting: &ExecutorSetting) -> TypeRegistry {
        let mut registry = TypeRegistry::new(setting.ignored_prefixes.clone());
        for class in &self.classes {
            registry.register(class.clone());
        }
        registry
    }

    /// Feeds every callback to a fresh executor.
    pub fn run(&self, setting: ExecutorSetting) -> SymbolicExecutor {
        let mut executor = SymbolicExecutor::new(self.registry(&setting), setting);
        executor.handle_all(&self.callbacks);
        executor
    }
}

struct Decoder<'a> {
    objects: &'a FxHashMap<u64, ObjectRef>,
    event: usize,
}

impl<'a> Decoder<'a> {
    fn object(&self, id: u64) -> Result<ObjectRef, ReplayError> {
        self.objects
            .get(&id)
            .cloned()
            .ok_or(ReplayError::UnknownObject {
                event: self.event,
                id,
            })
    }

    fn nullable(&self, id: Option<u64>) -> Result<Option<ObjectRef>, ReplayError> {
        id.map(|id| self.object(id)).transpose()
    }

    fn value(&self, value: ValueDecl) -> Result<ConcreteValue, ReplayError> {
        Ok(match value {
            ValueDecl::Int(v) => ConcreteValue::Int(v),
            ValueDecl::Long(v) => ConcreteValue::Long(v),
            ValueDecl::Float(v) => ConcreteValue::Float(v),
            ValueDecl::Double(v) => ConcreteValue::Double(v),
            ValueDecl::Ref(id) => ConcreteValue::Ref(self.nullable(id)?),
        })
    }

    fn callback(&self, event: TraceEvent) -> Result<Callback, ReplayError> {
        let site = |s: SiteDecl| BranchSite::new(&s.class_name, &s.method_name, s.branch_index);
        Ok(match event {
            TraceEvent::Binary { operator, sort } => {
                Callback::Arithmetic(ArithmeticOp::Binary { op: operator, sort })
            }
            TraceEvent::Negate { sort } => Callback::Arithmetic(ArithmeticOp::Negate { sort }),
            TraceEvent::Compare { sort } => Callback::Arithmetic(ArithmeticOp::Compare { sort }),
            TraceEvent::Convert { from, to } => {
                Callback::Arithmetic(ArithmeticOp::Convert { from, to })
            }
            TraceEvent::Narrow { operator } => {
                Callback::Arithmetic(ArithmeticOp::Narrow { op: operator })
            }
            TraceEvent::Nop => Callback::Stack(StackOp::Nop),
            TraceEvent::Push { value } => Callback::Stack(StackOp::Push(self.value(value)?)),
            TraceEvent::Pop => Callback::Stack(StackOp::Pop),
            TraceEvent::Pop2 => Callback::Stack(StackOp::Pop2),
            TraceEvent::Dup => Callback::Stack(StackOp::Dup),
            TraceEvent::DupX1 => Callback::Stack(StackOp::DupX1),
            TraceEvent::DupX2 => Callback::Stack(StackOp::DupX2),
            TraceEvent::Dup2 => Callback::Stack(StackOp::Dup2),
            TraceEvent::Dup2X1 => Callback::Stack(StackOp::Dup2X1),
            TraceEvent::Dup2X2 => Callback::Stack(StackOp::Dup2X2),
            TraceEvent::Swap => Callback::Stack(StackOp::Swap),
            TraceEvent::CheckCast => Callback::Stack(StackOp::CheckCast),
            TraceEvent::InstanceOf { result } => Callback::Stack(StackOp::InstanceOf { result }),
            TraceEvent::MonitorEnter => Callback::Stack(StackOp::MonitorEnter),
            TraceEvent::MonitorExit => Callback::Stack(StackOp::MonitorExit),
            TraceEvent::Load { sort, index } => Callback::Local(LocalOp::Load { sort, index }),
            TraceEvent::Store { sort, index } => Callback::Local(LocalOp::Store { sort, index }),
            TraceEvent::Increment { index, delta } => {
                Callback::Local(LocalOp::Increment { index, delta })
            }
            TraceEvent::Goto => Callback::Jump(JumpOp::Goto),
            TraceEvent::If {
                comparator,
                site: s,
                value,
            } => Callback::Jump(JumpOp::If {
                comparator,
                site: site(s),
                value,
            }),
            TraceEvent::IfCompare {
                comparator,
                site: s,
                left,
                right,
            } => Callback::Jump(JumpOp::IfCompare {
                comparator,
                site: site(s),
                left,
                right,
            }),
            TraceEvent::IfReferenceCompare { left, right } => {
                Callback::Jump(JumpOp::IfReferenceCompare {
                    left: self.nullable(left)?,
                    right: self.nullable(right)?,
                })
            }
            TraceEvent::IfNull { value } => Callback::Jump(JumpOp::IfNull {
                value: self.nullable(value)?,
            }),
            TraceEvent::TableSwitch {
                site: s,
                value,
                min,
                max,
            } => Callback::Jump(JumpOp::TableSwitch {
                site: site(s),
                value,
                min,
                max,
            }),
            TraceEvent::LookupSwitch {
                site: s,
                value,
                keys,
            } => Callback::Jump(JumpOp::LookupSwitch {
                site: site(s),
                value,
                keys,
            }),
            TraceEvent::Throw => Callback::Jump(JumpOp::Throw),
            TraceEvent::New { type_name } => Callback::Heap(HeapOp::New { type_name }),
            TraceEvent::NewArray { type_name, length } => {
                Callback::Heap(HeapOp::NewArray { type_name, length })
            }
            TraceEvent::MultiNewArray { type_name, lengths } => {
                Callback::Heap(HeapOp::MultiNewArray { type_name, lengths })
            }
            TraceEvent::ArrayLength { array } => Callback::Heap(HeapOp::ArrayLength {
                array: self.nullable(array)?,
            }),
            TraceEvent::ArrayLoad {
                sort,
                array,
                index,
                value,
            } => Callback::Heap(HeapOp::ArrayLoad {
                sort,
                array: self.nullable(array)?,
                index,
                value: self.value(value)?,
            }),
            TraceEvent::ArrayStore { array, index } => Callback::Heap(HeapOp::ArrayStore {
                array: self.nullable(array)?,
                index,
            }),
            TraceEvent::GetField {
                owner,
                name,
                receiver,
                value,
            } => Callback::Heap(HeapOp::GetField {
                owner,
                name,
                receiver: self.nullable(receiver)?,
                value: self.value(value)?,
            }),
            TraceEvent::PutField {
                owner,
                name,
                receiver,
            } => Callback::Heap(HeapOp::PutField {
                owner,
                name,
                receiver: self.nullable(receiver)?,
            }),
            TraceEvent::GetStatic { owner, name, value } => Callback::Heap(HeapOp::GetStatic {
                owner,
                name,
                value: self.value(value)?,
            }),
            TraceEvent::PutStatic { owner, name } => {
                Callback::Heap(HeapOp::PutStatic { owner, name })
            }
            TraceEvent::StringConcat { result, recipe } => Callback::Heap(HeapOp::StringConcat {
                result: self.object(result)?,
                recipe,
            }),
            TraceEvent::InvokeStatic {
                owner,
                name,
                descriptor,
            } => Callback::Call(CallOp::InvokeStatic {
                owner,
                name,
                descriptor,
            }),
            TraceEvent::InvokeSpecial {
                owner,
                name,
                descriptor,
            } => Callback::Call(CallOp::InvokeSpecial {
                owner,
                name,
                descriptor,
            }),
            TraceEvent::InvokeVirtual {
                owner,
                name,
                descriptor,
                receiver,
            } => Callback::Call(CallOp::InvokeVirtual {
                owner,
                name,
                descriptor,
                receiver: self.nullable(receiver)?,
            }),
            TraceEvent::InvokeInterface {
                owner,
                name,
                descriptor,
                receiver,
            } => Callback::Call(CallOp::InvokeInterface {
                owner,
                name,
                descriptor,
                receiver: self.nullable(receiver)?,
            }),
            TraceEvent::CallerStackParam { nr, value } => Callback::Call(CallOp::CallerStackParam {
                nr,
                value: self.value(value)?,
            }),
            TraceEvent::MethodBegin {
                owner,
                name,
                descriptor,
            } => Callback::Call(CallOp::MethodBegin {
                owner,
                name,
                descriptor,
            }),
            TraceEvent::MethodMaxs {
                owner,
                name,
                descriptor,
                max_locals,
            } => Callback::Call(CallOp::MethodMaxs {
                owner,
                name,
                descriptor,
                max_locals,
            }),
            TraceEvent::MethodBeginReceiver { receiver } => {
                Callback::Call(CallOp::MethodBeginReceiver {
                    receiver: self.object(receiver)?,
                })
            }
            TraceEvent::MethodBeginParam { nr, index, value } => {
                Callback::Call(CallOp::MethodBeginParam {
                    nr,
                    index,
                    value: self.value(value)?,
                })
            }
            TraceEvent::MethodBeginSymbolicParam {
                nr,
                index,
                value,
                name,
            } => Callback::Call(CallOp::MethodBeginSymbolicParam {
                nr,
                index,
                value: self.value(value)?,
                name,
            }),
            TraceEvent::Return { sort } => Callback::Call(CallOp::Return { sort }),
            TraceEvent::CallResult {
                owner,
                name,
                descriptor,
                value,
            } => Callback::Call(CallOp::CallResult {
                owner,
                name,
                descriptor,
                value: value.map(|v| self.value(v)).transpose()?,
            }),
            TraceEvent::HandlerBegin {
                owner,
                name,
                descriptor,
            } => Callback::Call(CallOp::HandlerBegin {
                owner,
                name,
                descriptor,
            }),
        })
    }
}
