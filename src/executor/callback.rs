//! Callback events reported by the instrumented program, one per executed
//! instruction or boundary crossing, in dynamic execution order.

use crate::executor::concrete::{ConcreteValue, ObjectRef};
use crate::executor::path_condition::BranchSite;
use crate::executor::symbolic_value::{Comparator, Operator, Sort};

#[derive(Clone, Debug)]
pub enum Callback {
    Arithmetic(ArithmeticOp),
    Stack(StackOp),
    Local(LocalOp),
    Jump(JumpOp),
    Heap(HeapOp),
    Call(CallOp),
}

#[derive(Clone, Debug)]
pub enum ArithmeticOp {
    /// `add sub mul div rem and or xor shl shr ushr` over operands of `sort`.
    /// Shift distances are always int32.
    Binary { op: Operator, sort: Sort },
    Negate { sort: Sort },
    /// `lcmp`, `fcmpl`, `fcmpg`, `dcmpl`, `dcmpg`.
    Compare { sort: Sort },
    /// Primitive widening and narrowing between computational sorts (`i2l`, `d2i`, ...).
    Convert { from: Sort, to: Sort },
    /// `i2b`, `i2c`, `i2s`.
    Narrow { op: Operator },
}

#[derive(Clone, Debug)]
pub enum StackOp {
    Nop,
    /// Constant push (`iconst`, `bipush`, `ldc`, `aconst_null`, ...).
    Push(ConcreteValue),
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
}

#[derive(Clone, Debug)]
pub enum LocalOp {
    Load { sort: Sort, index: usize },
    Store { sort: Sort, index: usize },
    Increment { index: usize, delta: i32 },
}

#[derive(Clone, Debug)]
pub enum JumpOp {
    Goto,
    /// `ifeq ifne iflt ifge ifgt ifle` against an implicit zero.
    If {
        comparator: Comparator,
        site: BranchSite,
        value: i32,
    },
    /// `if_icmpeq` ... `if_icmple`.
    IfCompare {
        comparator: Comparator,
        site: BranchSite,
        left: i32,
        right: i32,
    },
    /// `if_acmpeq`, `if_acmpne`.
    IfReferenceCompare {
        left: Option<ObjectRef>,
        right: Option<ObjectRef>,
    },
    /// `ifnull`, `ifnonnull`.
    IfNull { value: Option<ObjectRef> },
    TableSwitch {
        site: BranchSite,
        value: i32,
        min: i32,
        max: i32,
    },
    LookupSwitch {
        site: BranchSite,
        value: i32,
        keys: Vec<i32>,
    },
    Throw,
}

#[derive(Clone, Debug)]
pub enum HeapOp {
    New {
        type_name: String,
    },
    NewArray {
        type_name: String,
        length: i32,
    },
    MultiNewArray {
        type_name: String,
        lengths: Vec<i32>,
    },
    ArrayLength {
        array: Option<ObjectRef>,
    },
    /// The loaded element is `value`; it is ignored when the access fails.
    ArrayLoad {
        sort: Sort,
        array: Option<ObjectRef>,
        index: i32,
        value: ConcreteValue,
    },
    ArrayStore {
        array: Option<ObjectRef>,
        index: i32,
    },
    GetField {
        owner: String,
        name: String,
        receiver: Option<ObjectRef>,
        value: ConcreteValue,
    },
    PutField {
        owner: String,
        name: String,
        receiver: Option<ObjectRef>,
    },
    GetStatic {
        owner: String,
        name: String,
        value: ConcreteValue,
    },
    PutStatic {
        owner: String,
        name: String,
    },
    /// Indified string concatenation; `recipe` marks each argument with `\u{1}`.
    StringConcat {
        result: ObjectRef,
        recipe: String,
    },
}

#[derive(Clone, Debug)]
pub enum CallOp {
    InvokeStatic {
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeSpecial {
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeVirtual {
        owner: String,
        name: String,
        descriptor: String,
        receiver: Option<ObjectRef>,
    },
    InvokeInterface {
        owner: String,
        name: String,
        descriptor: String,
        receiver: Option<ObjectRef>,
    },
    /// A reference argument about to cross into the callee, reported from the
    /// caller side; `nr` counts from the last argument.
    CallerStackParam {
        nr: usize,
        value: ConcreteValue,
    },
    MethodBegin {
        owner: String,
        name: String,
        descriptor: String,
    },
    MethodMaxs {
        owner: String,
        name: String,
        descriptor: String,
        max_locals: usize,
    },
    MethodBeginReceiver {
        receiver: ObjectRef,
    },
    MethodBeginParam {
        nr: usize,
        index: usize,
        value: ConcreteValue,
    },
    /// Like `MethodBeginParam`, but binds a named symbolic input.
    MethodBeginSymbolicParam {
        nr: usize,
        index: usize,
        value: ConcreteValue,
        name: String,
    },
    /// `return` and the typed `*return` instructions; `None` for void.
    Return {
        sort: Option<Sort>,
    },
    /// Result of the call just made, reported by the caller. `None` for void.
    CallResult {
        owner: String,
        name: String,
        descriptor: String,
        value: Option<ConcreteValue>,
    },
    HandlerBegin {
        owner: String,
        name: String,
        descriptor: String,
    },
}

impl Callback {
    pub fn group(&self) -> &'static str {
        match self {
            Callback::Arithmetic(_) => "arithmetic",
            Callback::Stack(_) => "stack",
            Callback::Local(_) => "local",
            Callback::Jump(_) => "jump",
            Callback::Heap(_) => "heap",
            Callback::Call(_) => "call",
        }
    }
}
