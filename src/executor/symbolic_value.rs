use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use colored::Colorize;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::executor::concrete::{ConcreteObject, ObjectId, ObjectRef};

pub type ExprRef = Arc<Expression>;

/// Value category of a symbolic node, mirroring the computational types of
/// the concrete machine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Int32,
    Int64,
    Real32,
    Real64,
    Str,
    Ref,
}

impl Sort {
    pub fn is_integer(&self) -> bool {
        matches!(self, Sort::Int32 | Sort::Int64)
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Sort::Real32 | Sort::Real64)
    }

    pub fn is_double_word(&self) -> bool {
        matches!(self, Sort::Int64 | Sort::Real64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Sort::Int32 => "int32",
            Sort::Int64 => "int64",
            Sort::Real32 => "real32",
            Sort::Real64 => "real64",
            Sort::Str => "string",
            Sort::Ref => "reference",
        }
    }
}

/// Concrete shadow cached on every expression node.
///
/// Integers of every width are held as `i64` and reals as `f64`.
#[derive(Clone, Debug)]
pub enum Concrete {
    Integer(i64),
    Real(f64),
    Str(Arc<str>),
    Reference(Option<ObjectId>),
}

impl Concrete {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Concrete::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Concrete::Real(v) => Some(*v),
            Concrete::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Arc<str>> {
        match self {
            Concrete::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Concrete::Integer(v) => *v == 0,
            Concrete::Real(v) => *v == 0.0,
            _ => false,
        }
    }

    /// Value identity: reals compare by bit pattern so that a cached `NaN`
    /// matches a freshly observed `NaN`.
    pub fn same_value(&self, other: &Concrete) -> bool {
        match (self, other) {
            (Concrete::Integer(a), Concrete::Integer(b)) => a == b,
            (Concrete::Real(a), Concrete::Real(b)) => a.to_bits() == b.to_bits(),
            (Concrete::Str(a), Concrete::Str(b)) => a == b,
            (Concrete::Reference(a), Concrete::Reference(b)) => a == b,
            _ => false,
        }
    }

    fn compare(&self, other: &Concrete) -> Option<Ordering> {
        match (self, other) {
            (Concrete::Integer(a), Concrete::Integer(b)) => Some(a.cmp(b)),
            (Concrete::Str(a), Concrete::Str(b)) => Some(a.cmp(b)),
            (Concrete::Reference(a), Concrete::Reference(b)) => {
                if a == b {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
            _ => match (self.as_real(), other.as_real()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl PartialEq for Concrete {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Display for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concrete::Integer(v) => write!(f, "{}", v),
            Concrete::Real(v) => write!(f, "{:?}", v),
            Concrete::Str(s) => write!(f, "{:?}", s),
            Concrete::Reference(None) => write!(f, "null"),
            Concrete::Reference(Some(id)) => write!(f, "{}", id),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Xor,
    /// Three-way comparison yielding -1, 0 or 1.
    Cmp,
    IntegerToReal,
    RealToInteger,
    ToByte,
    ToChar,
    ToShort,
    /// int64 to int32 truncation.
    ToInt,
    Concat,
    Abs,
    Min,
    Max,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Neg => "-",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::UShr => ">>>",
            Operator::And => "&",
            Operator::Or => "|",
            Operator::Xor => "^",
            Operator::Cmp => "cmp",
            Operator::IntegerToReal => "i2r",
            Operator::RealToInteger => "r2i",
            Operator::ToByte => "i2b",
            Operator::ToChar => "i2c",
            Operator::ToShort => "i2s",
            Operator::ToInt => "l2i",
            Operator::Concat => "++",
            Operator::Abs => "abs",
            Operator::Min => "min",
            Operator::Max => "max",
        }
    }

    pub fn is_infix(&self) -> bool {
        !matches!(
            self,
            Operator::Neg
                | Operator::Cmp
                | Operator::IntegerToReal
                | Operator::RealToInteger
                | Operator::ToByte
                | Operator::ToChar
                | Operator::ToShort
                | Operator::ToInt
                | Operator::Abs
                | Operator::Min
                | Operator::Max
        )
    }
}

/// A named symbolic input with its inclusive domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: Arc<str>,
    pub sort: Sort,
    pub concrete: Concrete,
    pub min: Option<Concrete>,
    pub max: Option<Concrete>,
}

/// An operator application. Only ever built above at least one `Variable`:
/// the factory folds variable-free applications into constants.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub op: Operator,
    pub operands: Vec<ExprRef>,
    pub sort: Sort,
    pub concrete: Concrete,
}

#[derive(Debug)]
pub struct ObjectBinding {
    pub identity: ObjectId,
    pub handle: Weak<ConcreteObject>,
}

/// Non-null symbolic reference.
///
/// A reference is bound to at most one concrete object, and only once.
#[derive(Debug)]
pub struct ObjectReference {
    pub type_name: Arc<str>,
    pub instance_id: usize,
    binding: OnceLock<ObjectBinding>,
}

impl ObjectReference {
    pub fn new(type_name: Arc<str>, instance_id: usize) -> Self {
        ObjectReference {
            type_name,
            instance_id,
            binding: OnceLock::new(),
        }
    }

    /// Binds the reference to `object`. Returns `false` when it was already bound.
    pub fn bind(&self, object: &ObjectRef) -> bool {
        self.binding
            .set(ObjectBinding {
                identity: object.id(),
                handle: Arc::downgrade(object),
            })
            .is_ok()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn identity(&self) -> Option<ObjectId> {
        self.binding.get().map(|b| b.identity)
    }

    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.binding.get().and_then(|b| b.handle.upgrade())
    }

    /// A bound reference whose concrete object has been dropped.
    pub fn is_collected(&self) -> bool {
        match self.binding.get() {
            Some(b) => b.handle.strong_count() == 0,
            None => false,
        }
    }
}

/// Immutable symbolic expression tree.
#[derive(Debug)]
pub enum Expression {
    Constant(Concrete),
    Variable(Variable),
    Operation(Operation),
    NullReference,
    Reference(ObjectReference),
}

impl Expression {
    pub fn concrete(&self) -> Concrete {
        match self {
            Expression::Constant(c) => c.clone(),
            Expression::Variable(v) => v.concrete.clone(),
            Expression::Operation(o) => o.concrete.clone(),
            Expression::NullReference => Concrete::Reference(None),
            Expression::Reference(r) => Concrete::Reference(r.identity()),
        }
    }

    pub fn contains_variable(&self) -> bool {
        matches!(self, Expression::Variable(_) | Expression::Operation(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expression::Constant(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Expression::NullReference | Expression::Reference(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expression::NullReference)
    }

    pub fn as_reference(&self) -> Option<&ObjectReference> {
        match self {
            Expression::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Expression::Operation(o) => Some(o),
            _ => None,
        }
    }

    pub fn integer_value(&self) -> Option<i64> {
        match self {
            Expression::Constant(c) => c.as_integer(),
            Expression::Variable(v) => v.concrete.as_integer(),
            Expression::Operation(o) => o.concrete.as_integer(),
            _ => None,
        }
    }

    pub fn real_value(&self) -> Option<f64> {
        match self {
            Expression::Constant(c) => c.as_real(),
            Expression::Variable(v) => v.concrete.as_real(),
            Expression::Operation(o) => o.concrete.as_real(),
            _ => None,
        }
    }

    /// Names of every variable reachable from this node.
    pub fn variables(&self) -> FxHashSet<Arc<str>> {
        let mut names = FxHashSet::default();
        let mut worklist: Vec<&Expression> = vec![self];
        while let Some(e) = worklist.pop() {
            match e {
                Expression::Variable(v) => {
                    names.insert(v.name.clone());
                }
                Expression::Operation(o) => {
                    worklist.extend(o.operands.iter().map(|x| x.as_ref()));
                }
                _ => {}
            }
        }
        names
    }

    pub fn depth(&self) -> usize {
        match self {
            Expression::Operation(o) => {
                1 + o.operands.iter().map(|x| x.depth()).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// Colored rendering for terminal dumps.
    pub fn lookup_fmt(&self) -> String {
        match self {
            Expression::Constant(c) => format!("{}", c).bright_cyan().to_string(),
            Expression::Variable(v) => format!("{}", v.name).bright_yellow().to_string(),
            Expression::NullReference => "null".bright_magenta().to_string(),
            Expression::Reference(r) => format!("{}#{}", r.type_name, r.instance_id)
                .magenta()
                .to_string(),
            Expression::Operation(o) => {
                if o.op.is_infix() && o.operands.len() == 2 {
                    format!(
                        "({} {} {})",
                        o.operands[0].lookup_fmt(),
                        o.op.symbol().green(),
                        o.operands[1].lookup_fmt()
                    )
                } else {
                    format!(
                        "({} {})",
                        o.op.symbol().green(),
                        o.operands
                            .iter()
                            .map(|x| x.lookup_fmt())
                            .collect::<Vec<_>>()
                            .join(" ")
                    )
                }
            }
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::Constant(a), Expression::Constant(b)) => a == b,
            (Expression::Variable(a), Expression::Variable(b)) => a == b,
            (Expression::Operation(a), Expression::Operation(b)) => a == b,
            (Expression::NullReference, Expression::NullReference) => true,
            (Expression::Reference(a), Expression::Reference(b)) => {
                a.instance_id == b.instance_id && a.type_name == b.type_name
            }
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => write!(f, "{}", c),
            Expression::Variable(v) => write!(f, "{}", v.name),
            Expression::NullReference => write!(f, "null"),
            Expression::Reference(r) => write!(f, "{}#{}", r.type_name, r.instance_id),
            Expression::Operation(o) => {
                if o.op.is_infix() && o.operands.len() == 2 {
                    write!(f, "({} {} {})", o.operands[0], o.op.symbol(), o.operands[1])
                } else {
                    write!(f, "({}", o.op.symbol())?;
                    for x in &o.operands {
                        write!(f, " {}", x)?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Eq,
        Comparator::Ne,
        Comparator::Lt,
        Comparator::Le,
        Comparator::Gt,
        Comparator::Ge,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    /// Logical complement: `!(a OP b)` is `a OP.negate() b`.
    pub fn negate(&self) -> Comparator {
        match self {
            Comparator::Eq => Comparator::Ne,
            Comparator::Ne => Comparator::Eq,
            Comparator::Lt => Comparator::Ge,
            Comparator::Le => Comparator::Gt,
            Comparator::Gt => Comparator::Le,
            Comparator::Ge => Comparator::Lt,
        }
    }

    /// Operand exchange: `a OP b` is `b OP.swap() a`.
    pub fn swap(&self) -> Comparator {
        match self {
            Comparator::Lt => Comparator::Gt,
            Comparator::Le => Comparator::Ge,
            Comparator::Gt => Comparator::Lt,
            Comparator::Ge => Comparator::Le,
            c => *c,
        }
    }

    /// Truth of the comparator for an ordering; unordered operands only
    /// satisfy `Ne`.
    pub fn evaluate(&self, ordering: Option<Ordering>) -> bool {
        match ordering {
            None => *self == Comparator::Ne,
            Some(o) => match self {
                Comparator::Eq => o == Ordering::Equal,
                Comparator::Ne => o != Ordering::Equal,
                Comparator::Lt => o == Ordering::Less,
                Comparator::Le => o != Ordering::Greater,
                Comparator::Gt => o == Ordering::Greater,
                Comparator::Ge => o != Ordering::Less,
            },
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A relational constraint `left OP right`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub left: ExprRef,
    pub comparator: Comparator,
    pub right: ExprRef,
}

impl Constraint {
    pub fn new(left: ExprRef, comparator: Comparator, right: ExprRef) -> Self {
        Constraint {
            left,
            comparator,
            right,
        }
    }

    pub fn contains_variable(&self) -> bool {
        self.left.contains_variable() || self.right.contains_variable()
    }

    /// Truth of the constraint under the cached concrete values.
    pub fn holds(&self) -> bool {
        self.comparator
            .evaluate(self.left.concrete().compare(&self.right.concrete()))
    }

    pub fn negate(&self) -> Constraint {
        Constraint::new(
            self.left.clone(),
            self.comparator.negate(),
            self.right.clone(),
        )
    }

    pub fn variables(&self) -> FxHashSet<Arc<str>> {
        let mut names = self.left.variables();
        names.extend(self.right.variables());
        names
    }

    pub fn lookup_fmt(&self) -> String {
        format!(
            "{} {} {}",
            self.left.lookup_fmt(),
            self.comparator.symbol().bold(),
            self.right.lookup_fmt()
        )
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.comparator, self.right)
    }
}
