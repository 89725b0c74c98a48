use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::executor::symbolic_value::{Concrete, Sort};

/// Identity of a concrete object, unique for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    fn fresh() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
    Instance,
    Array { length: i32 },
    Str(Arc<str>),
}

/// A host-side object observed by the concrete run.
///
/// The shadow interpreter only ever keeps `Weak` handles to these, so dropping
/// the last `ObjectRef` makes the object collectable.
#[derive(Debug)]
pub struct ConcreteObject {
    id: ObjectId,
    type_name: Arc<str>,
    kind: ObjectKind,
}

pub type ObjectRef = Arc<ConcreteObject>;

impl ConcreteObject {
    pub fn new_instance(type_name: &str) -> ObjectRef {
        Arc::new(ConcreteObject {
            id: ObjectId::fresh(),
            type_name: Arc::from(type_name),
            kind: ObjectKind::Instance,
        })
    }

    pub fn new_array(type_name: &str, length: i32) -> ObjectRef {
        Arc::new(ConcreteObject {
            id: ObjectId::fresh(),
            type_name: Arc::from(type_name),
            kind: ObjectKind::Array { length },
        })
    }

    pub fn new_string(value: &str) -> ObjectRef {
        Arc::new(ConcreteObject {
            id: ObjectId::fresh(),
            type_name: Arc::from(JAVA_LANG_STRING),
            kind: ObjectKind::Str(Arc::from(value)),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn type_name(&self) -> &Arc<str> {
        &self.type_name
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn array_length(&self) -> Option<i32> {
        match self.kind {
            ObjectKind::Array { length } => Some(length),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&Arc<str>> {
        match &self.kind {
            ObjectKind::Str(s) => Some(s),
            _ => None,
        }
    }
}

pub const JAVA_LANG_STRING: &str = "java.lang.String";

/// A concrete value reported by a callback.
#[derive(Clone, Debug)]
pub enum ConcreteValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<ObjectRef>),
}

impl ConcreteValue {
    pub fn null() -> Self {
        ConcreteValue::Ref(None)
    }

    pub fn object(obj: &ObjectRef) -> Self {
        ConcreteValue::Ref(Some(obj.clone()))
    }

    pub fn is_double_word(&self) -> bool {
        matches!(self, ConcreteValue::Long(_) | ConcreteValue::Double(_))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            ConcreteValue::Ref(obj) => obj.as_ref(),
            _ => None,
        }
    }

    /// Computational sort of the value on the operand stack.
    pub fn sort(&self) -> Sort {
        match self {
            ConcreteValue::Int(_) => Sort::Int32,
            ConcreteValue::Long(_) => Sort::Int64,
            ConcreteValue::Float(_) => Sort::Real32,
            ConcreteValue::Double(_) => Sort::Real64,
            ConcreteValue::Ref(_) => Sort::Ref,
        }
    }

    /// The shadow an expression of this value must carry.
    pub fn shadow(&self) -> Concrete {
        match self {
            ConcreteValue::Int(v) => Concrete::Integer(*v as i64),
            ConcreteValue::Long(v) => Concrete::Integer(*v),
            ConcreteValue::Float(v) => Concrete::Real(*v as f64),
            ConcreteValue::Double(v) => Concrete::Real(*v),
            ConcreteValue::Ref(obj) => Concrete::Reference(obj.as_ref().map(|o| o.id())),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConcreteValue::Int(_) => "int",
            ConcreteValue::Long(_) => "long",
            ConcreteValue::Float(_) => "float",
            ConcreteValue::Double(_) => "double",
            ConcreteValue::Ref(_) => "reference",
        }
    }
}
