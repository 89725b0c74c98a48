use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::executor::error::ResolutionError;

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub max_locals: Option<usize>,
}

/// Loaded type information for one class or interface.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    pub fn new(name: &str) -> Self {
        ClassInfo {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_super(mut self, super_class: &str) -> Self {
        self.super_class = Some(super_class.to_string());
        self
    }

    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, descriptor: &str, is_static: bool) -> Self {
        self.fields.push(FieldInfo {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_static,
        });
        self
    }

    pub fn with_method(mut self, name: &str, descriptor: &str, is_static: bool) -> Self {
        self.methods.push(MethodInfo {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_static,
            is_native: false,
            max_locals: None,
        });
        self
    }

    pub fn with_native_method(mut self, name: &str, descriptor: &str, is_static: bool) -> Self {
        self.methods.push(MethodInfo {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_static,
            is_native: true,
            max_locals: None,
        });
        self
    }

    pub fn with_constructor(self, descriptor: &str) -> Self {
        self.with_method(CONSTRUCTOR_NAME, descriptor, false)
    }
}

/// A resolved method or constructor, identified by its declaring class.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Member {
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    pub is_static: bool,
    pub is_native: bool,
}

impl Member {
    pub fn is_constructor(&self) -> bool {
        &*self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Type information supplied by the host plus the instrumentation filter.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    classes: FxHashMap<String, ClassInfo>,
    ignored_prefixes: Vec<String>,
    max_locals: FxHashMap<Member, usize>,
}

impl TypeRegistry {
    pub fn new(ignored_prefixes: Vec<String>) -> Self {
        TypeRegistry {
            classes: FxHashMap::default(),
            ignored_prefixes,
            max_locals: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, class: ClassInfo) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Result<&ClassInfo, ResolutionError> {
        self.classes
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownType(name.to_string()))
    }

    /// Whether `class_name` falls under an uninstrumented package prefix.
    pub fn is_ignored(&self, class_name: &str) -> bool {
        self.ignored_prefixes
            .iter()
            .any(|p| class_name.starts_with(p.as_str()))
    }

    /// Whether a call to `member` runs instrumented code.
    pub fn is_instrumented(&self, member: &Member) -> bool {
        if member.is_native {
            return false;
        }
        let top_level = member.owner.split('$').next().unwrap_or(&member.owner);
        !self.is_ignored(top_level)
    }

    /// Class declaring field `name` as seen from `owner`: declared fields
    /// first, then super interfaces, then the super class chain.
    pub fn resolve_field(&self, owner: &str, name: &str) -> Result<Arc<str>, ResolutionError> {
        let mut visited = FxHashSet::default();
        let mut pending = VecDeque::from([owner.to_string()]);
        while let Some(current) = pending.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            // Only the starting owner has to be registered.
            let class = match self.classes.get(&current) {
                Some(class) => class,
                None if current == owner => return Err(ResolutionError::UnknownType(current)),
                None => continue,
            };
            if class.fields.iter().any(|f| f.name == name) {
                return Ok(Arc::from(class.name.as_str()));
            }
            for interface in &class.interfaces {
                pending.push_front(interface.clone());
            }
            if let Some(super_class) = &class.super_class {
                pending.push_back(super_class.clone());
            }
        }
        Err(ResolutionError::UnknownField {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Resolves a method by walking the super class chain, then the
    /// collected interfaces.
    pub fn resolve_method(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Member, ResolutionError> {
        let mut interfaces: VecDeque<String> = VecDeque::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(owner.to_string());
        while let Some(class_name) = current.take() {
            if visited.insert(class_name.clone()) {
                let class = match self.classes.get(&class_name) {
                    Some(class) => class,
                    None if class_name == owner => {
                        return Err(ResolutionError::UnknownType(class_name))
                    }
                    None => {
                        current = interfaces.pop_front();
                        continue;
                    }
                };
                interfaces.extend(class.interfaces.iter().cloned());
                if let Some(m) = class
                    .methods
                    .iter()
                    .find(|m| m.name == name && m.descriptor == descriptor)
                {
                    return Ok(self.member_of(class, m));
                }
                current = class.super_class.clone();
            }
            if current.is_none() {
                current = interfaces.pop_front();
            }
        }
        Err(ResolutionError::UnknownMethod {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Constructors are never inherited: only `owner` itself is searched.
    pub fn resolve_constructor(
        &self,
        owner: &str,
        descriptor: &str,
    ) -> Result<Member, ResolutionError> {
        let class = self.class(owner)?;
        class
            .methods
            .iter()
            .find(|m| m.name == CONSTRUCTOR_NAME && m.descriptor == descriptor)
            .map(|m| self.member_of(class, m))
            .ok_or_else(|| ResolutionError::UnknownConstructor {
                owner: owner.to_string(),
                descriptor: descriptor.to_string(),
            })
    }

    /// Resolves either a constructor or a method depending on `name`.
    pub fn resolve_member(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Member, ResolutionError> {
        if name == CONSTRUCTOR_NAME {
            self.resolve_constructor(owner, descriptor)
        } else {
            self.resolve_method(owner, name, descriptor)
        }
    }

    fn member_of(&self, class: &ClassInfo, method: &MethodInfo) -> Member {
        Member {
            owner: Arc::from(class.name.as_str()),
            name: Arc::from(method.name.as_str()),
            descriptor: Arc::from(method.descriptor.as_str()),
            is_static: method.is_static,
            is_native: method.is_native,
        }
    }

    /// Records the locals capacity of a member; the first report wins.
    pub fn record_max_locals(&mut self, member: Member, max_locals: usize) {
        self.max_locals.entry(member).or_insert(max_locals);
    }

    pub fn max_locals(&self, member: &Member) -> Option<usize> {
        if let Some(n) = self.max_locals.get(member) {
            return Some(*n);
        }
        self.classes.get(&*member.owner).and_then(|c| {
            c.methods
                .iter()
                .find(|m| *m.name == *member.name && *m.descriptor == *member.descriptor)
                .and_then(|m| m.max_locals)
        })
    }
}
