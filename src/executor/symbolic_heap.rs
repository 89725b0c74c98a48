use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::executor::concrete::{ObjectId, ObjectRef};
use crate::executor::error::{ExecutionError, ExecutionResult};
use crate::executor::expression_factory::{build_constant, build_reference, null_reference};
use crate::executor::symbolic_value::{Concrete, ExprRef, Expression};

/// Owner of the synthetic array length pseudo-field.
pub const ARRAY_OWNER: &str = "";
pub const ARRAY_LENGTH_FIELD: &str = "length";
/// Synthetic field holding the symbolic contents of a string object.
pub const STRING_VALUE_FIELD: &str = "$stringValue";

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct FieldKey {
    owner: Arc<str>,
    name: Arc<str>,
}

impl FieldKey {
    fn new(owner: &str, name: &str) -> Self {
        FieldKey {
            owner: Arc::from(owner),
            name: Arc::from(name),
        }
    }
}

/// Sparse symbolic heap of one execution.
///
/// Only values containing a variable are stored; writing a concrete-derivable
/// value evicts the slot instead.
#[derive(Debug, Default)]
pub struct SymbolicHeap {
    next_instance_id: usize,
    references: FxHashMap<ObjectId, ExprRef>,
    fields: FxHashMap<FieldKey, FxHashMap<usize, ExprRef>>,
    statics: FxHashMap<FieldKey, ExprRef>,
    arrays: FxHashMap<usize, FxHashMap<i32, ExprRef>>,
}

fn receiver_id(receiver: &ExprRef) -> ExecutionResult<usize> {
    receiver
        .as_reference()
        .map(|r| r.instance_id)
        .ok_or_else(|| ExecutionError::ExpressionKind {
            expected: "non-null reference",
            found: receiver.to_string(),
        })
}

/// Returns the stored value when its shadow matches `observed`, otherwise
/// evicts it and hands out a fresh constant.
fn heal<K: std::hash::Hash + Eq + std::fmt::Debug>(
    slots: &mut FxHashMap<K, ExprRef>,
    key: K,
    observed: Concrete,
) -> ExprRef {
    match slots.get(&key) {
        Some(stored) if stored.concrete().same_value(&observed) => stored.clone(),
        Some(stored) => {
            debug!(
                "evicting stale heap entry {:?}: stored {}, observed {}",
                key,
                stored.concrete(),
                observed
            );
            slots.remove(&key);
            build_constant(observed)
        }
        None => build_constant(observed),
    }
}

fn heal_slot<K: std::hash::Hash + Eq + std::fmt::Debug>(
    slots: Option<&mut FxHashMap<K, ExprRef>>,
    key: K,
    observed: Concrete,
) -> ExprRef {
    match slots {
        Some(slots) => heal(slots, key, observed),
        None => build_constant(observed),
    }
}

fn store<K: std::hash::Hash + Eq>(slots: &mut FxHashMap<K, ExprRef>, key: K, value: &ExprRef) {
    if value.contains_variable() {
        slots.insert(key, value.clone());
    } else {
        slots.remove(&key);
    }
}

impl SymbolicHeap {
    pub fn new() -> Self {
        SymbolicHeap::default()
    }

    /// A fresh, not yet bound, non-null reference.
    pub fn new_reference(&mut self, type_name: &str) -> ExprRef {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        build_reference(Arc::from(type_name), id)
    }

    /// Symbolic reference of a concrete object; the same object always maps
    /// to the same reference and `None` to the canonical null.
    pub fn get_reference(&mut self, object: Option<&ObjectRef>) -> ExprRef {
        let object = match object {
            None => return null_reference(),
            Some(o) => o,
        };
        if let Some(known) = self.references.get(&object.id()) {
            return known.clone();
        }
        let reference = self.new_reference(object.type_name());
        if let Some(r) = reference.as_reference() {
            r.bind(object);
        }
        self.references.insert(object.id(), reference.clone());
        reference
    }

    /// Binds a reference created before its concrete object was observed.
    /// Already bound references are left untouched.
    pub fn initialize_reference(&mut self, object: Option<&ObjectRef>, reference: &ExprRef) {
        if let (Some(object), Some(r)) = (object, reference.as_reference()) {
            if r.bind(object) {
                self.references.insert(object.id(), reference.clone());
            }
        }
    }

    pub fn put_field(
        &mut self,
        owner: &str,
        name: &str,
        receiver: &ExprRef,
        value: &ExprRef,
    ) -> ExecutionResult<()> {
        let id = receiver_id(receiver)?;
        let slots = self.fields.entry(FieldKey::new(owner, name)).or_default();
        store(slots, id, value);
        Ok(())
    }

    pub fn get_field(
        &mut self,
        owner: &str,
        name: &str,
        receiver: &ExprRef,
        observed: Concrete,
    ) -> ExecutionResult<ExprRef> {
        let id = receiver_id(receiver)?;
        Ok(heal_slot(
            self.fields.get_mut(&FieldKey::new(owner, name)),
            id,
            observed,
        ))
    }

    /// Stored value without a concrete comparison.
    pub fn peek_field(&self, owner: &str, name: &str, receiver: &ExprRef) -> Option<ExprRef> {
        let id = receiver.as_reference()?.instance_id;
        self.fields
            .get(&FieldKey::new(owner, name))
            .and_then(|slots| slots.get(&id))
            .cloned()
    }

    pub fn put_static(&mut self, owner: &str, name: &str, value: &ExprRef) {
        store(&mut self.statics, FieldKey::new(owner, name), value);
    }

    pub fn get_static(&mut self, owner: &str, name: &str, observed: Concrete) -> ExprRef {
        heal(&mut self.statics, FieldKey::new(owner, name), observed)
    }

    pub fn array_store(
        &mut self,
        array: &ExprRef,
        index: i32,
        value: &ExprRef,
    ) -> ExecutionResult<()> {
        let id = receiver_id(array)?;
        store(self.arrays.entry(id).or_default(), index, value);
        Ok(())
    }

    pub fn array_load(
        &mut self,
        array: &ExprRef,
        index: i32,
        observed: Concrete,
    ) -> ExecutionResult<ExprRef> {
        let id = receiver_id(array)?;
        Ok(heal_slot(self.arrays.get_mut(&id), index, observed))
    }

    pub fn field_entry_count(&self, owner: &str, name: &str) -> usize {
        self.fields
            .get(&FieldKey::new(owner, name))
            .map(|slots| slots.len())
            .unwrap_or(0)
    }

    pub fn static_entry_count(&self) -> usize {
        self.statics.len()
    }

    /// Total number of stored symbolic values.
    pub fn entry_count(&self) -> usize {
        self.fields.values().map(|s| s.len()).sum::<usize>()
            + self.statics.len()
            + self.arrays.values().map(|s| s.len()).sum::<usize>()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Whether the concrete object behind `reference` has been collected.
    /// Null and unbound references are never collectable.
    pub fn is_collectable(&self, reference: &ExprRef) -> bool {
        match reference.as_ref() {
            Expression::Reference(r) => r.is_collected(),
            _ => false,
        }
    }

    /// Drops reference-table and heap entries of collected objects.
    /// Returns the number of dropped references.
    pub fn purge_collected(&mut self) -> usize {
        let dead: Vec<(ObjectId, usize)> = self
            .references
            .iter()
            .filter_map(|(id, e)| match e.as_ref() {
                Expression::Reference(r) if r.is_collected() => Some((*id, r.instance_id)),
                _ => None,
            })
            .collect();
        for (object_id, instance_id) in &dead {
            self.references.remove(object_id);
            self.arrays.remove(instance_id);
            for slots in self.fields.values_mut() {
                slots.remove(instance_id);
            }
        }
        self.fields.retain(|_, slots| !slots.is_empty());
        if !dead.is_empty() {
            debug!("purged {} collected references", dead.len());
        }
        dead.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::concrete::ConcreteObject;

    #[test]
    fn test_reads_do_not_allocate_sections() {
        let mut heap = SymbolicHeap::new();
        let obj = ConcreteObject::new_instance("demo.Main");
        let arr = ConcreteObject::new_array("int[]", 3);
        let receiver = heap.get_reference(Some(&obj));
        let array = heap.get_reference(Some(&arr));

        let loaded = heap
            .get_field("demo.Main", "count", &receiver, Concrete::Integer(4))
            .unwrap();
        assert_eq!(loaded.integer_value(), Some(4));
        let loaded = heap.array_load(&array, 1, Concrete::Integer(0)).unwrap();
        assert_eq!(loaded.integer_value(), Some(0));

        assert!(heap.fields.is_empty());
        assert!(heap.arrays.is_empty());
    }
}
