mod utils;

use std::sync::Arc;

use concolic::executor::callback::{Callback, HeapOp};
use concolic::executor::concrete::{ConcreteObject, ConcreteValue, JAVA_LANG_STRING};
use concolic::executor::symbolic_heap::{SymbolicHeap, STRING_VALUE_FIELD};
use concolic::executor::symbolic_setting::get_default_setting_for_concolic_execution;
use concolic::executor::symbolic_value::{Concrete, Sort};
use concolic::executor::type_registry::ClassInfo;

use utils::{enter, executor, executor_with, load, main_class, pending, push, push_int, run, store, top, MAIN};

fn heap(op: HeapOp) -> Callback {
    Callback::Heap(op)
}

#[test]
fn test_array_with_symbolic_length() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(3))]);
    let arr = ConcreteObject::new_array("int[]", 3);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            heap(HeapOp::NewArray {
                type_name: "int[]".to_string(),
                length: 3,
            }),
            store(Sort::Ref, 1),
            load(Sort::Ref, 1),
            heap(HeapOp::ArrayLength {
                array: Some(arr.clone()),
            }),
        ],
    );
    assert_eq!(top(&mut sexe).to_string(), "x");

    run(
        &mut sexe,
        &[
            load(Sort::Ref, 1),
            push_int(1),
            load(Sort::Int32, 0),
            heap(HeapOp::ArrayStore {
                array: Some(arr.clone()),
                index: 1,
            }),
            load(Sort::Ref, 1),
            push_int(1),
            heap(HeapOp::ArrayLoad {
                sort: Sort::Int32,
                array: Some(arr.clone()),
                index: 1,
                value: ConcreteValue::Int(3),
            }),
        ],
    );
    assert_eq!(top(&mut sexe).to_string(), "x");
    assert_eq!(pending(&sexe), vec!["x >= 0", "1 < x", "1 < x"]);
}

#[test]
fn test_negative_array_length() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(-1))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            heap(HeapOp::NewArray {
                type_name: "int[]".to_string(),
                length: -1,
            }),
        ],
    );
    assert_eq!(pending(&sexe), vec!["x < 0"]);
    assert!(sexe.cur_state.stack().unwrap().is_empty());
}

#[test]
fn test_index_out_of_bounds_stores_nothing() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    let arr = ConcreteObject::new_array("int[]", 2);
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&arr)),
            load(Sort::Int32, 0),
            load(Sort::Int32, 0),
            heap(HeapOp::ArrayStore {
                array: Some(arr.clone()),
                index: 5,
            }),
        ],
    );
    assert_eq!(pending(&sexe), vec!["x >= 0", "x >= 2"]);
    assert_eq!(sexe.cur_state.heap.entry_count(), 0);
    assert!(sexe.cur_state.stack().unwrap().is_empty());
}

#[test]
fn test_negative_index_stops_checks() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(-2))]);
    let arr = ConcreteObject::new_array("int[]", 2);
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&arr)),
            load(Sort::Int32, 0),
            heap(HeapOp::ArrayLoad {
                sort: Sort::Int32,
                array: Some(arr.clone()),
                index: -2,
                value: ConcreteValue::Int(0),
            }),
        ],
    );
    assert_eq!(pending(&sexe), vec!["x < 0"]);
    assert!(sexe.cur_state.stack().unwrap().is_empty());
}

#[test]
fn test_null_array_records_nothing() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(0))]);
    run(
        &mut sexe,
        &[
            push(ConcreteValue::null()),
            load(Sort::Int32, 0),
            heap(HeapOp::ArrayLoad {
                sort: Sort::Int32,
                array: None,
                index: 0,
                value: ConcreteValue::Int(0),
            }),
        ],
    );
    assert!(pending(&sexe).is_empty());
    assert!(sexe.cur_state.stack().unwrap().is_empty());
    assert!(!sexe.is_failed());
}

#[test]
fn test_instance_field_round_trip_and_healing() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    let obj = ConcreteObject::new_instance(MAIN);
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&obj)),
            load(Sort::Int32, 0),
            heap(HeapOp::PutField {
                owner: MAIN.to_string(),
                name: "count".to_string(),
                receiver: Some(obj.clone()),
            }),
            push(ConcreteValue::object(&obj)),
            heap(HeapOp::GetField {
                owner: MAIN.to_string(),
                name: "count".to_string(),
                receiver: Some(obj.clone()),
                value: ConcreteValue::Int(5),
            }),
        ],
    );
    assert_eq!(top(&mut sexe).to_string(), "x");
    assert_eq!(sexe.cur_state.heap.field_entry_count(MAIN, "count"), 1);

    // Uninstrumented code changed the field behind our back.
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&obj)),
            heap(HeapOp::GetField {
                owner: MAIN.to_string(),
                name: "count".to_string(),
                receiver: Some(obj.clone()),
                value: ConcreteValue::Int(6),
            }),
        ],
    );
    let healed = top(&mut sexe);
    assert!(healed.is_constant());
    assert_eq!(healed.integer_value(), Some(6));
    assert_eq!(sexe.cur_state.heap.field_entry_count(MAIN, "count"), 0);
}

#[test]
fn test_inherited_field_is_keyed_by_declaring_class() {
    let sub = ClassInfo::new("demo.Sub").with_super(MAIN);
    let mut sexe = executor_with(
        vec![main_class(), sub],
        get_default_setting_for_concolic_execution(),
    );
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    let obj = ConcreteObject::new_instance("demo.Sub");
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&obj)),
            load(Sort::Int32, 0),
            heap(HeapOp::PutField {
                owner: "demo.Sub".to_string(),
                name: "count".to_string(),
                receiver: Some(obj.clone()),
            }),
        ],
    );
    assert_eq!(sexe.cur_state.heap.field_entry_count(MAIN, "count"), 1);
    assert_eq!(sexe.cur_state.heap.field_entry_count("demo.Sub", "count"), 0);
}

#[test]
fn test_static_field_round_trip() {
    let mut sexe = executor();
    enter(&mut sexe, "twice", "(J)J", &[("n", ConcreteValue::Long(9))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int64, 0),
            heap(HeapOp::PutStatic {
                owner: MAIN.to_string(),
                name: "total".to_string(),
            }),
            heap(HeapOp::GetStatic {
                owner: MAIN.to_string(),
                name: "total".to_string(),
                value: ConcreteValue::Long(9),
            }),
        ],
    );
    assert_eq!(top(&mut sexe).to_string(), "n");
    assert_eq!(sexe.cur_state.heap.static_entry_count(), 1);
}

#[test]
fn test_unregistered_library_static_is_concrete() {
    let mut sexe = executor();
    run(
        &mut sexe,
        &[heap(HeapOp::GetStatic {
            owner: "java.lang.Integer".to_string(),
            name: "MAX_VALUE".to_string(),
            value: ConcreteValue::Int(i32::MAX),
        })],
    );
    assert_eq!(top(&mut sexe).integer_value(), Some(i32::MAX as i64));
}

#[test]
fn test_string_concatenation_tracks_symbolic_text() {
    let mut sexe = executor();
    let s = ConcreteObject::new_string("ab");
    enter(
        &mut sexe,
        "describe",
        "(Ljava/lang/String;)Ljava/lang/String;",
        &[("s", ConcreteValue::object(&s))],
    );
    let result = ConcreteObject::new_string("ab-7!");
    run(
        &mut sexe,
        &[
            load(Sort::Ref, 0),
            push_int(7),
            heap(HeapOp::StringConcat {
                result: result.clone(),
                recipe: "\u{1}-\u{1}!".to_string(),
            }),
        ],
    );
    let reference = top(&mut sexe);
    let text = sexe
        .cur_state
        .heap
        .peek_field(JAVA_LANG_STRING, STRING_VALUE_FIELD, &reference)
        .expect("tracked contents");
    assert!(text.variables().contains("s"));
    assert!(text.concrete().same_value(&Concrete::Str("ab-7!".into())));
}

#[test]
fn test_string_concatenation_falls_back_to_observed_text() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(97))]);
    // A char argument renders as a letter, not as its code.
    let result = ConcreteObject::new_string("a");
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            heap(HeapOp::StringConcat {
                result: result.clone(),
                recipe: "\u{1}".to_string(),
            }),
        ],
    );
    let reference = top(&mut sexe);
    assert!(sexe
        .cur_state
        .heap
        .peek_field(JAVA_LANG_STRING, STRING_VALUE_FIELD, &reference)
        .is_none());
}

#[test]
fn test_collected_objects_are_purged() {
    let mut sexe = executor();
    let obj = ConcreteObject::new_instance(MAIN);
    run(&mut sexe, &[push(ConcreteValue::object(&obj))]);
    let reference = top(&mut sexe);
    assert!(!sexe.cur_state.heap.is_collectable(&reference));
    assert_eq!(sexe.cur_state.heap.reference_count(), 1);

    drop(obj);
    assert!(sexe.cur_state.heap.is_collectable(&reference));
    assert_eq!(sexe.cur_state.heap.purge_collected(), 1);
    assert_eq!(sexe.cur_state.heap.reference_count(), 0);
}

#[test]
fn test_concrete_writes_keep_heap_empty() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    let obj = ConcreteObject::new_instance(MAIN);
    let arr = ConcreteObject::new_array("int[]", 4);
    let put_count = || {
        heap(HeapOp::PutField {
            owner: MAIN.to_string(),
            name: "count".to_string(),
            receiver: Some(obj.clone()),
        })
    };
    let store_slot = || {
        heap(HeapOp::ArrayStore {
            array: Some(arr.clone()),
            index: 2,
        })
    };
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&obj)),
            load(Sort::Int32, 0),
            put_count(),
            push(ConcreteValue::object(&arr)),
            push_int(2),
            load(Sort::Int32, 0),
            store_slot(),
        ],
    );
    assert_eq!(sexe.cur_state.heap.entry_count(), 2);

    for n in 1..=50 {
        run(
            &mut sexe,
            &[
                push(ConcreteValue::object(&obj)),
                push_int(n),
                put_count(),
                push(ConcreteValue::object(&arr)),
                push_int(2),
                push_int(n),
                store_slot(),
            ],
        );
        assert_eq!(sexe.cur_state.heap.entry_count(), 0);
    }
    assert!(!sexe.is_failed());
}

#[test]
fn test_same_object_maps_to_same_reference() {
    let mut heap = SymbolicHeap::new();
    let obj = ConcreteObject::new_instance(MAIN);
    let first = heap.get_reference(Some(&obj));
    let second = heap.get_reference(Some(&obj));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(heap.reference_count(), 1);

    let other = heap.get_reference(Some(&ConcreteObject::new_instance(MAIN)));
    assert!(!Arc::ptr_eq(&first, &other));
}
