mod utils;

use concolic::executor::callback::{ArithmeticOp, CallOp, Callback, HeapOp, StackOp};
use concolic::executor::concrete::{ConcreteObject, ConcreteValue};
use concolic::executor::symbolic_value::{Operator, Sort};

use utils::{
    arithmetic, binary, enter, executor, load, push, push_int, push_long, run, stack, top, MAIN,
};

fn call(op: CallOp) -> Callback {
    Callback::Call(op)
}

fn method(name: &str, descriptor: &str) -> (String, String, String) {
    (MAIN.to_string(), name.to_string(), descriptor.to_string())
}

fn invoke_static(name: &str, descriptor: &str) -> Callback {
    let (owner, name, descriptor) = method(name, descriptor);
    call(CallOp::InvokeStatic {
        owner,
        name,
        descriptor,
    })
}

fn library_static(owner: &str, name: &str, descriptor: &str) -> Callback {
    call(CallOp::InvokeStatic {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    })
}

fn library_result(owner: &str, name: &str, descriptor: &str, value: Option<ConcreteValue>) -> Callback {
    call(CallOp::CallResult {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        value,
    })
}

fn method_begin(name: &str, descriptor: &str) -> Callback {
    let (owner, name, descriptor) = method(name, descriptor);
    call(CallOp::MethodBegin {
        owner,
        name,
        descriptor,
    })
}

fn call_result(name: &str, descriptor: &str, value: Option<ConcreteValue>) -> Callback {
    let (owner, name, descriptor) = method(name, descriptor);
    call(CallOp::CallResult {
        owner,
        name,
        descriptor,
        value,
    })
}

#[test]
fn test_instrumented_call_transfers_arguments_and_result() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            arithmetic(ArithmeticOp::Convert {
                from: Sort::Int32,
                to: Sort::Int64,
            }),
            invoke_static("twice", "(J)J"),
            method_begin("twice", "(J)J"),
            // Reported for every entry; the shadow already holds the argument.
            call(CallOp::MethodBeginParam {
                nr: 0,
                index: 0,
                value: ConcreteValue::Long(5),
            }),
        ],
    );
    assert_eq!(sexe.cur_state.frames.depth(), 3);
    let param = sexe.cur_state.locals().unwrap().get(0).unwrap().clone();
    assert_eq!(param.kind_name(), "bv64");
    assert!(param.expression().contains_variable());

    run(
        &mut sexe,
        &[
            load(Sort::Int64, 0),
            push_long(2),
            binary(Operator::Mul, Sort::Int64),
            call(CallOp::Return {
                sort: Some(Sort::Int64),
            }),
            call_result("twice", "(J)J", Some(ConcreteValue::Long(10))),
        ],
    );
    assert_eq!(sexe.cur_state.frames.depth(), 2);
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    let result = top(&mut sexe);
    assert_eq!(result.integer_value(), Some(10));
    assert!(result.variables().contains("x"));
}

#[test]
fn test_uninstrumented_call_result_is_concrete() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(-5))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            library_static("java.lang.Integer", "signum", "(I)I"),
            library_result("java.lang.Integer", "signum", "(I)I", Some(ConcreteValue::Int(-1))),
        ],
    );
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    let result = top(&mut sexe);
    assert!(result.is_constant());
    assert_eq!(result.integer_value(), Some(-1));
}

#[test]
fn test_math_abs_keeps_the_argument() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(-5))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            library_static("java.lang.Math", "abs", "(I)I"),
            library_result("java.lang.Math", "abs", "(I)I", Some(ConcreteValue::Int(5))),
        ],
    );
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    let result = top(&mut sexe);
    assert_eq!(result.to_string(), "(abs x)");
    assert_eq!(result.integer_value(), Some(5));
}

#[test]
fn test_math_max_of_two_longs() {
    let mut sexe = executor();
    enter(&mut sexe, "twice", "(J)J", &[("n", ConcreteValue::Long(3))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int64, 0),
            push_long(9),
            library_static("java.lang.Math", "max", "(JJ)J"),
            library_result("java.lang.Math", "max", "(JJ)J", Some(ConcreteValue::Long(9))),
        ],
    );
    let result = top(&mut sexe);
    assert_eq!(result.to_string(), "(max n 9)");
    assert_eq!(result.integer_value(), Some(9));
}

#[test]
fn test_model_disagreeing_with_observation_is_dropped() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(-5))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            library_static("java.lang.Math", "abs", "(I)I"),
            library_result("java.lang.Math", "abs", "(I)I", Some(ConcreteValue::Int(6))),
        ],
    );
    let result = top(&mut sexe);
    assert!(result.is_constant());
    assert_eq!(result.integer_value(), Some(6));
    assert!(!sexe.is_failed());
}

#[test]
fn test_boxing_round_trip_keeps_the_input() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(7))]);
    let boxed = ConcreteObject::new_instance("java.lang.Integer");
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            library_static("java.lang.Integer", "valueOf", "(I)Ljava/lang/Integer;"),
            library_result(
                "java.lang.Integer",
                "valueOf",
                "(I)Ljava/lang/Integer;",
                Some(ConcreteValue::object(&boxed)),
            ),
        ],
    );
    let reference = top(&mut sexe);
    assert_eq!(&*reference.as_reference().unwrap().type_name, "java.lang.Integer");
    assert_eq!(
        sexe.cur_state.heap.field_entry_count("java.lang.Integer", "$intValue"),
        1
    );

    run(
        &mut sexe,
        &[
            call(CallOp::InvokeVirtual {
                owner: "java.lang.Integer".to_string(),
                name: "intValue".to_string(),
                descriptor: "()I".to_string(),
                receiver: Some(boxed.clone()),
            }),
            library_result("java.lang.Integer", "intValue", "()I", Some(ConcreteValue::Int(7))),
        ],
    );
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    assert_eq!(top(&mut sexe).to_string(), "x");
}

#[test]
fn test_boxing_constructor_stores_the_argument() {
    let mut sexe = executor();
    enter(&mut sexe, "twice", "(J)J", &[("n", ConcreteValue::Long(4))]);
    let boxed = ConcreteObject::new_instance("java.lang.Long");
    run(
        &mut sexe,
        &[
            Callback::Heap(HeapOp::New {
                type_name: "java.lang.Long".to_string(),
            }),
            stack(StackOp::Dup),
            load(Sort::Int64, 0),
            call(CallOp::InvokeSpecial {
                owner: "java.lang.Long".to_string(),
                name: "<init>".to_string(),
                descriptor: "(J)V".to_string(),
            }),
            library_result("java.lang.Long", "<init>", "(J)V", None),
            call(CallOp::InvokeVirtual {
                owner: "java.lang.Long".to_string(),
                name: "longValue".to_string(),
                descriptor: "()J".to_string(),
                receiver: Some(boxed.clone()),
            }),
            library_result("java.lang.Long", "longValue", "()J", Some(ConcreteValue::Long(4))),
        ],
    );
    assert!(!sexe.is_failed());
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    assert_eq!(top(&mut sexe).to_string(), "n");
}

#[test]
fn test_stale_boxed_value_is_healed() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(7))]);
    let boxed = ConcreteObject::new_instance("java.lang.Integer");
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            library_static("java.lang.Integer", "valueOf", "(I)Ljava/lang/Integer;"),
            library_result(
                "java.lang.Integer",
                "valueOf",
                "(I)Ljava/lang/Integer;",
                Some(ConcreteValue::object(&boxed)),
            ),
            call(CallOp::InvokeVirtual {
                owner: "java.lang.Integer".to_string(),
                name: "intValue".to_string(),
                descriptor: "()I".to_string(),
                receiver: Some(boxed.clone()),
            }),
            library_result("java.lang.Integer", "intValue", "()I", Some(ConcreteValue::Int(8))),
        ],
    );
    let result = top(&mut sexe);
    assert!(result.is_constant());
    assert_eq!(result.integer_value(), Some(8));
    assert_eq!(
        sexe.cur_state.heap.field_entry_count("java.lang.Integer", "$intValue"),
        0
    );
}

#[test]
fn test_native_method_is_uninstrumented() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(3))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            invoke_static("hash", "(I)I"),
            call_result("hash", "(I)I", Some(ConcreteValue::Int(42))),
        ],
    );
    assert!(!sexe.cur_state.top_frame().unwrap().invoked_instrumented());
    assert_eq!(top(&mut sexe).integer_value(), Some(42));
}

#[test]
fn test_entry_from_uninstrumented_code_uses_reported_values() {
    let mut sexe = executor();
    run(
        &mut sexe,
        &[
            method_begin("check", "(I)V"),
            call(CallOp::MethodBeginParam {
                nr: 0,
                index: 0,
                value: ConcreteValue::Int(4),
            }),
            load(Sort::Int32, 0),
        ],
    );
    let value = top(&mut sexe);
    assert!(value.is_constant());
    assert_eq!(value.integer_value(), Some(4));
}

#[test]
fn test_virtual_call_copies_receiver() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(8))]);
    let obj = ConcreteObject::new_instance(MAIN);
    run(
        &mut sexe,
        &[
            push(ConcreteValue::object(&obj)),
            load(Sort::Int32, 0),
            call(CallOp::InvokeVirtual {
                owner: MAIN.to_string(),
                name: "update".to_string(),
                descriptor: "(I)V".to_string(),
                receiver: Some(obj.clone()),
            }),
            method_begin("update", "(I)V"),
            call(CallOp::MethodBeginReceiver {
                receiver: obj.clone(),
            }),
            load(Sort::Ref, 0),
            load(Sort::Int32, 1),
            Callback::Heap(HeapOp::PutField {
                owner: MAIN.to_string(),
                name: "count".to_string(),
                receiver: Some(obj.clone()),
            }),
            call(CallOp::Return { sort: None }),
            call_result("update", "(I)V", None),
        ],
    );
    assert!(sexe.cur_state.stack().unwrap().is_empty());
    assert_eq!(sexe.cur_state.heap.field_entry_count(MAIN, "count"), 1);
    assert_eq!(sexe.cur_state.heap.reference_count(), 1);
}

#[test]
fn test_constructor_entered_from_uninstrumented_code_binds_receiver() {
    let mut sexe = executor();
    let obj = ConcreteObject::new_instance(MAIN);
    run(
        &mut sexe,
        &[
            method_begin("<init>", "()V"),
            call(CallOp::MethodBeginReceiver {
                receiver: obj.clone(),
            }),
            load(Sort::Ref, 0),
        ],
    );
    let this = top(&mut sexe);
    let known = sexe.cur_state.heap.get_reference(Some(&obj));
    assert_eq!(this.to_string(), known.to_string());
    assert_eq!(sexe.cur_state.heap.reference_count(), 1);
}

#[test]
fn test_static_initializer_frame() {
    let mut sexe = executor();
    run(
        &mut sexe,
        &[
            method_begin("<clinit>", "()V"),
            push_int(1),
            Callback::Heap(HeapOp::PutStatic {
                owner: MAIN.to_string(),
                name: "total".to_string(),
            }),
            call(CallOp::Return { sort: None }),
        ],
    );
    assert_eq!(sexe.cur_state.frames.depth(), 1);
    assert_eq!(sexe.cur_state.heap.static_entry_count(), 0);
}

#[test]
fn test_handler_unwinds_to_catching_frame() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(1))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            arithmetic(ArithmeticOp::Convert {
                from: Sort::Int32,
                to: Sort::Int64,
            }),
            invoke_static("twice", "(J)J"),
            method_begin("twice", "(J)J"),
            push_int(3),
            call(CallOp::HandlerBegin {
                owner: MAIN.to_string(),
                name: "check".to_string(),
                descriptor: "(I)V".to_string(),
            }),
        ],
    );
    assert_eq!(sexe.cur_state.frames.depth(), 2);
    assert_eq!(sexe.cur_state.stack().unwrap().len(), 1);
    let exception = top(&mut sexe);
    assert_eq!(
        exception.as_reference().map(|r| r.type_name.to_string()),
        Some("java.lang.Throwable".to_string())
    );
}

#[test]
fn test_handler_without_matching_frame_stops_at_bottom() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(1))]);
    run(
        &mut sexe,
        &[call(CallOp::HandlerBegin {
            owner: MAIN.to_string(),
            name: "pair".to_string(),
            descriptor: "(II)V".to_string(),
        })],
    );
    assert_eq!(sexe.cur_state.frames.depth(), 1);
    assert!(top(&mut sexe).is_reference());
}

#[test]
fn test_unknown_method_is_a_resolution_failure() {
    let mut sexe = executor();
    assert!(!sexe.handle(&method_begin("missing", "()V")));
    assert!(sexe
        .first_error()
        .map(|e| e.is_resolution_failure())
        .unwrap_or(false));
}
