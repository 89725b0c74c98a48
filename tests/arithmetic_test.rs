mod utils;

use std::sync::Arc;

use concolic::executor::callback::{ArithmeticOp, Callback, LocalOp};
use concolic::executor::concrete::ConcreteValue;
use concolic::executor::expression_factory::{add, build_integer, integer_variable, mul};
use concolic::executor::symbolic_value::{Concrete, Operator, Sort};

use utils::{
    arithmetic, binary, enter, executor, load, pending, push_double, push_int, run, top,
};

#[test]
fn test_addition_keeps_constant_on_the_left() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    run(
        &mut sexe,
        &[load(Sort::Int32, 0), push_int(3), binary(Operator::Add, Sort::Int32)],
    );
    let result = top(&mut sexe);
    assert_eq!(result.to_string(), "(3 + x)");
    assert_eq!(result.integer_value(), Some(8));
}

#[test]
fn test_constant_arithmetic_wraps() {
    let mut sexe = executor();
    run(
        &mut sexe,
        &[
            push_int(i32::MAX),
            push_int(1),
            binary(Operator::Add, Sort::Int32),
        ],
    );
    let result = top(&mut sexe);
    assert!(result.is_constant());
    assert_eq!(result.integer_value(), Some(i32::MIN as i64));

    run(
        &mut sexe,
        &[
            push_int(i32::MIN),
            arithmetic(ArithmeticOp::Negate { sort: Sort::Int32 }),
        ],
    );
    assert_eq!(top(&mut sexe).integer_value(), Some(i32::MIN as i64));
}

#[test]
fn test_zero_divisor_records_constraint_and_pushes_nothing() {
    let mut sexe = executor();
    enter(
        &mut sexe,
        "pair",
        "(II)V",
        &[("x", ConcreteValue::Int(7)), ("y", ConcreteValue::Int(0))],
    );
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            load(Sort::Int32, 1),
            binary(Operator::Div, Sort::Int32),
        ],
    );
    assert_eq!(pending(&sexe), vec!["y == 0"]);
    assert!(sexe.cur_state.stack().unwrap().is_empty());
    assert!(!sexe.is_failed());
}

#[test]
fn test_nonzero_divisor_truncates() {
    let mut sexe = executor();
    enter(
        &mut sexe,
        "pair",
        "(II)V",
        &[("x", ConcreteValue::Int(-7)), ("y", ConcreteValue::Int(2))],
    );
    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            load(Sort::Int32, 1),
            binary(Operator::Div, Sort::Int32),
        ],
    );
    assert_eq!(pending(&sexe), vec!["y != 0"]);
    let quotient = top(&mut sexe);
    assert_eq!(quotient.to_string(), "(x / y)");
    assert_eq!(quotient.integer_value(), Some(-3));

    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            load(Sort::Int32, 1),
            binary(Operator::Rem, Sort::Int32),
        ],
    );
    assert_eq!(top(&mut sexe).integer_value(), Some(-1));
}

#[test]
fn test_concrete_zero_divisor_adds_no_constraint() {
    let mut sexe = executor();
    run(
        &mut sexe,
        &[push_int(7), push_int(0), binary(Operator::Div, Sort::Int32)],
    );
    assert!(pending(&sexe).is_empty());
    assert!(sexe.cur_state.stack().unwrap().is_empty());
}

#[test]
fn test_real_division_is_unchecked() {
    let mut sexe = executor();
    enter(
        &mut sexe,
        "scale",
        "(ID)D",
        &[("k", ConcreteValue::Int(1)), ("d", ConcreteValue::Double(1.0))],
    );
    run(
        &mut sexe,
        &[
            load(Sort::Real64, 1),
            push_double(0.0),
            binary(Operator::Div, Sort::Real64),
        ],
    );
    assert!(pending(&sexe).is_empty());
    assert_eq!(top(&mut sexe).real_value(), Some(f64::INFINITY));
}

#[test]
fn test_shift_distance_is_masked() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(1))]);
    run(
        &mut sexe,
        &[load(Sort::Int32, 0), push_int(33), binary(Operator::Shl, Sort::Int32)],
    );
    let shifted = top(&mut sexe);
    assert_eq!(shifted.to_string(), "(x << 33)");
    assert_eq!(shifted.integer_value(), Some(2));
}

#[test]
fn test_nan_compares_as_greater() {
    let mut sexe = executor();
    enter(
        &mut sexe,
        "scale",
        "(ID)D",
        &[("k", ConcreteValue::Int(1)), ("d", ConcreteValue::Double(f64::NAN))],
    );
    run(
        &mut sexe,
        &[
            load(Sort::Real64, 1),
            push_double(0.0),
            arithmetic(ArithmeticOp::Compare { sort: Sort::Real64 }),
        ],
    );
    let result = top(&mut sexe);
    assert_eq!(result.to_string(), "(cmp d 0.0)");
    assert_eq!(result.integer_value(), Some(1));
}

#[test]
fn test_conversions() {
    let mut sexe = executor();
    enter(
        &mut sexe,
        "scale",
        "(ID)D",
        &[("k", ConcreteValue::Int(200)), ("d", ConcreteValue::Double(1e20))],
    );

    run(
        &mut sexe,
        &[
            load(Sort::Real64, 1),
            arithmetic(ArithmeticOp::Convert {
                from: Sort::Real64,
                to: Sort::Int32,
            }),
        ],
    );
    let saturated = top(&mut sexe);
    assert_eq!(saturated.to_string(), "(r2i d)");
    assert_eq!(saturated.integer_value(), Some(i32::MAX as i64));

    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            arithmetic(ArithmeticOp::Narrow {
                op: Operator::ToByte,
            }),
        ],
    );
    let narrowed = top(&mut sexe);
    assert_eq!(narrowed.to_string(), "(i2b k)");
    assert_eq!(narrowed.integer_value(), Some(-56));

    run(
        &mut sexe,
        &[
            load(Sort::Int32, 0),
            arithmetic(ArithmeticOp::Convert {
                from: Sort::Int32,
                to: Sort::Int64,
            }),
        ],
    );
    let widened = sexe.cur_state.stack().unwrap().peek(0).unwrap().clone();
    assert_eq!(widened.kind_name(), "bv64");
    assert_eq!(widened.expression().to_string(), "k");
}

#[test]
fn test_long_to_int_truncates() {
    let mut sexe = executor();
    let n = (1i64 << 32) + 5;
    enter(&mut sexe, "twice", "(J)J", &[("n", ConcreteValue::Long(n))]);
    run(
        &mut sexe,
        &[
            load(Sort::Int64, 0),
            arithmetic(ArithmeticOp::Convert {
                from: Sort::Int64,
                to: Sort::Int32,
            }),
        ],
    );
    let truncated = top(&mut sexe);
    assert_eq!(truncated.to_string(), "(l2i n)");
    assert_eq!(truncated.integer_value(), Some(5));
}

#[test]
fn test_increment_reassociates_constants() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    run(
        &mut sexe,
        &[
            Callback::Local(LocalOp::Increment { index: 0, delta: 5 }),
            Callback::Local(LocalOp::Increment { index: 0, delta: 2 }),
        ],
    );
    let local = sexe.cur_state.locals().unwrap().get(0).unwrap().clone();
    assert_eq!(local.expression().to_string(), "(7 + x)");
    assert!(matches!(local.expression().concrete(), Concrete::Integer(12)));
}

#[test]
fn test_operand_kind_mismatch_is_an_error() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(5))]);
    assert!(!sexe.handle(&load(Sort::Int64, 0)));
    assert!(sexe.is_failed());
    assert!(sexe.first_error().map(|e| e.is_internal()).unwrap_or(false));
}

#[test]
fn test_additive_and_multiplicative_identities() {
    let x = integer_variable("x", Sort::Int32, 7);
    let zero = build_integer(0);
    let one = build_integer(1);

    for sum in [add(Sort::Int32, &x, &zero).unwrap(), add(Sort::Int32, &zero, &x).unwrap()] {
        assert!(Arc::ptr_eq(&sum, &x));
    }
    for product in [mul(Sort::Int32, &x, &one).unwrap(), mul(Sort::Int32, &one, &x).unwrap()] {
        assert!(Arc::ptr_eq(&product, &x));
    }
    for product in [mul(Sort::Int32, &x, &zero).unwrap(), mul(Sort::Int32, &zero, &x).unwrap()] {
        assert!(product.is_constant());
        assert_eq!(product.integer_value(), Some(0));
    }
}

#[test]
fn test_identities_through_the_interpreter() {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(7))]);
    run(
        &mut sexe,
        &[load(Sort::Int32, 0), push_int(0), binary(Operator::Add, Sort::Int32)],
    );
    assert_eq!(top(&mut sexe).to_string(), "x");

    run(
        &mut sexe,
        &[push_int(1), load(Sort::Int32, 0), binary(Operator::Mul, Sort::Int32)],
    );
    assert_eq!(top(&mut sexe).to_string(), "x");

    run(
        &mut sexe,
        &[load(Sort::Int32, 0), push_int(0), binary(Operator::Mul, Sort::Int32)],
    );
    let product = top(&mut sexe);
    assert!(product.is_constant());
    assert_eq!(product.integer_value(), Some(0));
}
