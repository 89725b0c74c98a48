/// Pops an operand of the given `Sort` from an `OperandStack`.
#[macro_export]
macro_rules! pop_sorted {
    ($stack:expr, $sort:expr) => {
        match $sort {
            $crate::executor::symbolic_value::Sort::Int32 => $stack.pop_bv32(),
            $crate::executor::symbolic_value::Sort::Int64 => $stack.pop_bv64(),
            $crate::executor::symbolic_value::Sort::Real32 => $stack.pop_fp32(),
            $crate::executor::symbolic_value::Sort::Real64 => $stack.pop_fp64(),
            $crate::executor::symbolic_value::Sort::Str
            | $crate::executor::symbolic_value::Sort::Ref => $stack.pop_ref(),
        }
    };
}

/// Pops `right` then `left` of `$sort`, pushes `$builder($sort, &left, &right)`.
#[macro_export]
macro_rules! binary_op {
    ($state:expr, $sort:expr, $builder:path) => {{
        let sort = $sort;
        let stack = $state.stack()?;
        let right = $crate::pop_sorted!(stack, sort)?;
        let left = $crate::pop_sorted!(stack, sort)?;
        let result = $builder(sort, &left, &right)?;
        stack.push($crate::executor::operand_stack::Operand::of_sort(sort, result));
    }};
}

/// Pops one operand of `$sort`, pushes `$builder($sort, &operand)`.
#[macro_export]
macro_rules! unary_op {
    ($state:expr, $sort:expr, $builder:path) => {{
        let sort = $sort;
        let stack = $state.stack()?;
        let operand = $crate::pop_sorted!(stack, sort)?;
        let result = $builder(sort, &operand)?;
        stack.push($crate::executor::operand_stack::Operand::of_sort(sort, result));
    }};
}
