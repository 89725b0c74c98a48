use std::fmt;

use crate::executor::error::StackError;
use crate::executor::symbolic_value::{ExprRef, Sort};

/// A symbolic operand, tagged with the computational category of the slot(s)
/// it occupies on the concrete operand stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// int, short, char, byte and boolean values.
    Bv32(ExprRef),
    Bv64(ExprRef),
    Fp32(ExprRef),
    Fp64(ExprRef),
    Ref(ExprRef),
}

impl Operand {
    pub fn of_sort(sort: Sort, expr: ExprRef) -> Operand {
        match sort {
            Sort::Int32 => Operand::Bv32(expr),
            Sort::Int64 => Operand::Bv64(expr),
            Sort::Real32 => Operand::Fp32(expr),
            Sort::Real64 => Operand::Fp64(expr),
            Sort::Str | Sort::Ref => Operand::Ref(expr),
        }
    }

    pub fn expression(&self) -> &ExprRef {
        match self {
            Operand::Bv32(e)
            | Operand::Bv64(e)
            | Operand::Fp32(e)
            | Operand::Fp64(e)
            | Operand::Ref(e) => e,
        }
    }

    pub fn into_expression(self) -> ExprRef {
        match self {
            Operand::Bv32(e)
            | Operand::Bv64(e)
            | Operand::Fp32(e)
            | Operand::Fp64(e)
            | Operand::Ref(e) => e,
        }
    }

    pub fn is_double_word(&self) -> bool {
        matches!(self, Operand::Bv64(_) | Operand::Fp64(_))
    }

    /// Number of concrete stack slots the operand occupies.
    pub fn slots(&self) -> usize {
        if self.is_double_word() {
            2
        } else {
            1
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Bv32(_) => "bv32",
            Operand::Bv64(_) => "bv64",
            Operand::Fp32(_) => "fp32",
            Operand::Fp64(_) => "fp64",
            Operand::Ref(_) => "reference",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_name(), self.expression())
    }
}

macro_rules! typed_pop {
    ($name:ident, $variant:ident, $label:expr) => {
        pub fn $name(&mut self) -> Result<ExprRef, StackError> {
            match self.pop_operand()? {
                Operand::$variant(e) => Ok(e),
                other => Err(StackError::KindMismatch {
                    expected: $label,
                    found: other.kind_name(),
                }),
            }
        }
    };
}

/// Symbolic mirror of one frame's operand stack.
#[derive(Clone, Debug, Default)]
pub struct OperandStack {
    operands: Vec<Operand>,
}

impl OperandStack {
    pub fn new() -> Self {
        OperandStack {
            operands: Vec::new(),
        }
    }

    pub fn push(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    pub fn push_bv32(&mut self, e: ExprRef) {
        self.operands.push(Operand::Bv32(e));
    }

    pub fn push_bv64(&mut self, e: ExprRef) {
        self.operands.push(Operand::Bv64(e));
    }

    pub fn push_fp32(&mut self, e: ExprRef) {
        self.operands.push(Operand::Fp32(e));
    }

    pub fn push_fp64(&mut self, e: ExprRef) {
        self.operands.push(Operand::Fp64(e));
    }

    pub fn push_ref(&mut self, e: ExprRef) {
        self.operands.push(Operand::Ref(e));
    }

    pub fn pop_operand(&mut self) -> Result<Operand, StackError> {
        self.operands.pop().ok_or(StackError::Underflow {
            needed: 1,
            have: 0,
        })
    }

    typed_pop!(pop_bv32, Bv32, "bv32");
    typed_pop!(pop_bv64, Bv64, "bv64");
    typed_pop!(pop_fp32, Fp32, "fp32");
    typed_pop!(pop_fp64, Fp64, "fp64");
    typed_pop!(pop_ref, Ref, "reference");

    /// Pops operands covering exactly `slots` concrete slots, returned in
    /// push order (deepest first).
    pub fn pop_slots(&mut self, slots: usize) -> Result<Vec<Operand>, StackError> {
        let mut taken = 0;
        let mut popped = Vec::new();
        while taken < slots {
            let operand = self.operands.pop().ok_or(StackError::Underflow {
                needed: slots,
                have: taken,
            })?;
            taken += operand.slots();
            popped.push(operand);
        }
        if taken != slots {
            return Err(StackError::SplitDoubleWord(slots));
        }
        popped.reverse();
        Ok(popped)
    }

    /// Operand at `depth` from the top (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<&Operand, StackError> {
        let len = self.operands.len();
        if depth >= len {
            return Err(StackError::Underflow {
                needed: depth + 1,
                have: len,
            });
        }
        Ok(&self.operands[len - 1 - depth])
    }

    pub fn clear(&mut self) {
        self.operands.clear();
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Iterates from the top of the stack downwards.
    pub fn iter(&self) -> impl Iterator<Item = &Operand> {
        self.operands.iter().rev()
    }
}

/// Local variable slots of one frame.
///
/// A double-word local occupies the single logical slot at its index.
#[derive(Clone, Debug)]
pub struct LocalsTable {
    slots: Vec<Option<Operand>>,
    max_locals: usize,
}

impl LocalsTable {
    pub fn new(max_locals: usize) -> Self {
        LocalsTable {
            slots: Vec::new(),
            max_locals,
        }
    }

    pub fn max_locals(&self) -> usize {
        self.max_locals
    }

    pub fn set(&mut self, index: usize, operand: Operand) -> Result<(), StackError> {
        if index >= self.max_locals {
            return Err(StackError::LocalOutOfRange {
                index,
                max: self.max_locals,
            });
        }
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(operand);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&Operand, StackError> {
        self.slots
            .get(index)
            .and_then(|s| s.as_ref())
            .ok_or(StackError::MissingLocal(index))
    }

    pub fn is_set(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Operand)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|o| (i, o)))
    }
}
