use std::sync::Arc;

use crate::executor::descriptor::MethodDescriptor;
use crate::executor::error::StackError;
use crate::executor::operand_stack::{LocalsTable, OperandStack};
use crate::executor::type_registry::Member;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FrameKind {
    /// Stands for the uninstrumented code that started the execution.
    Bottom,
    Method,
    Constructor,
    StaticInitializer,
}

/// Shadow of one active invocation.
#[derive(Clone, Debug)]
pub struct Frame {
    pub kind: FrameKind,
    pub member: Option<Member>,
    pub class_name: Option<Arc<str>>,
    pub operand_stack: OperandStack,
    pub locals: LocalsTable,
    invoked_instrumented: bool,
    invoke_needs_this: bool,
    stack_param_count: usize,
}

impl Frame {
    fn with_kind(kind: FrameKind, member: Option<Member>, max_locals: usize) -> Self {
        let class_name = member.as_ref().map(|m| m.owner.clone());
        Frame {
            kind,
            member,
            class_name,
            operand_stack: OperandStack::new(),
            locals: LocalsTable::new(max_locals),
            invoked_instrumented: false,
            invoke_needs_this: false,
            stack_param_count: 0,
        }
    }

    pub fn bottom(max_locals: usize) -> Self {
        Frame::with_kind(FrameKind::Bottom, None, max_locals)
    }

    pub fn method(member: Member, max_locals: usize) -> Self {
        let kind = if member.is_constructor() {
            FrameKind::Constructor
        } else {
            FrameKind::Method
        };
        Frame::with_kind(kind, Some(member), max_locals)
    }

    /// `<clinit>` frames take no parameters.
    pub fn static_initializer(class_name: &str, max_locals: usize) -> Self {
        let mut frame = Frame::with_kind(FrameKind::StaticInitializer, None, max_locals);
        frame.class_name = Some(Arc::from(class_name));
        frame
    }

    pub fn is_bottom(&self) -> bool {
        self.kind == FrameKind::Bottom
    }

    /// Records the target of the call this frame is about to make.
    pub fn invoke(&mut self, needs_this: bool, instrumented: bool) {
        self.invoke_needs_this = needs_this;
        self.invoked_instrumented = instrumented;
        self.stack_param_count = 0;
    }

    pub fn set_invoked_instrumented(&mut self, instrumented: bool) {
        self.invoked_instrumented = instrumented;
    }

    /// Whether the call most recently made from this frame targets instrumented code.
    pub fn invoked_instrumented(&self) -> bool {
        self.invoked_instrumented
    }

    pub fn invoke_needs_this(&self) -> bool {
        self.invoke_needs_this
    }

    /// Counts boundary parameter reports of the pending call; returns the
    /// zero-based position of the reported one.
    pub fn next_stack_param(&mut self) -> usize {
        self.stack_param_count += 1;
        self.stack_param_count - 1
    }

    /// Pops the arguments (and receiver) of the call described by `descriptor`.
    pub fn dispose_invoke_args(&mut self, descriptor: &MethodDescriptor) -> Result<(), StackError> {
        for _ in 0..descriptor.params.len() {
            self.operand_stack.pop_operand()?;
        }
        if self.invoke_needs_this {
            self.operand_stack.pop_ref()?;
        }
        Ok(())
    }
}

/// The frames of one execution; the bottom frame is never popped.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new(max_locals: usize) -> Self {
        FrameStack {
            frames: vec![Frame::bottom(max_locals)],
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Result<Frame, StackError> {
        match self.frames.last() {
            None => Err(StackError::NoFrame),
            Some(f) if f.is_bottom() => Err(StackError::BottomFrame),
            Some(_) => self.frames.pop().ok_or(StackError::NoFrame),
        }
    }

    pub fn top(&self) -> Result<&Frame, StackError> {
        self.frames.last().ok_or(StackError::NoFrame)
    }

    pub fn top_mut(&mut self) -> Result<&mut Frame, StackError> {
        self.frames.last_mut().ok_or(StackError::NoFrame)
    }

    /// The frame directly below the top one.
    pub fn caller(&self) -> Result<&Frame, StackError> {
        let len = self.frames.len();
        if len < 2 {
            return Err(StackError::NoCallerFrame);
        }
        Ok(&self.frames[len - 2])
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Pops frames until `is_target` accepts the top one or only the bottom
    /// frame is left. Returns the number of discarded frames and whether a
    /// target was found.
    pub fn discard_until<F>(&mut self, is_target: F) -> (usize, bool)
    where
        F: Fn(&Frame) -> bool,
    {
        let mut discarded = 0;
        for _ in 0..self.frames.len() {
            match self.frames.last() {
                Some(top) if top.is_bottom() => return (discarded, false),
                Some(top) if is_target(top) => return (discarded, true),
                Some(_) => {
                    self.frames.pop();
                    discarded += 1;
                }
                None => break,
            }
        }
        (discarded, false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }
}
