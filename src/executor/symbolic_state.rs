use colored::Colorize;

use crate::executor::error::StackError;
use crate::executor::frame::{Frame, FrameStack};
use crate::executor::operand_stack::{LocalsTable, OperandStack};
use crate::executor::path_condition::PathConditionCollector;
use crate::executor::symbolic_heap::SymbolicHeap;
use crate::executor::symbolic_setting::ExecutorSetting;
use crate::executor::type_registry::TypeRegistry;
use crate::executor::utils::italic;

/// Shadow environment of one concrete execution: frames, heap and the
/// path condition under construction.
pub struct SymbolicState {
    pub frames: FrameStack,
    pub heap: SymbolicHeap,
    pub path: PathConditionCollector,
    pub registry: TypeRegistry,
    pub setting: ExecutorSetting,
    pub is_failed: bool,
}

impl SymbolicState {
    /// Creates an environment holding only the bottom frame.
    ///
    /// # Arguments
    ///
    /// * `registry` - Type information of the program under analysis.
    /// * `setting` - Executor configuration.
    pub fn new(registry: TypeRegistry, setting: ExecutorSetting) -> Self {
        SymbolicState {
            frames: FrameStack::new(setting.max_locals_default),
            heap: SymbolicHeap::new(),
            path: PathConditionCollector::new(setting.normalize_constraints),
            registry,
            setting,
            is_failed: false,
        }
    }

    pub fn top_frame(&self) -> Result<&Frame, StackError> {
        self.frames.top()
    }

    pub fn top_frame_mut(&mut self) -> Result<&mut Frame, StackError> {
        self.frames.top_mut()
    }

    /// Operand stack of the current frame.
    pub fn stack(&mut self) -> Result<&mut OperandStack, StackError> {
        Ok(&mut self.frames.top_mut()?.operand_stack)
    }

    /// Locals of the current frame.
    pub fn locals(&mut self) -> Result<&mut LocalsTable, StackError> {
        Ok(&mut self.frames.top_mut()?.locals)
    }

    /// Formats the environment for terminal dumps.
    ///
    /// # Returns
    ///
    /// A colored multi-line rendering of frames, heap size and path condition.
    pub fn lookup_fmt(&self) -> String {
        let mut s = "".to_string();
        s += &format!("🛠️ {}", "SymbolicState [\n".cyan());
        s += &format!(
            "  {} {}\n",
            "📏 depth:".cyan(),
            self.frames.depth()
        );
        for frame in self.frames.iter() {
            let name = match (&frame.member, &frame.class_name) {
                (Some(m), _) => m.to_string(),
                (None, Some(c)) => format!("{}.<clinit>", c),
                (None, None) => "<bottom>".to_string(),
            };
            s += &format!(
                "  {} {} {}\n",
                "🧱".cyan(),
                italic(&name).magenta(),
                format!("({:?})", frame.kind).bright_black()
            );
            s += &format!(
                "      stack: [{}]\n",
                frame
                    .operand_stack
                    .iter()
                    .map(|o| o.expression().lookup_fmt())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for (i, local) in frame.locals.iter() {
                s += &format!("      local {}: {}\n", i, local.expression().lookup_fmt());
            }
        }
        s += &format!(
            "  {} {} entries, {} references\n",
            "📦 heap:".cyan(),
            self.heap.entry_count(),
            self.heap.reference_count()
        );
        s += &format!(
            "  {} {} committed, {} pending\n",
            "🪶 path_condition:".cyan(),
            self.path.len(),
            self.path.pending_supporting().len()
        );
        s += &format!("  {} {}\n", "❌ is_failed:".cyan(), self.is_failed);
        s += &format!("{}\n", "]".cyan());
        s
    }
}
