use colored::Colorize;
use log::{trace, warn};

use crate::executor::callback::Callback;
use crate::executor::error::ExecutionError;
use crate::executor::opcodes::dispatch;
use crate::executor::path_condition::PathCondition;
use crate::executor::symbolic_setting::ExecutorSetting;
use crate::executor::symbolic_state::SymbolicState;
use crate::executor::type_registry::TypeRegistry;

/// Replays callbacks of one concrete execution against a shadow state and
/// collects its path condition.
///
/// # Example
/// ```rust
/// use concolic::executor::callback::{ArithmeticOp, Callback, StackOp};
/// use concolic::executor::concrete::ConcreteValue;
/// use concolic::executor::symbolic_execution::SymbolicExecutor;
/// use concolic::executor::symbolic_setting::get_default_setting_for_concolic_execution;
/// use concolic::executor::symbolic_value::{Operator, Sort};
/// use concolic::executor::type_registry::TypeRegistry;
///
/// let setting = get_default_setting_for_concolic_execution();
/// let registry = TypeRegistry::new(setting.ignored_prefixes.clone());
/// let mut executor = SymbolicExecutor::new(registry, setting);
///
/// executor.handle(&Callback::Stack(StackOp::Push(ConcreteValue::Int(2))));
/// executor.handle(&Callback::Stack(StackOp::Push(ConcreteValue::Int(3))));
/// executor.handle(&Callback::Arithmetic(ArithmeticOp::Binary {
///     op: Operator::Add,
///     sort: Sort::Int32,
/// }));
///
/// assert!(!executor.is_failed());
/// assert!(executor.path_condition().is_empty());
/// ```
pub struct SymbolicExecutor {
    pub cur_state: SymbolicState,
    handled: usize,
    errors: Vec<ExecutionError>,
}

impl SymbolicExecutor {
    pub fn new(registry: TypeRegistry, setting: ExecutorSetting) -> Self {
        SymbolicExecutor {
            cur_state: SymbolicState::new(registry, setting),
            handled: 0,
            errors: Vec::new(),
        }
    }

    /// Processes one callback. Returns `false` when the callback failed or
    /// the executor had already stopped.
    ///
    /// With `abort_on_error` a failure stops the executor; later callbacks
    /// are ignored and the path condition keeps what was collected so far.
    pub fn handle(&mut self, callback: &Callback) -> bool {
        if self.cur_state.is_failed {
            return false;
        }
        trace!("{} {:?}", callback.group().bright_black(), callback);

        let outcome = dispatch(&mut self.cur_state, callback);
        self.handled += 1;

        let interval = self.cur_state.setting.purge_collected_interval;
        if interval > 0 && self.handled % interval == 0 {
            self.cur_state.heap.purge_collected();
        }

        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!("{} while handling {:?}: {}", "⚠️".yellow(), callback, e);
                if self.cur_state.setting.abort_on_error {
                    self.cur_state.is_failed = true;
                }
                self.errors.push(e);
                false
            }
        }
    }

    /// Processes callbacks in order; returns the number that succeeded.
    pub fn handle_all<'a, I>(&mut self, callbacks: I) -> usize
    where
        I: IntoIterator<Item = &'a Callback>,
    {
        callbacks
            .into_iter()
            .map(|c| self.handle(c))
            .filter(|ok| *ok)
            .count()
    }

    pub fn is_failed(&self) -> bool {
        self.cur_state.is_failed
    }

    pub fn handled(&self) -> usize {
        self.handled
    }

    pub fn errors(&self) -> &[ExecutionError] {
        &self.errors
    }

    pub fn first_error(&self) -> Option<&ExecutionError> {
        self.errors.first()
    }

    pub fn path_condition(&self) -> PathCondition {
        self.cur_state.path.path_condition()
    }

    pub fn into_path_condition(self) -> PathCondition {
        self.cur_state.path.into_path_condition()
    }
}
