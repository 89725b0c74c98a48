pub mod callback;
pub mod concrete;
pub mod coverage;
pub mod descriptor;
pub mod error;
pub mod expression_factory;
pub mod frame;
pub mod normalizer;
pub mod opcodes;
pub mod operand_stack;
pub mod path_condition;
pub mod symbolic_execution;
pub mod symbolic_function;
pub mod symbolic_heap;
pub mod symbolic_setting;
pub mod symbolic_state;
pub mod symbolic_value;
pub mod type_registry;
pub mod utils;
