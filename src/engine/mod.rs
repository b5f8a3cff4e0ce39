//! Engine module - runs one program against one input

pub mod executer;

pub use executer::{ExecutionResult, ExecutionStatus, Executor};
