//! Conversational agent: JSON extraction, function registry and dispatch.

pub mod dispatch;
pub mod json_extract;
pub mod registry;

pub use dispatch::{DispatchDecision, FunctionDispatcher};
pub use json_extract::extract_object;
pub use registry::{
    FunctionRegistry, FunctionSpec, ParamSpec, ToolContext, ToolFn, DIRECT_GENERATION,
};
