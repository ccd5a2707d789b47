//! Function registry: typed descriptors plus handlers, built at startup.
//!
//! The descriptor list is serialized verbatim into the routing prompt, so
//! its shape is part of the external contract. The registry is immutable
//! after construction and passed into the dispatcher explicitly; nothing is
//! looked up from global state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::currency::RateSource;
use crate::error::DispatchError;
use crate::metadata::MetadataRecord;
use crate::model::TextGenerator;
use crate::sheet::Table;

/// Reserved function name: answer directly with the language model.
pub const DIRECT_GENERATION: &str = "llm";

/// One typed parameter of a registered function.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub description: &'static str,
}

/// Descriptor of a registered function, as shown to the routing model.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParamSpec>,
}

/// Everything an analytic operation may touch: the ready-to-query tables,
/// their metadata records, the rate collaborator and the model handle.
pub struct ToolContext {
    pub tables: BTreeMap<String, Table>,
    pub metadata: BTreeMap<String, MetadataRecord>,
    pub rates: Arc<dyn RateSource>,
    pub model: Arc<dyn TextGenerator>,
}

/// Handler signature: validated parameters in, one renderable result out.
pub type ToolFn =
    Arc<dyn Fn(&ToolContext, &Map<String, Value>) -> Result<String, DispatchError> + Send + Sync>;

struct Entry {
    spec: FunctionSpec,
    handler: Option<ToolFn>,
}

/// Immutable registration table. Always contains the reserved
/// direct-generation descriptor; it has no handler because the dispatcher
/// treats it as a state transition, not a call.
pub struct FunctionRegistry {
    entries: Vec<Entry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                spec: FunctionSpec {
                    name: DIRECT_GENERATION,
                    description: "Generate text using a language model. \
                                  Use this function if no other function is suitable.",
                    parameters: Vec::new(),
                },
                handler: None,
            }],
        }
    }

    pub fn register(mut self, spec: FunctionSpec, handler: ToolFn) -> Self {
        self.entries.push(Entry { spec, handler: Some(handler) });
        self
    }

    pub fn specs(&self) -> Vec<&FunctionSpec> {
        self.entries.iter().map(|e| &e.spec).collect()
    }

    pub fn handler(&self, name: &str) -> Option<&ToolFn> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .and_then(|e| e.handler.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.spec.name == name)
    }

    /// Serialize the descriptor list for the routing prompt.
    pub fn describe(&self) -> String {
        serde_json::to_string_pretty(&self.specs()).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
