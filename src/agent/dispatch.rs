//! Model-driven function dispatch.
//!
//! One user turn, two states: route (ask the model to pick a function),
//! then execute (call it, or stream a direct answer). Every failure in the
//! turn is caught at the boundary and yielded as text; the host loop must
//! never die because a model produced garbage.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::DispatchError;
use crate::model::{collect, ChatMessage, TextStream};

use super::json_extract::extract_object;
use super::registry::{FunctionRegistry, ToolContext, DIRECT_GENERATION};

/// The routing model's answer: which function, with which arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchDecision {
    pub function: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Routes each user turn to a registered analytic operation or to direct
/// generation. Registry and context are injected by construction.
pub struct FunctionDispatcher {
    registry: Arc<FunctionRegistry>,
    context: Arc<ToolContext>,
}

impl FunctionDispatcher {
    pub fn new(registry: Arc<FunctionRegistry>, context: Arc<ToolContext>) -> Self {
        Self { registry, context }
    }

    /// Run one conversational turn. The returned stream yields the answer
    /// incrementally (direct generation) or as one final chunk (function
    /// result); errors arrive as a yielded error string.
    pub fn respond(&self, history: Vec<ChatMessage>) -> TextStream {
        let registry = Arc::clone(&self.registry);
        let context = Arc::clone(&self.context);
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            if let Err(e) = run_turn(&registry, &context, history, &tx).await {
                log::error!("Turn failed: {}", e);
                let _ = tx.send(format!("Error: {}", e)).await;
            }
        });

        rx
    }
}

async fn run_turn(
    registry: &FunctionRegistry,
    context: &ToolContext,
    history: Vec<ChatMessage>,
    tx: &mpsc::Sender<String>,
) -> Result<(), DispatchError> {
    let input = history.last().map(|m| m.content.clone()).unwrap_or_default();

    let prompt = routing_prompt(&input, registry);
    let mut stream = context.model.generate(&[ChatMessage::user(prompt)]).await?;
    let answer = collect(&mut stream).await;

    let decision = parse_decision(&answer)?;

    if decision.function == DIRECT_GENERATION {
        // Direct generation streams the original conversation, not the
        // routing prompt.
        let mut stream = context.model.generate(&history).await?;
        while let Some(chunk) = stream.recv().await {
            if tx.send(chunk).await.is_err() {
                return Ok(());
            }
        }
        return Ok(());
    }

    let handler = registry
        .handler(&decision.function)
        .ok_or_else(|| DispatchError::UnknownFunction(decision.function.clone()))?;

    log::info!(
        "Calling function {} with parameters {}",
        decision.function,
        Value::Object(decision.parameters.clone())
    );
    let result = handler(context, &decision.parameters)?;
    let _ = tx.send(result).await;
    Ok(())
}

/// Build the routing prompt: descriptor list plus the latest user message.
pub fn routing_prompt(input: &str, registry: &FunctionRegistry) -> String {
    format!(
        r#"As an AI assistant, please select the most suitable function and parameters from the list of available functions below, based on the user's input.

----------------------------------------

Input: {input}

----------------------------------------

Available functions:
{tools}
----------------------------------------
The output should be in the following format:
```
{{
    "function": "function_name",
    "parameters": {{
        "parameter1": "value1",
        "parameter2": "value2"
    }}
}}
```

Remember to only give the json object as output, without any additional text."#,
        input = input,
        tools = registry.describe(),
    )
}

/// Extract and validate the routing decision from raw model output.
fn parse_decision(answer: &str) -> Result<DispatchDecision, DispatchError> {
    let value = extract_object(answer)?;
    if value.get("function").and_then(Value::as_str).is_none() {
        return Err(DispatchError::BadDecision("function"));
    }
    serde_json::from_value(value).map_err(|_| DispatchError::BadDecision("parameters"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::currency::StaticRates;
    use crate::model::collect;
    use crate::model::mock::MockModel;
    use crate::agent::registry::{FunctionSpec, ParamSpec};

    fn context_with(model: MockModel) -> (Arc<MockModel>, Arc<ToolContext>) {
        let model = Arc::new(model);
        let context = Arc::new(ToolContext {
            tables: BTreeMap::new(),
            metadata: BTreeMap::new(),
            rates: Arc::new(StaticRates),
            model: model.clone(),
        });
        (model, context)
    }

    fn supplier_registry(calls: Arc<AtomicUsize>, seen: Arc<std::sync::Mutex<Option<Map<String, Value>>>>) -> Arc<FunctionRegistry> {
        Arc::new(FunctionRegistry::new().register(
            FunctionSpec {
                name: "get_suppliers_by_material",
                description: "Get suppliers that deliver a material.",
                parameters: vec![ParamSpec {
                    name: "material",
                    ty: "string",
                    description: "The material to search for.",
                }],
            },
            Arc::new(move |_, params| {
                calls.fetch_add(1, Ordering::SeqCst);
                *seen.lock().unwrap() = Some(params.clone());
                Ok("Suppliers for Copper: Acme".to_string())
            }),
        ))
    }

    #[tokio::test]
    async fn test_routes_to_registered_function_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(std::sync::Mutex::new(None));
        let registry = supplier_registry(Arc::clone(&calls), Arc::clone(&seen));

        let model = MockModel::scripted(vec![
            r#"{"function": "get_suppliers_by_material", "parameters": {"material": "Copper"}}"#
                .to_string(),
        ]);
        let (_, context) = context_with(model);
        let dispatcher = FunctionDispatcher::new(registry, context);

        let mut stream = dispatcher.respond(vec![ChatMessage::user("Who supplies copper?")]);
        let out = collect(&mut stream).await;

        assert_eq!(out, "Suppliers for Copper: Acme");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let params = seen.lock().unwrap().clone().unwrap();
        assert_eq!(params["material"], "Copper");
    }

    #[tokio::test]
    async fn test_unknown_function_yields_error_no_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(std::sync::Mutex::new(None));
        let registry = supplier_registry(Arc::clone(&calls), seen);

        let model = MockModel::scripted(vec![
            r#"{"function": "rm_rf", "parameters": {}}"#.to_string(),
        ]);
        let (_, context) = context_with(model);
        let dispatcher = FunctionDispatcher::new(registry, context);

        let mut stream = dispatcher.respond(vec![ChatMessage::user("destroy everything")]);
        let out = collect(&mut stream).await;

        assert!(out.contains("Unknown function 'rm_rf'"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_llm_streams_original_history() {
        let registry = Arc::new(FunctionRegistry::new());
        let model = MockModel::scripted(vec![
            r#"{"function": "llm", "parameters": {}}"#.to_string(),
            "Doing well, thanks!".to_string(),
        ]);
        let (mock, context) = context_with(model);
        let dispatcher = FunctionDispatcher::new(registry, context);

        let history = vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi!"),
            ChatMessage::user("How are you?"),
        ];
        let mut stream = dispatcher.respond(history);
        let out = collect(&mut stream).await;
        assert_eq!(out, "Doing well, thanks!");

        // Second call carries the conversation, not the routing prompt.
        assert_eq!(mock.call_count(), 2);
        let second = mock.call(1);
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].content, "Hello");
        assert_eq!(second[2].content, "How are you?");
    }

    #[tokio::test]
    async fn test_garbage_routing_answer_yields_error() {
        let registry = Arc::new(FunctionRegistry::new());
        let model = MockModel::scripted(vec!["total nonsense, no json".to_string()]);
        let (_, context) = context_with(model);
        let dispatcher = FunctionDispatcher::new(registry, context);

        let mut stream = dispatcher.respond(vec![ChatMessage::user("hi")]);
        let out = collect(&mut stream).await;
        assert!(out.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_missing_function_field_yields_error() {
        let registry = Arc::new(FunctionRegistry::new());
        let model = MockModel::scripted(vec![r#"{"parameters": {}}"#.to_string()]);
        let (_, context) = context_with(model);
        let dispatcher = FunctionDispatcher::new(registry, context);

        let mut stream = dispatcher.respond(vec![ChatMessage::user("hi")]);
        let out = collect(&mut stream).await;
        assert!(out.contains("missing 'function'"));
    }
}
