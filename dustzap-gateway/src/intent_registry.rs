// Intent Registry (C10): maps intent-type string to handler, validates
// the common request envelope (spec.md §4.10).
use std::collections::HashMap;
use std::sync::Arc;

use dustzap_common::GatewayError;

use crate::intent_handler::{IntentHandler, IntentOutcome, IntentRequest};

pub struct IntentRegistry {
    handlers: HashMap<String, Arc<IntentHandler>>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register(&mut self, intent_type: impl Into<String>, handler: Arc<IntentHandler>) {
        self.handlers.insert(intent_type.into(), handler);
    }

    pub async fn dispatch(&self, intent_type: &str, request: IntentRequest) -> Result<IntentOutcome, GatewayError> {
        let handler = self
            .handlers
            .get(intent_type)
            .ok_or_else(|| GatewayError::NotFound(intent_type.to_string()))?;
        handler.execute(request).await
    }
}

impl Default for IntentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
