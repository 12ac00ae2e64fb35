// HTTP gateway: SSE streaming pipeline (C7), context manager (C8),
// intent handler (C9), and intent registry (C10).

pub mod collaborators;
pub mod context_store;
pub mod handlers;
pub mod intent_handler;
pub mod intent_registry;
pub mod state;
pub mod stream;
