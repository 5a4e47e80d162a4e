//! Pluggable chat/embedding capability (interface only — the chat model and
//! embedding model are injected dependencies, not a bundled provider),
//! backed by an MCP child-process transport.

pub mod chat;
pub mod embed;

pub use chat::{ChatClient, ChatError, MockChatClient, SubprocessChatClient};
pub use embed::{EmbedClient, EmbedError, MockEmbedClient};
