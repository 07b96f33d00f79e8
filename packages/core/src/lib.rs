// Campus Chat Core
// Message timeline grouping, timezone-correct date boundaries
// and delivery-state classification for the web and mobile clients

#![warn(clippy::all)]

// Модули
pub mod api;
pub mod config;
pub mod error;
pub mod protocol;
pub mod state;
pub mod timeline;

// Re-exports для удобства
pub use api::ChatCoreAPI;
pub use config::Config;
pub use error::{CoreError, Result};
pub use protocol::{ConversationSummary, Identifier, LocalFlags, Message, TimeValue, TypingIndicator};
pub use state::{ConversationRecencyRanker, DeliveryStatus, Outbox};
pub use timeline::{MessageGroup, Timeline, TimelineGrouper, TimeNormalizer};

// WASM-specific bindings
#[cfg(target_arch = "wasm32")]
pub mod wasm;
