// Состояние вокруг ленты: статусы доставки, исходящие, список бесед

pub mod conversations;
pub mod delivery;
pub mod outbox;

pub use conversations::{rank, ConversationRecencyRanker};
pub use delivery::{Affordance, DeliveryStatus};
pub use outbox::{reconcile, sort_ascending, Outbox};
