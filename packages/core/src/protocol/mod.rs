// Модели данных, которыми ядро обменивается с внешним транспортом

pub mod lenient;
pub mod messages;

pub use messages::{
    ConversationSummary, Identifier, LocalFlags, Message, SenderRef, TimeValue, TypingIndicator,
};
