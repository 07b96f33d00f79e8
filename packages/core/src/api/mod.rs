// Публичный API ядра чата
// Высокоуровневые методы поверх ленты, статусов и списка бесед.
// JSON-варианты используются WASM-биндингами веб-клиента.

pub mod render;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{ConversationSummary, Identifier, LocalFlags, Message, TypingIndicator};
use crate::state::conversations::ConversationRecencyRanker;
use crate::state::delivery::DeliveryStatus;
use crate::timeline::{TimeNormalizer, Timeline, TimelineGrouper};

pub use render::{render_timeline, RenderedGroup, RenderedMessage, TimelineView};

/// Главный API ядра чата
#[derive(Debug, Clone, Copy)]
pub struct ChatCoreAPI {
    grouper: TimelineGrouper,
    ranker: ConversationRecencyRanker,
}

impl ChatCoreAPI {
    pub fn new(config: &Config) -> Self {
        let grouper = TimelineGrouper::new(config);
        Self {
            grouper,
            ranker: ConversationRecencyRanker::new(*grouper.normalizer()),
        }
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        self.grouper.normalizer()
    }

    pub fn timeline<'a>(
        &self,
        messages: &'a [Message],
        viewer: Option<&Identifier>,
        typing: &'a [TypingIndicator],
        now: DateTime<Utc>,
    ) -> Timeline<'a> {
        self.grouper.build(messages, viewer, typing, now)
    }

    pub fn rank_conversations<'a>(
        &self,
        conversations: &'a [ConversationSummary],
    ) -> Vec<&'a ConversationSummary> {
        self.ranker.rank(conversations)
    }

    /// Лента в JSON для UI: `messages_json`: массив записей,
    /// `typing_json`: массив индикаторов (может отсутствовать)
    pub fn timeline_json(
        &self,
        messages_json: &str,
        viewer: Option<&str>,
        typing_json: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let messages: Vec<Message> = parse_records(messages_json, "message")?;
        let typing: Vec<TypingIndicator> = match typing_json {
            Some(raw) if !raw.trim().is_empty() => parse_records(raw, "typing")?,
            _ => Vec::new(),
        };
        let viewer = viewer.map(Identifier::from);

        let timeline = self.timeline(&messages, viewer.as_ref(), &typing, now);
        let view = render_timeline(&timeline, self.normalizer(), now);
        Ok(serde_json::to_string(&view)?)
    }

    /// Беседы в JSON, отсортированные по свежести
    pub fn rank_conversations_json(&self, conversations_json: &str) -> Result<String> {
        let conversations: Vec<ConversationSummary> =
            parse_records(conversations_json, "conversation")?;
        let ranked = self.rank_conversations(&conversations);
        Ok(serde_json::to_string(&ranked)?)
    }

    /// Статус доставки для объекта с локальными флагами
    pub fn delivery_status_json(&self, flags_json: &str) -> Result<String> {
        let flags: LocalFlags = serde_json::from_str(flags_json)?;
        Ok(serde_json::to_string(&DeliveryStatus::resolve(&flags))?)
    }
}

/// Разобрать JSON-массив записей. Невалидный JSON или не-массив дают ошибку,
/// а отдельная нечитаемая запись (например, без `id`) пропускается.
fn parse_records<T: DeserializeOwned>(raw: &str, kind: &'static str) -> Result<Vec<T>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(kind, index, %error, "skipping malformed record");
                None
            }
        })
        .collect())
}

impl Default for ChatCoreAPI {
    fn default() -> Self {
        Self::new(Config::global())
    }
}
