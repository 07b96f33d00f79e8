// Записи, приходящие от REST-бэкенда
// Форма записей не единообразна между источниками (личные сообщения,
// ответы, системные уведомления), поэтому почти все поля опциональны.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::lenient;

/// Непрозрачный идентификатор: бэкенд отдаёт его то строкой, то числом
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl Identifier {
    /// Сравнение по строковой форме: `42` и `"42"` совпадают
    pub fn matches(&self, other: &Identifier) -> bool {
        match (self, other) {
            (Identifier::Number(a), Identifier::Number(b)) => a == b,
            (Identifier::Text(a), Identifier::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Identifier::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Number(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Number(i64::from(value))
    }
}

/// Сырое значение времени: ISO-8601 строка или epoch в миллисекундах
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Millis(i64),
    Text(String),
}

impl From<&str> for TimeValue {
    fn from(value: &str) -> Self {
        TimeValue::Text(value.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(value: String) -> Self {
        TimeValue::Text(value)
    }
}

impl From<i64> for TimeValue {
    fn from(value: i64) -> Self {
        TimeValue::Millis(value)
    }
}

/// Вложенный объект отправителя (`sender: { id, _id, username }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    #[serde(default, deserialize_with = "lenient::identifier", skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient::identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub alt_id: Option<Identifier>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Локальные флаги сообщения, ещё не подтверждённого транспортом
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalFlags {
    /// Принято локально, ответа сервера ещё нет
    #[serde(alias = "is_optimistic", deserialize_with = "lenient::flag")]
    pub is_optimistic: bool,
    /// Нет сети, сообщение ждёт повторной отправки
    #[serde(alias = "is_queued", deserialize_with = "lenient::flag")]
    pub is_queued: bool,
    /// Транспорт сообщил об окончательной ошибке
    #[serde(deserialize_with = "lenient::flag")]
    pub failed: bool,
}

impl LocalFlags {
    pub fn optimistic() -> Self {
        Self {
            is_optimistic: true,
            ..Self::default()
        }
    }

    pub fn queued() -> Self {
        Self {
            is_queued: true,
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    /// Сколько флагов выставлено одновременно
    pub fn count(&self) -> usize {
        [self.is_optimistic, self.is_queued, self.failed]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

/// Сообщение чата в том виде, в каком его отдаёт транспорт
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Стабильный между перезапросами идентификатор
    #[serde(alias = "_id")]
    pub id: Identifier,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "lenient::time_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<TimeValue>,

    // --- поля, по которым можно узнать отправителя ---
    // Неожиданная форма любого из них читается как отсутствие поля
    #[serde(
        default,
        alias = "sender_id",
        deserialize_with = "lenient::identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_id: Option<Identifier>,
    #[serde(default, deserialize_with = "lenient::sender", skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderRef>,
    #[serde(
        default,
        alias = "user_id",
        deserialize_with = "lenient::identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Identifier>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient::identifier", skip_serializing_if = "Option::is_none")]
    pub from: Option<Identifier>,
    #[serde(default, deserialize_with = "lenient::identifier", skip_serializing_if = "Option::is_none")]
    pub author: Option<Identifier>,

    #[serde(default, alias = "text", alias = "body", deserialize_with = "lenient::text_or_empty")]
    pub content: String,
    /// Локальный id для сопоставления оптимистичной записи с подтверждённой
    #[serde(
        default,
        alias = "client_msg_id",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_msg_id: Option<String>,

    #[serde(flatten)]
    pub local: LocalFlags,
}

impl Message {
    /// Минимальная запись с явным `senderId`
    pub fn new(
        id: impl Into<Identifier>,
        sender_id: impl Into<Identifier>,
        created_at: impl Into<TimeValue>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at: Some(created_at.into()),
            sender_id: Some(sender_id.into()),
            sender: None,
            user_id: None,
            username: None,
            from: None,
            author: None,
            content: String::new(),
            client_msg_id: None,
            local: LocalFlags::default(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_flags(mut self, local: LocalFlags) -> Self {
        self.local = local;
        self
    }
}

/// Краткая сводка беседы для списка бесед
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(alias = "_id")]
    pub id: Identifier,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "lenient::time_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<TimeValue>,
    #[serde(
        default,
        alias = "last_message_at",
        deserialize_with = "lenient::time_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_message_at: Option<TimeValue>,
    #[serde(default, alias = "unread_count", deserialize_with = "lenient::count")]
    pub unread_count: u32,
}

impl ConversationSummary {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    pub fn created_at(mut self, value: impl Into<TimeValue>) -> Self {
        self.created_at = Some(value.into());
        self
    }

    pub fn last_message_at(mut self, value: impl Into<TimeValue>) -> Self {
        self.last_message_at = Some(value.into());
        self
    }
}

/// Синтетическая запись "печатает…"; в группы не попадает
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub user: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
