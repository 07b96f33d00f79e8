// Локальные (ещё не подтверждённые) сообщения и их сведение
// с записями, пришедшими от сервера

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::protocol::{Identifier, LocalFlags, Message, TimeValue};
use crate::state::delivery::DeliveryStatus;
use crate::timeline::TimeNormalizer;

/// Префикс id оптимистичных записей
const LOCAL_ID_PREFIX: &str = "local-";

/// Очередь исходящих сообщений.
///
/// Флаги выставляет внешний транспорт через `mark_*`; у записи всегда
/// выставлено не больше одного флага.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Message>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Создать оптимистичную запись и поставить её в очередь
    pub fn enqueue(
        &mut self,
        sender: impl Into<Identifier>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Message {
        let client_id = uuid::Uuid::new_v4().to_string();
        let message = Message {
            id: Identifier::Text(format!("{}{}", LOCAL_ID_PREFIX, client_id)),
            created_at: Some(TimeValue::Text(
                now.to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
            sender_id: Some(sender.into()),
            sender: None,
            user_id: None,
            username: None,
            from: None,
            author: None,
            content: content.into(),
            client_msg_id: Some(client_id),
            local: LocalFlags::optimistic(),
        };

        tracing::debug!(client_msg_id = ?message.client_msg_id, "message enqueued");
        self.pending.push(message.clone());
        message
    }

    pub fn get(&self, client_id: &str) -> Option<&Message> {
        self.pending
            .iter()
            .find(|m| m.client_msg_id.as_deref() == Some(client_id))
    }

    pub fn status(&self, client_id: &str) -> Option<DeliveryStatus> {
        self.get(client_id).map(DeliveryStatus::of)
    }

    /// Нет сети: ждём повторной отправки
    pub fn mark_queued(&mut self, client_id: &str) -> Result<()> {
        self.set_flags(client_id, LocalFlags::queued())
    }

    /// Транспорт сообщил об окончательной ошибке
    pub fn mark_failed(&mut self, client_id: &str) -> Result<()> {
        self.set_flags(client_id, LocalFlags::failed())
    }

    /// Повторная попытка: снова "отправляется"
    pub fn mark_retrying(&mut self, client_id: &str) -> Result<()> {
        self.set_flags(client_id, LocalFlags::optimistic())
    }

    /// Сервер подтвердил запись: она покидает очередь
    pub fn confirm(&mut self, client_id: &str) -> Result<Message> {
        let index = self.index_of(client_id)?;
        let mut message = self.pending.remove(index);
        message.local = LocalFlags::default();
        tracing::debug!(client_id, "message confirmed");
        Ok(message)
    }

    pub fn pending(&self) -> &[Message] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn set_flags(&mut self, client_id: &str, flags: LocalFlags) -> Result<()> {
        let index = self.index_of(client_id)?;
        let message = &mut self.pending[index];
        message.local = flags;
        tracing::debug!(client_id, status = %DeliveryStatus::of(message), "outbox transition");
        Ok(())
    }

    fn index_of(&self, client_id: &str) -> Result<usize> {
        self.pending
            .iter()
            .position(|m| m.client_msg_id.as_deref() == Some(client_id))
            .ok_or_else(|| CoreError::NotFound(format!("outbox entry {}", client_id)))
    }
}

/// Свести подтверждённые записи с локальными.
///
/// Локальная запись отбрасывается, если сервер уже вернул запись с тем же
/// `clientMsgId` (или тем же id). Результат отсортирован по `createdAt`
/// по возрастанию; записи с битой датой идут в конце в исходном порядке.
pub fn reconcile(confirmed: &[Message], outbox: &Outbox, normalizer: &TimeNormalizer) -> Vec<Message> {
    let confirmed_client_ids: HashSet<&str> = confirmed
        .iter()
        .filter_map(|m| m.client_msg_id.as_deref())
        .collect();
    let confirmed_ids: HashSet<String> = confirmed.iter().map(|m| m.id.to_string()).collect();

    let mut merged: Vec<Message> = confirmed.to_vec();
    let mut superseded = 0usize;
    for local in outbox.pending() {
        let already_confirmed = local
            .client_msg_id
            .as_deref()
            .map_or(false, |id| confirmed_client_ids.contains(id))
            || confirmed_ids.contains(&local.id.to_string());
        if already_confirmed {
            superseded += 1;
        } else {
            merged.push(local.clone());
        }
    }

    sort_ascending(&mut merged, normalizer);
    tracing::debug!(
        confirmed = confirmed.len(),
        local = outbox.len(),
        superseded,
        "reconciled timeline input"
    );
    merged
}

/// Стабильная сортировка от старых к новым, битые даты в конце
pub fn sort_ascending(messages: &mut [Message], normalizer: &TimeNormalizer) {
    messages.sort_by_cached_key(|m| {
        let at = normalizer.parse_opt(m.created_at.as_ref());
        (at.is_none(), at)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new(chrono_tz::America::New_York)
    }

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_enqueue_creates_optimistic_entry() {
        let mut outbox = Outbox::new();
        let msg = outbox.enqueue("alice", "hello", at("2024-01-10T12:00:00Z"));

        let client_id = msg.client_msg_id.clone().unwrap();
        assert!(msg.id.to_string().starts_with(LOCAL_ID_PREFIX));
        assert_eq!(msg.created_at, Some(TimeValue::from("2024-01-10T12:00:00.000Z")));
        assert_eq!(outbox.status(&client_id), Some(DeliveryStatus::Sending));
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_transitions_keep_single_flag() {
        let mut outbox = Outbox::new();
        let client_id = outbox
            .enqueue("alice", "hello", at("2024-01-10T12:00:00Z"))
            .client_msg_id
            .unwrap();

        outbox.mark_queued(&client_id).unwrap();
        assert_eq!(outbox.status(&client_id), Some(DeliveryStatus::Queued));
        assert_eq!(outbox.get(&client_id).unwrap().local.count(), 1);

        outbox.mark_failed(&client_id).unwrap();
        assert_eq!(outbox.status(&client_id), Some(DeliveryStatus::Failed));

        outbox.mark_retrying(&client_id).unwrap();
        assert_eq!(outbox.status(&client_id), Some(DeliveryStatus::Sending));

        let confirmed = outbox.confirm(&client_id).unwrap();
        assert_eq!(DeliveryStatus::of(&confirmed), DeliveryStatus::Sent);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_unknown_client_id() {
        let mut outbox = Outbox::new();
        assert!(matches!(outbox.mark_failed("nope"), Err(CoreError::NotFound(_))));
        assert!(matches!(outbox.confirm("nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_reconcile_drops_superseded_local_entries() {
        let mut outbox = Outbox::new();
        let echoed = outbox.enqueue("alice", "first", at("2024-01-10T12:00:00Z"));
        let still_pending = outbox.enqueue("alice", "second", at("2024-01-10T12:01:00Z"));

        let mut server_copy = Message::new("srv-1", "alice", "2024-01-10T12:00:01Z");
        server_copy.client_msg_id = echoed.client_msg_id.clone();
        let older = Message::new("srv-0", "bob", "2024-01-10T11:59:00Z");

        let merged = reconcile(&[server_copy, older], &outbox, &normalizer());
        let ids: Vec<String> = merged.iter().map(|m| m.id.to_string()).collect();

        assert_eq!(ids, vec!["srv-0".to_string(), "srv-1".to_string(), still_pending.id.to_string()]);
        assert_eq!(DeliveryStatus::of(&merged[2]), DeliveryStatus::Sending);
    }

    #[test]
    fn test_sort_ascending_is_stable_with_invalid_last() {
        let mut messages = vec![
            Message::new("bad-1", "a", "??"),
            Message::new("late", "a", "2024-01-10T12:00:00Z"),
            Message::new("bad-2", "a", ""),
            Message::new("early", "a", "2024-01-10T11:00:00Z"),
            Message::new("tie", "a", "2024-01-10T12:00:00Z"),
        ];
        sort_ascending(&mut messages, &normalizer());
        let ids: Vec<String> = messages.iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["early", "late", "tie", "bad-1", "bad-2"]);
    }
}
