// Список бесед: сортировка по последней активности

use chrono::{DateTime, Utc};
use std::cmp::Reverse;

use crate::protocol::ConversationSummary;
use crate::timeline::TimeNormalizer;

/// Сортировщик бесед по свежести
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationRecencyRanker {
    normalizer: TimeNormalizer,
}

impl ConversationRecencyRanker {
    pub fn new(normalizer: TimeNormalizer) -> Self {
        Self { normalizer }
    }

    /// Момент последней активности: `lastMessageAt`, иначе `createdAt`.
    /// Берётся первое значение, которое удалось разобрать.
    pub fn activity_at(&self, conversation: &ConversationSummary) -> Option<DateTime<Utc>> {
        self.normalizer
            .parse_opt(conversation.last_message_at.as_ref())
            .or_else(|| self.normalizer.parse_opt(conversation.created_at.as_ref()))
    }

    /// От самых свежих к старым.
    ///
    /// Беседы без валидной даты равны между собой, стоят после всех
    /// датированных и сохраняют исходный порядок.
    pub fn rank<'a>(&self, conversations: &'a [ConversationSummary]) -> Vec<&'a ConversationSummary> {
        let mut keyed: Vec<(Option<DateTime<Utc>>, &'a ConversationSummary)> = conversations
            .iter()
            .map(|c| (self.activity_at(c), c))
            .collect();
        // Стабильная сортировка; None < Some, поэтому Reverse уводит None в конец
        keyed.sort_by_key(|(at, _)| Reverse(*at));
        keyed.into_iter().map(|(_, c)| c).collect()
    }

    /// Как `rank`, но сортирует владеющий вектор
    pub fn rank_owned(&self, mut conversations: Vec<ConversationSummary>) -> Vec<ConversationSummary> {
        conversations.sort_by_cached_key(|c| Reverse(self.activity_at(c)));
        conversations
    }

    /// Суммарное число непрочитанных; счётчики приходят с бэкенда, поэтому с насыщением
    pub fn total_unread(conversations: &[ConversationSummary]) -> u32 {
        conversations
            .iter()
            .fold(0u32, |total, c| total.saturating_add(c.unread_count))
    }
}

/// Отсортировать с глобальной конфигурацией
pub fn rank(conversations: &[ConversationSummary]) -> Vec<&ConversationSummary> {
    ConversationRecencyRanker::default().rank(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Identifier;

    fn ranker() -> ConversationRecencyRanker {
        ConversationRecencyRanker::new(TimeNormalizer::new(chrono_tz::America::New_York))
    }

    fn ids(ranked: &[&ConversationSummary]) -> Vec<String> {
        ranked.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn test_prefers_last_message_at() {
        let conversations = vec![
            ConversationSummary::new(1).created_at("2024-01-01"),
            ConversationSummary::new(2).last_message_at("2024-01-05"),
            ConversationSummary::new(3).created_at("2024-01-03"),
        ];
        assert_eq!(ids(&ranker().rank(&conversations)), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_last_message_overrides_old_creation() {
        let conversations = vec![
            ConversationSummary::new("new-but-quiet").created_at("2024-02-01T10:00:00Z"),
            ConversationSummary::new("old-but-busy")
                .created_at("2023-06-01T10:00:00Z")
                .last_message_at("2024-02-02T10:00:00Z"),
        ];
        assert_eq!(
            ids(&ranker().rank(&conversations)),
            vec!["old-but-busy", "new-but-quiet"]
        );
    }

    #[test]
    fn test_unparseable_last_message_falls_back() {
        let c = ConversationSummary::new("c")
            .created_at("2024-01-03")
            .last_message_at("??");
        assert!(ranker().activity_at(&c).is_some());
    }

    #[test]
    fn test_stable_for_equal_and_invalid_keys() {
        let conversations = vec![
            ConversationSummary::new("x1").created_at("garbage"),
            ConversationSummary::new("a").created_at("2024-01-02T00:00:00Z"),
            ConversationSummary::new("x2"),
            ConversationSummary::new("b").created_at("2024-01-02T00:00:00Z"),
            ConversationSummary::new("x3").last_message_at(""),
            ConversationSummary::new("c").created_at("2024-01-04T00:00:00Z"),
        ];
        let ranked = ranker().rank(&conversations);
        assert_eq!(ids(&ranked), vec!["c", "a", "b", "x1", "x2", "x3"]);

        let owned = ranker().rank_owned(conversations.clone());
        let owned_ids: Vec<String> = owned.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(owned_ids, vec!["c", "a", "b", "x1", "x2", "x3"]);
    }

    #[test]
    fn test_empty_and_unread() {
        assert!(ranker().rank(&[]).is_empty());

        let mut c = ConversationSummary::new(Identifier::from(9));
        c.unread_count = 4;
        let d = ConversationSummary {
            unread_count: 2,
            ..ConversationSummary::new(10)
        };
        assert_eq!(ConversationRecencyRanker::total_unread(&[c, d]), 6);
    }

    #[test]
    fn test_total_unread_saturates() {
        let mut a = ConversationSummary::new("a");
        a.unread_count = u32::MAX;
        let mut b = ConversationSummary::new("b");
        b.unread_count = 1;
        assert_eq!(ConversationRecencyRanker::total_unread(&[a, b]), u32::MAX);
    }
}
