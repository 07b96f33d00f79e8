//! Построение ленты сообщений
//!
//! Вход: сообщения в порядке от старых к новым (сортировка на стороне
//! поставщика, здесь порядок не меняется), идентификатор зрителя и
//! индикаторы "печатает". Выход: последовательность групп, перед
//! некоторыми из которых стоит разделитель даты.
//!
//! Новая группа начинается, когда меняется "моё/чужое", меняется
//! отправитель, меняется дата в опорном поясе или разрыв между соседними
//! сообщениями больше `Config::group_gap_ms`. Невалидное время всегда
//! начинает новую группу.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::protocol::{Identifier, Message, TimeValue, TypingIndicator};
use crate::timeline::identity;
use crate::timeline::time::{DateKey, TimeNormalizer};

/// Группа подряд идущих сообщений одного отправителя
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageGroup<'a> {
    /// Ключ отправителя (см. `identity::sender_key`)
    pub owner: Option<String>,
    pub is_mine: bool,
    /// От старых к новым
    pub members: Vec<&'a Message>,
    /// `createdAt` первого сообщения
    pub group_start_time: Option<&'a TimeValue>,
}

impl<'a> MessageGroup<'a> {
    pub fn first(&self) -> Option<&'a Message> {
        self.members.first().copied()
    }

    pub fn last(&self) -> Option<&'a Message> {
        self.members.last().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Разделитель даты перед группой
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSeparator {
    /// `None`, если у первого сообщения группы битая дата
    pub date: Option<DateKey>,
    /// "Today" / "Yesterday" / полная дата; пусто для битой даты
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<DateSeparator>,
    pub group: MessageGroup<'a>,
}

/// Пустая лента отличается от заполненной явным сигналом
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimelineState {
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline<'a> {
    pub entries: Vec<TimelineEntry<'a>>,
    /// Кто сейчас печатает (без самого зрителя), показывается после групп
    pub typing: Vec<&'a TypingIndicator>,
    pub state: TimelineState,
}

impl<'a> Timeline<'a> {
    /// Нет ни сообщений, ни индикаторов "печатает"
    pub fn is_empty_state(&self) -> bool {
        self.state == TimelineState::Empty
    }

    /// Все сообщения в порядке ленты
    pub fn messages(&self) -> impl Iterator<Item = &'a Message> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| entry.group.members.iter().copied())
    }

    pub fn groups(&self) -> impl Iterator<Item = &MessageGroup<'a>> + '_ {
        self.entries.iter().map(|entry| &entry.group)
    }

    pub fn separator_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.separator.is_some())
            .count()
    }
}

/// Причина начала новой группы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBreak {
    First,
    Ownership,
    Sender,
    Day,
    Gap,
}

/// Сообщение с заранее вычисленными признаками
struct Annotated<'a> {
    message: &'a Message,
    is_mine: bool,
    sender: Option<String>,
    instant: Option<DateTime<Utc>>,
    date: Option<DateKey>,
}

#[derive(Debug, Clone, Copy)]
pub struct TimelineGrouper {
    normalizer: TimeNormalizer,
    gap_ms: i64,
}

impl Default for TimelineGrouper {
    fn default() -> Self {
        Self::new(Config::global())
    }
}

impl TimelineGrouper {
    pub fn new(config: &Config) -> Self {
        Self {
            normalizer: TimeNormalizer::from_config(config),
            gap_ms: config.group_gap_ms,
        }
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    /// Сгруппировать сообщения без разделителей
    pub fn group<'a>(
        &self,
        messages: &'a [Message],
        viewer: Option<&Identifier>,
    ) -> Vec<MessageGroup<'a>> {
        self.group_annotated(&self.annotate(messages, viewer))
            .into_iter()
            .map(|(group, _)| group)
            .collect()
    }

    /// Полная лента: группы, разделители дат, "печатает" и сигнал пустоты
    pub fn build<'a>(
        &self,
        messages: &'a [Message],
        viewer: Option<&Identifier>,
        typing: &'a [TypingIndicator],
        now: DateTime<Utc>,
    ) -> Timeline<'a> {
        let annotated = self.annotate(messages, viewer);
        let grouped = self.group_annotated(&annotated);

        let mut entries = Vec::with_capacity(grouped.len());
        let mut prev_last: Option<&Annotated<'a>> = None;
        for (group, range) in grouped {
            let first = &annotated[range.0];
            let needs_separator = match prev_last {
                None => true,
                Some(prev) => !same_date(prev.date, first.date),
            };
            let separator = needs_separator.then(|| DateSeparator {
                date: first.date,
                label: first
                    .instant
                    .map(|instant| self.normalizer.separator_label(instant, now))
                    .unwrap_or_default(),
            });
            prev_last = Some(&annotated[range.1]);
            entries.push(TimelineEntry { separator, group });
        }

        let typing: Vec<&'a TypingIndicator> = typing
            .iter()
            .filter(|t| viewer.map_or(true, |v| !t.user.matches(v)))
            .collect();

        let state = if entries.is_empty() && typing.is_empty() {
            TimelineState::Empty
        } else {
            TimelineState::Populated
        };

        tracing::debug!(
            messages = messages.len(),
            groups = entries.len(),
            typing = typing.len(),
            "timeline built"
        );

        Timeline {
            entries,
            typing,
            state,
        }
    }

    /// Начинает ли `cur` новую группу после `prev`
    fn group_break(&self, prev: &Annotated<'_>, cur: &Annotated<'_>) -> Option<GroupBreak> {
        if prev.is_mine != cur.is_mine {
            return Some(GroupBreak::Ownership);
        }
        // Неизвестный отправитель ни с кем не склеивается
        match (&prev.sender, &cur.sender) {
            (Some(a), Some(b)) if a == b => {}
            _ => return Some(GroupBreak::Sender),
        }
        if !same_date(prev.date, cur.date) {
            return Some(GroupBreak::Day);
        }
        match (prev.instant, cur.instant) {
            (Some(a), Some(b)) if (b - a).num_milliseconds().abs() <= self.gap_ms => None,
            _ => Some(GroupBreak::Gap),
        }
    }

    fn annotate<'a>(
        &self,
        messages: &'a [Message],
        viewer: Option<&Identifier>,
    ) -> Vec<Annotated<'a>> {
        messages
            .iter()
            .map(|message| {
                let instant = self.normalizer.parse_opt(message.created_at.as_ref());
                Annotated {
                    message,
                    is_mine: identity::is_mine(message, viewer),
                    sender: identity::sender_key(message),
                    instant,
                    date: instant.map(|i| self.normalizer.date_key_of(i)),
                }
            })
            .collect()
    }

    /// Группы вместе с индексами первого и последнего сообщения
    fn group_annotated<'a>(
        &self,
        annotated: &[Annotated<'a>],
    ) -> Vec<(MessageGroup<'a>, (usize, usize))> {
        let mut groups: Vec<(MessageGroup<'a>, (usize, usize))> = Vec::new();

        for (index, cur) in annotated.iter().enumerate() {
            let reason = match index {
                0 => Some(GroupBreak::First),
                _ => self.group_break(&annotated[index - 1], cur),
            };

            if reason.is_none() {
                if let Some((group, range)) = groups.last_mut() {
                    group.members.push(cur.message);
                    range.1 = index;
                    continue;
                }
            }

            tracing::trace!(
                index,
                ?reason,
                source = ?identity::sender_source(cur.message),
                "new message group"
            );
            groups.push((
                MessageGroup {
                    owner: cur.sender.clone(),
                    is_mine: cur.is_mine,
                    members: vec![cur.message],
                    group_start_time: cur.message.created_at.as_ref(),
                },
                (index, index),
            ));
        }

        groups
    }
}

fn same_date(a: Option<DateKey>, b: Option<DateKey>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Построить ленту с глобальной конфигурацией
pub fn build_timeline<'a>(
    messages: &'a [Message],
    viewer: Option<&Identifier>,
    typing: &'a [TypingIndicator],
    now: DateTime<Utc>,
) -> Timeline<'a> {
    TimelineGrouper::default().build(messages, viewer, typing, now)
}
