// Плоское представление ленты для слоя отрисовки
//
// UI не должен сам считать статусы и подписи: всё нужное для каждого
// сообщения вычисляется здесь.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::{Message, TypingIndicator};
use crate::state::delivery::{Affordance, DeliveryStatus};
use crate::timeline::{DateSeparator, Timeline, TimelineState, TimeNormalizer};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage<'a> {
    #[serde(flatten)]
    pub message: &'a Message,
    pub status: DeliveryStatus,
    pub affordance: Affordance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    /// "9:05 AM"
    pub time: String,
    /// "5m", "2d", "Jan 3"
    pub relative_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedGroup<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<DateSeparator>,
    pub owner: Option<String>,
    pub is_mine: bool,
    pub messages: Vec<RenderedMessage<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView<'a> {
    pub state: TimelineState,
    pub groups: Vec<RenderedGroup<'a>>,
    pub typing: Vec<&'a TypingIndicator>,
}

pub fn render_message<'a>(
    message: &'a Message,
    normalizer: &TimeNormalizer,
    now: DateTime<Utc>,
) -> RenderedMessage<'a> {
    let status = DeliveryStatus::of(message);
    let affordance = status.affordance();
    RenderedMessage {
        message,
        status,
        affordance,
        hint: affordance.hint(),
        time: normalizer.format_clock(message.created_at.as_ref()),
        relative_time: normalizer.format_relative(message.created_at.as_ref(), now),
    }
}

pub fn render_timeline<'a>(
    timeline: &Timeline<'a>,
    normalizer: &TimeNormalizer,
    now: DateTime<Utc>,
) -> TimelineView<'a> {
    let groups = timeline
        .entries
        .iter()
        .map(|entry| RenderedGroup {
            separator: entry.separator.clone(),
            owner: entry.group.owner.clone(),
            is_mine: entry.group.is_mine,
            messages: entry
                .group
                .members
                .iter()
                .copied()
                .map(|m| render_message(m, normalizer, now))
                .collect(),
        })
        .collect();

    TimelineView {
        state: timeline.state,
        groups,
        typing: timeline.typing.clone(),
    }
}
