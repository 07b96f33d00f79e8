// Определение "это моё сообщение?"
//
// Бэкенд кладёт отправителя в разные поля в зависимости от источника
// записи. Вместо разбора произвольного JSON используем фиксированный
// список типизированных аксессоров в порядке приоритета.

use crate::protocol::{Identifier, Message};

/// Аксессор одного возможного поля отправителя
type SenderAccessor = fn(&Message) -> Option<Identifier>;

/// Поля отправителя в порядке приоритета
const SENDER_ACCESSORS: &[(&str, SenderAccessor)] = &[
    ("senderId", |m| m.sender_id.clone()),
    ("sender.id", |m| m.sender.as_ref().and_then(|s| s.id.clone())),
    ("sender._id", |m| m.sender.as_ref().and_then(|s| s.alt_id.clone())),
    ("sender.username", |m| {
        m.sender
            .as_ref()
            .and_then(|s| s.username.clone())
            .map(Identifier::Text)
    }),
    ("userId", |m| m.user_id.clone()),
    ("username", |m| m.username.clone().map(Identifier::Text)),
    ("from", |m| m.from.clone()),
    ("author", |m| m.author.clone()),
];

/// Все присутствующие идентификаторы отправителя, в порядке приоритета.
/// Пустые строки пропускаются.
pub fn sender_candidates(message: &Message) -> Vec<Identifier> {
    SENDER_ACCESSORS
        .iter()
        .filter_map(|(_, accessor)| accessor(message))
        .filter(|id| !id.is_blank())
        .collect()
}

/// Ключ отправителя: строковая форма первого найденного идентификатора
pub fn sender_key(message: &Message) -> Option<String> {
    SENDER_ACCESSORS
        .iter()
        .filter_map(|(_, accessor)| accessor(message))
        .find(|id| !id.is_blank())
        .map(|id| id.to_string())
}

/// Имя поля, из которого взят ключ отправителя (для логов)
pub fn sender_source(message: &Message) -> Option<&'static str> {
    SENDER_ACCESSORS
        .iter()
        .find(|(_, accessor)| accessor(message).map_or(false, |id| !id.is_blank()))
        .map(|(name, _)| *name)
}

/// `true`, если любой из идентификаторов отправителя совпадает со зрителем.
/// Без зрителя ничего не "моё".
pub fn is_mine(message: &Message, viewer: Option<&Identifier>) -> bool {
    let Some(viewer) = viewer.filter(|v| !v.is_blank()) else {
        return false;
    };
    sender_candidates(message)
        .iter()
        .any(|candidate| candidate.matches(viewer))
}
