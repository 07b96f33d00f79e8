// Статус доставки сообщения
//
// Статус не хранится: это чистая функция от локальных флагов,
// вычисляемая заново при каждом обращении.

use serde::{Deserialize, Serialize};

use crate::protocol::{LocalFlags, Message};

/// Статус доставки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending, // Принято локально, ждём ответа сервера
    Queued,  // Нет сети, транспорт отправит позже
    Failed,  // Окончательная ошибка отправки
    Sent,    // Подтверждено
}

/// Что показывает UI для каждого статуса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Affordance {
    Spinner,
    WillSendWhenOnline,
    TapToRetry,
    DeliveredIcon,
}

impl DeliveryStatus {
    /// Приоритет флагов фиксирован: optimistic > queued > failed.
    /// Больше одного флага быть не должно, но если так вышло,
    /// результат детерминирован.
    pub fn resolve(flags: &LocalFlags) -> Self {
        if flags.count() > 1 {
            tracing::debug!(?flags, "conflicting local flags, applying precedence");
        }

        if flags.is_optimistic {
            DeliveryStatus::Sending
        } else if flags.is_queued {
            DeliveryStatus::Queued
        } else if flags.failed {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Sent
        }
    }

    pub fn of(message: &Message) -> Self {
        Self::resolve(&message.local)
    }

    pub fn affordance(self) -> Affordance {
        match self {
            DeliveryStatus::Sending => Affordance::Spinner,
            DeliveryStatus::Queued => Affordance::WillSendWhenOnline,
            DeliveryStatus::Failed => Affordance::TapToRetry,
            DeliveryStatus::Sent => Affordance::DeliveredIcon,
        }
    }

    /// Ещё не подтверждено сервером
    pub fn is_pending(self) -> bool {
        self != DeliveryStatus::Sent
    }

    pub fn can_retry(self) -> bool {
        self == DeliveryStatus::Failed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Sending => "sending",
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Sent => "sent",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Affordance {
    /// Подпись под сообщением; у спиннера и иконки её нет
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Affordance::WillSendWhenOnline => Some("Will send when online"),
            Affordance::TapToRetry => Some("Tap to retry"),
            Affordance::Spinner | Affordance::DeliveredIcon => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(is_optimistic: bool, is_queued: bool, failed: bool) -> LocalFlags {
        LocalFlags {
            is_optimistic,
            is_queued,
            failed,
        }
    }

    #[test]
    fn test_single_flags() {
        assert_eq!(DeliveryStatus::resolve(&flags(false, false, false)), DeliveryStatus::Sent);
        assert_eq!(DeliveryStatus::resolve(&flags(true, false, false)), DeliveryStatus::Sending);
        assert_eq!(DeliveryStatus::resolve(&flags(false, true, false)), DeliveryStatus::Queued);
        assert_eq!(DeliveryStatus::resolve(&flags(false, false, true)), DeliveryStatus::Failed);
    }

    #[test]
    fn test_precedence_over_all_combinations() {
        for bits in 0u8..8 {
            let f = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let expected = if f.is_optimistic {
                DeliveryStatus::Sending
            } else if f.is_queued {
                DeliveryStatus::Queued
            } else if f.failed {
                DeliveryStatus::Failed
            } else {
                DeliveryStatus::Sent
            };
            assert_eq!(DeliveryStatus::resolve(&f), expected, "flags {:?}", f);
        }
    }

    #[test]
    fn test_optimistic_and_failed_is_sending() {
        let msg = Message::new("m1", "alice", "2024-01-05T09:00:00Z")
            .with_flags(flags(true, false, true));
        assert_eq!(DeliveryStatus::of(&msg), DeliveryStatus::Sending);
    }

    #[test]
    fn test_affordances() {
        assert_eq!(DeliveryStatus::Sending.affordance(), Affordance::Spinner);
        assert_eq!(DeliveryStatus::Queued.affordance().hint(), Some("Will send when online"));
        assert_eq!(DeliveryStatus::Failed.affordance().hint(), Some("Tap to retry"));
        assert_eq!(DeliveryStatus::Sent.affordance(), Affordance::DeliveredIcon);
        assert!(DeliveryStatus::Failed.can_retry());
        assert!(!DeliveryStatus::Queued.can_retry());
        assert!(DeliveryStatus::Queued.is_pending());
        assert!(!DeliveryStatus::Sent.is_pending());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&DeliveryStatus::Queued).unwrap(), "\"queued\"");
        assert_eq!(DeliveryStatus::Sending.to_string(), "sending");
        assert_eq!(
            serde_json::to_string(&Affordance::TapToRetry).unwrap(),
            "\"tapToRetry\""
        );
    }
}
