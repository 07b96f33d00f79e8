//! Нормализация времени к опорному часовому поясу
//!
//! Все решения о границах дней принимаются по датам в одном поясе
//! (`Config::reference_zone`), а не по разнице миллисекунд: сообщение в 23:59
//! и сообщение в 00:01 следующего дня относятся к разным дням.
//!
//! Функции не паникуют и не возвращают ошибок на битых данных: невалидная
//! дата даёт `None`, `false` или пустую строку.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::protocol::TimeValue;

/// Форматы со смещением, которые не покрывает RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

/// Форматы без смещения: трактуются как локальное время опорного пояса
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Допустимые годы. За пределами chrono не может перевести момент в
/// локальное время пояса и паникует.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Дата (год-месяц-день) в опорном поясе
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Число календарных дней от `self` до `later` (отрицательное, если `later` раньше)
    pub fn days_until(&self, later: DateKey) -> i64 {
        later.0.signed_duration_since(self.0).num_days()
    }

    pub fn previous(&self) -> Option<DateKey> {
        self.0.pred_opt().map(DateKey)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Привязанный к поясу нормализатор времени
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    zone: Tz,
    relative_days_limit: i64,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::from_config(Config::global())
    }
}

impl TimeNormalizer {
    pub fn new(zone: Tz) -> Self {
        Self {
            zone,
            relative_days_limit: Config::default().relative_days_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            zone: config.reference_zone,
            relative_days_limit: config.relative_days_limit,
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Разобрать значение времени в UTC-момент
    pub fn parse(&self, value: &TimeValue) -> Option<DateTime<Utc>> {
        let parsed = match value {
            TimeValue::Millis(ms) if *ms > 0 => DateTime::<Utc>::from_timestamp_millis(*ms),
            TimeValue::Millis(_) => None,
            TimeValue::Text(raw) => parse_text(raw, self.zone),
        }
        .filter(|instant| YEAR_RANGE.contains(&instant.year()));
        if parsed.is_none() {
            tracing::trace!(?value, "unparseable timestamp");
        }
        parsed
    }

    pub fn parse_opt(&self, value: Option<&TimeValue>) -> Option<DateTime<Utc>> {
        value.and_then(|v| self.parse(v))
    }

    /// Дата момента в опорном поясе
    pub fn date_key_of(&self, instant: DateTime<Utc>) -> DateKey {
        DateKey(instant.with_timezone(&self.zone).date_naive())
    }

    pub fn date_key(&self, value: Option<&TimeValue>) -> Option<DateKey> {
        self.parse_opt(value).map(|instant| self.date_key_of(instant))
    }

    /// `false`, если хотя бы одна дата невалидна: лучше лишний разделитель,
    /// чем склейка с чужим днём
    pub fn is_same_date(&self, a: Option<&TimeValue>, b: Option<&TimeValue>) -> bool {
        match (self.date_key(a), self.date_key(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// "now" / "{m}m" / "{h}h" / "{d}d" / короткая дата
    pub fn format_relative(&self, value: Option<&TimeValue>, now: DateTime<Utc>) -> String {
        let Some(then) = self.parse_opt(value) else {
            return String::new();
        };

        let secs = now.signed_duration_since(then).num_seconds();
        if secs < 60 {
            return "now".to_string();
        }
        if secs < 3600 {
            return format!("{}m", secs / 60);
        }
        if secs < 24 * 3600 {
            return format!("{}h", secs / 3600);
        }

        let days = self
            .date_key_of(then)
            .days_until(self.date_key_of(now))
            .max(1);
        if days < self.relative_days_limit {
            return format!("{}d", days);
        }

        let local = then.with_timezone(&self.zone);
        if local.year() == now.with_timezone(&self.zone).year() {
            local.format("%b %-d").to_string()
        } else {
            local.format("%b %-d, %Y").to_string()
        }
    }

    /// "Today" / "Yesterday" / "Friday, January 5, 2024"
    pub fn format_date_separator(&self, value: Option<&TimeValue>, now: DateTime<Utc>) -> String {
        let Some(then) = self.parse_opt(value) else {
            return String::new();
        };
        self.separator_label(then, now)
    }

    pub(crate) fn separator_label(&self, then: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let key = self.date_key_of(then);
        let today = self.date_key_of(now);

        if key == today {
            return "Today".to_string();
        }
        if Some(key) == today.previous() {
            return "Yesterday".to_string();
        }
        then.with_timezone(&self.zone)
            .format("%A, %B %-d, %Y")
            .to_string()
    }

    /// Время сообщения, "9:05 AM"
    pub fn format_clock(&self, value: Option<&TimeValue>) -> String {
        match self.parse_opt(value) {
            Some(then) => then.with_timezone(&self.zone).format("%-I:%M %p").to_string(),
            None => String::new(),
        }
    }
}

fn parse_text(raw: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return localize(naive, zone);
        }
    }
    // Только дата: полночь в опорном поясе
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return localize(date.and_hms_opt(0, 0, 0)?, zone);
    }

    None
}

fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    if !YEAR_RANGE.contains(&naive.year()) {
        return None;
    }
    // Для времени внутри перехода на летнее время берём час спустя
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(chrono::Duration::hours(1))
                .and_then(|shifted| zone.from_local_datetime(&shifted).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Свободные функции поверх глобальной конфигурации
// ============================================================================

/// Дата в поясе `zone`; `None` для невалидного времени
pub fn to_zone_local_date_key(value: Option<&TimeValue>, zone: Tz) -> Option<DateKey> {
    TimeNormalizer::new(zone).date_key(value)
}

pub fn is_same_zone_date(a: Option<&TimeValue>, b: Option<&TimeValue>, zone: Tz) -> bool {
    TimeNormalizer::new(zone).is_same_date(a, b)
}

pub fn format_relative(value: Option<&TimeValue>, now: DateTime<Utc>) -> String {
    TimeNormalizer::default().format_relative(value, now)
}

pub fn format_date_separator(value: Option<&TimeValue>, now: DateTime<Utc>) -> String {
    TimeNormalizer::default().format_date_separator(value, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ny() -> TimeNormalizer {
        TimeNormalizer::new(chrono_tz::America::New_York)
    }

    fn ts(raw: &str) -> TimeValue {
        TimeValue::from(raw)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse_formats() {
        let n = ny();
        let expected = n.parse(&ts("2024-01-05T14:00:00Z")).unwrap();

        assert_eq!(n.parse(&ts("2024-01-05T09:00:00-05:00")), Some(expected));
        assert_eq!(n.parse(&ts("2024-01-05T14:00:00.000+0000")), Some(expected));
        assert_eq!(n.parse(&ts("2024-01-05 09:00:00")), Some(expected));
        assert_eq!(n.parse(&ts("Fri, 05 Jan 2024 14:00:00 +0000")), Some(expected));
        assert_eq!(n.parse(&TimeValue::Millis(expected.timestamp_millis())), Some(expected));
    }

    #[test]
    fn test_parse_invalid_is_none() {
        let n = ny();
        assert!(n.parse(&ts("")).is_none());
        assert!(n.parse(&ts("yesterday-ish")).is_none());
        assert!(n.parse(&ts("2024-13-45")).is_none());
        assert!(n.parse(&TimeValue::Millis(0)).is_none());
        assert!(n.parse_opt(None).is_none());
    }

    #[test]
    fn test_extreme_instants_are_invalid() {
        let tokyo = TimeNormalizer::new(chrono_tz::Asia::Tokyo);
        let extremes = [
            ts("-262143-01-01T00:00:00+0000"),
            ts("+262142-12-31T23:59:59+0000"),
            ts("0000-12-31T23:00:00Z"),
            ts("10000-01-01T00:00:00Z"),
            TimeValue::Millis(DateTime::<Utc>::MAX_UTC.timestamp_millis()),
        ];
        for value in &extremes {
            for n in [ny(), tokyo] {
                assert!(n.parse(value).is_none(), "{:?}", value);
                assert!(n.date_key(Some(value)).is_none());
                assert_eq!(n.format_relative(Some(value), now()), "");
                assert_eq!(n.format_date_separator(Some(value), now()), "");
                assert_eq!(n.format_clock(Some(value)), "");
            }
        }
        assert!(ny().parse(&ts("+262142-12-31 23:59:59")).is_none());
        assert!(ny().parse(&ts("-262143-01-01")).is_none());
        // Границы окна ещё валидны
        assert!(ny().parse(&ts("9999-12-31T12:00:00Z")).is_some());
        assert!(ny().parse(&ts("0001-01-02T00:00:00Z")).is_some());
    }

    #[test]
    fn test_date_only_is_local_midnight() {
        let key = ny().date_key(Some(&ts("2024-01-01"))).unwrap();
        assert_eq!(key.to_string(), "2024-01-01");
    }

    #[test]
    fn test_date_key_uses_reference_zone() {
        // 2024-01-01T00:00:00Z в Нью-Йорке ещё 31 декабря
        let key = ny().date_key(Some(&TimeValue::Millis(1_704_067_200_000))).unwrap();
        assert_eq!(key.to_string(), "2023-12-31");

        let key = to_zone_local_date_key(
            Some(&TimeValue::Millis(1_704_067_200_000)),
            chrono_tz::Europe::Rome,
        )
        .unwrap();
        assert_eq!(key.to_string(), "2024-01-01");
    }

    #[test]
    fn test_same_date_ignores_offset_representation() {
        let n = ny();
        let a = ts("2024-01-05T10:00:00-05:00");
        let b = ts("2024-01-05T20:00:00Z");
        let c = ts("2024-01-06T03:00:00+00:00");
        assert!(n.is_same_date(Some(&a), Some(&b)));
        assert!(n.is_same_date(Some(&a), Some(&c)));
        assert!(n.is_same_date(Some(&b), Some(&b)));
    }

    #[test]
    fn test_midnight_straddle_is_different_date() {
        let n = ny();
        assert!(!n.is_same_date(
            Some(&ts("2024-01-05T23:59:00-05:00")),
            Some(&ts("2024-01-06T00:01:00-05:00")),
        ));
        assert!(!is_same_zone_date(
            Some(&ts("2024-01-06T04:59:00Z")),
            Some(&ts("2024-01-06T05:01:00Z")),
            chrono_tz::America::New_York,
        ));
    }

    #[test]
    fn test_same_date_invalid_is_false() {
        let n = ny();
        let valid = ts("2024-01-05T10:00:00Z");
        assert!(!n.is_same_date(Some(&valid), Some(&ts("nope"))));
        assert!(!n.is_same_date(None, Some(&valid)));
        assert!(!n.is_same_date(None, None));
    }

    #[test]
    fn test_format_relative_thresholds() {
        let n = ny();
        let rel = |raw: &str| n.format_relative(Some(&ts(raw)), now());

        assert_eq!(rel("2024-01-10T11:59:30Z"), "now");
        assert_eq!(rel("2024-01-10T12:05:00Z"), "now");
        assert_eq!(rel("2024-01-10T11:55:00Z"), "5m");
        assert_eq!(rel("2024-01-10T09:00:00Z"), "3h");
        assert_eq!(rel("2024-01-09T11:00:00Z"), "1d");
        assert_eq!(rel("2024-01-08T12:00:00Z"), "2d");
        assert_eq!(rel("2024-01-04T12:00:00Z"), "6d");
        assert_eq!(rel("2024-01-03T12:00:00Z"), "Jan 3");
        assert_eq!(rel("2023-12-25T17:00:00Z"), "Dec 25, 2023");
        assert_eq!(rel("broken"), "");
        assert_eq!(n.format_relative(None, now()), "");
    }

    #[test]
    fn test_format_date_separator() {
        let n = ny();
        let sep = |raw: &str| n.format_date_separator(Some(&ts(raw)), now());

        // 00:30 в Нью-Йорке
        assert_eq!(sep("2024-01-10T05:30:00Z"), "Today");
        // 23:30 предыдущего дня в Нью-Йорке, хотя в UTC уже 10 января
        assert_eq!(sep("2024-01-10T04:30:00Z"), "Yesterday");
        assert_eq!(sep("2024-01-05T15:00:00Z"), "Friday, January 5, 2024");
        assert_eq!(sep("not a date"), "");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(ny().format_clock(Some(&ts("2024-01-05T14:05:00Z"))), "9:05 AM");
        assert_eq!(ny().format_clock(Some(&ts("2024-07-05T23:30:00Z"))), "7:30 PM");
        assert_eq!(ny().format_clock(None), "");
    }

    #[test]
    fn test_days_until() {
        let a = DateKey::new(NaiveDate::from_ymd_opt(2024, 2, 27).unwrap());
        let b = DateKey::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(a.days_until(b), 3);
        assert_eq!(b.days_until(a), -3);
        assert_eq!(b.previous().unwrap().to_string(), "2024-02-29");
    }
}
