// Терпимый разбор полей записей бэкенда
//
// Поле неожиданной формы превращается в "нет значения", а не в ошибку:
// одна кривая запись не должна ронять всю ленту. Значение сначала читается
// как `serde_json::Value`, поэтому работает и с serde_json, и с
// serde-wasm-bindgen.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::messages::{Identifier, SenderRef, TimeValue};

/// Строка или целое число; остальное (объекты, массивы, bool, null) даёт `None`
pub fn identifier<'de, D>(deserializer: D) -> Result<Option<Identifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(Identifier::Text(s)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => Identifier::Number(i),
            None => Identifier::Text(n.to_string()),
        }),
        _ => None,
    })
}

/// Вложенный объект отправителя; не-объект даёт `None`
pub fn sender<'de, D>(deserializer: D) -> Result<Option<SenderRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// ISO-строка или epoch в миллисекундах.
/// Дробное число принимается, только если оно целое (`1.7e12` из JS).
pub fn time_value<'de, D>(deserializer: D) -> Result<Option<TimeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(TimeValue::Text(s)),
        Value::Number(n) => n.as_i64().or_else(|| whole_millis(n.as_f64())).map(TimeValue::Millis),
        _ => None,
    })
}

fn whole_millis(value: Option<f64>) -> Option<i64> {
    let f = value?;
    // 2^63 как f64: всё, что меньше по модулю, помещается в i64
    let limit = 9_223_372_036_854_775_808.0_f64;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < limit).then(|| f as i64)
}

/// Только строка
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Строка; всё остальное даёт пустую строку
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(deserializer)?.unwrap_or_default())
}

/// `true` только для настоящего `true`; `null`, строки и числа дают `false`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

/// Неотрицательное целое, с насыщением до `u32::MAX`; остальное даёт 0
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0))
}
