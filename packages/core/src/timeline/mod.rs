// Лента сообщений: время, отправитель, группировка

pub mod grouping;
pub mod identity;
pub mod time;

pub use grouping::{
    build_timeline, DateSeparator, GroupBreak, MessageGroup, Timeline, TimelineEntry,
    TimelineGrouper, TimelineState,
};
pub use identity::{is_mine, sender_candidates, sender_key};
pub use time::{
    format_date_separator, format_relative, is_same_zone_date, to_zone_local_date_key, DateKey,
    TimeNormalizer,
};
