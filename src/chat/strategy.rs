// src/chat/strategy.rs
//! Chat identifier schemes.
//!
//! `Explicit` groups rows by the `chat_id` stored on each message.
//! `Bucket` is the legacy scheme: the id is the local calendar hour of the
//! message (`YYYYMMDD_HH`) and a chat is every message in that hour.

use crate::models::chat::StoredMessage;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, TimeZone, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::fmt::Display;
use std::str::FromStr;

pub const CHAT_ID_LEN: usize = 12;
/// Width of the `prompts.chat_id` column.
pub const MAX_CHAT_ID_LEN: usize = 64;
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

const BUCKET_FORMAT: &str = "%Y%m%d_%H";
const BUCKET_ID_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatIdStrategy {
    #[default]
    Explicit,
    Bucket,
}

/// How the store addresses the rows of one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatScope {
    Exact(String),
    TimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl ChatScope {
    pub fn contains(&self, message: &StoredMessage) -> bool {
        match self {
            ChatScope::Exact(chat_id) => message.chat_id.as_deref() == Some(chat_id.as_str()),
            ChatScope::TimeRange { start, end } => {
                message.created_at >= *start && message.created_at < *end
            }
        }
    }
}

impl FromStr for ChatIdStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "explicit" | "chat_id" | "chatid" => Ok(ChatIdStrategy::Explicit),
            "bucket" | "hour" | "hourly" => Ok(ChatIdStrategy::Bucket),
            other => Err(format!(
                "unknown chat id strategy '{}' (expected 'explicit' or 'bucket')",
                other
            )),
        }
    }
}

impl ChatIdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatIdStrategy::Explicit => "explicit",
            ChatIdStrategy::Bucket => "bucket",
        }
    }

    /// Chat id a stored message belongs to. Explicit rows written without a
    /// `chat_id` have none and are left out of every chat.
    pub fn derive_id(&self, message: &StoredMessage) -> Option<String> {
        match self {
            ChatIdStrategy::Explicit => message.chat_id.clone().filter(|id| !id.is_empty()),
            ChatIdStrategy::Bucket => Some(bucket_id(message.created_at)),
        }
    }

    pub fn scope(&self, chat_id: &str) -> ChatScope {
        match self {
            ChatIdStrategy::Explicit => ChatScope::Exact(chat_id.to_string()),
            ChatIdStrategy::Bucket => {
                let (start, end) = bucket_range(chat_id);
                ChatScope::TimeRange { start, end }
            }
        }
    }

    /// The `chat_id` to write on a new message. Bucket rows carry none.
    pub fn resolve_chat_id(&self, supplied: Option<&str>) -> Option<String> {
        match self {
            ChatIdStrategy::Explicit => Some(
                supplied
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(new_chat_id),
            ),
            ChatIdStrategy::Bucket => {
                if supplied.is_some() {
                    tracing::debug!("Ignoring caller chat id under bucket strategy");
                }
                None
            }
        }
    }

    /// Title shown until the chat has a user message.
    pub fn placeholder_title(&self, first_seen: DateTime<Utc>) -> String {
        match self {
            ChatIdStrategy::Explicit => DEFAULT_CHAT_TITLE.to_string(),
            ChatIdStrategy::Bucket => format!(
                "Chat from {}",
                first_seen.with_timezone(&Local).format("%b %d, %H:00")
            ),
        }
    }
}

/// Fresh 12-character alphanumeric chat id.
pub fn new_chat_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CHAT_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn bucket_id(created_at: DateTime<Utc>) -> String {
    bucket_id_in(created_at, &Local)
}

/// `[start, end)` covered by a bucket id, falling back to today when the id
/// does not parse. Never fails.
pub fn bucket_range(chat_id: &str) -> (DateTime<Utc>, DateTime<Utc>) {
    bucket_range_in(chat_id, &Local, Utc::now())
}

pub fn bucket_id_in<Tz>(created_at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    created_at.with_timezone(tz).format(BUCKET_FORMAT).to_string()
}

pub fn bucket_range_in<Tz: TimeZone>(
    chat_id: &str,
    tz: &Tz,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match parse_bucket_hour(chat_id, tz) {
        Some(range) => range,
        None => {
            tracing::debug!("Unparseable bucket chat id '{}', using today's range", chat_id);
            day_range(tz, now)
        }
    }
}

fn parse_bucket_hour<Tz: TimeZone>(chat_id: &str, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let bytes = chat_id.as_bytes();
    if bytes.len() != BUCKET_ID_LEN || bytes[8] != b'_' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 8 || b.is_ascii_digit())
    {
        return None;
    }

    let year: i32 = chat_id[0..4].parse().ok()?;
    let month: u32 = chat_id[4..6].parse().ok()?;
    let day: u32 = chat_id[6..8].parse().ok()?;
    let hour: u32 = chat_id[9..11].parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)?;
    hour_range(tz.from_local_datetime(&naive))
}

/// UTC span of one local hour. A repeated hour (DST fall-back) spans both
/// of its occurrences; the order chrono reports them in is not relied on.
fn hour_range<Tz: TimeZone>(local: LocalResult<DateTime<Tz>>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (first, second) = match local {
        LocalResult::Single(at) => {
            let at = at.with_timezone(&Utc);
            (at, at)
        }
        LocalResult::Ambiguous(a, b) => (a.with_timezone(&Utc), b.with_timezone(&Utc)),
        LocalResult::None => return None,
    };
    Some((first.min(second), first.max(second) + Duration::hours(1)))
}

fn day_range<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .with_timezone(tz)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + Duration::hours(24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use chrono::FixedOffset;

    fn message(chat_id: Option<&str>, created_at: DateTime<Utc>) -> StoredMessage {
        StoredMessage {
            id: 1,
            user_id: 1,
            chat_id: chat_id.map(str::to_string),
            role: Role::User,
            content: "hello".to_string(),
            created_at,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_bucket_id_is_zero_padded_local_hour() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(bucket_id_in(utc(2024, 3, 5, 7, 59, 0), &plus_two), "20240305_09");
        assert_eq!(bucket_id_in(utc(2024, 12, 31, 23, 30, 0), &plus_two), "20250101_01");
        assert_eq!(bucket_id_in(utc(2024, 1, 2, 3, 4, 5), &Utc), "20240102_03");
    }

    #[test]
    fn test_bucket_range_covers_one_hour() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let (start, end) = bucket_range_in("20240305_09", &plus_two, Utc::now());
        assert_eq!(start, utc(2024, 3, 5, 7, 0, 0));
        assert_eq!(end, utc(2024, 3, 5, 8, 0, 0));
    }

    #[test]
    fn test_bucket_round_trip_contains_timestamp() {
        let samples = [
            utc(2024, 1, 1, 0, 0, 0),
            utc(2024, 2, 29, 12, 59, 59),
            utc(2023, 10, 29, 1, 30, 0),
            utc(2024, 3, 31, 2, 15, 0),
            utc(2025, 6, 15, 23, 45, 12),
        ];
        for t in samples {
            let (start, end) = bucket_range(&bucket_id(t));
            assert!(start <= t && t < end, "{} not in [{}, {})", t, start, end);

            let offset = FixedOffset::west_opt(5 * 3600 + 1800).unwrap();
            let (start, end) = bucket_range_in(&bucket_id_in(t, &offset), &offset, Utc::now());
            assert!(start <= t && t < end);
        }
    }

    #[test]
    fn test_repeated_hour_spans_both_occurrences() {
        // 2023-10-29 02:00 in Berlin happens at +02:00 and again at +01:00
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let winter = FixedOffset::east_opt(3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(2023, 10, 29).unwrap().and_hms_opt(2, 0, 0).unwrap();
        let first = summer.from_local_datetime(&naive).unwrap();
        let second = winter.from_local_datetime(&naive).unwrap();

        for local in [LocalResult::Ambiguous(first, second), LocalResult::Ambiguous(second, first)] {
            let (start, end) = hour_range(local).unwrap();
            assert_eq!(start, utc(2023, 10, 29, 0, 0, 0));
            assert_eq!(end, utc(2023, 10, 29, 2, 0, 0));
            for t in [utc(2023, 10, 29, 0, 30, 0), utc(2023, 10, 29, 1, 30, 0)] {
                assert!(start <= t && t < end, "{} not in [{}, {})", t, start, end);
            }
        }
    }

    #[test]
    fn test_skipped_hour_has_no_range() {
        assert!(hour_range::<Utc>(LocalResult::None).is_none());
        let (start, end) = hour_range(LocalResult::Single(utc(2024, 3, 5, 7, 0, 0))).unwrap();
        assert_eq!(end - start, Duration::hours(1));
    }

    #[test]
    fn test_malformed_bucket_falls_back_to_today() {
        let now = utc(2024, 5, 10, 15, 20, 0);
        for bad in ["notadate", "", "2024051_15", "20240510-15", "2024O510_15", "20241310_10", "20240230_10", "20240510_24", "20240510_1５"] {
            let (start, end) = bucket_range_in(bad, &Utc, now);
            assert_eq!(start, utc(2024, 5, 10, 0, 0, 0), "input {:?}", bad);
            assert_eq!(end - start, Duration::hours(24));
        }
    }

    #[test]
    fn test_malformed_bucket_with_local_time_is_a_day() {
        let (start, end) = bucket_range("notadate");
        assert_eq!(end - start, Duration::hours(24));
        let now = Utc::now();
        assert!(start <= now && now < end);
    }

    #[test]
    fn test_explicit_derive_is_stored_chat_id() {
        let strategy = ChatIdStrategy::Explicit;
        assert_eq!(strategy.derive_id(&message(Some("abc123"), Utc::now())), Some("abc123".to_string()));
        assert_eq!(strategy.derive_id(&message(None, Utc::now())), None);
        assert_eq!(strategy.derive_id(&message(Some(""), Utc::now())), None);
    }

    #[test]
    fn test_bucket_derive_ignores_stored_chat_id() {
        let t = utc(2024, 7, 1, 10, 10, 0);
        let id = ChatIdStrategy::Bucket.derive_id(&message(Some("abc123"), t)).unwrap();
        assert_eq!(id, bucket_id(t));
    }

    #[test]
    fn test_scope_per_strategy() {
        assert_eq!(ChatIdStrategy::Explicit.scope("abc"), ChatScope::Exact("abc".to_string()));
        match ChatIdStrategy::Bucket.scope("notadate") {
            ChatScope::TimeRange { start, end } => assert_eq!(end - start, Duration::hours(24)),
            other => panic!("unexpected scope {:?}", other),
        }
    }

    #[test]
    fn test_scope_contains() {
        let t = utc(2024, 7, 1, 10, 10, 0);
        let range = ChatScope::TimeRange { start: utc(2024, 7, 1, 10, 0, 0), end: utc(2024, 7, 1, 11, 0, 0) };
        assert!(range.contains(&message(None, t)));
        assert!(!range.contains(&message(None, utc(2024, 7, 1, 11, 0, 0))));
        assert!(ChatScope::Exact("a".into()).contains(&message(Some("a"), t)));
        assert!(!ChatScope::Exact("a".into()).contains(&message(None, t)));
    }

    #[test]
    fn test_new_chat_ids_are_short_alphanumeric_tokens() {
        let a = new_chat_id();
        let b = new_chat_id();
        assert_eq!(a.len(), CHAT_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_chat_id() {
        let explicit = ChatIdStrategy::Explicit;
        assert_eq!(explicit.resolve_chat_id(Some("keep-me")), Some("keep-me".to_string()));
        assert_eq!(explicit.resolve_chat_id(Some("   ")).map(|id| id.len()), Some(CHAT_ID_LEN));
        assert_eq!(explicit.resolve_chat_id(None).map(|id| id.len()), Some(CHAT_ID_LEN));
        assert_eq!(ChatIdStrategy::Bucket.resolve_chat_id(Some("keep-me")), None);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("explicit".parse::<ChatIdStrategy>(), Ok(ChatIdStrategy::Explicit));
        assert_eq!(" Bucket ".parse::<ChatIdStrategy>(), Ok(ChatIdStrategy::Bucket));
        assert!("daily".parse::<ChatIdStrategy>().is_err());
    }

    #[test]
    fn test_placeholder_titles() {
        let t = utc(2024, 7, 1, 10, 10, 0);
        assert_eq!(ChatIdStrategy::Explicit.placeholder_title(t), DEFAULT_CHAT_TITLE);
        assert!(ChatIdStrategy::Bucket.placeholder_title(t).starts_with("Chat from "));
    }
}
