//! Usage statistics derived from an entity's interaction-log feed.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Known interaction event types.
pub mod event_type {
    pub const ENTITY_VIEW: &str = "entity_view";
    pub const ENTITY_INTERACTION: &str = "entity_interaction";
    pub const ENTITY_SHARE: &str = "entity_share";
    pub const CHAT_REQUEST: &str = "chat_request";
    pub const REQUEST_ATTRIBUTE: &str = "request_attribute";
    pub const UNKNOWN: &str = "unknown";
}

/// Number of daily buckets kept in `view_history`.
pub const VIEW_HISTORY_DAYS: usize = 7;
/// Number of entries kept in `recent_logs`.
pub const RECENT_LOG_LIMIT: usize = 10;

/// One record of the interaction-log feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InteractionLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "eventType", alias = "event_type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at_snake: Option<Value>,
    #[serde(rename = "interactionType", alias = "interaction_type", default, skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<String>,
    #[serde(rename = "eventPayload", alias = "event_payload", default, skip_serializing_if = "Option::is_none")]
    pub event_payload: Option<Value>,
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

impl InteractionLogEntry {
    /// Event type, with `unknown` for entries that carry none.
    pub fn kind(&self) -> &str {
        self.event_type.as_deref().unwrap_or(event_type::UNKNOWN)
    }

    /// First parseable of `timestamp`, `createdAt`, `created_at`.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        [&self.timestamp, &self.created_at, &self.created_at_snake]
            .into_iter()
            .flatten()
            .find_map(parse_instant)
    }
}

/// Extracts log entries from a feed response.
///
/// Accepts `{logs: [...]}`, `{notifications: [...]}` or a bare array;
/// anything else is an empty feed.
pub fn parse_log_feed(value: Value) -> Vec<InteractionLogEntry> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["logs", "notifications"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Where a statistics value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatsSource {
    /// Derived from the live log feed.
    Live,
    /// Last live value for the same entity, served because the feed failed.
    Cached,
    /// Randomized placeholder; not real data.
    Fallback,
}

/// Views on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Aggregated statistics for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub views: u64,
    pub interactions: u64,
    pub shares: u64,
    pub chat_requests: u64,
    pub attribute_requests: u64,
    pub last_viewed: DateTime<Utc>,
    pub event_breakdown: BTreeMap<String, u64>,
    pub view_history: Vec<DailyCount>,
    pub recent_logs: Vec<InteractionLogEntry>,
    pub source: StatsSource,
}

impl EntityStats {
    /// Derives statistics from `logs`.
    ///
    /// Pure: the same logs and `now` always yield the same value. `now` is
    /// only used as `last_viewed` when no view entry has a timestamp.
    pub fn from_logs(logs: &[InteractionLogEntry], now: DateTime<Utc>) -> Self {
        let count = |kind: &str| logs.iter().filter(|l| l.event_type.as_deref() == Some(kind)).count() as u64;

        let mut event_breakdown = BTreeMap::new();
        for log in logs {
            *event_breakdown.entry(log.kind().to_string()).or_insert(0) += 1;
        }

        let views: Vec<&InteractionLogEntry> = logs
            .iter()
            .filter(|l| l.event_type.as_deref() == Some(event_type::ENTITY_VIEW))
            .collect();

        let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for at in views.iter().filter_map(|l| l.occurred_at()) {
            *by_day.entry(at.date_naive()).or_insert(0) += 1;
        }
        let skip = by_day.len().saturating_sub(VIEW_HISTORY_DAYS);
        let view_history = by_day
            .into_iter()
            .skip(skip)
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        let mut recent_logs: Vec<InteractionLogEntry> = logs.to_vec();
        // Stable: equal timestamps keep feed order, undated entries sink.
        recent_logs.sort_by_key(|l| Reverse(l.occurred_at()));
        recent_logs.truncate(RECENT_LOG_LIMIT);

        let last_viewed = views
            .first()
            .and_then(|l| l.occurred_at())
            .unwrap_or(now);

        Self {
            views: views.len() as u64,
            interactions: count(event_type::ENTITY_INTERACTION),
            shares: count(event_type::ENTITY_SHARE),
            chat_requests: count(event_type::CHAT_REQUEST),
            attribute_requests: count(event_type::REQUEST_ATTRIBUTE),
            last_viewed,
            event_breakdown,
            view_history,
            recent_logs,
            source: StatsSource::Live,
        }
    }

    /// Randomized placeholder statistics, tagged [`StatsSource::Fallback`].
    pub fn placeholder<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let views = rng.gen_range(10..=109);
        let interactions = rng.gen_range(5..=54);
        let shares = rng.gen_range(2..=21);
        let chat_requests = rng.gen_range(1..=10);
        let attribute_requests = rng.gen_range(1..=5);

        let today = now.date_naive();
        let view_history = (0..VIEW_HISTORY_DAYS as i64)
            .rev()
            .map(|days_ago| DailyCount {
                date: today - Duration::days(days_ago),
                count: rng.gen_range(1..=20),
            })
            .collect();

        let event_breakdown = BTreeMap::from([
            (event_type::ENTITY_VIEW.to_string(), views),
            (event_type::ENTITY_INTERACTION.to_string(), interactions),
            (event_type::ENTITY_SHARE.to_string(), shares),
            (event_type::CHAT_REQUEST.to_string(), chat_requests),
            (event_type::REQUEST_ATTRIBUTE.to_string(), attribute_requests),
        ]);

        Self {
            views,
            interactions,
            shares,
            chat_requests,
            attribute_requests,
            last_viewed: now,
            event_breakdown,
            view_history,
            recent_logs: Vec::new(),
            source: StatsSource::Fallback,
        }
    }

    /// Returns a copy tagged with `source`.
    pub fn with_source(mut self, source: StatsSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == StatsSource::Fallback
    }
}
