//! Chat and lead statistics for the support dashboard.
//!
//! Computed on demand from a [`StoreData`] borrow; nothing is cached.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use crate::core::StoreData;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlyCount {
    /// Start of the hour, `%H:%M`.
    pub hour: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatStats {
    pub total_sessions: usize,
    /// Sessions active in the last 24 hours.
    pub active_sessions: usize,
    pub total_messages: usize,
    /// Messages per session, rounded to two decimals.
    pub avg_messages: f64,
    /// Messages of the last 24 hours, bucketed by hour, oldest first.
    pub hourly_activity: Vec<HourlyCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeadStats {
    pub total_leads: usize,
    pub leads_30_days: usize,
    pub opt_in_count: usize,
    /// Leads per source, most frequent first.
    pub lead_sources: Vec<SourceCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analytics {
    pub chat: ChatStats,
    pub leads: LeadStats,
}

pub fn analytics(data: &StoreData, now: DateTime<Utc>) -> Analytics {
    Analytics {
        chat: chat_stats(data, now),
        leads: lead_stats(data, now),
    }
}

pub fn chat_stats(data: &StoreData, now: DateTime<Utc>) -> ChatStats {
    let day_ago = now - Duration::days(1);

    let total_sessions = data.sessions.len();
    let active_sessions = data.sessions.values().filter(|s| s.last_active >= day_ago).count();
    let total_messages = data.messages.len();
    let avg_messages = if total_sessions > 0 {
        (total_messages as f64 / total_sessions as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let mut buckets: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for message in data.messages.iter().filter(|m| m.created_at >= day_ago) {
        let hour = message
            .created_at
            .duration_trunc(Duration::hours(1))
            .unwrap_or(message.created_at);
        *buckets.entry(hour).or_default() += 1;
    }

    ChatStats {
        total_sessions,
        active_sessions,
        total_messages,
        avg_messages,
        hourly_activity: buckets
            .into_iter()
            .map(|(hour, count)| HourlyCount {
                hour: hour.format("%H:%M").to_string(),
                count,
            })
            .collect(),
    }
}

pub fn lead_stats(data: &StoreData, now: DateTime<Utc>) -> LeadStats {
    let month_ago = now - Duration::days(30);

    let mut per_source: HashMap<&str, usize> = HashMap::new();
    for lead in &data.leads {
        *per_source.entry(lead.source.as_str()).or_default() += 1;
    }
    let mut lead_sources: Vec<SourceCount> = per_source
        .into_iter()
        .map(|(source, count)| SourceCount {
            source: source.to_string(),
            count,
        })
        .collect();
    lead_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));

    LeadStats {
        total_leads: data.leads.len(),
        leads_30_days: data.leads.iter().filter(|l| l.created_at >= month_ago).count(),
        opt_in_count: data.leads.iter().filter(|l| l.opt_in).count(),
        lead_sources,
    }
}
