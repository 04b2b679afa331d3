use chrono::Duration;

use crate::models::order::Order;

pub const NO_TIMESTAMP: &str = "[no timestamp]";

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry<'a> {
    /// 1-based position in chronological order.
    pub position: usize,
    pub order: &'a Order,
    /// Time since the previous entry. `None` for the first entry and for
    /// any entry where either side lacks a timestamp.
    pub delta: Option<Duration>,
}

impl TimelineEntry<'_> {
    pub fn formatted_delta(&self) -> Option<String> {
        self.delta.map(format_delta)
    }
}

/// Stable ascending sort by creation time. Orders without a timestamp go
/// last, in their original relative order.
pub fn sort_chronologically(orders: &[Order]) -> Vec<&Order> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by_key(|o| (o.created_at.is_none(), o.created_at));
    sorted
}

pub fn build_timeline(orders: &[Order]) -> Vec<TimelineEntry<'_>> {
    let sorted = sort_chronologically(orders);

    sorted
        .iter()
        .enumerate()
        .map(|(i, &order)| {
            let delta = if i == 0 {
                None
            } else {
                match (sorted[i - 1].created_at, order.created_at) {
                    (Some(prev), Some(curr)) => Some(curr - prev),
                    _ => None,
                }
            };

            TimelineEntry {
                position: i + 1,
                order,
                delta,
            }
        })
        .collect()
}

/// Render an elapsed time in one of three tiers:
/// `+Ns` under a minute, `+Mm Ss` under an hour, `+Hh Mm` otherwise.
/// Sub-second precision is truncated.
pub fn format_delta(delta: Duration) -> String {
    let total = delta.num_seconds().max(0);

    if total < 60 {
        format!("+{}s", total)
    } else if total < 3600 {
        format!("+{}m {}s", total / 60, total % 60)
    } else {
        format!("+{}h {}m", total / 3600, (total % 3600) / 60)
    }
}
