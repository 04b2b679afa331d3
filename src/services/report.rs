use chrono::{Duration, Local};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

use crate::models::order::Order;
use crate::services::duplicate_grouping::{DuplicateAnalysis, GroupKey};
use crate::services::phone;
use crate::services::timeline::{self, build_timeline, NO_TIMESTAMP};

const RULE_WIDTH: usize = 90;
const EMPTY: &str = "[EMPTY]";
const NULL: &str = "[NULL]";

/// Deltas under this are treated as a repeated submission.
const RAPID_SUBMISSION_WINDOW: i64 = 60;

/// Text report over one fetch. Rendered through `Display`.
pub struct Report<'a> {
    target_ids: &'a [i64],
    orders: &'a [Order],
}

impl<'a> Report<'a> {
    pub fn new(target_ids: &'a [i64], orders: &'a [Order]) -> Self {
        Self { target_ids, orders }
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        heading(f, "DUPLICATE ORDER ANALYSIS")?;
        writeln!(f, "Target Order IDs: {}", join_ids(self.target_ids))?;

        if self.orders.is_empty() {
            writeln!(f, "No orders found for the specified IDs.")?;
            return Ok(());
        }

        writeln!(f, "Found {} orders", self.orders.len())?;
        let missing: Vec<i64> = self
            .target_ids
            .iter()
            .copied()
            .filter(|id| !self.orders.iter().any(|o| o.id == *id))
            .collect();
        if !missing.is_empty() {
            writeln!(f, "Not found: {}", join_ids(&missing))?;
        }
        writeln!(f)?;

        let analysis = DuplicateAnalysis::from_orders(self.orders);

        heading(f, "DETAILED ORDER INFORMATION")?;
        for order in timeline::sort_chronologically(self.orders) {
            write_order_details(f, order)?;
            writeln!(f)?;
        }

        heading(f, "DUPLICATE ANALYSIS")?;
        write_duplicate_analysis(f, &analysis)?;

        writeln!(f)?;
        heading(f, "TIMELINE ANALYSIS")?;
        write_timeline(f, self.orders)?;

        heading(f, "CONCLUSIONS & RECOMMENDATIONS")?;
        write_findings(f, self.orders, &analysis)?;
        writeln!(f)?;
        write_recommendations(f)?;

        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "Analysis complete")?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}

fn heading(f: &mut Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

fn or_empty(value: Option<&str>) -> &str {
    value.unwrap_or(EMPTY)
}

fn write_order_details(f: &mut Formatter<'_>, order: &Order) -> fmt::Result {
    writeln!(f, "ORDER #{}", order.id)?;
    writeln!(f, "{}", "-".repeat(50))?;

    writeln!(f, "Customer Email:  {}", or_empty(order.customer_email.as_deref()))?;
    match order.customer_phone.as_deref() {
        Some(p) => writeln!(f, "Phone Number:    {} ({})", p, phone::classify(p).label())?,
        None => writeln!(f, "Phone Number:    {}", EMPTY)?,
    }

    match order.payment_amount {
        Some(amount) => writeln!(f, "Payment Amount:  {}", amount)?,
        None => writeln!(f, "Payment Amount:  {}", NULL)?,
    }
    writeln!(f, "Payment Method:  {}", or_empty(order.payment_method.as_deref()))?;
    writeln!(f, "Product Name:    {}", or_empty(order.product_name.as_deref()))?;
    match order.ticket_quantity {
        Some(quantity) => writeln!(f, "Ticket Quantity: {}", quantity)?,
        None => writeln!(f, "Ticket Quantity: {}", NULL)?,
    }
    writeln!(f, "Order Status:    {}", or_empty(order.order_status.as_deref()))?;

    match order.created_at {
        Some(dt) => {
            writeln!(
                f,
                "Created At:      {} (Local)",
                dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(f, "UTC Time:        {} (UTC)", dt.format("%Y-%m-%d %H:%M:%S"))?;
        }
        None => writeln!(f, "Created At:      {}", NO_TIMESTAMP)?,
    }

    if let Some(receipt) = order.receipt_url.as_deref() {
        writeln!(f, "Receipt URL:     {}", receipt)?;
    }

    if !order.extra.is_empty() {
        writeln!(f, "Other Fields:")?;
        for (name, value) in &order.extra {
            match value {
                Value::Null => writeln!(f, "  {}: [EMPTY/NULL]", name)?,
                Value::String(s) if s.trim().is_empty() => writeln!(f, "  {}: [EMPTY/NULL]", name)?,
                Value::String(s) => writeln!(f, "  {}: {}", name, s)?,
                other => writeln!(f, "  {}: {}", name, other)?,
            }
        }
    }

    Ok(())
}

fn write_duplicate_analysis(f: &mut Formatter<'_>, analysis: &DuplicateAnalysis<'_>) -> fmt::Result {
    for grouping in analysis.groupings() {
        writeln!(f, "{}:", grouping.key.label())?;

        // Minute buckets are only interesting when they cluster
        let only_clusters = grouping.key == GroupKey::CreatedMinute;

        if grouping.groups.is_empty() || (only_clusters && grouping.clusters().next().is_none()) {
            writeln!(f, "  (none)")?;
        }

        for group in &grouping.groups {
            let shown_key = match grouping.key {
                GroupKey::Amount => format!("{} won", group.key()),
                _ => group.key().clone(),
            };

            if group.is_duplicate() {
                let label = if only_clusters { "CLUSTER" } else { "DUPLICATE" };
                writeln!(
                    f,
                    "  {}: {} -> {} orders (IDs: {})",
                    label,
                    shown_key,
                    group.len(),
                    join_ids(&group.ids())
                )?;

                match grouping.key {
                    GroupKey::Phone => {
                        for gap in group.gaps() {
                            writeln!(
                                f,
                                "    Time gap between order {} and {}: {} seconds",
                                gap.from_id,
                                gap.to_id,
                                gap.elapsed.num_seconds()
                            )?;
                        }
                    }
                    GroupKey::CreatedMinute => {
                        writeln!(f, "    This suggests rapid successive submissions!")?;
                    }
                    _ => {}
                }
            } else if !only_clusters {
                writeln!(f, "  UNIQUE: {} -> 1 order (ID: {})", shown_key, join_ids(&group.ids()))?;
            }
        }

        writeln!(f)?;
    }

    Ok(())
}

fn write_timeline(f: &mut Formatter<'_>, orders: &[Order]) -> fmt::Result {
    writeln!(f, "CHRONOLOGICAL ORDER:")?;

    for entry in build_timeline(orders) {
        let order = entry.order;
        let time = order
            .created_at
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NO_TIMESTAMP.to_string());
        let delta = entry
            .formatted_delta()
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();

        writeln!(f, "{}. Order #{:<3} at {}{}", entry.position, order.id, time, delta)?;
        writeln!(f, "   Email:  {}", or_empty(order.customer_email.as_deref()))?;
        writeln!(f, "   Phone:  {}", or_empty(order.customer_phone.as_deref()))?;
        writeln!(f, "   Method: {}", or_empty(order.payment_method.as_deref()))?;
        writeln!(f)?;
    }

    Ok(())
}

fn write_findings(f: &mut Formatter<'_>, orders: &[Order], analysis: &DuplicateAnalysis<'_>) -> fmt::Result {
    writeln!(f, "KEY FINDINGS:")?;

    let mut findings: Vec<String> = Vec::new();
    let total = orders.len();

    if let Some(phones) = analysis.get(GroupKey::Phone) {
        for cluster in phones.clusters() {
            let scope = if cluster.len() == total { "All" } else { "" };
            findings.push(
                format!(
                    "{} {} orders use the same phone number: {} (IDs: {})",
                    scope,
                    cluster.len(),
                    cluster.key(),
                    join_ids(&cluster.ids())
                )
                .trim()
                .to_string(),
            );
        }
    }

    let with_email: Vec<&Order> = orders.iter().filter(|o| o.customer_email.is_some()).collect();
    match analysis.cluster_count(GroupKey::Email) {
        0 => findings.push(format!(
            "{} of {} orders have an email address; none is shared",
            with_email.len(),
            total
        )),
        n => findings.push(format!("{} email addresses are shared by more than one order", n)),
    }

    let entries = build_timeline(orders);
    for pair in entries.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if let Some(delta) = curr.delta {
            if delta < Duration::seconds(RAPID_SUBMISSION_WINDOW) {
                findings.push(format!(
                    "Orders #{} and #{} were created {} apart",
                    prev.order.id,
                    curr.order.id,
                    timeline::format_delta(delta).trim_start_matches('+')
                ));
            }
        }
    }

    if let Some(receipts) = analysis.get(GroupKey::ReceiptUrl) {
        for cluster in receipts.clusters() {
            findings.push(format!(
                "Orders {} share the same receipt URL",
                join_ids(&cluster.ids())
            ));
        }
    }

    let without_amount = orders.iter().filter(|o| o.payment_amount.is_none()).count();
    if without_amount > 0 {
        findings.push(format!("{} of {} orders have no payment amount", without_amount, total));
    }

    let placeholders: Vec<i64> = orders
        .iter()
        .filter(|o| {
            o.customer_phone
                .as_deref()
                .is_some_and(|p| phone::classify(p) == phone::PhonePattern::Placeholder)
        })
        .map(|o| o.id)
        .collect();
    if !placeholders.is_empty() {
        findings.push(format!(
            "Orders {} still carry the form's placeholder phone {}",
            join_ids(&placeholders),
            phone::PLACEHOLDER_PHONE
        ));
    }

    if total > 1 {
        if let Some(best) = orders.iter().max_by_key(|o| (o.completeness(), o.created_at)) {
            findings.push(format!(
                "Order #{} carries the most complete data ({} populated fields)",
                best.id,
                best.completeness()
            ));
        }
    }

    for (i, finding) in findings.iter().enumerate() {
        writeln!(f, "{}. {}", i + 1, finding)?;
    }

    Ok(())
}

fn write_recommendations(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "RECOMMENDATIONS:")?;
    writeln!(f, "1. IMMEDIATE:")?;
    writeln!(f, "   - Keep the most complete order of each duplicate cluster")?;
    writeln!(f, "   - Mark the remaining orders of the cluster as duplicates/cancelled")?;
    writeln!(f, "   - Verify payment status with the payment provider using the receipt URL")?;
    writeln!(f, "2. SYSTEM IMPROVEMENTS:")?;
    writeln!(f, "   - Debounce form submission to prevent rapid clicks")?;
    writeln!(f, "   - Add client-side validation for required fields")?;
    writeln!(f, "   - Detect duplicates server-side on phone number within a time window")?;
    writeln!(f, "   - Show a loading state while a submission is in flight")?;
    writeln!(f, "3. DATA INTEGRITY:")?;
    writeln!(f, "   - Fix payment_amount field population")?;
    writeln!(f, "   - Ensure all required fields are captured")?;
    writeln!(f, "   - Add unique constraints where appropriate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::parse_timestamp;

    fn sample_orders() -> Vec<Order> {
        vec![
            Order {
                id: 32,
                customer_phone: Some("01073627711".to_string()),
                receipt_url: Some("https://payapp.kr/r/1".to_string()),
                created_at: parse_timestamp("2025-08-01T03:21:07Z"),
                ..Default::default()
            },
            Order {
                id: 33,
                customer_phone: Some("01073627711".to_string()),
                receipt_url: Some("https://payapp.kr/r/1".to_string()),
                created_at: parse_timestamp("2025-08-01T03:21:09Z"),
                ..Default::default()
            },
            Order {
                id: 34,
                customer_phone: Some("01073627711".to_string()),
                customer_email: Some("tip123@hanmail.net".to_string()),
                payment_method: Some("PayApp".to_string()),
                created_at: parse_timestamp("2025-08-01T03:22:11Z"),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_report_sections() {
        let orders = sample_orders();
        let report = Report::new(&[32, 33, 34], &orders).to_string();

        assert!(report.contains("Target Order IDs: 32, 33, 34"));
        assert!(report.contains("Found 3 orders"));
        assert!(report.contains("ORDER #32"));
        assert!(report.contains("UTC Time:        2025-08-01 03:21:07 (UTC)"));
        assert!(report.contains("Payment Amount:  [NULL]"));
        assert!(report.contains("DUPLICATE: 01073627711 -> 3 orders (IDs: 32, 33, 34)"));
        assert!(report.contains("UNIQUE: tip123@hanmail.net -> 1 order (ID: 34)"));
        assert!(report.contains("Time gap between order 32 and 33: 2 seconds"));
        assert!(report.contains("CLUSTER: 2025-08-01 03:21 -> 2 orders (IDs: 32, 33)"));
        assert!(report.contains("RECOMMENDATIONS:"));
    }

    #[test]
    fn test_timeline_deltas_rendered() {
        let orders = sample_orders();
        let report = Report::new(&[32, 33, 34], &orders).to_string();

        let timeline = report
            .split("CHRONOLOGICAL ORDER:")
            .nth(1)
            .and_then(|rest| rest.split("CONCLUSIONS").next())
            .unwrap();
        let lines: Vec<&str> = timeline.lines().filter(|l| l.contains(". Order #")).collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1. Order #32 "));
        assert!(!lines[0].contains("(+"));
        assert!(lines[1].ends_with("(+2s)"));
        assert!(lines[2].ends_with("(+1m 2s)"));
    }

    #[test]
    fn test_findings_derived_from_data() {
        let orders = sample_orders();
        let report = Report::new(&[32, 33, 34], &orders).to_string();

        assert!(report.contains("All 3 orders use the same phone number: 01073627711"));
        assert!(report.contains("1 of 3 orders have an email address; none is shared"));
        assert!(report.contains("Orders #32 and #33 were created 2s apart"));
        assert!(report.contains("Orders 32, 33 share the same receipt URL"));
        assert!(report.contains("3 of 3 orders have no payment amount"));
        assert!(report.contains("Order #34 carries the most complete data"));
    }

    #[test]
    fn test_empty_fetch() {
        let report = Report::new(&[32, 33, 34], &[]).to_string();

        assert!(report.contains("No orders found for the specified IDs."));
        assert!(!report.contains("DUPLICATE ANALYSIS"));
    }

    #[test]
    fn test_missing_ids_listed() {
        let orders = sample_orders();
        let report = Report::new(&[32, 33, 34, 35], &orders[..2]).to_string();

        assert!(report.contains("Found 2 orders"));
        assert!(report.contains("Not found: 34, 35"));
    }

    #[test]
    fn test_missing_timestamp_placeholder() {
        let mut orders = sample_orders();
        orders[1].created_at = None;
        let report = Report::new(&[32, 33, 34], &orders).to_string();

        assert!(report.contains(&format!("3. Order #33  at {}", NO_TIMESTAMP)));
    }
}
