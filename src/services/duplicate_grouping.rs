use chrono::Duration;
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::order::Order;

/// Fields that may reveal the same customer submitting more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Email,
    Phone,
    Amount,
    CreatedMinute,
    ReceiptUrl,
}

impl GroupKey {
    pub const ALL: [GroupKey; 5] = [
        GroupKey::Phone,
        GroupKey::Email,
        GroupKey::Amount,
        GroupKey::CreatedMinute,
        GroupKey::ReceiptUrl,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GroupKey::Email => "EMAIL",
            GroupKey::Phone => "PHONE NUMBER",
            GroupKey::Amount => "PAYMENT AMOUNT",
            GroupKey::CreatedMinute => "TIMESTAMP CLUSTERING (same minute, UTC)",
            GroupKey::ReceiptUrl => "RECEIPT URL",
        }
    }

    /// Key value for an order. Missing and blank values yield `None` so
    /// they never form a shared "empty" group.
    pub fn extract(&self, order: &Order) -> Option<String> {
        let key = match self {
            GroupKey::Email => order.customer_email.clone(),
            GroupKey::Phone => order.customer_phone.clone(),
            GroupKey::Amount => order.payment_amount.map(|a| a.normalize().to_string()),
            GroupKey::CreatedMinute => order
                .created_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string()),
            GroupKey::ReceiptUrl => order.receipt_url.clone(),
        }?;

        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a, K> {
    key: K,
    orders: Vec<&'a Order>,
}

/// Elapsed time between two chronologically adjacent members of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub from_id: i64,
    pub to_id: i64,
    pub elapsed: Duration,
}

impl<'a, K> Group<'a, K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Members in fetch order.
    pub fn orders(&self) -> &[&'a Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn is_duplicate(&self) -> bool {
        self.orders.len() > 1
    }

    pub fn ids(&self) -> Vec<i64> {
        self.orders.iter().map(|o| o.id).collect()
    }

    /// Gaps between timestamped members in chronological order.
    /// Members without a timestamp are skipped.
    pub fn gaps(&self) -> Vec<Gap> {
        let mut timed: Vec<&Order> = self
            .orders
            .iter()
            .copied()
            .filter(|o| o.created_at.is_some())
            .collect();
        timed.sort_by_key(|o| o.created_at);

        timed
            .windows(2)
            .filter_map(|pair| {
                let (prev, curr) = (pair[0], pair[1]);
                Some(Gap {
                    from_id: prev.id,
                    to_id: curr.id,
                    elapsed: curr.created_at? - prev.created_at?,
                })
            })
            .collect()
    }
}

/// Partition orders by `key_fn`.
///
/// Groups appear in order of their key's first occurrence and keep their
/// members in input order. Orders for which `key_fn` returns `None` are
/// left out.
pub fn group_by<'a, K, F>(orders: &'a [Order], key_fn: F) -> Vec<Group<'a, K>>
where
    K: Eq + Hash + Clone,
    F: Fn(&Order) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, K>> = Vec::new();

    for order in orders {
        let Some(key) = key_fn(order) else {
            continue;
        };

        match index.get(&key) {
            Some(&slot) => groups[slot].orders.push(order),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    orders: vec![order],
                });
            }
        }
    }

    groups
}

pub fn group_by_key(orders: &[Order], key: GroupKey) -> Vec<Group<'_, String>> {
    group_by(orders, |order| key.extract(order))
}

#[derive(Debug, Clone)]
pub struct Grouping<'a> {
    pub key: GroupKey,
    pub groups: Vec<Group<'a, String>>,
}

impl<'a> Grouping<'a> {
    pub fn clusters(&self) -> impl Iterator<Item = &Group<'a, String>> {
        self.groups.iter().filter(|g| g.is_duplicate())
    }
}

/// All candidate groupings computed over one fetch.
#[derive(Debug, Clone)]
pub struct DuplicateAnalysis<'a> {
    groupings: Vec<Grouping<'a>>,
}

impl<'a> DuplicateAnalysis<'a> {
    pub fn from_orders(orders: &'a [Order]) -> Self {
        let groupings = GroupKey::ALL
            .iter()
            .map(|&key| Grouping {
                key,
                groups: group_by_key(orders, key),
            })
            .collect();

        tracing::debug!("Computed {} groupings over {} orders", GroupKey::ALL.len(), orders.len());

        Self { groupings }
    }

    pub fn groupings(&self) -> &[Grouping<'a>] {
        &self.groupings
    }

    pub fn get(&self, key: GroupKey) -> Option<&Grouping<'a>> {
        self.groupings.iter().find(|g| g.key == key)
    }

    pub fn cluster_count(&self, key: GroupKey) -> usize {
        self.get(key).map(|g| g.clusters().count()).unwrap_or(0)
    }
}
