use reqwest::Client;
use std::time::Duration;

use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::order::Order;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client for the PostgREST endpoint in front of the orders table.
#[derive(Clone)]
pub struct SupabaseService {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SupabaseService {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
            table: config.table.clone(),
        })
    }

    /// `select * from {table} where id in (...)`
    pub async fn fetch_orders_by_ids(&self, ids: &[i64]) -> Result<Vec<Order>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let filter = id_filter(ids);

        tracing::info!("Fetching {} orders from '{}' ({})", ids.len(), self.table, filter);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*"), ("id", filter.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Order store returned {}: {}", status, body);
            return Err(AnalyzerError::Api { status, body });
        }

        let orders: Vec<Order> = serde_json::from_str(&body)?;

        tracing::info!("Fetched {} orders from '{}'", orders.len(), self.table);

        Ok(orders)
    }
}

/// PostgREST `in` filter, e.g. `in.(32,33,34)`.
fn id_filter(ids: &[i64]) -> String {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            supabase_url: "http://127.0.0.1:9/".to_string(),
            anon_key: "anon".to_string(),
            table: "orders".to_string(),
            order_ids: vec![32, 33, 34],
        }
    }

    #[test]
    fn test_id_filter() {
        assert_eq!(id_filter(&[32, 33, 34]), "in.(32,33,34)");
        assert_eq!(id_filter(&[7]), "in.(7)");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let service = SupabaseService::new(&config()).unwrap();
        assert_eq!(service.base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_empty_ids_skip_request() {
        // Port 9 is unreachable; an empty list must not touch the network
        let service = SupabaseService::new(&config()).unwrap();
        let orders = service.fetch_orders_by_ids(&[]).await.unwrap();
        assert!(orders.is_empty());
    }
}
