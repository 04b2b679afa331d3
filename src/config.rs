use crate::error::{AnalyzerError, Result};

pub const DEFAULT_ORDER_IDS: [i64; 3] = [32, 33, 34];
pub const DEFAULT_TABLE: &str = "orders";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub table: String,
    pub order_ids: Vec<i64>,
}

impl AnalyzerConfig {
    /// Load from the process environment, after merging a local `.env` file
    /// if one exists. Variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let supabase_url = value("SUPABASE_URL").ok_or(AnalyzerError::MissingConfig("SUPABASE_URL"))?;
        let anon_key =
            value("SUPABASE_ANON_KEY").ok_or(AnalyzerError::MissingConfig("SUPABASE_ANON_KEY"))?;

        let table = value("ORDERS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let order_ids = match value("ORDER_IDS") {
            Some(raw) => parse_order_ids("ORDER_IDS", raw.split(','))?,
            None => DEFAULT_ORDER_IDS.to_vec(),
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key,
            table,
            order_ids,
        })
    }

    pub fn with_order_ids(mut self, order_ids: Vec<i64>) -> Self {
        self.order_ids = order_ids;
        self
    }
}

/// Parse a list of order IDs, dropping blanks and repeated IDs.
/// An empty result is an error: a run must target at least one order.
pub fn parse_order_ids<I, S>(var: &str, raw: I) -> Result<Vec<i64>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ids = Vec::new();

    for item in raw {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }

        let id = item.parse::<i64>().map_err(|_| AnalyzerError::InvalidConfig {
            var: var.to_string(),
            value: item.to_string(),
        })?;

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(AnalyzerError::InvalidConfig {
            var: var.to_string(),
            value: String::new(),
        });
    }

    Ok(ids)
}

/// Positional command-line IDs override the configured ones.
/// Returns `None` when no arguments were given.
pub fn parse_cli_ids<I>(args: I) -> Result<Option<Vec<i64>>>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.is_empty() {
        return Ok(None);
    }

    parse_order_ids("order id argument", args.iter().flat_map(|a| a.split(','))).map(Some)
}
