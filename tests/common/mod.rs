use axum::Router;
use order_duplicate_analyzer::AnalyzerConfig;
use tokio::net::TcpListener;

pub const TEST_ANON_KEY: &str = "test-anon-key";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_stub_store(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub store");
    let addr = listener.local_addr().expect("Stub store has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub store failed");
    });

    format!("http://{}", addr)
}

pub fn test_config(base_url: &str, table: &str) -> AnalyzerConfig {
    AnalyzerConfig {
        supabase_url: base_url.to_string(),
        anon_key: TEST_ANON_KEY.to_string(),
        table: table.to_string(),
        order_ids: vec![32, 33, 34],
    }
}
