//! Resolve a connection string to a token provider and fetch a token.
//!
//! # Running
//!
//! ```bash
//! # Pass the connection string as an argument or via KUSTO_CONNECTION_STRING
//! export KUSTO_CONNECTION_STRING="https://help.kusto.windows.net/Samples;AZCLI=true"
//!
//! RUST_LOG=kusto_client=debug cargo run --example token_provider
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use kusto_client::{ConnectionConfig, Error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let conn_str = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KUSTO_CONNECTION_STRING").ok())
        .unwrap_or_else(|| "https://help.kusto.windows.net/Samples;AZCLI=true".into());

    let config = ConnectionConfig::from_connection_string(&conn_str)?;
    println!("Data source: {}", config.data_source);
    println!("Selected mode: {}", config.credentials().method_name());

    let provider = config.token_provider().await?;
    println!("Provider: {:?}", provider.method());
    if let Some(scope) = provider.scope() {
        println!("Scope: {scope}");
    }

    match provider.get_token().await {
        Ok(token) => println!("Acquired token: {token:?}"),
        Err(e) => eprintln!("Token acquisition failed: {e}"),
    }

    Ok(())
}
