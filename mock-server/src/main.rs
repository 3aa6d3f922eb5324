use mock_server::{app_with_prefix, new_db, serve_tls, TlsIdentity};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let prefix = std::env::var("API_PREFIX").unwrap_or_else(|_| Uuid::new_v4().simple().to_string());

    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    let identity = TlsIdentity::self_signed()?;

    // Same two lines the real installer writes to access.txt.
    println!("certSha256:{}", identity.cert_sha256());
    println!("apiURL:https://{addr}/{prefix}");

    let db = new_db(&host, 443);
    serve_tls(listener, &identity, app_with_prefix(&prefix, db)).await?;
    Ok(())
}
