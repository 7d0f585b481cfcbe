use std::sync::Arc;

use anyhow::Context;

use doyashop_api::app::{build_app, AppServices};
use doyashop_auth::Hs256Jwt;
use doyashop_infra::{
    AppConfig, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, StripeGateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    doyashop_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(config = ?config, "starting doyashop api");

    let store: Arc<dyn DocumentStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresDocumentStore::connect(url)
                .await
                .context("failed to connect to the document database")?;
            store.ensure_schema().await.context("failed to prepare the documents table")?;
            Arc::new(store)
        }
        None => Arc::new(InMemoryDocumentStore::new()),
    };

    let jwt = Hs256Jwt::with_ttl(
        config.jwt_secret.as_bytes(),
        chrono::Duration::seconds(config.token_ttl_secs),
    );
    let gateway = StripeGateway::new(&config.payment_api_base, config.stripe_secret.clone())
        .context("failed to build the payment gateway client")?;
    if !gateway.is_configured() {
        tracing::warn!("STRIPE_SECRET not set, payment intents will fail");
    }

    let app = build_app(AppServices::new(store, jwt, Arc::new(gateway)));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Server is running on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
