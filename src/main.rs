//! SaaS Kit server entry point.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use saas_kit::adapters::auth::SignedSessionCookie;
use saas_kit::adapters::http::{
    app_router, with_http_layers, AdminAppState, AuthState, PaymentAppState,
};
use saas_kit::adapters::postgres::{
    self, PostgresAdminReader, PostgresSessionValidator, PostgresWebhookEventRepository,
};
use saas_kit::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use saas_kit::application::handlers::admin::AdminAccess;
use saas_kit::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = %config.server.environment,
        base_url = %config.server.base_url(),
        "Starting saas-kit"
    );

    if config.uses_test_keys_in_production() {
        tracing::warn!("Stripe test keys are configured in production");
    }

    tracing::info!(database = %config.database.redacted_url(), "Connecting to database");
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let payment_provider = Arc::new(StripePaymentAdapter::new(
        StripeConfig::from_payment_config(&config.payment),
    ));

    let urls = config.payment_urls();
    tracing::info!(
        webhook_endpoint = %urls.webhook_endpoint,
        currency = %config.payment.currency,
        "Stripe webhooks must be delivered to this endpoint"
    );

    let payment = PaymentAppState {
        payment_provider,
        webhook_ledger: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        base_url: config.server.base_url().to_string(),
        urls,
    };

    let admin_emails = config.auth.admin_emails_list();
    if admin_emails.is_empty() {
        tracing::warn!("No admin allowlist configured; every signed-in user can read admin pages");
    }
    let admin = AdminAppState {
        reader: Arc::new(PostgresAdminReader::new(pool.clone())),
        access: AdminAccess::new(admin_emails),
    };

    let auth = AuthState::new(Arc::new(PostgresSessionValidator::new(pool))).with_cookie(
        SignedSessionCookie::new(config.auth.session_cookie.clone(), config.auth.secret.clone()),
    );

    let app = with_http_layers(app_router(payment, admin, auth), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured level.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
