use crate::{
    axum_http::{
        default_routers::{self, HealthState},
        routers,
    },
    config::config_model::{DotEnvyConfig, StorageBackend},
    usecases::{
        login_codes::LoginCodeUseCase,
        payments::{CheckoutSettings, PaymentUseCase},
    },
};
use anyhow::{Result, anyhow};
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{CONTENT_TYPE, COOKIE},
    },
    routing::get,
};
use crates::{
    domain::repositories::{
        payments::PaymentRepository, saved_cards::SavedCardRepository,
        successful_operations::SuccessfulOperationRepository,
    },
    infra::{
        db::{
            postgres::postgres_connection,
            repositories::{
                payments::PaymentPostgres, saved_cards::SavedCardPostgres,
                successful_operations::SuccessfulOperationPostgres,
            },
        },
        memory::{
            login_codes::LoginCodeMemory, payments::PaymentMemory,
            saved_cards::SavedCardMemory, successful_operations::SuccessfulOperationMemory,
        },
    },
    notifications::LogMailer,
    payments::card_authorizer::FixedCardAuthorizer,
    webhooks::{
        delivery::{ReqwestTransport, RetryPolicy, WebhookDeliverer},
        queue::{WebhookQueue, run_webhook_worker},
        signer::WebhookSigner,
    },
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub async fn start(config: Arc<DotEnvyConfig>) -> Result<()> {
    let app = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for postgres storage"))?;
            let db_pool = Arc::new(postgres_connection::establish_connection(database_url)?);
            info!("Postgres connection has been established");

            build_app(
                &config,
                Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
                Arc::new(SavedCardPostgres::new(Arc::clone(&db_pool))),
                Arc::new(SuccessfulOperationPostgres::new(Arc::clone(&db_pool))),
            )?
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, payments are lost on restart");
            build_app(
                &config,
                Arc::new(PaymentMemory::new()),
                Arc::new(SavedCardMemory::new()),
                Arc::new(SuccessfulOperationMemory::new()),
            )?
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wires usecases over the given repositories and starts the webhook worker. Must be
/// called inside a tokio runtime.
pub fn build_app<P, C, O>(
    config: &DotEnvyConfig,
    payment_repo: Arc<P>,
    saved_card_repo: Arc<C>,
    operation_repo: Arc<O>,
) -> Result<Router>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
{
    let signer = WebhookSigner::new(config.webhook.secret.as_bytes());
    let transport = ReqwestTransport::new(Duration::from_secs(config.webhook.timeout_secs))?;
    let deliverer = Arc::new(WebhookDeliverer::new(
        Arc::clone(&payment_repo),
        Arc::new(transport),
        signer.clone(),
        RetryPolicy {
            max_attempts: config.webhook.max_attempts,
            base_delay: Duration::from_millis(config.webhook.base_delay_ms),
        },
    ));
    let (webhook_queue, webhook_jobs) = WebhookQueue::new();
    tokio::spawn(run_webhook_worker(webhook_jobs, deliverer));

    let mailer = Arc::new(LogMailer);

    let payment_usecase = Arc::new(PaymentUseCase::new(
        payment_repo,
        saved_card_repo,
        operation_repo,
        Arc::clone(&mailer),
        Arc::new(webhook_queue),
        Arc::new(FixedCardAuthorizer::default()),
        CheckoutSettings {
            base_url: config.checkout.base_url.clone(),
            currency_symbol: config.checkout.currency_symbol.clone(),
            invoice_ttl: chrono::Duration::minutes(config.checkout.invoice_ttl_minutes),
            otp_length: config.checkout.otp_length,
        },
    ));

    let login_code_usecase = Arc::new(LoginCodeUseCase::new(
        Arc::new(LoginCodeMemory::new()),
        mailer,
        chrono::Duration::minutes(config.checkout.login_code_ttl_minutes),
        config.checkout.otp_length,
    ));

    let health_state = Arc::new(HealthState {
        currency_code: config.checkout.currency_code.clone(),
    });

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api",
            routers::payments::routes(Arc::clone(&payment_usecase))
                .nest("/auth", routers::auth::routes(login_code_usecase)),
        )
        .nest("/webhooks", routers::webhooks::routes(Arc::new(signer)))
        .merge(routers::checkout::routes(payment_usecase))
        .route(
            "/health",
            get(default_routers::health_check).with_state(health_state),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    CONTENT_TYPE,
                    COOKIE,
                    HeaderName::from_static("idempotency-key"),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
