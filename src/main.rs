use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tokio::{signal, sync::mpsc};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use storefront_api as api;
use storefront_api::services::notifications::{LogNotifier, Notifier, WebhookNotifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Notification collaborator: signed webhook when configured, log-only otherwise
    let notifier: Arc<dyn Notifier> = match cfg.webhook_url.clone() {
        Some(url) => {
            info!("webhook notifications enabled: {}", url);
            Arc::new(WebhookNotifier::new(url, cfg.webhook_secret.clone()))
        }
        None => {
            info!("no webhook URL configured; notifications are log-only");
            Arc::new(LogNotifier)
        }
    };

    // Build services and the shared job context
    let ledger = api::services::stock_ledger::StockLedger::new(db_arc.clone(), event_sender.clone());
    let rules = api::services::rule_resolver::RuleResolver::new(db_arc.clone(), event_sender.clone());
    let jobs = api::jobs::JobContext {
        db: db_arc.clone(),
        config: cfg.clone(),
        event_sender: event_sender.clone(),
        notifier,
        audit: api::services::audit::AuditTrail::new(db_arc.clone()),
        tenants: api::services::tenants::TenantDirectory::new(db_arc.clone()),
        ledger,
        rules,
    };

    let app_state = api::AppState {
        db: db_arc.clone(),
        config: cfg.clone(),
        jobs,
    };

    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "storefront-api up" }))
        .route(
            "/api/v1/openapi.json",
            get(|| async { axum::Json(api::openapi::openapi_json()) }),
        )
        .nest("/api/v1", api::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
