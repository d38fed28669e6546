mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use helpdesk_api::seed::seed_defaults;
use helpdesk_api::triage::{FallbackClassifier, OpenAiClassifier, TriageClassifier};
use helpdesk_api::workflow::{HttpWorkflowNotifier, NoopWorkflowNotifier, WorkflowNotifier};
use helpdesk_api::{AppState, AppStateInner, SessionSettings};
use helpdesk_db::Database;

use crate::config::{Config, PLACEHOLDER_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "helpdesk=debug,helpdesk_api=debug,helpdesk_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == PLACEHOLDER_SECRET {
        warn!("HELPDESK_JWT_SECRET is the development placeholder; set a real secret before deploying");
    }

    let db = Database::open(&config.db_path)?;
    if config.seed {
        seed_defaults(&db, &config.seed_admin_password, &config.seed_user_password)?;
    }

    let classifier: Arc<dyn TriageClassifier> = match config.openai_api_key.clone() {
        Some(key) => {
            info!(model = %config.openai_model, "Triage classifier enabled");
            Arc::new(OpenAiClassifier::new(
                key,
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                config.triage_timeout,
            )?)
        }
        None => {
            warn!("OPENAI_API_KEY not set; new tickets default to low priority");
            Arc::new(FallbackClassifier)
        }
    };

    let workflow: Arc<dyn WorkflowNotifier> = match config.workflow_url.clone() {
        Some(url) => {
            info!("Workflow notifications go to {}", url);
            Arc::new(HttpWorkflowNotifier::new(url, config.triage_timeout)?)
        }
        None => Arc::new(NoopWorkflowNotifier),
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        session: SessionSettings {
            jwt_secret: config.jwt_secret.clone(),
            ttl: chrono_hours(config.session_hours),
            cookie_secure: config.cookie_secure,
        },
        classifier,
        workflow,
    });

    let origins = config
        .cors_origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = helpdesk_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Helpdesk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn chrono_hours(hours: i64) -> chrono::Duration {
    chrono::Duration::hours(hours.max(1))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
