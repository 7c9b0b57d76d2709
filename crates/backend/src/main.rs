#![allow(
    clippy::useless_format,
    clippy::unnecessary_map_or,
    clippy::type_complexity,
    clippy::too_many_arguments,
    clippy::if_same_then_else,
    clippy::unnecessary_cast,
    clippy::redundant_pattern_matching
)]

pub mod dashboards;
pub mod domain;
pub mod handlers;
pub mod shared;
pub mod system;
pub mod usecases;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::body::Body;
    use axum::http::{header, HeaderName, Method, Request};
    use axum::middleware::{self, Next};
    use axum::response::Response;
    use axum::{
        routing::{get, post},
        Router,
    };
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Создаем директорию для логов
    let log_dir = std::path::Path::new("target").join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                // Отключаем логи SQL запросов, но оставляем логи приложения
                "info,sqlx=warn,sea_orm=warn".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    // Функция для форматирования чисел с разделителями триад
    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, ch) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push('.');
            }
            result.push(ch);
        }
        result.chars().rev().collect()
    }

    // Простой middleware для логирования запросов
    async fn request_logger(req: Request<Body>, next: Next) -> Response {
        use axum::body::to_bytes;
        use chrono::Utc;

        let start = std::time::Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();

        // Читаем тело ответа, чтобы узнать реальный размер
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(b) => b,
            Err(_) => {
                let duration = start.elapsed();
                let timestamp = Utc::now() + chrono::Duration::hours(3);
                // Ошибка - используем коричневый цвет
                println!(
                    "\x1b[33m{}\x1b[0m | {:>5}ms | {:>12} | {} {:>6} {}",
                    timestamp.format("%H:%M:%S"),
                    duration.as_millis(),
                    "error",
                    parts.status.as_u16(),
                    method,
                    uri.path()
                );
                return Response::from_parts(parts, Body::default());
            }
        };

        let size = bytes.len();
        let duration = start.elapsed();
        let timestamp = Utc::now() + chrono::Duration::hours(3);

        // Выбираем цвет для времени: голубой для 200, коричневый для остальных
        let color_code = if parts.status.as_u16() == 200 {
            "36"
        } else {
            "33"
        };

        println!(
            "\x1b[{}m{}\x1b[0m | {:>5}ms | {:>12} | {} {:>6} {}",
            color_code,
            timestamp.format("%H:%M:%S"),
            duration.as_millis(),
            format!("{}", format_number(size)),
            parts.status.as_u16(),
            method,
            uri.path()
        );

        // Создаем новый ответ с прочитанным телом
        Response::from_parts(parts, Body::from(bytes))
    }

    let config = shared::config::load_config()?;
    let db_path = shared::config::get_database_path(&config)?;
    let port = config.server.port;

    shared::crypto::initialize_credential_key(config.security.credential_key.as_deref())?;
    shared::config::initialize_config(config)?;

    shared::data::db::initialize_database(db_path.to_str())
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    // Фоновые контуры: воркер webhook-очереди и планировщик синхронизаций
    tokio::spawn(usecases::u602_ingest_webhook::worker::run());
    let scheduler = system::scheduler::SyncScheduler::new();
    tokio::spawn(async move { scheduler.run_loop().await });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static("x-webhook-signature"),
        ]);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // CONNECTIONS
        // ========================================
        .route(
            "/api/connections",
            get(handlers::a001_marketplace_connection::list),
        )
        .route(
            "/api/connections/:kind/connect",
            post(handlers::a001_marketplace_connection::connect),
        )
        .route(
            "/api/connections/:kind/disconnect",
            post(handlers::a001_marketplace_connection::disconnect),
        )
        // UseCase u601: запуск синхронизации
        .route(
            "/api/connections/:kind/sync",
            post(handlers::usecases::u601_sync),
        )
        .route("/api/sync-runs", get(handlers::a004_sync_run::list))
        // UseCase u602: приём webhook-событий
        .route("/api/webhooks/:kind", post(handlers::usecases::u602_webhook))
        // ========================================
        // NORMALIZED STORE
        // ========================================
        .route("/api/products", get(handlers::a002_normalized_product::list))
        .route("/api/orders", get(handlers::a003_normalized_order::list))
        .route(
            "/api/orders/:order_id/status",
            post(handlers::a003_normalized_order::update_status),
        )
        .route(
            "/api/orders/:order_id/ship",
            post(handlers::a003_normalized_order::ship),
        )
        // ========================================
        // DASHBOARDS
        // ========================================
        .route("/api/dashboard", get(handlers::d401_overview::get_dashboard))
        .route(
            "/api/analytics",
            get(handlers::d402_analytics::get_analytics),
        )
        // Logs handlers
        .route(
            "/api/logs",
            get(handlers::logs::list_all).delete(handlers::logs::clear_all),
        )
        .layer(middleware::from_fn(request_logger))
        .layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", port, e);
            }
            // Propagate the error to stop the application
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
