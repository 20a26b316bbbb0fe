use std::net::SocketAddr;
use std::sync::Arc;

use atelier_api::{
    app,
    gateway::MockGateway,
    mailer::LogMailer,
    state::{AppState, AuthConfig},
};
use atelier_booking::BookingService;
use atelier_store::{
    DbClient, PgBookingRepository, PgChargeRepository, PgCreditLedger, PgStudioRepository,
    PgUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = atelier_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Atelier API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let bookings = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let studios = Arc::new(PgStudioRepository::new(db.pool.clone()));
    let charges = Arc::new(PgChargeRepository::new(db.pool.clone()));
    let users = Arc::new(PgUserRepository::new(db.pool.clone()));
    let ledger = Arc::new(PgCreditLedger::new(db.pool.clone()));
    let gateway = Arc::new(MockGateway);
    let mailer = Arc::new(LogMailer::new(config.app.domain.clone()));

    let service = Arc::new(BookingService::new(
        bookings,
        studios.clone(),
        charges.clone(),
        users.clone(),
        ledger,
        gateway.clone(),
        config.booking_rules.to_rules(),
    ));

    let app_state = AppState {
        service,
        studios,
        users,
        charges,
        gateway,
        mailer,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        app: config.app.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
