use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use payment_ledger::{Ledger, LedgerConfig};
use pos_gateway::{
    config::GatewayConfig,
    dispatch::{DispatchRateLimiter, PaymentDispatcher},
    handlers,
};
use std::sync::Arc;
use terminal_bridge::{TcpLink, TerminalBridge};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = GatewayConfig::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    info!(
        "Starting POS gateway on port {} (terminal {})",
        config.server.port,
        config.terminal.addr()
    );

    let ledger = Arc::new(
        Ledger::open(&LedgerConfig::at(&config.ledger.data_dir))
            .expect("Failed to open payment ledger"),
    );

    let bridge = TerminalBridge::new(Arc::new(TcpLink::new()));
    let limiter = DispatchRateLimiter::per_minute(config.dispatch.rate_limit_per_minute);
    let dispatcher = Arc::new(PaymentDispatcher::new(
        bridge,
        ledger.clone(),
        config.terminal.clone(),
        limiter,
    ));

    let workers = config.server.workers;
    let bind = (config.server.host.clone(), config.server.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .configure(handlers::configure_routes)
    })
    .workers(workers)
    .bind(bind)?
    .run()
    .await
}
