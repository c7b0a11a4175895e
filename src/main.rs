use std::sync::Arc;

use rust_booking_service::{
    adapters::database::sqlite::SqliteDatabase, commands::DomainLogic, config::Config, http,
    telemetry,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(config.log_format);

    let database = SqliteDatabase::connect(&config.database_url).await?;
    database.migrate().await?;

    let app = http::router(DomainLogic::new(Arc::new(database)), &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
