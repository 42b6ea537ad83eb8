use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use actix_web_httpauth::extractors::bearer;
use dotenvy::dotenv;
use log::info;
use mockmate::{
    ai::OpenAiClient, config::Config, db, news::HttpNewsFetcher, routes, types::AppState,
};

#[cfg(feature = "scheduler")]
use mockmate::tasks::scheduler::{start_scheduler, stop_scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;

    let database = db::get_database(&config).await?;
    info!("Connecting to Database");
    let conn = db::connect(&database).await?;
    info!("Connected to Database. Migrating");
    db::migrate_db(&conn).await?;
    info!("Migrated Database");

    let generator = Arc::new(OpenAiClient::new(&config)?);
    let fetcher = Arc::new(HttpNewsFetcher::new(&config)?);
    let bind = (config.host.clone(), config.port);

    let app_data = web::Data::new(AppState::new(database, config, generator, fetcher));

    #[cfg(feature = "scheduler")]
    let scheduler = start_scheduler(app_data.clone()).await?;

    info!("Listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_data.clone())
            .app_data(bearer::Config::default().realm("MockMate admin"))
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    stop_scheduler(scheduler).await?;

    Ok(())
}
