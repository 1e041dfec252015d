use std::process::ExitCode;

use log::{error, info};
use sqlx::postgres::PgPoolOptions;

use foodgram::{
    api::{routes, AppState},
    config::Config,
    MIGRATOR,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Could not connect to the database: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = MIGRATOR.run(&pool).await {
        error!("Could not apply migrations: {e}");
        return ExitCode::FAILURE;
    }

    let port = config.port;
    info!("Serving on port {port}, media from {}", config.media_root.display());

    warp::serve(routes(AppState::new(pool, config)))
        .run(([0, 0, 0, 0], port))
        .await;

    ExitCode::SUCCESS
}
