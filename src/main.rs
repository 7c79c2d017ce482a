use std::sync::Arc;

use dotenvy::dotenv;
use order_lifecycle::config::AppConfig;
use order_lifecycle::{build_scheduler, build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(std::io::Error::other)?;
    run_migrations(&pool).map_err(std::io::Error::other)?;

    if config.scheduler.enabled {
        log::info!(
            "Scheduling pending-order processing every {:?}",
            config.scheduler.interval
        );
        let scheduler = Arc::new(build_scheduler(pool.clone(), config.scheduler.lease_secs));
        actix_web::rt::spawn(scheduler.run(config.scheduler.interval));
    } else {
        log::info!("Order scheduler disabled");
    }

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(pool, &config.host, config.port)?.await
}
