pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::lock_manager::LockManager;
use application::order_service::OrderService;
use application::scheduler::OrderScheduler;
use infrastructure::lock_repo::DieselLockStore;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Scheduler = OrderScheduler<DieselOrderRepository, DieselLockStore>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    use handlers::orders;

    let service = web::Data::new(OrderService::new(DieselOrderRepository::new(pool)));
    let openapi = handlers::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(orders::create_order))
                    .route("", web::get().to(orders::list_orders))
                    .route("/{id}", web::get().to(orders::get_order))
                    .route("/{id}", web::delete().to(orders::delete_order))
                    .route("/{id}/cancel", web::post().to(orders::cancel_order))
                    .route("/{id}/status", web::put().to(orders::update_status))
                    .route("/{id}/history", web::get().to(orders::get_history))
                    .route("/{id}/track", web::get().to(orders::track_order)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

/// Wire the pending-order scheduler against the same database.
pub fn build_scheduler(pool: DbPool, lease_secs: u32) -> Scheduler {
    OrderScheduler::new(
        OrderService::new(DieselOrderRepository::new(pool.clone())),
        LockManager::new(DieselLockStore::new(pool)),
        lease_secs,
    )
}
