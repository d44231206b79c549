pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppConfig;
pub use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::upsert_product,
        handlers::carts::get_cart,
        handlers::carts::add_item,
        handlers::carts::update_item,
        handlers::carts::remove_item,
        handlers::carts::clear_cart,
        handlers::carts::checkout,
        handlers::orders::list_orders,
        handlers::orders::replace_orders,
        handlers::orders::get_order,
        handlers::orders::update_status,
        handlers::dashboard::get_dashboard,
    ),
    tags(
        (name = "products", description = "Catalog"),
        (name = "carts", description = "Session carts and checkout"),
        (name = "orders", description = "Order administration"),
        (name = "admin", description = "Back-office counters"),
    )
)]
pub struct ApiDoc;

/// Registers every route; shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(handlers::products::list_products))
            .route("/{id}", web::get().to(handlers::products::get_product))
            .route("/{id}", web::put().to(handlers::products::upsert_product)),
    )
    .service(
        web::scope("/carts/{session}")
            .route("", web::get().to(handlers::carts::get_cart))
            .route("", web::delete().to(handlers::carts::clear_cart))
            .route("/items", web::post().to(handlers::carts::add_item))
            .route("/items/{id}", web::put().to(handlers::carts::update_item))
            .route("/items/{id}", web::delete().to(handlers::carts::remove_item))
            .route("/checkout", web::post().to(handlers::carts::checkout)),
    )
    .service(
        web::scope("/orders")
            .route("", web::get().to(handlers::orders::list_orders))
            .route("", web::put().to(handlers::orders::replace_orders))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/status", web::patch().to(handlers::orders::update_status)),
    )
    .route("/dashboard", web::get().to(handlers::dashboard::get_dashboard));
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or spawning) the returned
/// server.
pub fn build_server(
    state: web::Data<AppState>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
