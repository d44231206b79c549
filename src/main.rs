use actix_web::web;
use dotenvy::dotenv;
use saturn_storefront::{build_server, AppConfig, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let state = web::Data::new(AppState::new(&config));

    log::info!(
        "Starting server at http://{}:{} (data in {})",
        config.host,
        config.port,
        config.data_dir.display()
    );

    build_server(state, &config.host, config.port)?.await
}
