//! Standalone HTTP server exposing GridBase tables, saved views, and the
//! query engine as a JSON API for frontend clients.

use gridbase::server::run_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("GRIDBASE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("GRIDBASE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    run_server(&host, port).await
}
