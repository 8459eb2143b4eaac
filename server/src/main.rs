mod config;
mod db;
mod rate_limit;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = match config::ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let jwt = services::auth::JwtKeys::new(&config.jwt);
    let (audit, _audit_writer) = services::audit::spawn_audit_writer(pool.clone());
    let _revocation_sweeper = services::auth::spawn_revocation_sweeper(pool.clone(), config.revocation_sweep);

    let state = state::AppState::new(pool, jwt, config.login_limit, audit);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "scrapbook api listening");
    axum::serve(listener, app).await.expect("server failed");
}
