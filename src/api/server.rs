//! Read-only API server over the migrated row store (actix-web).

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::api::routes;
use crate::util::env::{env_opt, env_parse, init_env};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub allowed_origins: String,
}

impl ApiServer {
    pub fn from_env() -> Self {
        init_env();
        Self {
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_parse("API_PORT", 8080u16),
            db_path: env_opt("MIGRATE_DB").unwrap_or_else(|| "studio.db".into()),
            allowed_origins: env_opt("ALLOWED_ORIGINS").unwrap_or_default(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("opening row store {}", self.db_path))?;

        let bind_addr = format!("{}:{}", self.host, self.port);
        info!(addr = %bind_addr, db = %self.db_path, "starting read-only content API");

        let pool_data = web::Data::new(pool);
        let allowed_origins = self.allowed_origins.clone();
        HttpServer::new(move || {
            let cors = build_cors(&allowed_origins);
            App::new()
                .app_data(pool_data.clone())
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("failed to bind {bind_addr}"))?
        .run()
        .await
        .context("HTTP server error")?;
        Ok(())
    }
}

fn build_cors(allowed_origins: &str) -> actix_cors::Cors {
    if allowed_origins.trim().is_empty() {
        return actix_cors::Cors::permissive();
    }
    let mut cors = actix_cors::Cors::default()
        .allowed_methods(["GET"])
        .max_age(3600);
    for origin in allowed_origins.split(',').filter(|s| !s.trim().is_empty()) {
        cors = cors.allowed_origin(origin.trim());
    }
    cors
}
