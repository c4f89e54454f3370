use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use student_portal::backend::config::{self, Config};
use student_portal::backend::portal::Portal;
use student_portal::backend::rest_api;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // The subscriber must exist before `Config::from_env` can warn.
    init_tracing(config::log_json_from_env());
    let config = Config::from_env();

    let portal = Portal::open(&config.data_dir)
        .with_context(|| format!("Could not open portal data in {}", config.data_dir.display()))?;
    let portal = web::Data::new(Mutex::new(portal));

    info!(bind = %config.bind, data_dir = %config.data_dir.display(), "starting student portal");

    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(portal.clone())
            .configure(rest_api::configure)
    })
    .bind(config.bind.as_str())
    .with_context(|| format!("Could not bind {}", config.bind))?;

    http_server.run().await?;
    Ok(())
}
