use std::{fs::OpenOptions, io, process::ExitCode, sync::Arc};

use actix_web::{web, App, HttpServer};
use migration::{Migrator, MigratorTrait as _};
use sea_orm::Database;
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::{auth::Authority, clock::{Clock, SystemClock}};

mod config;
mod consts;
mod utils;

mod clock;
mod entity;
mod auth;
mod payroll;
mod pages;

#[cfg(test)]
mod testing;

fn init_tracing() -> io::Result<()> {
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")?;

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)
}

#[actix_web::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(err) = init_tracing() {
        eprintln!("Unable to set up logging: {err}");
        return ExitCode::FAILURE;
    }

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let config::Config {
        host_address,
        database_opt,
        jwt_secret,
    } = config::load()?;

    let database = Database::connect(database_opt).await?;
    Migrator::up(&database, None).await?;

    let database = web::Data::new(database);
    let authority = web::Data::new(Authority::new(jwt_secret.as_bytes()));
    let clock = web::Data::from(Arc::new(SystemClock) as Arc<dyn Clock>);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(clock.clone())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    })
    .bind(host_address)?;

    info!(addresses = ?server.addrs(), "payroll server listening");

    server.run().await?;

    Ok(())
}
