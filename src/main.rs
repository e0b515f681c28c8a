use std::{env, io, sync::Arc};

use actix_web::{web::Data, App, HttpServer};
use lab_inventory_api::config::Settings;
use lab_inventory_api::mailer::LogMailer;
use lab_inventory_api::models::AppState;
use lab_inventory_api::{db, ApiDoc};
use log::{error, info, LevelFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn initalize_syslog() {
    let log_level: LevelFilter = match env::var("LOG_LEVEL") {
        Err(_) => log::LevelFilter::Warn,
        Ok(value) => match value.to_uppercase().as_str() {
            "ERROR" => log::LevelFilter::Error,
            "WARNING" => log::LevelFilter::Warn,
            "INFO" => log::LevelFilter::Info,
            "DEBUG" => log::LevelFilter::Debug,
            "TRACE" => log::LevelFilter::Trace,
            "OFF" => log::LevelFilter::Off,
            _ => log::LevelFilter::Warn,
        },
    };
    let log_result = syslog::init(syslog::Facility::LOG_SYSLOG, log_level, None);
    if log_result.is_err() {
        eprintln!("WARNING! Failed to initialize logging system! Server logs will be unavaliable!");
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    initalize_syslog();

    let settings = Settings::from_env();

    let pool = match db::connect(&settings.database_url).await {
        Ok(pool) => {
            info!("Connected to the database");
            pool
        }
        Err(err) => {
            let message = format!("ERROR: Failed to connect to the database: {err}");
            error!("{message}");
            eprintln!("{message}");
            panic!("{err}");
        }
    };

    if let Err(err) = db::init_db(&pool).await {
        let message = format!("ERROR: Failed to initialize the database: {err}");
        error!("{message}");
        eprintln!("{message}");
        panic!("{err}");
    }

    let state = Data::new(AppState {
        database: pool,
        settings,
        mailer: Arc::new(LogMailer),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(lab_inventory_api::configure)
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
