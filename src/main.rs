use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use pawdoc::api;
use pawdoc::api::middleware::ApiKeyAuth;
use pawdoc::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use pawdoc::config::AppConfig;
use pawdoc::db;
use pawdoc::llm::{openai::OpenAiGateway, AssistantGateway};
use pawdoc::orchestrator::{InMemoryRunRegistry, RunRegistry, TurnOrchestrator};
use pawdoc::search::{tavily::TavilySearch, SearchProvider};
use std::sync::Arc;
use tracing::{error, info};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting Pawdoc Pet Health Assistant Server...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db_pool = match db::get_connection(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn AssistantGateway> = match OpenAiGateway::connect(&config.openai).await {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Failed to initialize assistant gateway: {}", e);
            std::process::exit(1);
        }
    };

    let search: Arc<dyn SearchProvider> = Arc::new(TavilySearch::new(&config.tavily));
    let registry: Arc<dyn RunRegistry> = Arc::new(InMemoryRunRegistry::new());

    let orchestrator = TurnOrchestrator::new(
        db_pool.clone(),
        gateway,
        search,
        registry,
        config.polling.clone(),
        &config.chat,
    );

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(orchestrator.clone()))
            .route("/health", web::get().to(health))
            .wrap(ApiKeyAuth)
            .configure(api::routes::configure)
            .configure(api::pets::configure)
            .configure(api::feedback::configure)
            .configure(api::admin::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
