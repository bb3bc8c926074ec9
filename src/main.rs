use std::io::Error;
use std::sync::Arc;

use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    application::{
        handlers::message_dispatcher::MessageDispatcher,
        services::scheduler::{DEFAULT_TICK_INTERVAL, DispatchScheduler},
        usecases::list_sent_messages::ListSentMessagesUseCase,
    },
    config::Config,
    domain::repositories::MessageRepository,
    infrastructure::{
        delivery::http::HttpSmsGateway, repositories::postgres::PostgresMessageRepository,
    },
    presentation::http::endpoints::{
        dispatch::DispatchEndpoints, health::HealthEndpoints, messages::MessagesEndpoints,
        root::ApiState,
    },
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;

#[main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::try_parse().map_err(Error::other)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(Error::other)?;
    info!("connected to the database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(Error::other)?;
    info!("database schema migrated");

    let repository: Arc<dyn MessageRepository> = PostgresMessageRepository::new(pool);

    if std::env::args().any(|arg| arg == "--fill") {
        info!("--fill flag set, populating database with demo messages");
        if let Err(err) = fill_demo_messages(repository.as_ref()).await {
            error!(error = %err, "failed to populate demo messages, continuing with startup");
        }
    }

    let driver = HttpSmsGateway::new(config.provider_url.clone()).map_err(Error::other)?;
    let dispatcher = Arc::new(MessageDispatcher::new(repository.clone(), driver));
    let scheduler = Arc::new(DispatchScheduler::new(dispatcher, DEFAULT_TICK_INTERVAL));

    let shutdown = CancellationToken::new();
    scheduler
        .start(shutdown.clone())
        .await
        .map_err(Error::other)?;

    let state = Arc::new(ApiState {
        scheduler,
        list_sent_messages_usecase: Arc::new(ListSentMessagesUseCase::new(repository)),
        shutdown,
    });

    let server_url = format!("http://localhost:{}", config.port);
    info!(url = %server_url, "starting dispatch server");

    let api_service = OpenApiService::new(
        (
            HealthEndpoints,
            DispatchEndpoints::new(state.clone()),
            MessagesEndpoints::new(state.clone()),
        ),
        "Dispatch API",
        "0.1.0",
    )
    .server(server_url);
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/docs", ui).nest("/", api_service);

    Server::new(TcpListener::bind(format!("localhost:{}", config.port)))
        .run(app)
        .await
}

async fn fill_demo_messages(repository: &dyn MessageRepository) -> anyhow::Result<()> {
    let demo = [
        ("+12345678901", "Dummy message 1 for testing"),
        ("+12345678902", "Another dummy message for --fill"),
        ("+12345678903", "Urgent: fill data test"),
        ("+12345678904", "Scheduled dummy message"),
    ];

    for (recipient, content) in demo {
        let message = repository
            .create(recipient.to_owned(), content.to_owned())
            .await?;
        info!(id = %message.id, recipient, "inserted demo message");
    }

    Ok(())
}
