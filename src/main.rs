use azul_chat::chat::ChatService;
use azul_chat::exchange_log::ExchangeLog;
use azul_chat::llm_wrapper::LLMClient;
use azul_chat::responder::{RetryPolicy, RetryingResponder, TokioSleeper};
use azul_chat::server;
use azul_chat::settings::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging first
    init_logging();

    let settings = Settings::new()?;

    let client = LLMClient::new(&settings.generation)?;
    info!("Generation endpoint: {}", client.endpoint());

    let responder = RetryingResponder::new(
        Arc::new(client),
        Arc::new(TokioSleeper),
        RetryPolicy::from(&settings.retry),
        settings.generation.max_output_tokens,
    );
    let exchange_log = ExchangeLog::new(&settings.exchange_log_path);
    let service = ChatService::new(responder, exchange_log);

    let app = server::create_app(service, &settings.static_dir);

    let addr = SocketAddr::new(settings.host, settings.port);
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Serving chat API on http://{} (exchange log: {})",
        addr,
        settings.exchange_log_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
