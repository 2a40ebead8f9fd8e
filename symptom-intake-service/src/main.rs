use symptom_intake_service::{ServiceConfig, create_app};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing: human-readable with LOG_FORMAT=pretty, JSON lines otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "symptom_intake_service=debug,intake_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    for variable in config.missing_credentials() {
        warn!(
            "{} not set; the calls that need it will fail until it is configured",
            variable
        );
    }

    let app = create_app(&config);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Symptom Intake Service starting on {}", addr);
    info!(
        intake_steps = config.layout.intake_steps(),
        questions = config.question_prompt.count,
        "Wizard configured"
    );
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
