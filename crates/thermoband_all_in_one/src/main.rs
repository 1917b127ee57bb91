mod config;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use config::ServiceConfig;
use thermoband_domain::{
    BindingService, InMemoryThrottleGate, IngestionService, PatientService, ResetWorkflow,
    SpawningResetDispatcher,
};
use thermoband_http::{create_router, serve, AppState, JwtAuthTokenProvider, JwtConfig};
use thermoband_postgres::{
    apply_schema, PostgresBindingRepository, PostgresClient, PostgresConfig,
    PostgresPatientRepository, PostgresReadingRepository,
};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    telemetry::init_telemetry(&config.log_level);

    info!(
        http_host = %config.http_host,
        http_port = config.http_port,
        "Starting thermoband-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    // PostgreSQL initialization
    info!("Initializing PostgreSQL...");
    let postgres_client = match initialize_postgres(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize PostgreSQL: {}", e);
            std::process::exit(1);
        }
    };

    let binding_repository = Arc::new(PostgresBindingRepository::new(postgres_client.clone()));
    let patient_repository = Arc::new(PostgresPatientRepository::new(postgres_client.clone()));
    let reading_repository = Arc::new(PostgresReadingRepository::new(postgres_client));

    // Reset workflow runs detached from the request path
    let reset_workflow = Arc::new(ResetWorkflow::new(
        binding_repository.clone(),
        patient_repository.clone(),
        reading_repository.clone(),
    ));
    let reset_dispatcher = Arc::new(SpawningResetDispatcher::new(reset_workflow));

    // One process-wide throttle gate, owned here, shared with the pipeline
    let throttle_gate = Arc::new(InMemoryThrottleGate::default());

    // Domain services
    let ingestion_service = Arc::new(IngestionService::new(
        throttle_gate,
        binding_repository.clone(),
        reading_repository.clone(),
        reset_dispatcher,
    ));
    let binding_service = Arc::new(BindingService::new(
        binding_repository.clone(),
        patient_repository.clone(),
    ));
    let patient_service = Arc::new(PatientService::new(
        patient_repository,
        binding_repository,
        reading_repository,
    ));

    let auth_token_provider = Arc::new(JwtAuthTokenProvider::new(JwtConfig::new(
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    )));

    let state = Arc::new(AppState {
        ingestion: ingestion_service,
        bindings: binding_service,
        patients: patient_service,
        auth: auth_token_provider,
        device_api_key: config.device_api_key.clone(),
    });
    let router = create_router(state);

    // Shutdown token - owned by main for lifecycle coordination
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let addr = SocketAddr::new(
        match config.http_host.parse() {
            Ok(ip) => ip,
            Err(e) => {
                error!("Invalid HTTP host {}: {}", config.http_host, e);
                std::process::exit(1);
            }
        },
        config.http_port,
    );

    if let Err(e) = serve(router, addr, shutdown_token).await {
        error!("HTTP server error: {}", e);
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

async fn initialize_postgres(config: &ServiceConfig) -> anyhow::Result<PostgresClient> {
    let postgres_config = PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_max_pool_size,
    };

    let client = PostgresClient::new(&postgres_config)?;
    client.ping().await?;
    apply_schema(&client).await?;

    Ok(client)
}
