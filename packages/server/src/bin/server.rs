//! Clinic relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin clinic-relay-server -- --jwt-secret dev-secret
//! cargo run --bin clinic-relay-server -- --jwt-secret dev-secret --seed-file packages/server/fixtures/seed.json
//! ```

use std::sync::Arc;

use clap::Parser;
use clinic_relay_server::{
    config::ServerConfig,
    domain::{AccessPolicy, EntityResolver, RelationshipGraph, TextGenerator},
    infrastructure::{
        auth::JwtAuthVerifier,
        generator::{OpenAiGenerator, ScriptedGenerator},
        message_pusher::ConnectionRegistry,
        seed::SeedData,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, EndSessionUseCase,
        GetRoomsUseCase, InterviewService, SendMessageUseCase, SessionGateway,
    },
};
use clinic_relay_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Initialize dependencies in order:
    // 1. Stores
    // 2. Collaborators (auth, text generation)
    // 3. ConnectionRegistry
    // 4. UseCases
    // 5. Server

    // 1. Create stores (in-memory, optionally seeded)
    let seed = match &config.seed_file {
        Some(path) => match SeedData::load(path).await {
            Ok(seed) => seed,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No seed file given; starting with empty stores");
            SeedData::default()
        }
    };
    let stores = seed.into_stores();
    let graph = RelationshipGraph::new(stores.relationships.clone());

    // 2. Create collaborators
    let auth = Arc::new(JwtAuthVerifier::new(&config.jwt_secret, stores.users.clone()));
    let generator: Arc<dyn TextGenerator> = match &config.openai_api_key {
        Some(api_key) => {
            tracing::info!("Using chat-completions model '{}'", config.openai_model);
            Arc::new(OpenAiGenerator::new(
                api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
            ))
        }
        None => {
            tracing::warn!("No API key configured; using the scripted interviewer");
            Arc::new(ScriptedGenerator::new())
        }
    };
    let clock = Arc::new(SystemClock);

    // 3. Create ConnectionRegistry
    let registry = Arc::new(ConnectionRegistry::new());

    // 4. Create UseCases
    let interviews = Arc::new(InterviewService::new(
        generator,
        config.interview_settings(),
    ));
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        auth,
        EntityResolver::new(graph.clone()),
        AccessPolicy::new(graph),
        stores.rooms.clone(),
        stores.turns.clone(),
        registry.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        stores.rooms.clone(),
        stores.turns.clone(),
        registry.clone(),
        interviews.clone(),
        clock,
    ));
    let end_session_usecase = Arc::new(EndSessionUseCase::new(
        stores.rooms.clone(),
        interviews,
        registry.clone(),
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(registry.clone()));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(registry.clone()));
    let gateway = Arc::new(SessionGateway::new(
        connect_participant_usecase,
        send_message_usecase,
        end_session_usecase,
        disconnect_participant_usecase,
        registry.clone(),
    ));

    // 5. Create and run the server
    let server = Server::new(gateway, get_rooms_usecase, registry);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
