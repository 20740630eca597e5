use lumir_agent::{
    agent::AgentChain,
    api::{start_server, ApiState},
    config::{DocumentStoreConfig, LlmConfig, ServerConfig},
    documents::{store_from_config, NumerologyLibrary},
    evaluator::PlanEvaluator,
    llm::{ChatCompletionClient, LanguageModel},
    telemetry::init_tracing,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    init_tracing("info,tower_http=debug");

    let server = ServerConfig::from_env()?;
    let llm = LlmConfig::from_env()?;
    let documents = DocumentStoreConfig::from_env()?;

    info!("🚀 Lumir Agent - API Server");
    info!("📍 Port: {}", server.port);
    info!("🤖 Model: {}", llm.model_name);
    info!("📂 Trading data: {}", server.trading_data_dir.display());

    let model: Arc<dyn LanguageModel> = Arc::new(ChatCompletionClient::new(llm)?);

    if let Some(url) = &documents.base_url {
        let signed = if documents.credentials.is_some() { "signed" } else { "unsigned" };
        info!("📚 Document store: {} ({})", url, signed);
    }
    let store = store_from_config(&documents)?;

    let chain = Arc::new(AgentChain::from_config_file(
        &server.agent_config_path,
        Arc::clone(&model),
    )?);
    info!(
        config = %server.agent_config_path.display(),
        agents = chain.chain_info().len(),
        "✅ Agent chain initialized"
    );

    let state = ApiState {
        chain,
        evaluator: Arc::new(PlanEvaluator::new(model)?),
        library: NumerologyLibrary::new(store, documents.prefix),
        max_iterations: server.max_iterations,
        trading_data_dir: server.trading_data_dir,
    };

    info!("📡 Starting API server...");
    start_server(state, server.port).await?;

    Ok(())
}
