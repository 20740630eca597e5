use clap::Parser;
use lumir_agent::{
    agent::AgentChain,
    config::{DocumentStoreConfig, LlmConfig},
    context::{ExternalLookup, NumerologyContextProvider, TradingContextProvider},
    documents::{store_from_config, NumerologyLibrary},
    llm::{ChatCompletionClient, LanguageModel},
    signature::value_text,
    telemetry::init_tracing,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run one plan → execute → check chain and print the answer
#[derive(Debug, Parser)]
#[command(name = "lumir-agent", version)]
struct Cli {
    /// Agent chain configuration (JSON array of agents)
    #[arg(short, long, env = "AGENT_CONFIG", default_value = "config/agent_node/numerology.json")]
    config: PathBuf,

    /// Question for the chain
    question: String,

    /// Full name for numerology context
    #[arg(long, requires = "dob", conflicts_with = "trading")]
    name: Option<String>,

    /// Date of birth, dd/mm/yyyy
    #[arg(long, requires = "name")]
    dob: Option<String>,

    /// Reference date for personal year/month/day, dd/mm/yyyy
    #[arg(long, requires = "dob")]
    current_date: Option<String>,

    /// Trading history export (.xlsx/.xls) for trading context
    #[arg(long)]
    trading: Option<PathBuf>,

    #[arg(long, env = "MAX_ITERATIONS", default_value_t = lumir_agent::agent::DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// Print the whole outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();

    let llm = LlmConfig::from_env()?;
    info!(model = %llm.model_name, config = %cli.config.display(), "Lumir agent starting");

    let model: Arc<dyn LanguageModel> = Arc::new(ChatCompletionClient::new(llm)?);
    let chain = AgentChain::from_config_file(&cli.config, model)?;

    let lookup: Option<Box<dyn ExternalLookup>> = match (&cli.name, &cli.dob, &cli.trading) {
        (Some(name), Some(dob), _) => {
            let documents = DocumentStoreConfig::from_env()?;
            let library = NumerologyLibrary::new(store_from_config(&documents)?, documents.prefix);
            Some(Box::new(NumerologyContextProvider::new(
                name.clone(),
                dob.clone(),
                cli.current_date.clone(),
                library,
            )) as Box<dyn ExternalLookup>)
        }
        (_, _, Some(path)) => {
            Some(Box::new(TradingContextProvider::new(path.clone())) as Box<dyn ExternalLookup>)
        }
        _ => None,
    };

    let outcome = chain
        .execute(&cli.question, lookup.as_deref(), cli.max_iterations)
        .await?;

    info!(
        run_id = %outcome.run_id,
        termination = %outcome.termination,
        iterations = outcome.iterations,
        "Chain finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        match outcome.response.get("response") {
            Some(answer) => println!("{}", value_text(answer)),
            None => println!("{}", serde_json::to_string_pretty(&outcome.response)?),
        }
    }

    Ok(())
}
