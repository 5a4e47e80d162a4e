//! graphrag-orchestrator CLI — thin entrypoint wiring adapters and running a
//! single query.
//!
//! Usage:
//!   graphrag-orchestrator query --tenant t1 --workspace ws1 --mode hybrid "question"

use clap::{Parser, Subcommand, ValueEnum};
use graphrag_orchestrator::adapter::lpg::InMemoryLpgAdapter;
use graphrag_orchestrator::adapter::{InMemoryTriplestoreAdapter, InMemoryVectorAdapter};
use graphrag_orchestrator::ids::{AgentId, TenantId, WorkspaceId};
use graphrag_orchestrator::llm::SubprocessChatClient;
use graphrag_orchestrator::ontology::schema::OntologySchema;
use graphrag_orchestrator::orchestrator::{Mode as OrchestratorMode, Orchestrator, QueryRequest};
use graphrag_orchestrator::{Config, LogLevel};

#[derive(Parser)]
#[command(name = "graphrag-orchestrator", version, about = "Multi-tenant GraphRAG query orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query against freshly constructed in-memory adapters.
    Query {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        workspace: String,
        #[arg(long, default_value = "cli-agent")]
        agent: String,
        #[arg(long, value_enum, default_value_t = CliMode::Rag)]
        mode: CliMode,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        #[arg(long, default_value_t = 2)]
        graph_depth: usize,
        question: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Rag,
    Graph,
    Graphdb,
    Neo4j,
    Compare,
    Hybrid,
    Unified,
}

impl From<CliMode> for OrchestratorMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Rag => OrchestratorMode::Rag,
            CliMode::Graph => OrchestratorMode::Graph,
            CliMode::Graphdb => OrchestratorMode::GraphDb,
            CliMode::Neo4j => OrchestratorMode::Neo4j,
            CliMode::Compare => OrchestratorMode::Compare,
            CliMode::Hybrid => OrchestratorMode::Hybrid,
            CliMode::Unified => OrchestratorMode::Unified,
        }
    }
}

fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(level.as_filter_str())).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(config.log_level);

    match cli.command {
        Commands::Query { tenant, workspace, agent, mode, top_k, graph_depth, question } => {
            let vector = InMemoryVectorAdapter::new();
            let lpg = InMemoryLpgAdapter::new();
            let triplestore = InMemoryTriplestoreAdapter::new();
            let chat = SubprocessChatClient::new();
            let schema = OntologySchema::default();
            let orchestrator = Orchestrator { vector: &vector, lpg: &lpg, triplestore: &triplestore, chat: &chat, ontology_schema: &schema };

            let request = QueryRequest {
                tenant: TenantId::new(tenant),
                workspace: WorkspaceId::new(workspace),
                agent: AgentId::new(agent),
                question,
                mode: mode.into(),
                folder_document_ids: Vec::new(),
                top_k,
                graph_depth,
            };

            match orchestrator.run_query(request).await {
                Ok(response) => {
                    println!("{}", serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.content.clone()));
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
    }
}
