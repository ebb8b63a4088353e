mod exit_codes;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trustbench_api::state::AppState;
use trustbench_core::config::{EnvConfig, Profile};
use trustbench_core::gate::Decision;
use trustbench_core::providers::fake::FakeProvider;
use trustbench_core::providers::openai::OpenAiProvider;
use trustbench_core::providers::{BoundedProvider, LlmProvider, RetryPolicy};
use trustbench_core::store::RunStore;
use trustbench_core::tools::fake::FakeToolClient;
use trustbench_core::tools::http::HttpToolClient;
use trustbench_core::tools::ToolClient;

#[derive(Parser)]
#[command(name = "trustbench")]
#[command(about = "AI safety evaluation harness")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single profile end-to-end and print the verdict.
    Run {
        /// Path to the evaluation profile (YAML or JSON).
        profile: PathBuf,
    },
    /// Start the job manager HTTP API.
    Serve {
        /// Address to bind, e.g. `0.0.0.0:8080`.
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
}

fn init_tracing() {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn resolve_provider(provider_id: &str, model: &str, env: &EnvConfig) -> Arc<dyn LlmProvider> {
    if env.fake_provider || provider_id == "fake" {
        return Arc::new(FakeProvider::new(model));
    }
    let api_key = env.provider_api_key.clone().unwrap_or_default();
    Arc::new(OpenAiProvider::new(model, api_key))
}

async fn run_profile(profile_path: PathBuf) -> anyhow::Result<i32> {
    let env = EnvConfig::from_env();

    let profile = match Profile::load(&profile_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("fatal: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let inner_provider = resolve_provider(&profile.provider_id, &profile.model, &env);
    let provider = Arc::new(BoundedProvider::new(
        inner_provider,
        env.max_provider_concurrency,
        RetryPolicy {
            max_retries: env.provider_retries,
            backoff_seconds: env.provider_retry_backoff,
        },
    ));
    let secondary_provider = profile.secondary_provider_id.as_deref().map(|id| {
        Arc::new(BoundedProvider::new(
            resolve_provider(id, &profile.model, &env),
            env.max_provider_concurrency,
            RetryPolicy {
                max_retries: env.provider_retries,
                backoff_seconds: env.provider_retry_backoff,
            },
        ))
    });

    let tool_client: Arc<dyn ToolClient> = if env.fake_provider {
        Arc::new(FakeToolClient::new([
            "prompt_guard",
            "semgrep_rules",
            "secrets_scan",
            "download_and_extract_repo",
            "env_content",
            "cleanup_workspace",
        ]))
    } else {
        Arc::new(HttpToolClient::new(
            env.tool_bridge_url.clone(),
            None,
            std::time::Duration::from_secs(30),
        ))
    };

    let scorer_chain = Arc::new(trustbench_core::scorer::default_chain());
    let store = RunStore::new(&env.runs_root)?;

    let outcome = trustbench_core::orchestrator::run_evaluation(
        Arc::new(profile),
        provider,
        secondary_provider,
        tool_client,
        scorer_chain,
        &store,
        &env,
        None,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&outcome.verdict)?);

    Ok(match outcome.verdict.decision {
        Decision::Pass => exit_codes::SUCCESS,
        Decision::Warn | Decision::Fail => exit_codes::GATE_FAILURE,
    })
}

async fn serve(addr: String) -> anyhow::Result<i32> {
    let env = EnvConfig::from_env();
    let state = Arc::new(AppState::new(env)?);
    let socket_addr: std::net::SocketAddr = addr.parse()?;
    trustbench_api::server::serve(state, socket_addr).await?;
    Ok(exit_codes::SUCCESS)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { profile } => run_profile(profile).await,
        Commands::Serve { addr } => serve(addr).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
