use anyhow::Context;
use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand};
use logreview::client::{ChatClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use logreview::evaluate::{self, DEFAULT_THRESHOLD};
use logreview::pipeline::{
    BatchPipeline, PipelineConfig, SingleSystemPipeline, DEFAULT_BATCH_SIZE, DEFAULT_BATCH_THROTTLE,
    DEFAULT_ROW_THROTTLE,
};
use logreview::prompt::{self, PromptTemplate};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "logreview", version, about = "Assistant-driven review and scoring of log templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review templates in batches, one endpoint call per batch
    Review {
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Manually reviewed example table (CSV)
        #[arg(long = "examples")] examples: PathBuf,
        /// Templates to review (CSV)
        #[arg(long = "input")] input: PathBuf,
        #[arg(long = "output")] output: PathBuf,
        #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE,
              value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize))]
        batch_size: usize,
        /// Pause after each batch, in milliseconds
        #[arg(long = "throttle-ms", default_value_t = DEFAULT_BATCH_THROTTLE.as_millis() as u64)] throttle_ms: u64,
    },
    /// Review templates of a single system, one endpoint call per row
    ReviewSingle {
        #[command(flatten)]
        endpoint: EndpointArgs,
        #[arg(long = "system")] system: String,
        #[arg(long = "examples")] examples: PathBuf,
        #[arg(long = "input")] input: PathBuf,
        #[arg(long = "output")] output: PathBuf,
        /// Pause after each row, in milliseconds
        #[arg(long = "throttle-ms", default_value_t = DEFAULT_ROW_THROTTLE.as_millis() as u64)] throttle_ms: u64,
    },
    /// Score reviewed templates against human revisions
    Evaluate {
        #[arg(long = "reviewed")] reviewed: PathBuf,
        #[arg(long = "human")] human: PathBuf,
        #[arg(long = "output")] output: PathBuf,
        #[arg(long = "threshold", default_value_t = DEFAULT_THRESHOLD)] threshold: f64,
    },
    /// Print the system prompt that would be sent, without calling the endpoint
    Prompt {
        #[arg(long = "examples")] examples: PathBuf,
        /// May be repeated
        #[arg(long = "system", required = true)] system: Vec<String>,
        /// Use the per-row prompt wording instead of the batch one
        #[arg(long = "single", default_value_t = false)] single: bool,
    },
}

#[derive(Args, Debug)]
struct EndpointArgs {
    #[arg(long = "base-url", env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long = "model", env = "LOGREVIEW_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    /// HTTP timeout in seconds
    #[arg(long = "timeout", default_value_t = 120)]
    timeout_secs: u64,
}

impl EndpointArgs {
    fn into_client(self) -> anyhow::Result<ChatClient> {
        let config = ClientConfig {
            base_url: self.base_url,
            api_key: self.api_key,
            model: self.model,
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        };
        ChatClient::new(config).context("failed to set up endpoint client")
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    // Endpoint credentials may live in a local .env file.
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Review { endpoint, examples, input, output, batch_size, throttle_ms } => {
            let config = PipelineConfig { batch_size, throttle: Duration::from_millis(throttle_ms) };
            let pipeline = BatchPipeline::new(endpoint.into_client()?, config)?;
            pipeline
                .process_files(&examples, &input, &output)
                .with_context(|| format!("batch review of {} failed", input.display()))?;
        }
        Command::ReviewSingle { endpoint, system, examples, input, output, throttle_ms } => {
            let pipeline = SingleSystemPipeline::new(endpoint.into_client()?, Duration::from_millis(throttle_ms));
            pipeline
                .process_files(&system, &examples, &input, &output)
                .with_context(|| format!("per-row review of {} failed", input.display()))?;
        }
        Command::Evaluate { reviewed, human, output, threshold } => {
            evaluate::evaluate_files(&reviewed, &human, &output, threshold)
                .context("evaluation failed")?;
        }
        Command::Prompt { examples, system, single } => {
            let rows = prompt::load_examples_from_path(&examples)
                .with_context(|| format!("failed to load {}", examples.display()))?;
            let template = if single { PromptTemplate::SingleSystem } else { PromptTemplate::MultiSystem };
            println!("{}", prompt::build_system_prompt(&rows, template, system.as_slice()));
        }
    }
    Ok(())
}
