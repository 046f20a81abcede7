mod analyze;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "adscope-cli")]
#[command(about = "Find negative keywords that block active keywords")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Audit one ads account for negative keyword conflicts
    Analyze {
        /// Customer (account) id; dashes are ignored
        #[arg(long)]
        customer_id: String,

        /// Restrict the audit to a campaign (repeatable)
        #[arg(long = "campaign-id")]
        campaign_ids: Vec<String>,

        /// Maximum conflicts in the report
        #[arg(long)]
        max_total: Option<usize>,

        /// Maximum conflicts kept per campaign
        #[arg(long)]
        max_per_campaign: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = adscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            customer_id,
            campaign_ids,
            max_total,
            max_per_campaign,
            format,
        } => {
            let request = analyze::AnalyzeRequest {
                customer_id,
                campaign_ids,
                max_total,
                max_per_campaign,
            };
            let report = analyze::run(&config, &request, cancel_signal()).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print!("{}", analyze::render_text(&report)),
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn cancel_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for ctrl-c; cancellation disabled");
        std::future::pending::<()>().await;
    }
    tracing::info!("received ctrl-c, cancelling analysis");
}
