use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use match_ingest::batch::{fetch_and_ingest, ingest_files, list_json_files, read_payload};
use match_ingest::config::Settings;
use match_ingest::ingest::{IngestReport, Ingestor};
use match_ingest::riot_api::{DEFAULT_MAX_REQS_PER_2MIN, RiotClient};
use match_ingest::store::MemoryStore;

#[derive(Parser, Debug)]
#[command(
    name = "match-ingest",
    about = "Ingest match telemetry into the match history store",
    version
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest match JSON files
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ingest every .json file in a directory
    IngestDir { dir: PathBuf },

    /// Download matches from the Riot API and ingest them
    #[command(group(ArgGroup::new("source").required(true).args(["match_ids", "puuid"])))]
    Fetch {
        /// Match id, e.g. EUW1_7000000001
        #[arg(long = "match-id")]
        match_ids: Vec<String>,

        /// Ingest the most recent matches of this player
        #[arg(long)]
        puuid: Option<String>,

        #[arg(long, default_value_t = 20)]
        count: usize,

        #[arg(long = "max-req-per-2min", default_value_t = DEFAULT_MAX_REQS_PER_2MIN)]
        max_req_per_2min: usize,
    },

    /// Print the row a match file would produce without storing it
    Preview { file: PathBuf },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.settings.log_json);

    match run(cli).await {
        Ok(report) => {
            info!(
                persisted = report.persisted,
                rejected = report.rejected,
                persist_failed = report.persist_failed,
                unavailable = report.unavailable,
                "done"
            );
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<IngestReport> {
    let queues = cli.settings.queue_table();

    if let Command::Preview { file } = &cli.command {
        let ingestor = Ingestor::new(queues, MemoryStore::new());
        let payload = read_payload(file).await?;
        let prepared = ingestor.prepare(&payload)?;
        info!(match_id = %prepared.match_id, "previewing match");
        println!("{}", serde_json::to_string_pretty(&prepared.row)?);
        return Ok(IngestReport::default());
    }

    let store = cli.settings.open_store().await?;
    let ingestor = Ingestor::new(queues, store);

    match cli.command {
        Command::Ingest { files } => Ok(ingest_files(&ingestor, &files).await),
        Command::IngestDir { dir } => {
            let files = list_json_files(&dir)?;
            info!(dir = %dir.display(), files = files.len(), "ingesting directory");
            Ok(ingest_files(&ingestor, &files).await)
        }
        Command::Fetch {
            match_ids,
            puuid,
            count,
            max_req_per_2min,
        } => {
            let client = RiotClient::new_with_max(max_req_per_2min)?;
            let mut match_ids = match_ids;
            if let Some(puuid) = puuid {
                match_ids.extend(client.get_match_ids_by_puuid(&puuid, count).await?);
            }
            Ok(fetch_and_ingest(&ingestor, &client, &match_ids).await)
        }
        Command::Preview { .. } => Ok(IngestReport::default()),
    }
}
