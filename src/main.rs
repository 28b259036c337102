use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use edge_offload::client::{
    append_lost_report, HttpTransport, LoadGenerator, Negotiator, OffloadJob, Outcome, Workload,
};
use edge_offload::config::{
    ClientConfig, ExecutorConfig, ServerConfig, ACCELERATION_FACTOR, DEFAULT_EPOCH_SECS,
    MEAN_JOB_SIZE_SECS,
};
use edge_offload::node::ServerNode;
use edge_offload::shutdown::install_shutdown_handler;
use edge_offload::worker::JobExecutor;

/// Job program used when `--program` is not given.
const DEFAULT_PROGRAM: &str = include_str!("../programs/load.c");

#[derive(Parser, Debug)]
#[command(name = "edge-offload")]
#[command(version)]
#[command(about = "Offload jobs to an edge server based on predicted waiting time")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start an offload server
    Server(ServerArgs),

    /// Negotiate a single job with a server
    Client {
        #[command(flatten)]
        client: ClientArgs,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },

    /// Simulate a population of clients until interrupted
    Load {
        #[command(flatten)]
        client: ClientArgs,

        /// Mean gap between negotiations, in seconds
        #[arg(long, default_value_t = MEAN_JOB_SIZE_SECS)]
        mean_gap_secs: f64,

        /// File the lost-negotiation count is appended to on exit
        #[arg(long, default_value = "lost_packets.txt")]
        lost_log: PathBuf,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on
    #[arg(long, default_value = "5683")]
    port: u16,

    /// Queue-model epoch, in seconds
    #[arg(long, default_value_t = DEFAULT_EPOCH_SECS)]
    epoch_secs: u64,

    /// Directory for per-job build artifacts
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// C compiler used to build submitted programs
    #[arg(long, default_value = "cc")]
    compiler: String,

    /// Upper bound on compile and run time of one job, in seconds
    #[arg(long, default_value = "300")]
    exec_timeout_secs: u64,

    /// Append a JSON line with each completed job's timestamps to this file
    #[arg(long)]
    timestamps_log: Option<PathBuf>,
}

// =============================================================================
// Client Arguments (shared by client and load commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:5683")]
    addr: String,

    /// C source of the job program (defaults to the bundled sleep program)
    #[arg(long)]
    program: Option<PathBuf>,

    /// Directory for build artifacts of locally executed jobs
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Give up on a server request after this many seconds
    #[arg(long, default_value = "30")]
    request_timeout_secs: f64,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct NegotiationOutput {
    execution_secs: f64,
    accelerated_secs: f64,
    location: &'static str,
    job_id: Option<u64>,
    output: String,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn load_program(path: &Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => Ok(DEFAULT_PROGRAM.to_string()),
    }
}

async fn build_negotiator(
    args: &ClientArgs,
) -> Result<(Negotiator<HttpTransport>, ClientConfig, String), Box<dyn std::error::Error>> {
    if !(args.request_timeout_secs.is_finite() && args.request_timeout_secs > 0.0) {
        return Err(format!(
            "--request-timeout-secs must be positive, got {}",
            args.request_timeout_secs
        )
        .into());
    }
    let config = ClientConfig::new(args.addr.clone())
        .with_request_timeout(Duration::from_secs_f64(args.request_timeout_secs));
    config.validate()?;
    let mut executor = ExecutorConfig::default();
    if let Some(dir) = &args.work_dir {
        executor.work_dir = dir.clone();
    }
    let program = load_program(&args.program).await?;
    let negotiator = Negotiator::new(
        HttpTransport::from_config(&config)?,
        Arc::new(JobExecutor::new(executor)),
        config.clone(),
    );
    Ok((negotiator, config, program))
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.epoch_secs == 0 {
        return Err("--epoch-secs must be at least 1".into());
    }
    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;

    let mut executor = ExecutorConfig {
        compiler: args.compiler,
        timeout: Duration::from_secs(args.exec_timeout_secs),
        ..ExecutorConfig::default()
    };
    if let Some(dir) = args.work_dir {
        executor.work_dir = dir;
    }

    let mut config = ServerConfig::new(listen_addr).with_epoch(Duration::from_secs(args.epoch_secs));
    config.executor = executor;
    if let Some(path) = args.timestamps_log {
        config = config.with_timestamps_log(path);
    }

    tracing::info!(
        listen_addr = %config.listen_addr,
        epoch_secs = args.epoch_secs,
        compiler = %config.executor.compiler,
        work_dir = %config.executor.work_dir.display(),
        "Starting offload server"
    );

    let shutdown = install_shutdown_handler();
    ServerNode::new(config).run(shutdown).await?;
    Ok(())
}

async fn run_client(
    args: ClientArgs,
    output_format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (negotiator, config, program) = build_negotiator(&args).await?;
    let workload = Workload::sample(
        &mut rand::thread_rng(),
        config.mean_job_size_secs,
        config.acceleration_factor,
    );

    if let OutputFormat::Table = output_format {
        println!("ACCELERATION_FACTOR: {}", ACCELERATION_FACTOR);
        println!("EXECUTION_TIME: {}", workload.execution_secs);
        println!("ACCELERATED_TIME: {}", workload.accelerated_secs);
    }

    let outcome = negotiator
        .negotiate(&OffloadJob::new(program, workload))
        .await?;

    match output_format {
        OutputFormat::Json => {
            let output = NegotiationOutput {
                execution_secs: workload.execution_secs,
                accelerated_secs: workload.accelerated_secs,
                location: if outcome.ran_locally() { "local" } else { "remote" },
                job_id: match &outcome {
                    Outcome::Remote { job_id, .. } => Some(*job_id),
                    Outcome::Local { .. } => None,
                },
                output: outcome.output().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => match &outcome {
            Outcome::Remote { output, .. } => println!("Result is: {}", output),
            Outcome::Local { result, .. } => print!("{}", result.output),
        },
    }
    Ok(())
}

async fn run_load(
    args: ClientArgs,
    mean_gap_secs: f64,
    lost_log: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(mean_gap_secs.is_finite() && mean_gap_secs > 0.0) {
        return Err(format!("--mean-gap-secs must be positive, got {}", mean_gap_secs).into());
    }
    let (negotiator, config, program) = build_negotiator(&args).await?;

    tracing::info!(server = %config.server_url, mean_gap_secs, "Starting load generator");

    let shutdown = install_shutdown_handler();
    let report = LoadGenerator::new(negotiator, program, Duration::from_secs_f64(mean_gap_secs))
        .run(config.mean_job_size_secs, config.acceleration_factor, shutdown)
        .await;

    tracing::info!(
        launched = report.launched,
        completed = report.completed,
        lost = report.lost,
        "Load generator stopped"
    );
    append_lost_report(&lost_log, report.lost).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Commands::Server(server_args) => run_server(server_args).await?,
        Commands::Client { client, output } => run_client(client, output).await?,
        Commands::Load {
            client,
            mean_gap_secs,
            lost_log,
        } => run_load(client, mean_gap_secs, lost_log).await?,
    }

    Ok(())
}
