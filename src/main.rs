mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::hybrid::HybridArgs;
use commands::Context;
use hybrid_rag::core::paths::DEFAULT_DATA_DIR;
use hybrid_rag::DocumentFormat;

#[derive(Parser)]
#[command(name = "hybrid-rag")]
#[command(about = "Local hybrid retrieval: embedding similarity fused with graph traversal", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR, help = "Data directory")]
    data_dir: PathBuf,
    #[arg(long, global = true, help = "Use the SQLite snapshot instead of JSON files")]
    sqlite: bool,
    #[arg(long, global = true, help = "JSON output")]
    json: bool,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More logging (-v info, -vv debug)")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files, directories or glob patterns
    Ingest {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long, help = "Force a format: text|markdown|csv|json|jsonl")]
        format: Option<DocumentFormat>,
    },
    /// Vector similarity search (local mode)
    Search {
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
    },
    /// Graph traversal from keyword seeds or explicit node ids (global mode)
    Traverse {
        #[arg(required_unless_present = "from")]
        query: Option<String>,
        #[arg(long, num_args = 1.., help = "Start from these node ids")]
        from: Vec<String>,
        #[arg(long, short, help = "Maximum depth")]
        depth: Option<usize>,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
    },
    /// Fused vector + graph search (hybrid mode)
    Hybrid {
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Vector weight in [0, 1]")]
        vector_weight: Option<f32>,
        #[arg(long, help = "Graph weight in [0, 1]")]
        graph_weight: Option<f32>,
        #[arg(long, short, help = "Traversal depth")]
        depth: Option<usize>,
        #[arg(long, help = "Score the graph signal by node degree")]
        degree: bool,
        #[arg(long, help = "Follow edges in both directions")]
        undirected: bool,
        #[arg(long, help = "Apply the token-overlap rerank pass")]
        rerank: bool,
    },
    /// Add a relationship between two nodes
    Edge {
        source: String,
        target: String,
        #[arg(value_name = "TYPE")]
        kind: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f32,
    },
    /// Show store statistics
    Status {
        #[arg(short, long, help = "Brief output")]
        brief: bool,
    },
    /// Populate sample data and run every retrieval mode
    Demo {
        #[arg(long, help = "Replace the data directory's snapshot with the demo store")]
        save: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new(cli.data_dir, cli.sqlite, cli.json)?;
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Ingest { paths, format } => runtime.block_on(commands::ingest::run(&ctx, &paths, format)),
        Commands::Search { query, limit } => runtime.block_on(commands::search::run(&ctx, &query, limit)),
        Commands::Traverse {
            query,
            from,
            depth,
            limit,
        } => commands::traverse::run(&ctx, query.as_deref(), &from, depth, limit),
        Commands::Hybrid {
            query,
            limit,
            vector_weight,
            graph_weight,
            depth,
            degree,
            undirected,
            rerank,
        } => runtime.block_on(commands::hybrid::run(
            &ctx,
            &query,
            HybridArgs {
                limit,
                vector_weight,
                graph_weight,
                depth,
                degree,
                undirected,
                rerank,
            },
        )),
        Commands::Edge {
            source,
            target,
            kind,
            weight,
        } => commands::edge::run(&ctx, &source, &target, &kind, weight),
        Commands::Status { brief } => commands::status::run(&ctx, brief),
        Commands::Demo { save } => runtime.block_on(commands::demo::run(&ctx, save)),
    }
}
