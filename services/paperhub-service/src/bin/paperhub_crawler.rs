use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use paperhub_catalog::Paper;
use paperhub_clients::{EmbederClient, PineconeClient, PostgresClient};
use paperhub_common::{EnvVars, ModuleClient};
use paperhub_crawler::{
    crawl_keywords, crawl_to_db, import_metadata, index_papers, migrate_papers, ArxivCrawler, ArxivSort,
    CrawlRequest, CrawlerEnv, METADATA_FILE_NAME,
};
use paperhub_database::{list_public_tables, prepare_table, test_connection};
use paperhub_api::setup_tracing;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Parser, Debug)]
#[command(name = "paperhub_crawler", about = "Crawl arXiv into the PaperHub catalogue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search arXiv once and store the results
    Crawl(CrawlArgs),
    /// Crawl several keywords in a row, without PDFs
    CrawlKeywords(CrawlKeywordsArgs),
    /// Insert papers from a metadata JSON file
    Import(ImportArgs),
    /// Embed stored papers and write them to the vector index
    Index(IndexArgs),
    /// Copy papers into another database
    Migrate(MigrateArgs),
    /// Check the connection and create the tables
    InitDb(InitDbArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    #[arg(long)]
    query: String,
    #[arg(long, default_value_t = 50)]
    max_results: usize,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    download_pdf: bool,
    #[arg(long, default_value = "relevance")]
    sort: ArxivSort,
}

#[derive(Args, Debug)]
struct CrawlKeywordsArgs {
    #[arg(long = "keyword", required = true)]
    keywords: Vec<String>,
    #[arg(long, default_value_t = 30)]
    max_results_per_keyword: usize,
    #[arg(long, default_value_t = 10)]
    pause_secs: u64,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Defaults to `$PAPERS_DIR/papers_metadata.json`
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    #[arg(long)]
    target_url: String,
}

#[derive(Args, Debug)]
struct InitDbArgs {
    /// Drop the paper table before creating it
    #[arg(long)]
    drop: bool,
}

async fn connect_db() -> Result<&'static PgPool> {
    let db = PostgresClient::setup_connection().await?;
    Ok(**db.get_client())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let cli = Cli::parse();
    let env = CrawlerEnv::load()?;

    match cli.command {
        Commands::Crawl(args) => {
            let pool = connect_db().await?;
            let crawler = ArxivCrawler::new(&env.papers_dir)?;
            let request = CrawlRequest {
                query: args.query,
                max_results: args.max_results,
                category: args.category,
                download_pdf: args.download_pdf,
                sort: args.sort,
            };

            let report = crawl_to_db(&crawler, pool, &request).await?;
            println!("{}", report);
        }
        Commands::CrawlKeywords(args) => {
            let pool = connect_db().await?;
            let crawler = ArxivCrawler::new(&env.papers_dir)?;

            let total = crawl_keywords(
                &crawler,
                pool,
                &args.keywords,
                args.max_results_per_keyword,
                Duration::from_secs(args.pause_secs),
            )
            .await;
            println!("Total papers saved: {}", total);
        }
        Commands::Import(args) => {
            let pool = connect_db().await?;
            let path = args.path.unwrap_or_else(|| env.papers_dir.join(METADATA_FILE_NAME));

            let report = import_metadata(pool, &path).await?;
            println!("{}", report);
        }
        Commands::Index(args) => {
            let pool = connect_db().await?;
            let embeder = EmbederClient::setup_connection().await?;
            let pinecone = PineconeClient::setup_connection().await?;

            let indexed = index_papers(pool, &embeder, &pinecone, args.batch_size).await?;
            println!("Indexed {} papers", indexed);
        }
        Commands::Migrate(args) => {
            let source = connect_db().await?;
            let target = PgPoolOptions::new()
                .max_connections(5)
                .connect(&args.target_url)
                .await?;

            let report = migrate_papers(source, &target).await?;
            println!("Copied: {}, Skipped: {}", report.copied, report.skipped);
        }
        Commands::InitDb(args) => {
            let pool = connect_db().await?;
            if !test_connection(pool).await {
                bail!("database connection failed");
            }
            if args.drop {
                prepare_table::<Paper>(pool, true, true).await?;
            }

            for table in list_public_tables(pool).await? {
                println!("{}", table);
            }
        }
    }

    Ok(())
}
