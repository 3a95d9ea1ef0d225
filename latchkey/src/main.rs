use clap::Parser;
use latchkey::{CleanupReport, Error, RepositoryProvider};
use tracing::Level;

/// Command line interface for Latchkey
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string. `postgres://` URLs select Postgres,
    /// anything else is opened with SQLite.
    /// Not needed for `version`.
    #[arg(long, env = "LATCHKEY_DATABASE_URL")]
    db_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check the database is reachable
    Check,
    /// Delete expired refresh, reset and magic link tokens
    Cleanup,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Commands::Version = cli.command {
        println!("Latchkey v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let db_url = cli.database_url()?;
    if db_url.starts_with("postgres://") || db_url.starts_with("postgresql://") {
        run_postgres(db_url, &cli.command).await
    } else {
        run_sqlite(db_url, &cli.command).await
    }
}

impl Cli {
    fn database_url(&self) -> Result<&str, Error> {
        self.db_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                latchkey::error::ValidationError::MissingField(
                    "--db-url or LATCHKEY_DATABASE_URL".to_string(),
                )
                .into()
            })
    }
}

#[cfg(feature = "postgres")]
async fn run_postgres(db_url: &str, command: &Commands) -> Result<(), Error> {
    let repositories = latchkey::PostgresRepositoryProvider::connect(db_url).await?;
    run(&repositories, command).await
}

#[cfg(not(feature = "postgres"))]
async fn run_postgres(_db_url: &str, _command: &Commands) -> Result<(), Error> {
    Err(latchkey::error::StorageError::Connection(
        "built without the postgres feature".to_string(),
    )
    .into())
}

#[cfg(feature = "sqlite")]
async fn run_sqlite(db_url: &str, command: &Commands) -> Result<(), Error> {
    let repositories = latchkey::SqliteRepositoryProvider::connect(db_url).await?;
    run(&repositories, command).await
}

#[cfg(not(feature = "sqlite"))]
async fn run_sqlite(_db_url: &str, _command: &Commands) -> Result<(), Error> {
    Err(latchkey::error::StorageError::Connection(
        "built without the sqlite feature".to_string(),
    )
    .into())
}

async fn run<R: RepositoryProvider>(repositories: &R, command: &Commands) -> Result<(), Error> {
    match command {
        Commands::Migrate => {
            tracing::info!("Running migrations");
            repositories.migrate().await?;
            println!("Migrations complete");
        }
        Commands::Check => {
            repositories.health_check().await?;
            println!("Database reachable");
        }
        Commands::Cleanup => {
            let CleanupReport {
                tokens,
                passwordless_tokens,
            } = latchkey::cleanup_expired(repositories).await?;
            println!("Removed {tokens} tokens and {passwordless_tokens} magic link tokens");
        }
        Commands::Version => {}
    }
    Ok(())
}
