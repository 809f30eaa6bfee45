use anyhow::Context;
use bookshelf_app::{migrate, App};
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Book catalog service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Override `database.url` from configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations and serve HTTP until shutdown
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }

    bookshelf_telemetry::init(&settings.telemetry)?;
    tracing::debug!(command = ?cli.command, env = ?settings.environment, "bookshelf cli");

    match cli.command {
        Command::Serve => bookshelf_app::serve(settings).await,
        Command::Migrate => {
            let app = App::build(settings).await?;
            let applied = migrate(&app).await?;
            println!("applied {} migration(s)", applied);
            for (module, id) in bookshelf_db::applied_migrations(&app.pool).await? {
                println!("  {}/{}", module, id);
            }
            app.pool.close().await;
            Ok(())
        }
        Command::Config => {
            println!("{:#?}", settings);
            Ok(())
        }
    }
}
