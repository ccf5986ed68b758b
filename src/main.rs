use clap::Parser;
use color_eyre::Result;
use std::path::Path;
use tasks_db::{Clock, Config, Database, Profile, cli::{self, Cli, Commands}};

/// Log to stderr; `RUST_LOG` wins over the configured level
fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match cli.config {
        Some(ref path) => {
            let mut config = Config::load_from_path(Path::new(path))?;
            config.fill_profile_defaults(profile);
            config
        }
        None => Config::load_with_profile(profile)?,
    };
    init_logging(&config.log_level);

    let clock = match cli.now {
        Some(millis) => Clock::fixed(millis),
        None => Clock::system(),
    };

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?
    )?;

    match cli.command {
        None => {
            let filter = cli::resolve_filter(&db, &config, None, false)?;
            cli::handle_list(&filter, &db, &clock)?;
        }
        Some(Commands::List { tag, recent }) => {
            let filter = cli::resolve_filter(&db, &config, tag.as_deref(), recent)?;
            cli::handle_list(&filter, &db, &clock)?;
        }
        Some(Commands::Add { title, tag }) => {
            let filter = cli::resolve_filter(&db, &config, tag.as_deref(), false)?;
            cli::handle_add(&filter, title, &db, &clock)?;
        }
        Some(Commands::Tag { action }) => {
            cli::handle_tag(action, &db)?;
        }
        Some(Commands::Time { millis }) => {
            cli::handle_time(millis, &clock);
        }
    }

    Ok(())
}
