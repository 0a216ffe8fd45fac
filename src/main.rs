use anyhow::{Context, Result};
use clap::Parser;
use pathfork::mailer::{LogMailer, Mailer, SendGridMailerBuilder};
use pathfork::{App, Config, Database, Settings};
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        // Configuration problems are the user's to fix; anything else is ours.
        let exit_code = if is_config_error(&e) { 1 } else { 2 };
        tracing::error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathfork=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn is_config_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<pathfork::config::ConfigError>().is_some()
}

fn run(config: &Config) -> Result<()> {
    let settings = config.settings()?;
    if config.dev {
        tracing::warn!("Running with generated secrets; sessions will not survive a restart");
    }

    let db = Database::open(&settings.database_path).context("Failed to open database")?;
    tracing::info!("Using database {}", settings.database_path.display());

    // The blocking mail client must be built outside the async runtime.
    let mailer = build_mailer(&settings)?;
    let app = App::new(settings, db, mailer);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(pathfork::server::serve(app))
}

fn build_mailer(settings: &Settings) -> Result<Box<dyn Mailer>> {
    match &settings.sendgrid_api_key {
        Some(key) => {
            let mailer = SendGridMailerBuilder::new(key.as_str())
                .build()
                .context("Failed to build SendGrid client")?;
            Ok(Box::new(mailer))
        }
        None => {
            tracing::warn!("No SendGrid key configured; outgoing mail is only logged");
            Ok(Box::new(LogMailer))
        }
    }
}
