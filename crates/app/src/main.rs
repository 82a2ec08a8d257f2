use std::sync::Arc;

use services::{Clock, Collaborators, CourseServices};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod commands;
mod console;
mod curriculum;

use args::{Args, print_usage};
use console::{ConsoleCertificateIssuer, ConsoleNotifier};

fn init_tracing() {
    let directives = std::env::var("COURSE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    init_tracing();

    let curriculum = Arc::new(match &parsed.curriculum {
        Some(path) => curriculum::load(path)?,
        None => curriculum::builtin()?,
    });
    let collaborators = Collaborators::new()
        .with_notifier(Arc::new(ConsoleNotifier))
        .with_certificate_issuer(Arc::new(ConsoleCertificateIssuer));
    let clock = Clock::default_clock();

    let mut services = if parsed.in_memory {
        info!("using in-memory progress store");
        CourseServices::in_memory(clock, curriculum, collaborators).await
    } else {
        info!(db = %parsed.db_url, "opening progress store");
        CourseServices::sqlite(&parsed.db_url, clock, curriculum, collaborators).await?
    };

    commands::run(&mut services, parsed.command).await?;

    if !services.engine_mut().flush().await {
        eprintln!("warning: progress could not be saved");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
