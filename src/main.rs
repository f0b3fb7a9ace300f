use senda::config::Config;
use senda::{AppError, RouteDraftService};
use std::env;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        "\
Usage: senda <TRACK_FILE> [OPTIONS]

Reads a GPX or KML track and prints a route draft as JSON on stdout.

Options:
  --title=TEXT          Use TEXT as the route title instead of the file's
  --compact             Print single-line JSON
  --help                Show this help message

Environment:
  AI_PROVIDER, GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY,
  GOOGLE_MAPS_API_KEY, METADATA_LANGUAGE, AI_TIMEOUT_SECS"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only the draft
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "senda=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help") {
        print_help();
        return Ok(());
    }

    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        print_help();
        return Err(AppError::InvalidRequest("missing track file".to_string()).into());
    };
    let title = args.iter().find_map(|a| a.strip_prefix("--title="));
    let compact = args.iter().any(|a| a == "--compact");

    let config = Config::from_env().map_err(AppError::Config)?;
    let service = RouteDraftService::from_config(&config);

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Cannot read {}: {}", path, e)))?;
    let raw = String::from_utf8_lossy(&bytes);
    let filename = Path::new(path).file_name().and_then(|n| n.to_str());

    let draft = service.create_draft_titled(&raw, filename, title).await?;

    for note in &draft.diagnostics {
        eprintln!("- {}", note);
    }

    let json = if compact {
        serde_json::to_string(&draft)?
    } else {
        serde_json::to_string_pretty(&draft)?
    };
    println!("{}", json);

    Ok(())
}
