use financial_query_pipeline::{app::build_pipeline, config::AppConfig, report::format_report};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: query <question...>");
        std::process::exit(2);
    }

    let config = AppConfig::from_env()?;
    let pipeline = build_pipeline(&config).await?;

    info!(question = %question, "Running question");

    let report = pipeline.process(question.trim()).await;
    println!("{}", format_report(&report));

    if !report.success {
        std::process::exit(1);
    }

    Ok(())
}
