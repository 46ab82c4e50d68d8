//! CI Insights - command line entry point.
//!
//! Usage:
//!   ci-insights collect [--days N]
//!   ci-insights watch
//!   ci-insights failures [--limit N]
//!   ci-insights failed-tests [--limit N]
//!   ci-insights patterns
//!   ci-insights import-tests <run_id> <file>
//!   ci-insights serve

use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use chrono::Utc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use ci_insights_lib::api;
use ci_insights_lib::config::Config;
use ci_insights_lib::db::DbPool;
use ci_insights_lib::middleware::RequestLogger;
use ci_insights_lib::models::clamp_limit;
use ci_insights_lib::services::{
    GitHubRunSource, OpenAiAdvisor, Pipeline, import_test_results, start_collection_task,
};

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        std::process::exit(1);
    };

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, CI_INSIGHTS_DATABASE_URL and the GITHUB_* variables must be set");
            std::process::exit(1);
        }
    };

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    };
    if let Err(e) = pool.run_migrations().await {
        fail("Failed to prepare database", e);
    }

    let result = match command.as_str() {
        "collect" => {
            let days = parse_flag(&args, "--days").unwrap_or(config.lookback_days);
            collect(&config, pool, days).await
        }
        "watch" => watch(&config, pool).await,
        "failures" => list_failures(&pool, parse_flag(&args, "--limit")).await,
        "failed-tests" => list_failed_tests(&pool, parse_flag(&args, "--limit")).await,
        "patterns" => list_patterns(&pool).await,
        "import-tests" => match (args.get(2), args.get(3)) {
            (Some(run_id), Some(file)) => import_tests(&pool, run_id, file).await,
            _ => {
                eprintln!("Error: import-tests requires <run_id> <file>");
                print_usage();
                std::process::exit(1);
            }
        },
        "serve" => serve(&config, pool).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        fail("Command failed", e);
    }
}

fn print_usage() {
    println!("CI Insights - CI failure analysis");
    println!();
    println!("Usage: ci-insights <command> [options]");
    println!();
    println!("Commands:");
    println!("  collect [--days N]          Analyze runs from the last N days (default: CI_INSIGHTS_LOOKBACK_DAYS)");
    println!("  watch                       Collect every CI_INSIGHTS_COLLECT_INTERVAL_SECS seconds");
    println!("  failures [--limit N]        Show recent failed runs");
    println!("  failed-tests [--limit N]    Show recent failed tests with their workflow");
    println!("  patterns                    Show error patterns by frequency");
    println!("  import-tests <run_id> <file>  Append test results from a JSON array");
    println!("  serve                       Start the read-only HTTP API");
    println!("  help                        Show this help");
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, e);
    std::process::exit(1);
}

/// Value following `flag`; exits on an unparsable value.
fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let position = args.iter().position(|a| a == flag)?;
    let Some(raw) = args.get(position + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("Error: invalid value for {}: {}", flag, raw);
            std::process::exit(1);
        }
    }
}

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn build_pipeline(config: &Config, pool: DbPool) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let github = config
        .github
        .as_ref()
        .ok_or("GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO must be set to collect runs")?;
    let timeout = Duration::from_secs(config.fetch_timeout_secs);

    info!("Collecting from {}", github.full_name());
    let source = GitHubRunSource::new(github, timeout)?;
    let mut pipeline = Pipeline::new(pool, Arc::new(source))
        .with_max_concurrent_fetches(config.max_concurrent_fetches)
        .with_fetch_timeout(timeout);

    match &config.advisor {
        Some(settings) => {
            pipeline = pipeline.with_advisor(Arc::new(OpenAiAdvisor::new(settings, timeout)?));
        }
        None => info!("OPENAI_API_KEY not set; fix suggestions disabled"),
    }

    Ok(pipeline)
}

async fn collect(config: &Config, pool: DbPool, days: i64) -> CommandResult {
    let pipeline = build_pipeline(config, pool)?;
    let since = Utc::now() - chrono::Duration::days(days);
    let summary = pipeline.run_batch(Some(since)).await?;

    println!();
    println!(
        "Runs: {} seen, {} stored, {} skipped",
        summary.runs_seen, summary.runs_stored, summary.skipped
    );
    println!(
        "Failures analyzed: {}, patterns updated: {}",
        summary.failures_analyzed, summary.patterns_updated
    );
    for insight in &summary.insights {
        println!();
        println!("Run {} ({})", insight.run_id, insight.workflow_name);
        println!("  Reason:   {}", insight.reason);
        println!("  Category: {}", insight.category);
        println!("  Job:      {}", insight.correlated_job);
        match insight.correlated_line {
            Some(line) => println!("  Line {}:  {}", line, insight.correlated_line_text),
            None => println!("  Line:     {}", insight.correlated_line_text),
        }
        for suggestion in &insight.suggestions {
            println!("  - {}", suggestion);
        }
    }
    Ok(())
}

async fn watch(config: &Config, pool: DbPool) -> CommandResult {
    let pipeline = Arc::new(build_pipeline(config, pool)?);
    let handle = start_collection_task(
        pipeline,
        config.collect_interval_secs,
        config.lookback_days,
    );
    handle.await?;
    Ok(())
}

async fn list_failures(pool: &DbPool, limit: Option<u64>) -> CommandResult {
    let runs = pool.recent_failed_runs(clamp_limit(limit)).await?;
    if runs.is_empty() {
        println!("No failed runs found.");
        return Ok(());
    }

    println!(
        "{:<14} {:<24} {:<20} {:<20} {}",
        "RUN", "WORKFLOW", "BRANCH", "STARTED", "REASON"
    );
    println!("{}", "-".repeat(110));
    for run in runs {
        println!(
            "{:<14} {:<24} {:<20} {:<20} {}",
            run.run_id,
            truncate(&run.workflow_name, 22),
            truncate(&run.branch, 18),
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.failure_reason.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn list_failed_tests(pool: &DbPool, limit: Option<u64>) -> CommandResult {
    let tests = pool.failed_tests_with_workflow(clamp_limit(limit)).await?;
    if tests.is_empty() {
        println!("No failed tests found.");
        return Ok(());
    }

    println!(
        "{:<14} {:<24} {:<32} {:<20} {}",
        "RUN", "WORKFLOW", "TEST", "ERROR TYPE", "MESSAGE"
    );
    println!("{}", "-".repeat(120));
    for test in tests {
        println!(
            "{:<14} {:<24} {:<32} {:<20} {}",
            test.run_id,
            truncate(&test.workflow_name, 22),
            truncate(&test.test_name, 30),
            truncate(test.error_type.as_deref().unwrap_or(""), 18),
            test.failure_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn list_patterns(pool: &DbPool) -> CommandResult {
    let patterns = pool.patterns_by_frequency().await?;
    if patterns.is_empty() {
        println!("No error patterns recorded.");
        return Ok(());
    }

    for pattern in patterns {
        println!("{} x{} [{}]", pattern.pattern, pattern.frequency, pattern.error_type);
        println!("  last seen: {}", pattern.last_seen.format("%Y-%m-%d %H:%M"));
        println!("  fix: {}", pattern.suggested_fix);
    }
    Ok(())
}

async fn import_tests(pool: &DbPool, run_id: &str, file: &str) -> CommandResult {
    let json = tokio::fs::read_to_string(file).await?;
    let summary = import_test_results(pool, run_id, &json).await?;

    println!("Imported {} test results for run {}", summary.imported, run_id);
    for rejected in &summary.rejected {
        println!("  rejected {}", rejected);
    }
    Ok(())
}

async fn serve(config: &Config, pool: DbPool) -> CommandResult {
    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        4
    } else {
        num_cpus::get()
    };
    info!(
        "Starting read API at http://{} ({} workers)",
        bind_address, worker_count
    );

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_insight_routes),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let kept: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        value.to_string()
    }
}
