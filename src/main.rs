use anyhow::Result;
use clap::Parser;
use log::{error, info};

use inbox_digest::agent::run_once;
use inbox_digest::config::Config;
use inbox_digest::email::RunOutcome;
use inbox_digest::server;

#[derive(Parser)]
#[command(name = "inbox-digest")]
#[command(about = "Summarizes unread Gmail messages with Gemini and forwards the digests back to you")]
#[command(version = "0.1.0")]
struct Args {
    /// Dry-run mode: analyze emails and print digests without forwarding, labelling or reporting
    #[arg(short, long)]
    dry_run: bool,

    /// Daemon mode: run on the schedule defined by SCHEDULER_TIMES
    #[arg(long)]
    daemon: bool,

    /// Serve an HTTP trigger on PORT instead of running once
    #[arg(long)]
    serve: bool,

    /// Maximum number of unread emails to examine (default: DIGEST_MAX_RESULTS)
    #[arg(short = 'l', long)]
    limit: Option<u32>,

    /// Check the configuration without connecting
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load the .env file if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    if args.dry_run {
        info!("🧪 Starting inbox digest in DRY-RUN mode");
    } else {
        info!("🚀 Starting inbox digest");
    }

    let mut config = Config::new()?;

    if let Some(limit) = args.limit {
        config.digest.max_results = limit;
    }

    if args.check_config {
        println!("✅ Configuration valid!");
        println!("📧 Gmail API OAuth2");
        println!("🔑 Credentials: {}", config.gmail.credentials_path);
        println!("💾 Token cache: {}", config.gmail.token_cache_path);
        println!(
            "🤖 Gemini model: {} (API key {})",
            config.gemini.model,
            if config.gemini.api_key.is_some() { "set" } else { "MISSING" }
        );
        println!("📬 Max unread emails per run: {}", config.digest.max_results);
        println!("🈶 Translation domain: {}", config.digest.translation_domain);
        return Ok(());
    }

    if args.serve {
        info!("🌐 Starting in HTTP trigger mode");
        return server::serve(config).await;
    }

    if args.daemon {
        info!("🔄 Starting in daemon mode");
        return run_daemon_mode(config, args.dry_run).await;
    }

    // One-shot mode (default)
    let outcome = run_once(config, args.dry_run).await?;
    log_outcome(&outcome);

    match outcome.error {
        Some(e) => Err(anyhow::anyhow!(e)),
        None => Ok(()),
    }
}

fn log_outcome(outcome: &RunOutcome) {
    if outcome.success {
        info!(
            "✅ Run completed successfully. {} of {} email(s) forwarded.",
            outcome.stats.processed, outcome.stats.total
        );
    } else {
        error!(
            "❌ Run failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}

async fn run_daemon_mode(config: Config, dry_run: bool) -> Result<()> {
    use tokio_cron_scheduler::{Job, JobScheduler};
    use chrono::{Local, Timelike};

    if !config.scheduler.enabled {
        error!("❌ Daemon mode requires SCHEDULER_ENABLED=true");
        anyhow::bail!("Scheduler not enabled in configuration");
    }

    if config.scheduler.schedule_times.is_empty() {
        error!("❌ No schedule defined (SCHEDULER_TIMES)");
        anyhow::bail!("No schedule defined");
    }

    info!("📅 Configured run times: {:?}", config.scheduler.schedule_times);

    let scheduler = JobScheduler::new().await?;

    for schedule_time in &config.scheduler.schedule_times {
        let Some((hour, minute)) = schedule_time.split_once(':') else {
            error!("❌ Invalid schedule format: {}. Use HH:MM", schedule_time);
            continue;
        };

        // Cron format: "0 minute hour * * *" (every day)
        let cron_expr = format!("0 {} {} * * *", minute.trim(), hour.trim());
        info!("📆 Adding scheduled job: {} (cron: {})", schedule_time, cron_expr);

        let config_clone = config.clone();
        let schedule_time_clone = schedule_time.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let config = config_clone.clone();
            let schedule_time = schedule_time_clone.clone();

            Box::pin(async move {
                info!("⏰ Scheduled run at {} - checking unread emails...", schedule_time);

                match run_once(config, dry_run).await {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => error!("❌ Scheduled run at {} failed: {:#}", schedule_time, e),
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;

    info!("✅ Daemon started. Waiting for scheduled times...");
    info!("⏸️  Press Ctrl+C to stop the daemon");

    loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;

        // Periodic heartbeat while the daemon is idle
        let now = Local::now();
        if now.minute() == 0 {
            info!("💓 Daemon alive - {}", now.format("%Y-%m-%d %H:%M"));
        }
    }
}
