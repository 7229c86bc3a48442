pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod parser;
pub mod pdf;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod storage;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
pub use config::Config;
use domain::{ClientId, JobId, JobStatus};
use scheduler::Scheduler;
use services::job_service::SubmitJobRequest;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "minutarr")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "daemon" | "-d" | "--daemon" => run_daemon(config, prometheus_handle).await,

        "scrape" => {
            if args.len() < 3 {
                println!("Usage: minutarr scrape <client_id>");
                return Ok(());
            }
            let id_str = &args[2];
            cmd_scrape(&config, id_str).await
        }

        "codes" => {
            if args.len() < 3 {
                println!("Usage: minutarr codes <subcommand>");
                println!("Subcommands: create, list, revoke");
                return Ok(());
            }
            match args[2].as_str() {
                "create" => {
                    let expires_days = flag_value(&args, "--expires-days")
                        .and_then(|v| v.parse::<i64>().ok());
                    let max_uses = flag_value(&args, "--max-uses")
                        .and_then(|v| v.parse::<i32>().ok())
                        .unwrap_or(1);
                    let notes = flag_value(&args, "--notes");
                    cmd_codes_create(&config, expires_days, max_uses, notes.as_deref()).await
                }
                "list" | "ls" => cmd_codes_list(&config).await,
                "revoke" | "rm" => {
                    if args.len() < 4 {
                        println!("Usage: minutarr codes revoke <code_id>");
                        return Ok(());
                    }
                    cmd_codes_revoke(&config, &args[3]).await
                }
                _ => {
                    println!("Unknown codes subcommand: {}", args[2]);
                    println!("Use: create, list, revoke");
                    Ok(())
                }
            }
        }

        "cleanup" => cmd_cleanup(&config).await,

        "stats" => cmd_stats(&config),

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_help() {
    println!("Minutarr - Meeting Minutes Monitor");
    println!("Tracks agency meeting documents and flags keyword matches");
    println!();
    println!("USAGE:");
    println!("  minutarr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  serve             Run the API server and background scheduler");
    println!("  scrape <id>       Run one scrape job for a client and wait for it");
    println!("  codes <subcmd>    Manage invite codes (create, list, revoke)");
    println!("  cleanup           Run the storage retention sweep now");
    println!("  stats             Show per-category storage statistics");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("CODES SUBCOMMANDS:");
    println!("  codes create [--expires-days N] [--max-uses N] [--notes TEXT]");
    println!("  codes list");
    println!("  codes revoke <code_id>");
    println!();
    println!("EXAMPLES:");
    println!("  minutarr serve                        # Start the server");
    println!("  minutarr scrape 3                     # Scrape client 3 now");
    println!("  minutarr codes create --max-uses 5    # Five-use invite code");
    println!("  minutarr cleanup                      # Apply retention windows");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure sources, storage, retention, etc.");
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    config.validate()?;

    info!(
        "Minutarr v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let api_state = api::create_app_state(shared.clone(), prometheus_handle).await;

    let scheduler = Scheduler::new(
        shared.storage.clone(),
        shared.event_bus.clone(),
        config.scheduler.clone(),
    );

    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting Web API on port {}", port);

        let app = api::router(api_state)?;
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Web API running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Server stopped");

    Ok(())
}

async fn cmd_scrape(config: &Config, id_str: &str) -> anyhow::Result<()> {
    let client_id: i32 = match id_str.parse() {
        Ok(id) => id,
        Err(_) => {
            println!("Invalid client ID: {}", id_str);
            return Ok(());
        }
    };

    let shared = SharedState::new(config.clone()).await?;

    let client = match shared.store.client_repo().get(client_id).await? {
        Some(c) => c,
        None => {
            println!("Client with ID {} not found.", client_id);
            return Ok(());
        }
    };

    println!("Submitting scrape job for: {}", client.name);

    let job = shared
        .job_service
        .submit(
            SubmitJobRequest {
                client_id: ClientId::new(client_id),
                date_from: None,
                date_to: None,
                max_pages: None,
                include_minutes: true,
                include_packages: true,
            },
            1,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Submit failed: {e}"))?;

    println!("Job #{} submitted, waiting...", job.id);

    loop {
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let current = shared
            .job_service
            .get(JobId::new(job.id))
            .await
            .map_err(|e| anyhow::anyhow!("Status poll failed: {e}"))?;

        match current.status {
            JobStatus::Pending | JobStatus::Running => continue,
            JobStatus::Completed => {
                println!();
                println!("✓ Job #{} completed", job.id);
                println!("  Matches: {}", current.result_count);
                if current.result_count > 0 {
                    println!(
                        "  Artifact: {}",
                        shared
                            .storage
                            .path_for(job.id, storage::Category::Artifacts)
                            .join(format!("job_{}.zip", job.id))
                            .display()
                    );
                }
                return Ok(());
            }
            JobStatus::Failed => {
                println!();
                println!("✗ Job #{} failed", job.id);
                if let Some(message) = current.error_message {
                    println!("  Error: {}", message);
                }
                return Ok(());
            }
            JobStatus::Cancelled => {
                println!();
                println!("Job #{} was cancelled", job.id);
                return Ok(());
            }
        }
    }
}

async fn cmd_codes_create(
    config: &Config,
    expires_days: Option<i64>,
    max_uses: i32,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    let shared = SharedState::new(config.clone()).await?;

    let code = shared
        .code_service
        .create_code(1, expires_days, max_uses, notes)
        .await
        .map_err(|e| anyhow::anyhow!("Create failed: {e}"))?;

    println!("✓ Created invite code #{}", code.id);
    println!("  Code:    {}", code.display_code);
    println!("  Uses:    0/{}", code.max_uses);
    match &code.expires_at {
        Some(expires) => println!("  Expires: {}", expires),
        None => println!("  Expires: never"),
    }
    if let Some(notes) = &code.notes {
        println!("  Notes:   {}", notes);
    }

    Ok(())
}

async fn cmd_codes_list(config: &Config) -> anyhow::Result<()> {
    let shared = SharedState::new(config.clone()).await?;

    let (codes, total) = shared
        .code_service
        .list(100, 0)
        .await
        .map_err(|e| anyhow::anyhow!("List failed: {e}"))?;

    if codes.is_empty() {
        println!("No invite codes.");
        println!();
        println!("Create one with: minutarr codes create");
        return Ok(());
    }

    println!("Invite Codes ({} total)", total);
    println!("{:-<70}", "");

    for code in codes {
        let status = match code.status {
            services::CodeStatus::Active => "✓ active",
            services::CodeStatus::Revoked => "⊘ revoked",
            services::CodeStatus::Expired => "⏱ expired",
            services::CodeStatus::Exhausted => "• used up",
        };

        println!("#{} {} [{}]", code.id, code.display_code, status);
        println!("  Uses: {}/{}", code.current_uses, code.max_uses);
        if let Some(expires) = &code.expires_at {
            println!("  Expires: {}", expires);
        }
        if let Some(notes) = &code.notes {
            println!("  Notes: {}", notes);
        }
        println!();
    }

    Ok(())
}

async fn cmd_codes_revoke(config: &Config, id_str: &str) -> anyhow::Result<()> {
    let id: i32 = match id_str.parse() {
        Ok(id) => id,
        Err(_) => {
            println!("Invalid code ID: {}", id_str);
            return Ok(());
        }
    };

    let shared = SharedState::new(config.clone()).await?;

    match shared.code_service.revoke(id).await {
        Ok(()) => println!("✓ Revoked code #{}", id),
        Err(e) => println!("Failed to revoke: {}", e),
    }

    Ok(())
}

async fn cmd_cleanup(config: &Config) -> anyhow::Result<()> {
    let storage = storage::JobStorage::new(&config.storage);

    println!("Running retention sweep...");
    let stats = storage.cleanup_older_than_retention().await?;

    println!();
    println!("{:-<70}", "");
    println!("Cleanup complete!");
    println!("  Files deleted: {}", stats.files_deleted);
    println!("  Freed:         {}", stats.bytes_freed_human());
    if stats.errors > 0 {
        println!("  Errors:        {}", stats.errors);
    }

    Ok(())
}

fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let storage = storage::JobStorage::new(&config.storage);
    let stats = storage.stats();

    println!("Storage Statistics");
    println!("{:-<70}", "");

    for (name, entry) in [
        ("Raw", &stats.raw),
        ("Annotated", &stats.annotated),
        ("Artifacts", &stats.artifacts),
    ] {
        println!(
            "{:<10} {} jobs, {} files, {} bytes",
            name, entry.job_count, entry.file_count, entry.total_bytes
        );
    }

    Ok(())
}
