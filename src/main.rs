use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lead_automation::adapters::{CrunchbaseCollector, OpenAiEnricher, SqliteStore};
use lead_automation::api::{self, ApiState};
use lead_automation::utils::logger;
use lead_automation::{
    AppConfig, CliArgs, CycleRunner, ResourceSession, RunStats, Scheduler, SchedulerExit, Secrets,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let config = match Secrets::from_env().and_then(|secrets| AppConfig::load(&args, secrets)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if args.json_logs || config.file.logging.json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_logger(args.verbose, config.log_file().as_deref())
            .context("initialising logger")?;
    }
    tracing::info!("Starting lead-automation");
    tracing::debug!(?config, "loaded configuration");

    let store = Arc::new(
        SqliteStore::open(&config.db_path())
            .await
            .context("opening lead database")?,
    );
    let stats = Arc::new(RunStats::new());

    let mut runner = CycleRunner::new(
        config.categories(),
        Arc::new(CrunchbaseCollector::new(config.collector_config())),
        Arc::new(OpenAiEnricher::new(config.enricher_config())),
        store.clone(),
        ResourceSession::new(config.session_config()),
        stats.clone(),
    )
    .with_enrich_timeout(config.enrich_timeout());

    if args.once {
        let result = runner.run_cycle(&CancellationToken::new()).await;
        store.close().await;
        let outcome = result.context("automation cycle failed")?;
        println!("✅ Cycle finished: {:?}", outcome.report());
        return Ok(());
    }

    let token = CancellationToken::new();
    let mut scheduler = Scheduler::new(runner, config.interval());
    let scheduler_task = tokio::spawn({
        let token = token.clone();
        async move {
            let result = scheduler.run(token.clone()).await;
            if result.is_err() {
                // Take the API down with us.
                token.cancel();
            }
            result
        }
    });

    let addr = config.file.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding monitoring API to {}", addr))?;
    tracing::info!(%addr, "monitoring API listening");

    let app = api::router(ApiState {
        stats,
        store: store.clone(),
        interval_hours: config.interval().as_secs_f64() / 3600.0,
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(token.clone()))
        .await
        .context("monitoring API server")?;

    token.cancel();
    let exit = scheduler_task.await.context("scheduler task panicked")?;
    store.close().await;

    match exit {
        Ok(SchedulerExit::Cancelled { cycles_run }) => {
            tracing::info!(cycles_run, "shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, severity = ?e.severity(), "scheduler stopped on fatal error");
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("shutdown requested"),
        _ = terminate => tracing::info!("terminate signal received"),
        _ = token.cancelled() => {}
    }
}
