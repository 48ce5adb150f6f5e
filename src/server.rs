//! HTTP trigger: each request to `/` runs one digest pass.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use tokio::sync::Mutex;

use crate::agent::run_once;
use crate::config::Config;
use crate::email::{DigestProcessor, RunOutcome, RunStats};

/// One digest pass started by the HTTP trigger
#[async_trait]
pub trait RunTrigger: Send + Sync {
    async fn trigger(&self) -> Result<RunOutcome>;
}

/// Production trigger: connects to Gmail and Gemini on every request
pub struct AgentTrigger {
    config: Config,
}

impl AgentTrigger {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RunTrigger for AgentTrigger {
    async fn trigger(&self) -> Result<RunOutcome> {
        run_once(self.config.clone(), false).await
    }
}

#[async_trait]
impl RunTrigger for DigestProcessor {
    async fn trigger(&self) -> Result<RunOutcome> {
        Ok(self.run().await)
    }
}

#[derive(Clone)]
struct TriggerState {
    runner: Arc<dyn RunTrigger>,
    /// Overlapping triggers wait for the running pass
    run_lock: Arc<Mutex<()>>,
}

pub fn router(runner: Arc<dyn RunTrigger>) -> Router {
    let state = TriggerState {
        runner,
        run_lock: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/", get(trigger_run).post(trigger_run))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<()> {
    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Unable to bind HTTP trigger on port {}", port))?;

    info!("🌐 HTTP trigger listening on port {}", port);
    axum::serve(listener, router(Arc::new(AgentTrigger::new(config))))
        .await
        .context("HTTP trigger server failed")?;

    Ok(())
}

async fn trigger_run(State(state): State<TriggerState>) -> (StatusCode, Json<RunOutcome>) {
    let _guard = state.run_lock.lock().await;
    info!("Received trigger request. Starting agent...");

    let outcome = match state.runner.trigger().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("❌ Error running agent: {:#}", e);
            RunOutcome::new(RunStats::new(), Some(format!("{:#}", e)))
        }
    };

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(outcome))
}

async fn health() -> &'static str {
    "ok"
}
