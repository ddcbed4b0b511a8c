use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ts_sweep::{
    AgentConfig, ControllerKind, JsonLinesController, RandomSearchController, SweepAdapter,
    SweepController,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for the stdio controller protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::from_env()?;
    info!(
        "Tuning sweep agent: binary {}, space {}, controller {:?}, trial timeout {:?}",
        config.binary.display(),
        config.variant.name(),
        config.controller,
        config.trial_timeout
    );

    let adapter = SweepAdapter::from_config(&config)?;

    match config.controller {
        ControllerKind::Stdio => {
            let mut controller = JsonLinesController::stdio();
            if !drive(&adapter, &mut controller).await {
                // A pending stdin read would keep the runtime from shutting down
                std::process::exit(0);
            }
        }
        ControllerKind::Random => {
            let mut controller = match config.seed {
                Some(seed) => RandomSearchController::seeded(config.max_trials, seed),
                None => RandomSearchController::new(config.max_trials),
            };
            drive(&adapter, &mut controller).await;
            match &controller.status().best_trial {
                Some(best) => info!(
                    "Best {} = {} at trial {} with {}",
                    adapter.space().objective.metric_name,
                    best.objective,
                    best.trial_number,
                    serde_json::to_string(&best.assignment)?
                ),
                None => warn!("No trial reported the objective metric"),
            }
        }
    }

    // Trial failures are reported as empty results, never as an exit code
    Ok(())
}

/// Run the sweep until it finishes or the agent is interrupted. Returns false
/// when interrupted; dropping the in-flight trial kills its subprocess.
async fn drive<C: SweepController>(adapter: &SweepAdapter, controller: &mut C) -> bool {
    tokio::select! {
        summary = adapter.run(controller) => {
            if let Some(e) = summary.controller_error {
                warn!("Sweep ended early after {} trials: {}", summary.trials, e);
            }
            true
        }
        signal = shutdown_signal() => {
            warn!("Received {}; abandoning in-flight trial", signal);
            false
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM from a scheduler or supervisor.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                return tokio::select! {
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                    _ = terminate.recv() => "SIGTERM",
                };
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending().await
        }
    }
}
