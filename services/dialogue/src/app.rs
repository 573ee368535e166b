//! # Application Bootstrap
//!
//! Builds the service from `frame.json` and runs it: one broker and
//! `workers` NLU workers registered under the configured service name,
//! all stopped by the same [`Shutdown`].

use crate::handler::NluHandler;
use anyhow::{Context, Result};
use dialogue_config::FrameConfig;
use majordomo::{shutdown, Broker, Shutdown, Worker};
use nlu::{ComponentRegistry, Pipeline};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Configured dialogue service, ready to run
#[derive(Debug)]
pub struct App {
    config: FrameConfig,
    pipeline: Arc<Pipeline>,
}

/// Load the configuration at `path` and build the NLU pipeline
pub fn create_app(path: impl AsRef<Path>) -> Result<App> {
    let path = path.as_ref();
    let config = FrameConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    App::new(config)
}

impl App {
    pub fn new(config: FrameConfig) -> Result<Self> {
        let registry = ComponentRegistry::with_builtins();
        let pipeline = Pipeline::build(&registry, config.pipeline.as_slice())
            .context("Failed to build NLU pipeline")?;
        info!(
            service = %config.service,
            components = ?pipeline.component_names(),
            "Built NLU pipeline"
        );
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Replace the configured port
    pub fn with_port(mut self, port: impl Into<String>) -> Result<Self> {
        self.config.runtime.port = port.into();
        self.config
            .runtime
            .port_number()
            .context("Invalid port override")?;
        Ok(self)
    }

    /// Turn on message dumps regardless of the file setting
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.runtime.verbose |= verbose;
        self
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Bind `bind_address:port` and serve until `shutdown` fires
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let broker = Broker::bind(&self.config.runtime).await.with_context(|| {
            format!(
                "Failed to bind {}:{}",
                self.config.runtime.bind_address, self.config.runtime.port
            )
        })?;
        self.serve(broker, shutdown).await
    }

    /// Run until `stop` resolves, then shut down gracefully
    ///
    /// A `stop` future that fails, e.g. a signal handler that could not be
    /// installed, is fatal and is returned as an error.
    pub async fn run_until<F>(self, stop: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let (trigger, signal) = shutdown::channel();
        let mut app_task = tokio::spawn(self.run(signal));

        tokio::select! {
            finished = &mut app_task => return finished.context("Application task panicked")?,
            stopped = stop => {
                stopped.context("Failed to listen for shutdown signal")?;
                info!("Received shutdown signal");
            }
        }

        trigger.trigger();
        app_task.await.context("Application task panicked")?
    }

    /// Serve on an already bound listener
    pub async fn run_on(self, listener: TcpListener, shutdown: Shutdown) -> Result<()> {
        let broker = Broker::from_listener(&self.config.runtime, listener);
        self.serve(broker, shutdown).await
    }

    async fn serve(self, broker: Broker, shutdown: Shutdown) -> Result<()> {
        let endpoint = worker_endpoint(broker.local_addr()?).to_string();
        info!(
            endpoint = %endpoint,
            service = %self.config.service,
            workers = self.config.workers,
            "Dialogue service listening"
        );

        let broker_task = tokio::spawn(broker.run(shutdown.clone()));

        let mut workers = JoinSet::new();
        for _ in 0..self.config.workers {
            let handler = NluHandler::new(Arc::clone(&self.pipeline));
            let worker = Worker::new(&endpoint, &self.config.service, handler, &self.config.runtime);
            debug!(service = worker.service(), "Starting NLU worker");
            workers.spawn(worker.run(shutdown.clone()));
        }

        // Dropping the JoinSet on an early broker failure aborts the workers
        broker_task
            .await
            .context("Broker task panicked")?
            .context("Broker failed")?;

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined.context("Worker task panicked")? {
                error!(error = %e, "Worker stopped with error");
            }
        }

        info!("Dialogue service stopped");
        Ok(())
    }
}

/// Address workers use to reach the in-process broker
fn worker_endpoint(local: SocketAddr) -> SocketAddr {
    if local.ip().is_unspecified() {
        SocketAddr::from((Ipv4Addr::LOCALHOST, local.port()))
    } else {
        local
    }
}
