use crate::blockchain::Ledger;
use crate::config::Config;
use crate::crypto::Identity;
use crate::discovery::{find_neighbors, NeighborSet};
use crate::error::ChainError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
    ShuttingDown,
}

pub struct Node {
    pub config: Config,
    pub owner: Identity,
    pub ledger: Arc<Ledger>,
    pub neighbors: Arc<NeighborSet>,
    pub state: Arc<RwLock<NodeState>>,
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

impl Node {
    pub fn init(config: Config) -> Result<Self, ChainError> {
        config.validate()?;
        init_tracing(&config.log_level);

        let owner = match &config.miner.private_key {
            Some(hex_key) => Identity::from_private_key_hex(hex_key)?,
            None => {
                let identity = Identity::generate()?;
                warn!("no miner.private_key configured; generated a fresh owner identity");
                identity
            }
        };
        info!(
            owner = %owner.address(),
            api_port = config.network.api_port,
            "Starting LedgerChain node"
        );

        let ledger = Arc::new(Ledger::new(owner.address().clone(), config.ledger_config()?));

        Ok(Self {
            config,
            owner,
            ledger,
            neighbors: Arc::new(NeighborSet::new()),
            state: Arc::new(RwLock::new(NodeState::Booting)),
        })
    }

    async fn set_state(&self, state: NodeState) {
        *self.state.write().await = state;
        info!(state = ?state, "node state changed");
    }

    /// Runs the node until Ctrl-C.
    pub async fn start(self: Arc<Self>) -> Result<(), ChainError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let api_task = self.spawn_api(shutdown_rx.clone())?;

        if self.config.discovery.enabled {
            let node = self.clone();
            tokio::spawn(node.discovery_loop(shutdown_rx.clone()));
        }

        if self.config.miner.auto_mining {
            self.ledger
                .start_auto_mining(self.config.auto_mining_interval())?;
        }

        self.set_state(NodeState::Ready).await;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        self.set_state(NodeState::ShuttingDown).await;

        self.ledger.shutdown().await;
        let _ = shutdown_tx.send(true);

        if let Some(task) = api_task {
            if let Err(e) = task.await {
                warn!(error = %e, "API task ended abnormally");
            }
        }

        info!(height = self.ledger.height(), "node stopped");
        Ok(())
    }

    fn api_addr(&self) -> Result<SocketAddr, ChainError> {
        let bind = format!("{}:{}", self.config.network.host, self.config.network.api_port);
        bind.parse()
            .map_err(|e| ChainError::ConfigError(format!("invalid API address {}: {}", bind, e)))
    }

    #[cfg(feature = "api")]
    fn spawn_api(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Option<tokio::task::JoinHandle<()>>, ChainError> {
        let addr = self.api_addr()?;
        let api_node = Arc::new(crate::api::Node::new_shared(
            self.ledger.clone(),
            self.neighbors.clone(),
            Some(self.state.clone()),
        ));

        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            };
            if let Err(e) = crate::api::run_api_server(api_node, addr, signal).await {
                error!(error = %e, "API server failed");
            }
        });
        Ok(Some(handle))
    }

    #[cfg(not(feature = "api"))]
    fn spawn_api(
        &self,
        _shutdown: watch::Receiver<bool>,
    ) -> Result<Option<tokio::task::JoinHandle<()>>, ChainError> {
        warn!("API feature not enabled in this build");
        Ok(None)
    }

    async fn discovery_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let discovery = self.config.discovery.clone();
        let mut ticker = tokio::time::interval(discovery.interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            let found = find_neighbors(
                &self.config.network.host,
                self.config.network.api_port,
                discovery.ip_offsets(),
                discovery.ports(),
                discovery.probe_timeout(),
            )
            .await;
            self.neighbors.replace(found);
        }
        info!("neighbor discovery stopped");
    }
}
