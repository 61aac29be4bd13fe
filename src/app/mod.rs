use crate::api::{ApiCommand, ApiServer, ServiceStatus};
use crate::audio::DeviceBackend;
use crate::config::Config;
use crate::monitor::RoleMonitor;
use crate::playback::{AudioBackend, Notices, PlaybackController};
use crate::policy::ConfigPolicyStore;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub async fn run_service() -> Result<()> {
    info!("Starting Mount Radio service");

    let config = Config::load()?;
    let config_path = Config::config_path()?;
    let port = config.service.port;

    let store = Arc::new(ConfigPolicyStore::new(config, config_path.clone()));
    let notices = Notices::default();
    let controller = PlaybackController::new(Arc::new(DeviceBackend), store, notices);

    let (tx, rx) = mpsc::channel::<ApiCommand>(32);
    let api_server = ApiServer::new(tx, port);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("Mount Radio is ready!");
    info!("Report mount changes from your game hook, e.g.:");
    info!(
        "curl -X POST http://127.0.0.1:{}/condition -H 'content-type: application/json' -d '{{\"flag\":\"mounted\",\"value\":true}}'",
        port
    );

    let dispatcher = Dispatcher::new(controller, Some(config_path.display().to_string()));
    dispatcher
        .run(rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Interrupt received");
        })
        .await;

    Ok(())
}

/// The single event-dispatch context. Owns the role monitor and feeds role
/// edges and user commands to the controller one at a time.
pub struct Dispatcher<B: AudioBackend> {
    controller: PlaybackController<B>,
    monitor: RoleMonitor,
    config_path: Option<String>,
}

impl<B: AudioBackend> Dispatcher<B> {
    pub fn new(controller: PlaybackController<B>, config_path: Option<String>) -> Self {
        Self {
            controller,
            monitor: RoleMonitor::new(),
            config_path,
        }
    }

    pub fn controller(&self) -> &PlaybackController<B> {
        &self.controller
    }

    /// Process commands until the channel closes or `shutdown` resolves, then
    /// stop playback and drop the subscription.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<ApiCommand>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        rx.close();
        self.controller.shutdown().await;
        info!("Mount Radio stopped");
    }

    pub async fn handle(&mut self, command: ApiCommand) {
        match command {
            ApiCommand::Toggle { reply } => {
                self.controller.manual_toggle().await;
                let _ = reply.send(self.controller.state().await);
            }
            ApiCommand::SetVolume { value, reply } => {
                let _ = reply.send(self.controller.set_volume(&value).await);
            }
            ApiCommand::ToggleAutoStart { reply } => {
                let _ = reply.send(self.controller.toggle_auto_start().await);
            }
            ApiCommand::ToggleAutoStop { reply } => {
                let _ = reply.send(self.controller.toggle_auto_stop().await);
            }
            ApiCommand::SetStreamUrl { url, reply } => {
                let _ = reply.send(self.controller.set_stream_url(&url).await);
            }
            ApiCommand::Condition { flag, value, reply } => {
                let edge = self.monitor.observe(&flag, value);
                if let Some(edge) = edge {
                    self.controller.on_role_changed(edge.role, edge.new).await;
                }
                let _ = reply.send(edge);
            }
            ApiCommand::Status { reply } => {
                let status = self.controller.status().await;
                let _ = reply.send(ServiceStatus {
                    state: status.state,
                    policy: status.policy,
                    roles: self.monitor.state(),
                    last_error: status.last_error,
                    playing_since: status.playing_since,
                    config_path: self.config_path.clone(),
                });
            }
        }
    }
}
