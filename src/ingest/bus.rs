use crate::config::MessageBrokerConfig;
use crate::error::Error;
use anyhow::Result;
use deadpool_lapin::{Config, Manager, Pool};
use lapin::{Channel, ConnectionProperties};
use log::{info, warn};
use std::time::Duration;

/// Owned handle over the RabbitMQ connection pool.
///
/// Constructed once at startup and passed into whatever needs a channel;
/// lifecycle ends when the handle is dropped, there is no process-global
/// connection state.
pub struct MessageBus {
    pool: Pool,
    config: MessageBrokerConfig,
}

impl MessageBus {
    /// Create a new message bus backed by a connection pool
    pub async fn new(config: MessageBrokerConfig) -> Result<Self> {
        let pool_config = Config {
            url: Some(config.uri.clone()),
            pool: Some(deadpool_lapin::PoolConfig {
                max_size: config.pool_size as usize,
                queue_mode: deadpool::managed::QueueMode::Fifo,
                timeouts: deadpool::managed::Timeouts {
                    wait: Some(Duration::from_millis(config.timeout_ms)),
                    create: Some(Duration::from_millis(config.timeout_ms)),
                    recycle: Some(Duration::from_millis(config.timeout_ms)),
                },
            }),
            connection_properties: ConnectionProperties::default(),
        };
        let pool = pool_config.create_pool(Some(deadpool_lapin::Runtime::Tokio1))?;

        let bus = Self { pool, config };

        // Fail fast on a bad URI rather than at the first delivery.
        let _ = bus.get_connection().await?;
        info!("Connected to RabbitMQ");

        Ok(bus)
    }

    /// Name of the durable queue the camera events arrive on
    pub fn queue(&self) -> &str {
        &self.config.queue
    }

    /// Get a connection from the pool with retry
    async fn get_connection(&self) -> Result<deadpool::managed::Object<Manager>> {
        let mut attempts = 0;
        let max_attempts = self.config.retry_attempts;

        loop {
            attempts += 1;
            match self.pool.get().await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    if attempts >= max_attempts {
                        return Err(Error::Service(format!(
                            "Failed to get RabbitMQ connection after {} attempts: {}",
                            attempts, err
                        ))
                        .into());
                    }

                    warn!(
                        "Failed to get RabbitMQ connection (attempt {}/{}): {}",
                        attempts, max_attempts, err
                    );

                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
            }
        }
    }

    /// Open a fresh channel on a pooled connection
    pub async fn open_channel(&self) -> Result<Channel> {
        let conn = self.get_connection().await?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| Error::Service(format!("Failed to create RabbitMQ channel: {}", e)))?;

        Ok(channel)
    }
}
