use crate::error::Error;
use crate::ingest::bus::MessageBus;
use crate::ingest::event::CameraEvent;
use crate::ingest::writer::OccupancyWriter;
use anyhow::Result;
use futures_util::stream::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
};
use log::{error, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What to do with a delivery once its event has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove the message from the queue permanently.
    Ack,
    /// Reject without requeue; resubmitting the same payload cannot succeed.
    Drop,
    /// Reject with requeue for a later attempt.
    Requeue,
}

/// Map a processing outcome to a delivery disposition.
pub fn disposition_for(outcome: &Result<(), Error>) -> Disposition {
    match outcome {
        Ok(()) => Disposition::Ack,
        Err(err) if err.is_retryable() => Disposition::Requeue,
        Err(_) => Disposition::Drop,
    }
}

/// Long-lived consumer over the camera event queue.
///
/// One delivery in flight at a time (prefetch 1); multiple consumer processes
/// may run against the same queue for throughput.
pub struct EventConsumer {
    bus: MessageBus,
    writer: OccupancyWriter,
}

impl EventConsumer {
    /// Create a new event consumer
    pub fn new(bus: MessageBus, writer: OccupancyWriter) -> Self {
        Self { bus, writer }
    }

    /// Consume deliveries until the token is cancelled.
    ///
    /// On cancellation the loop exits without acking or nacking anything
    /// still in handling; the broker's redelivery policy covers it.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let channel = self.bus.open_channel().await?;

        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| Error::Service(format!("Failed to set QoS: {}", e)))?;

        channel
            .queue_declare(
                self.bus.queue(),
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                Error::Service(format!("Failed to declare queue {}: {}", self.bus.queue(), e))
            })?;

        let mut consumer = channel
            .basic_consume(
                self.bus.queue(),
                "occupancy-consumer",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::Service(format!("Failed to start consuming: {}", e)))?;

        info!("Consuming camera events from queue {}", self.bus.queue());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Consumer shutting down; in-flight deliveries are left to broker redelivery");
                    return Ok(());
                }
                next = consumer.next() => {
                    let Some(delivery) = next else {
                        return Err(Error::Service("deliveries channel closed".to_string()).into());
                    };
                    match delivery {
                        Ok(delivery) => {
                            let outcome = self.process(&delivery.data).await;
                            self.settle(delivery, outcome).await;
                        }
                        Err(e) => {
                            error!("Error receiving delivery: {}", e);
                            // Short delay to avoid a tight loop on errors
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
    }

    /// Handler entry point: decode, validate and store one raw payload.
    pub async fn process(&self, payload: &[u8]) -> Result<(), Error> {
        let event = CameraEvent::decode(payload)?;
        let record = self.writer.save_event(&event).await?;
        info!(
            "Stored occupancy for auditorium {} from camera {}: {} persons at {}",
            record.auditorium_id,
            event.camera_id,
            record.person_count,
            record.timestamp.to_rfc3339()
        );
        Ok(())
    }

    /// Convert the outcome into an acknowledge-or-reject decision.
    ///
    /// Ack/nack failures mean the connection is gone; they are logged and not
    /// retried, the broker redelivers on disconnect.
    async fn settle(&self, delivery: Delivery, outcome: Result<(), Error>) {
        match disposition_for(&outcome) {
            Disposition::Ack => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!("Failed to ack delivery: {}", e);
                }
            }
            Disposition::Drop => {
                if let Err(err) = &outcome {
                    warn!("Dropping delivery permanently: {}", err);
                }
                if let Err(e) = delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
                {
                    error!("Failed to nack delivery: {}", e);
                }
            }
            Disposition::Requeue => {
                if let Err(err) = &outcome {
                    warn!("Requeueing delivery after retryable failure: {}", err);
                }
                if let Err(e) = delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
                {
                    error!("Failed to nack delivery: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_acked() {
        assert_eq!(disposition_for(&Ok(())), Disposition::Ack);
    }

    #[test]
    fn permanent_rejections_are_dropped() {
        for err in [
            Error::Validation("person_count is missing".into()),
            Error::CameraUnknown("AA:BB:CC:DD:EE:FF".into()),
            Error::CameraUnattached("AA:BB:CC:DD:EE:FF".into()),
        ] {
            assert_eq!(disposition_for(&Err(err)), Disposition::Drop);
        }
    }

    #[test]
    fn transient_failures_are_requeued() {
        for err in [
            Error::Database("connection reset".into()),
            Error::Service("channel closed".into()),
        ] {
            assert_eq!(disposition_for(&Err(err)), Disposition::Requeue);
        }
    }
}
