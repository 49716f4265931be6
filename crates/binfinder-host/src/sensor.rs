//! Handle for the platform location subscription.

use std::future::Future;

use binfinder_core::SensorEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SENSOR_CHANNEL_CAPACITY: usize = 64;

/// Push-driven stream of [`SensorEvent`]s.
///
/// Dropping the handle (or calling [`SensorSubscription::unsubscribe`])
/// aborts the producer task and closes the channel, so no callback can reach
/// a disposed controller.
#[derive(Debug)]
pub struct SensorSubscription {
    events: mpsc::Receiver<SensorEvent>,
    producer: Option<JoinHandle<()>>,
}

impl SensorSubscription {
    /// Spawns `producer` on the current runtime and subscribes to what it sends.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<SensorEvent>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SENSOR_CHANNEL_CAPACITY);
        let handle = tokio::spawn(producer(tx));
        Self {
            events: rx,
            producer: Some(handle),
        }
    }

    /// Wraps a channel whose sender is owned elsewhere (e.g. a platform callback).
    #[must_use]
    pub fn from_receiver(events: mpsc::Receiver<SensorEvent>) -> Self {
        Self {
            events,
            producer: None,
        }
    }

    /// Waits for the next event. `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<SensorEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
            tracing::debug!("location subscription released");
        }
        self.events.close();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.events.is_closed()
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use binfinder_core::Coordinate;

    use super::*;

    fn fix() -> SensorEvent {
        SensorEvent::Fix(Coordinate {
            latitude: 52.1,
            longitude: 21.0,
        })
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let mut sub = SensorSubscription::spawn(|tx| async move {
            tx.send(fix()).await.ok();
            tx.send(SensorEvent::Failure("lost".to_string())).await.ok();
        });
        assert_eq!(sub.next().await, Some(fix()));
        assert_eq!(
            sub.next().await,
            Some(SensorEvent::Failure("lost".to_string()))
        );
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let mut sub = SensorSubscription::spawn(|tx| async move {
            loop {
                if tx.send(fix()).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        assert!(sub.next().await.is_some());
        sub.unsubscribe();
        assert!(!sub.is_active());
        // Drain anything buffered before the close, then the stream ends.
        while sub.next().await.is_some() {}
    }

    #[tokio::test]
    async fn drop_aborts_producer() {
        let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
        let sub = SensorSubscription::spawn(|tx| async move {
            let _keep = tx;
            let _signal = done_tx;
            std::future::pending::<()>().await;
        });
        drop(sub);
        // The aborted task drops its captures, closing the signal channel.
        assert!(done_rx.recv().await.is_none());
    }
}
