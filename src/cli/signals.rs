//! Ctrl+C handling for the chat loop
//!
//! Installing the handler replaces the default "terminate" behavior, so the
//! chat loop decides what an interrupt means: stop the reply in flight, or
//! leave the session when idle.

use tokio::sync::mpsc;
use tracing::debug;

/// Stream of Ctrl+C presses
pub struct InterruptSignal {
    receiver: mpsc::Receiver<()>,
}

impl InterruptSignal {
    /// Start listening for Ctrl+C. Must be called inside a tokio runtime.
    pub fn listen() -> Self {
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received Ctrl+C");
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Self { receiver: rx }
    }

    /// Wait for the next Ctrl+C. None once the listener is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.receiver.recv().await
    }

    /// Drop presses that arrived while nobody was waiting
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    #[cfg(test)]
    fn from_receiver(receiver: mpsc::Receiver<()>) -> Self {
        Self { receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recv_yields_each_press() {
        let (tx, rx) = mpsc::channel(4);
        let mut signal = InterruptSignal::from_receiver(rx);
        tx.send(()).await.unwrap();
        assert_eq!(signal.recv().await, Some(()));
        drop(tx);
        assert_eq!(signal.recv().await, None);
    }

    #[tokio::test]
    async fn drain_discards_stale_presses() {
        let (tx, rx) = mpsc::channel(4);
        let mut signal = InterruptSignal::from_receiver(rx);
        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        assert_eq!(signal.drain(), 2);
        assert_eq!(signal.drain(), 0);
    }
}
