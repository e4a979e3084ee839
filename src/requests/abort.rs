// Abort signal for in-flight step requests

use std::future::Future;
use tokio::sync::watch;
use tracing::debug;

/// Owner side of an abort signal, held by whoever can tear a step down
#[derive(Debug)]
pub struct AbortHandle {
    sender: watch::Sender<bool>,
}

/// Observer side, handed to the request being run
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (sender, receiver) = watch::channel(false);
    (AbortHandle { sender }, AbortSignal { receiver })
}

impl AbortHandle {
    pub fn abort(&self) {
        // send_replace never fails, even with every receiver gone
        self.sender.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once aborted. If the handle is dropped without aborting,
    /// never completes.
    pub async fn aborted(&mut self) {
        if self.receiver.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run `future` unless the signal fires first. `None` means aborted; the
/// future is dropped and its output never observed.
pub async fn run_abortable<F: Future>(mut signal: AbortSignal, future: F) -> Option<F::Output> {
    if signal.is_aborted() {
        debug!("Request aborted before it started");
        return None;
    }

    tokio::select! {
        biased;
        _ = signal.aborted() => {
            debug!("Request aborted while in flight");
            None
        }
        output = future => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_aborted() {
        let (_handle, signal) = abort_pair();
        let output = run_abortable(signal, async { 42 }).await;
        assert_eq!(output, Some(42));
    }

    #[tokio::test]
    async fn test_abort_before_start() {
        let (handle, signal) = abort_pair();
        handle.abort();
        assert!(handle.is_aborted());
        let output = run_abortable(signal, async { 42 }).await;
        assert_eq!(output, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_while_in_flight() {
        let (handle, signal) = abort_pair();

        let request = tokio::spawn(run_abortable(signal, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "provisioned"
        }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();

        assert_eq!(request.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_abort() {
        let (handle, signal) = abort_pair();
        let extra = handle.signal();
        drop(handle);

        assert!(!extra.is_aborted());
        let output = run_abortable(signal, async { "done" }).await;
        assert_eq!(output, Some("done"));
    }
}
