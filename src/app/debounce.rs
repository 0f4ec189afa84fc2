//! Debounced staging for the search box

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn a debouncer: values sent to the returned sender come out of the
/// returned receiver only once `window` passes with no newer value.
///
/// When the input side closes, a pending value is flushed.
pub fn spawn_debouncer<T: Send + 'static>(
    window: Duration,
) -> (
    mpsc::UnboundedSender<T>,
    mpsc::UnboundedReceiver<T>,
    JoinHandle<()>,
) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(debounce(input_rx, output_tx, window));
    (input_tx, output_rx, handle)
}

async fn debounce<T>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
    window: Duration,
) {
    while let Some(mut latest) = input.recv().await {
        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => latest = value,
                    None => {
                        let _ = output.send(latest);
                        return;
                    }
                },
                _ = tokio::time::sleep(window) => {
                    if output.send(latest).is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
