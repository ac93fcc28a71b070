//! Bounded producer/consumer handoff shared by every streaming collaborator.
//!
//! Each external stream is one channel of `Result` values: items until the
//! producer finishes (channel closed) or reports the error that ended the
//! stream. Dropping the receiver is the cancellation signal — the producer's
//! next send fails and its task unwinds instead of leaking.

use tokio::sync::mpsc;

/// Capacity of each stream handoff. Producers suspend once the consumer
/// falls this far behind.
pub const STREAM_BUFFER: usize = 32;

/// Receiving half of a collaborator stream.
pub type ItemStream<T, E> = mpsc::Receiver<Result<T, E>>;

/// Sending half, held by the producer task.
pub type ItemSender<T, E> = mpsc::Sender<Result<T, E>>;

/// Create a stream handoff pair.
pub fn stream_channel<T, E>() -> (ItemSender<T, E>, ItemStream<T, E>) {
    mpsc::channel(STREAM_BUFFER)
}

/// Drain a stream to completion, preserving arrival order.
///
/// The first error the producer reported ends the drain; items gathered
/// before it are discarded with the receiver.
pub async fn drain<T, E>(mut stream: ItemStream<T, E>) -> Result<Vec<T>, E> {
    let mut items = Vec::new();
    while let Some(next) = stream.recv().await {
        items.push(next?);
    }
    Ok(items)
}
