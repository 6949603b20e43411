//! Adapters from tokio channels to `futures` streams

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Turn a broadcast receiver into a stream that ends when every sender is
/// gone.
///
/// A receiver that falls behind loses the oldest messages; the gap is logged
/// and the stream keeps going with the next available message.
pub fn broadcast_stream<T>(receiver: broadcast::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    BroadcastStream::new(receiver)
        .filter_map(|item| {
            future::ready(match item {
                Ok(item) => Some(item),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Broadcast subscriber lagged; messages dropped");
                    None
                }
            })
        })
        .boxed()
}
