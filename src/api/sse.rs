use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

/// Create an SSE response from a stream of JSON-serializable values.
///
/// Each item is serialized to JSON and sent as one `data` event. The response
/// ends when the stream does.
pub fn sse_response<S, T>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = T> + Send + 'static,
    T: serde::Serialize + Send + 'static,
{
    let event_stream = stream.filter_map(|value| async move {
        format_sse_data(&value).map(|data| Ok(Event::default().data(data)))
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Format a single SSE data line from a serializable value.
pub fn format_sse_data<T: serde::Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(error = %e, "Dropped unserializable SSE event");
            None
        }
    }
}
