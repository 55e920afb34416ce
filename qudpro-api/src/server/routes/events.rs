use crate::server::{Feed, ServerError, ServerRouter};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::routing::{RouterExt, TypedPath};
use qudpro_feed::FeedSignal;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const EVENT_BUFFER: usize = 16;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(feed_events)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/events", rejection(ServerError))]
struct EventsPath();

/// Streams every feed signal as one JSON server-sent event until the client
/// disconnects or the server shuts down.
async fn feed_events(
    EventsPath(): EventsPath,
    State(feed): State<Arc<Feed>>,
    State(shutdown): State<CancellationToken>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let signals = forward_signals(feed.subscribe_signals(), shutdown);

    Sse::new(signals.map(|signal| Event::default().json_data(signal)))
        .keep_alive(KeepAlive::default())
}

fn forward_signals(
    mut signals: broadcast::Receiver<FeedSignal>,
    shutdown: CancellationToken,
) -> ReceiverStream<FeedSignal> {
    let (sender, receiver) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                biased;

                received = signals.recv() => match received {
                    Ok(signal) => signal,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream fell behind, skipping signals");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                () = shutdown.cancelled() => break,
            };

            if sender.send(signal).await.is_err() {
                break;
            }
        }
        debug!("Event stream closed");
    });

    ReceiverStream::new(receiver)
}
