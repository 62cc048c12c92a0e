// src/ws.rs
use futures::{Sink, SinkExt, StreamExt};
use log::{info, warn};
use std::net::SocketAddr;
use tokio::sync::broadcast::{self, error::RecvError};
use warp::Filter;
use warp::path::FullPath;
use warp::ws::Message;

use crate::types::Publication;

/// Serves publications over WebSocket. A client connected at
/// `ws://<bind>/<topic>` receives each payload published on `<topic>` as one
/// frame. There is no replay and no delivery guarantee.
pub async fn start_server(bind: SocketAddr, publications: broadcast::Sender<Publication>) {
    let ws_route = warp::path::full()
        .and(warp::ws())
        .map(move |path: FullPath, ws: warp::ws::Ws| {
            let topic = topic_from_path(path.as_str()).to_string();
            let rx = publications.subscribe();

            ws.on_upgrade(move |socket| handle_connection(socket, topic, rx))
        });

    let routes = ws_route.with(warp::cors().allow_any_origin());

    info!("WebSocket publisher running on ws://{}", bind);
    warp::serve(routes).run(bind).await;
}

fn topic_from_path(path: &str) -> &str {
    path.trim_matches('/')
}

// Text frame when the payload is valid UTF-8, binary otherwise
fn to_message(payload: Vec<u8>) -> Message {
    match String::from_utf8(payload) {
        Ok(text) => Message::text(text),
        Err(e) => Message::binary(e.into_bytes()),
    }
}

/// Sends every publication on `topic` to `sink` until the channel closes or
/// the sink fails. Publications on other topics are skipped.
async fn forward_topic<S>(topic: String, mut rx: broadcast::Receiver<Publication>, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(publication) if publication.topic == topic => {
                if sink.send(to_message(publication.payload)).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Subscriber lagging, dropped {} publication(s)", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn handle_connection(
    ws: warp::ws::WebSocket,
    topic: String,
    rx: broadcast::Receiver<Publication>,
) {
    info!("Subscriber connected to {:?}", topic);
    let (client_ws_tx, mut client_ws_rx) = ws.split();

    // Publications -> Client
    let forward = tokio::spawn(forward_topic(topic, rx, client_ws_tx));

    // Client -> nothing; read until it goes away
    while let Some(Ok(msg)) = client_ws_rx.next().await {
        if msg.is_close() {
            break;
        }
    }

    forward.abort();
    info!("Subscriber disconnected");
}
