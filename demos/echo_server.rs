use futures::StreamExt;
use log::*;
use wsforge::event::Event;
use wsforge::server::start_server;

/// Accepts connections and greets each client with a text frame, then a
/// ping, demonstrating the send-side facade. This crate's receive path is
/// a single-frame reader only (see `wsforge::recv`), so this demo does not
/// attempt to echo anything back to the client.
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut events = start_server(9002).await.expect("failed to bind listener");
    info!("listening on 127.0.0.1:9002");

    while let Some(event) = events.next().await {
        match event {
            Event::NewClient(id, sender) => {
                info!("client {id} connected");
                tokio::spawn(async move {
                    if let Err(err) = sender.send_text("hello from wsforge".to_string()).await {
                        error!("client {id} send failed: {err}");
                        return;
                    }
                    if let Err(err) = sender.send_ping(Vec::new()).await {
                        error!("client {id} ping failed: {err}");
                    }
                });
            }
            Event::Error(id, err) => error!("client {id} handshake error: {err}"),
        }
    }
}
