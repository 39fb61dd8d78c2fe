use crate::config::ServerConfig;
use crate::event::{generate_new_uuid, Event, EventStream};
use crate::handshake::accept_async_with_config;
use crate::stream::SocketFlowStream;
use std::io::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;

/// Spawns a websocket server listening on `port` and returns an
/// [`EventStream`] yielding one [`Event::NewClient`] per accepted and
/// handshaken connection, each carrying a ready-to-use [`crate::sender::Sender`].
pub async fn start_server_with_config(port: u16, config: Option<ServerConfig>) -> Result<EventStream, Error> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let (tx, rx) = mpsc::channel(1000);
    let config = config.unwrap_or_default();
    let web_socket_config = config.web_socket_config;
    let tls_config = config.tls_config;

    tokio::spawn(async move {
        loop {
            let uuid = generate_new_uuid();
            match listener.accept().await {
                Ok((stream, _)) => {
                    let socket_stream = if let Some(tls_config) = tls_config.clone() {
                        let acceptor = TlsAcceptor::from(tls_config);
                        match acceptor.accept(stream).await {
                            Ok(tls_stream) => {
                                SocketFlowStream::Secure(Box::new(tokio_rustls::TlsStream::Server(tls_stream)))
                            }
                            Err(err) => {
                                let _ = tx.send(Event::Error(uuid, err.into())).await;
                                continue;
                            }
                        }
                    } else {
                        SocketFlowStream::Plain(stream)
                    };

                    match accept_async_with_config(socket_stream, web_socket_config.clone()).await {
                        Ok(sender) => {
                            let _ = tx.send(Event::NewClient(uuid, sender)).await;
                        }
                        Err(err) => {
                            let _ = tx.send(Event::Error(uuid, err)).await;
                        }
                    }
                }
                Err(error) => {
                    let _ = tx.send(Event::Error(uuid, error.into())).await;
                }
            }
        }
    });

    Ok(EventStream::new(rx))
}

pub async fn start_server(port: u16) -> Result<EventStream, Error> {
    start_server_with_config(port, None).await
}
