use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::time::{interval, Duration};
use wsforge::handshake::connect_async;

async fn handle_connection(addr: &str) {
    match connect_async(addr, None).await {
        Ok(sender) => {
            let mut ticker = interval(Duration::from_secs(5));
            for _ in 0..3 {
                ticker.tick().await;
                let binary_data = Vec::from(generate_random_string());
                if sender.send_binary(binary_data).await.is_err() {
                    eprintln!("failed to send message");
                    return;
                }
            }
            if sender.close().await.is_err() {
                eprintln!("error occurred when closing connection");
            }
        }
        Err(err) => eprintln!("error when performing handshake: {err}"),
    }
}

#[tokio::main]
async fn main() {
    handle_connection("ws://127.0.0.1:9002").await;
}

fn generate_random_string() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(30)
        .map(char::from)
        .collect()
}
