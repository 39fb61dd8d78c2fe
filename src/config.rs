use rustls::ServerConfig as RustlsConfig;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub web_socket_config: Option<WebSocketConfig>,
    pub tls_config: Option<Arc<RustlsConfig>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub web_socket_config: WebSocketConfig,
    pub ca_file: Option<String>,
}

/// Default size of the endpoint's shared output buffer, header scratch
/// buffer's payload-length threshold, and UTF-8 encode buffer (spec §3).
pub const OUTPUT_BUFFER_SIZE: usize = 8192;

/// Default blocking-send timeout, in milliseconds (spec §6
/// `BLOCKING_SEND_TIMEOUT`). `None` means "wait forever".
pub const DEFAULT_BLOCKING_SEND_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub max_frame_size: Option<usize>,
    pub max_message_size: Option<usize>,
    /// `BLOCKING_SEND_TIMEOUT` (spec §6). `Some(ms)` bounds blocking sends;
    /// `None` disables the timeout and waits forever.
    pub blocking_send_timeout_ms: Option<u64>,
    /// Initial value of the endpoint's batching-allowed flag (spec §4.11).
    pub batching_allowed: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            max_message_size: Some(64 << 20),
            max_frame_size: Some(16 << 20),
            blocking_send_timeout_ms: Some(DEFAULT_BLOCKING_SEND_TIMEOUT_MS),
            batching_allowed: false,
        }
    }
}
