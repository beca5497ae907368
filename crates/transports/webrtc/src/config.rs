//! WebRTC engine configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default public STUN server used when none is configured
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Configuration for the peer connections the negotiator builds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRtcConfig {
    /// STUN server URLs handed to the ICE agent
    pub stun_servers: Vec<String>,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

impl WebRtcConfig {
    /// Validate the configuration
    ///
    /// An empty server list is allowed (host-only candidates); empty or
    /// non-STUN/TURN entries are not.
    pub fn validate(&self) -> Result<()> {
        for url in &self.stun_servers {
            if url.is_empty() {
                return Err(Error::Config("empty STUN server URL".to_string()));
            }
            if !url.starts_with("stun:") && !url.starts_with("turn:") {
                return Err(Error::Config(format!(
                    "STUN server URL must start with stun: or turn:, got {url}"
                )));
            }
        }
        Ok(())
    }
}
