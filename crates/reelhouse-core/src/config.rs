// ── Runtime client configuration ──
//
// Describes *what* to connect to and how. Loading it from disk or the
// environment is `reelhouse-config`'s job; this is the in-memory shape.

use std::time::Duration;

use reelhouse_api::realtime::{DEFAULT_HEARTBEAT, DEFAULT_RECONNECT_DELAY};
use reelhouse_api::session::LOGIN_ROUTE;
use reelhouse_api::{RealtimeConfig, SessionExpiryPolicy, TlsMode, TransportConfig};
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site root. REST calls go to `<website_url>/api/`.
    pub website_url: Url,
    pub timeout: Duration,
    pub tls: TlsMode,
    pub session_expiry: SessionExpiryPolicy,
    /// Where the navigator is sent when the session expires.
    pub login_route: String,
    pub realtime: RealtimeSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeSettings {
    pub reconnect_delay: Duration,
    pub heartbeat: Duration,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

impl ClientConfig {
    pub fn new(website_url: Url) -> Self {
        let transport = TransportConfig::default();
        Self {
            website_url,
            timeout: transport.timeout,
            tls: transport.tls,
            session_expiry: SessionExpiryPolicy::default(),
            login_route: LOGIN_ROUTE.to_owned(),
            realtime: RealtimeSettings::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }

    pub fn realtime_config(&self) -> Result<RealtimeConfig, reelhouse_api::Error> {
        Ok(RealtimeConfig::for_website(&self.website_url)?
            .with_reconnect_delay(self.realtime.reconnect_delay)
            .with_heartbeat(self.realtime.heartbeat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new(Url::parse("https://stream.example.com").unwrap());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.session_expiry, SessionExpiryPolicy::UnauthorizedOrServerFault);
        assert_eq!(config.realtime.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.realtime.heartbeat, Duration::from_secs(10));
    }

    #[test]
    fn realtime_settings_flow_into_channel_config() {
        let mut config = ClientConfig::new(Url::parse("https://stream.example.com").unwrap());
        config.realtime.reconnect_delay = Duration::from_secs(1);
        let realtime = config.realtime_config().unwrap();
        assert_eq!(realtime.url.as_str(), "wss://stream.example.com/api/ws/websocket");
        assert_eq!(realtime.reconnect_delay, Duration::from_secs(1));
    }
}
