//! Campus network heuristic.
//!
//! This cannot tell campus Wi-Fi from any other network. It exists to keep
//! the scan button disabled on devices that report no connection at all, and
//! must not be treated as attestation.

/// What the device reports about its connection and the page it runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Effective connection type such as `4g` or `wifi`, when the platform exposes one.
    pub effective_type: Option<String>,
    /// Host the client was served from.
    pub host: Option<String>,
}

pub trait NetworkProbe: Send + Sync {
    fn on_campus(&self, info: &NetworkInfo) -> bool;
}

#[derive(Debug, Clone)]
pub struct WifiHeuristic {
    dev_hosts: Vec<String>,
    fallback: bool,
}

impl Default for WifiHeuristic {
    fn default() -> Self {
        Self {
            dev_hosts: vec!["127.0.0.1".into(), "localhost".into()],
            fallback: true,
        }
    }
}

impl WifiHeuristic {
    pub fn new(dev_hosts: Vec<String>, fallback: bool) -> Self {
        Self { dev_hosts, fallback }
    }

    /// Result when neither a connection type nor a development host is seen.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

impl NetworkProbe for WifiHeuristic {
    fn on_campus(&self, info: &NetworkInfo) -> bool {
        if info
            .effective_type
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
        {
            return true;
        }
        if let Some(host) = info.host.as_deref() {
            if self.dev_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
                return true;
            }
        }
        self.fallback
    }
}
