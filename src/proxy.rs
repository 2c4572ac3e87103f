//! System proxy discovery.
//!
//! Only local configuration is inspected: environment variables first, then
//! (on Windows) the per-user Internet Settings registry key.

use std::fmt;
use std::sync::Arc;

/// Environment variables consulted, in priority order.
pub const PROXY_ENV_VARS: [&str; 8] = [
    "http_proxy",
    "https_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "all_proxy",
    "ALL_PROXY",
    "socks_proxy",
    "SOCKS_PROXY",
];

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Finds the proxy URL configured for the current user, if any.
#[derive(Clone)]
pub struct ProxyResolver {
    lookup: EnvLookup,
    consult_registry: bool,
}

impl fmt::Debug for ProxyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResolver")
            .field("consult_registry", &self.consult_registry)
            .finish_non_exhaustive()
    }
}

impl Default for ProxyResolver {
    fn default() -> Self {
        Self::system()
    }
}

impl ProxyResolver {
    /// Resolver reading the process environment (and the registry on Windows).
    #[must_use]
    pub fn system() -> Self {
        Self {
            lookup: Arc::new(|name| std::env::var(name).ok()),
            consult_registry: cfg!(target_os = "windows"),
        }
    }

    /// Resolver backed by a custom variable lookup. The registry is skipped.
    #[must_use]
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
            consult_registry: false,
        }
    }

    /// Resolver that never finds a proxy.
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_lookup(|_| None)
    }

    /// Returns the first configured proxy, or `None`.
    #[must_use]
    pub fn detect(&self) -> Option<String> {
        let from_env = PROXY_ENV_VARS.iter().find_map(|name| {
            (self.lookup)(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });

        if let Some(proxy) = from_env {
            log::debug!("Using proxy from environment: {proxy}");
            return Some(proxy);
        }

        if self.consult_registry {
            return registry_proxy();
        }
        None
    }
}

/// Turns a registry `ProxyServer` value into a proxy URL.
///
/// Accepts both the plain `host:port` form and the per-protocol
/// `http=host:port;https=host:port` form, preferring the https entry.
#[must_use]
pub fn normalize_proxy_server(server: &str) -> Option<String> {
    let server = server.trim();
    if server.is_empty() {
        return None;
    }

    let chosen = if server.contains('=') {
        let entries: Vec<(&str, &str)> = server
            .split(';')
            .filter_map(|entry| entry.split_once('='))
            .map(|(scheme, addr)| (scheme.trim(), addr.trim()))
            .filter(|(_, addr)| !addr.is_empty())
            .collect();
        ["https", "http"]
            .iter()
            .find_map(|wanted| {
                entries
                    .iter()
                    .find(|(scheme, _)| scheme.eq_ignore_ascii_case(wanted))
                    .map(|(_, addr)| *addr)
            })
            .or_else(|| entries.first().map(|(_, addr)| *addr))?
    } else {
        server
    };

    if chosen.contains("://") {
        Some(chosen.to_string())
    } else {
        Some(format!("http://{chosen}"))
    }
}

#[cfg(target_os = "windows")]
fn registry_proxy() -> Option<String> {
    use winreg::RegKey;
    use winreg::enums::HKEY_CURRENT_USER;

    let key = RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey(r"Software\Microsoft\Windows\CurrentVersion\Internet Settings")
        .ok()?;
    let enabled: u32 = key.get_value("ProxyEnable").ok()?;
    if enabled == 0 {
        return None;
    }
    let server: String = key.get_value("ProxyServer").ok()?;
    let proxy = normalize_proxy_server(&server);
    if let Some(ref proxy) = proxy {
        log::debug!("Using proxy from registry: {proxy}");
    }
    proxy
}

#[cfg(not(target_os = "windows"))]
const fn registry_proxy() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolver(vars: &[(&str, &str)]) -> ProxyResolver {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ProxyResolver::with_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn https_proxy_alone_is_found() {
        let r = resolver(&[("https_proxy", "http://10.0.0.1:8080")]);
        assert_eq!(r.detect().as_deref(), Some("http://10.0.0.1:8080"));
    }

    #[test]
    fn http_proxy_takes_priority() {
        let r = resolver(&[
            ("HTTPS_PROXY", "http://b:2"),
            ("http_proxy", "http://a:1"),
        ]);
        assert_eq!(r.detect().as_deref(), Some("http://a:1"));
    }

    #[test]
    fn empty_values_are_skipped() {
        let r = resolver(&[("http_proxy", "  "), ("ALL_PROXY", "socks5://127.0.0.1:1080")]);
        assert_eq!(r.detect().as_deref(), Some("socks5://127.0.0.1:1080"));
    }

    #[test]
    fn socks_proxy_is_last_resort() {
        let r = resolver(&[("SOCKS_PROXY", "socks5://s:9")]);
        assert_eq!(r.detect().as_deref(), Some("socks5://s:9"));
    }

    #[test]
    fn nothing_configured() {
        assert_eq!(resolver(&[]).detect(), None);
        assert_eq!(ProxyResolver::disabled().detect(), None);
    }

    #[test]
    fn normalize_adds_scheme() {
        assert_eq!(
            normalize_proxy_server("127.0.0.1:8888").as_deref(),
            Some("http://127.0.0.1:8888")
        );
        assert_eq!(
            normalize_proxy_server("https://proxy:443").as_deref(),
            Some("https://proxy:443")
        );
        assert_eq!(normalize_proxy_server("  "), None);
    }

    #[test]
    fn normalize_per_protocol_entries() {
        assert_eq!(
            normalize_proxy_server("http=web:80;https=secure:443;ftp=f:21").as_deref(),
            Some("http://secure:443")
        );
        assert_eq!(
            normalize_proxy_server("http=web:80").as_deref(),
            Some("http://web:80")
        );
        assert_eq!(
            normalize_proxy_server("socks=s:1080").as_deref(),
            Some("http://s:1080")
        );
    }
}
