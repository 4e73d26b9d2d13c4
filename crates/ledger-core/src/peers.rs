use crate::{LedgerError, Result};
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Known peer endpoints, e.g. `10.0.0.220:5000` or `http://node-b:5000`.
///
/// Guarded by its own lock, independent of the ledger's. Kept sorted so
/// that iteration order, and with it consensus, is deterministic.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the endpoint was already known.
    pub fn add(&self, endpoint: &str) -> Result<bool> {
        let endpoint = normalize_endpoint(endpoint)?;
        let added = self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.clone());
        if added {
            info!(peer = %endpoint, "registered peer");
        } else {
            debug!(peer = %endpoint, "peer already registered");
        }
        Ok(added)
    }

    /// Validates every endpoint before registering any of them.
    pub fn add_all<I, S>(&self, endpoints: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = endpoints
            .into_iter()
            .map(|e| normalize_endpoint(e.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut peers = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        let added = normalized.into_iter().filter(|e| peers.insert(e.clone())).count();
        info!(added, total = peers.len(), "registered peers");
        Ok(added)
    }

    pub fn remove(&self, endpoint: &str) -> bool {
        let Ok(endpoint) = normalize_endpoint(endpoint) else {
            return false;
        };
        let removed = self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&endpoint);
        if removed {
            info!(peer = %endpoint, "removed peer");
        }
        removed
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        normalize_endpoint(endpoint).is_ok_and(|e| {
            self.peers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&e)
        })
    }

    /// Sorted copy of the current set.
    pub fn list(&self) -> Vec<String> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structural check of a peer endpoint: optional `http://` or `https://`,
/// a host, an optional numeric port, nothing else. A trailing `/` is dropped.
///
/// Plain http is the default, so `http://a:1` is stored as `a:1`; `https://`
/// is kept.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let malformed = |why: &str| LedgerError::MalformedInput(format!("peer endpoint {raw:?}: {why}"));

    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(malformed("empty"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(malformed("contains whitespace"));
    }

    let (secure, authority) = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => (false, rest),
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => (true, rest),
        Some((scheme, _)) => return Err(malformed(&format!("unsupported scheme {scheme}"))),
        None => (false, trimmed),
    };
    if authority.contains('/') {
        return Err(malformed("paths are not allowed"));
    }

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (inner, after) = rest
            .split_once(']')
            .ok_or_else(|| malformed("unclosed ipv6 bracket"))?;
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(malformed("bad ipv6 host"));
        }
        match after {
            "" => (inner, None),
            _ => match after.strip_prefix(':') {
                Some(port) => (inner, Some(port)),
                None => return Err(malformed("junk after ipv6 host")),
            },
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(malformed("missing host"));
    }
    if !authority.starts_with('[')
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return Err(malformed("bad host"));
    }
    if let Some(port) = port {
        port.parse::<u16>()
            .map_err(|_| malformed("port is not a number in 0..=65535"))?;
    }
    Ok(if secure {
        format!("https://{authority}")
    } else {
        authority.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_add_is_noop() {
        let peers = PeerRegistry::new();
        assert!(peers.add("10.0.0.220:5000").unwrap());
        assert!(!peers.add("10.0.0.220:5000").unwrap());
        assert!(!peers.add("10.0.0.220:5000/").unwrap());
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn remove_and_contains() {
        let peers = PeerRegistry::new();
        peers.add("localhost:5001").unwrap();
        assert!(peers.contains("localhost:5001"));
        assert!(peers.remove("localhost:5001"));
        assert!(!peers.remove("localhost:5001"));
        assert!(!peers.remove("not a peer"));
        assert!(peers.is_empty());
    }

    #[test]
    fn list_is_sorted() {
        let peers = PeerRegistry::new();
        peers.add("c:1").unwrap();
        peers.add("a:1").unwrap();
        peers.add("b:1").unwrap();
        assert_eq!(peers.list(), vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn add_all_is_all_or_nothing() {
        let peers = PeerRegistry::new();
        assert!(peers.add_all(["a:1", "bad host:1"]).is_err());
        assert!(peers.is_empty());
        assert_eq!(peers.add_all(["a:1", "b:2", "a:1"]).unwrap(), 2);
    }

    #[test]
    fn accepted_endpoint_shapes() {
        for ok in [
            "10.0.0.220:5000",
            "localhost",
            "node-b.example.org:80",
            "http://127.0.0.1:5000",
            "https://node.example:443/",
            "[::1]:5000",
        ] {
            assert!(normalize_endpoint(ok).is_ok(), "{ok}");
        }
        assert_eq!(normalize_endpoint("http://a:1/").unwrap(), "a:1");
        assert_eq!(
            normalize_endpoint("HTTPS://node:443/").unwrap(),
            "https://node:443"
        );
    }

    #[test]
    fn plain_http_scheme_collapses_with_bare_endpoint() {
        let peers = PeerRegistry::new();
        assert!(peers.add("a:1").unwrap());
        assert!(!peers.add("http://a:1").unwrap());
        assert!(!peers.add("HTTP://a:1/").unwrap());
        assert!(peers.add("https://a:1").unwrap());
        assert_eq!(peers.list(), vec!["a:1", "https://a:1"]);
        assert!(peers.remove("http://a:1"));
        assert_eq!(peers.list(), vec!["https://a:1"]);
    }

    #[test]
    fn rejected_endpoint_shapes() {
        for bad in [
            "",
            "   ",
            "a b:1",
            "ftp://a:1",
            "a:port",
            "a:70000",
            "a:1/chain",
            ":5000",
            "[::1",
            "[zz]:1",
            "a;rm:1",
        ] {
            assert!(
                matches!(normalize_endpoint(bad), Err(LedgerError::MalformedInput(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn concurrent_adds_collapse() {
        let peers = std::sync::Arc::new(PeerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let peers = peers.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        peers.add(&format!("node{}:5000", (i + t) % 20)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(peers.len(), 20);
    }
}
