//! Loopback host classification, exposed for any remote-client helper in the
//! host runtime that needs to gate auto-authentication to the local machine.
//! Exact-match only — deliberately rejects subdomain tricks like
//! `localhost.evil.com` and non-loopback bind addresses like `0.0.0.0`.

/// Canonical loopback host literals. A host of `None` (the caller's default
/// URL, which resolves to `localhost`) is also loopback.
const LOOPBACK_HOSTS: [&str; 3] = ["127.0.0.1", "localhost", "::1"];

pub fn is_loopback(host: Option<&str>) -> bool {
    match host {
        None => true,
        Some(h) => LOOPBACK_HOSTS.contains(&h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_loopback_hosts_are_recognized() {
        assert!(is_loopback(Some("127.0.0.1")));
        assert!(is_loopback(Some("localhost")));
        assert!(is_loopback(Some("::1")));
        assert!(is_loopback(None));
    }

    #[test]
    fn subdomain_tricks_are_rejected() {
        assert!(!is_loopback(Some("localhost.evil.com")));
        assert!(!is_loopback(Some("127.0.0.1.evil.com")));
    }

    #[test]
    fn non_loopback_addresses_are_rejected() {
        assert!(!is_loopback(Some("evil.com")));
        assert!(!is_loopback(Some("0.0.0.0")));
        assert!(!is_loopback(Some("192.168.1.1")));
    }
}
