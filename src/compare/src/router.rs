//! Naming-context routing and referral rewriting

use ldapd_core::traits::{Backend, BackendRouter};
use ldapd_core::types::Dn;
use std::sync::Arc;
use tracing::debug;

/// Registry of backends, routed by longest matching suffix
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
    default_referrals: Vec<String>,
}

impl BackendRegistry {
    pub fn new(default_referrals: Vec<String>) -> Self {
        Self {
            backends: Vec::new(),
            default_referrals,
        }
    }

    /// Register a backend; its suffixes must not already be served
    pub fn register(&mut self, backend: Arc<dyn Backend>) -> Result<(), String> {
        for suffix in backend.suffixes() {
            if let Some(owner) = self
                .backends
                .iter()
                .find(|b| b.suffixes().iter().any(|s| s == suffix))
            {
                return Err(format!(
                    "naming context '{}' already served by backend '{}'",
                    suffix.normalized(),
                    owner.name()
                ));
            }
        }
        debug!("Registered backend '{}'", backend.name());
        self.backends.push(backend);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl BackendRouter for BackendRegistry {
    fn select_backend(&self, dn: &Dn) -> Option<Arc<dyn Backend>> {
        let mut best: Option<(usize, &Arc<dyn Backend>)> = None;
        for backend in &self.backends {
            for suffix in backend.suffixes() {
                if dn.ends_with(suffix) && best.map_or(true, |(depth, _)| suffix.depth() > depth) {
                    best = Some((suffix.depth(), backend));
                }
            }
        }
        best.map(|(_, backend)| backend.clone())
    }

    fn default_referrals(&self) -> &[String] {
        &self.default_referrals
    }

    fn naming_contexts(&self) -> Vec<Dn> {
        self.backends
            .iter()
            .flat_map(|b| b.suffixes().iter().cloned())
            .collect()
    }
}

/// LDAP URL split into the parts referral rewriting touches
struct LdapUrl<'a> {
    /// `ldap://host:port`
    base: &'a str,
    /// Decoded DN part, possibly empty
    dn: String,
    /// `?attrs?scope...`, kept verbatim
    tail: &'a str,
}

impl<'a> LdapUrl<'a> {
    fn parse(url: &'a str) -> Option<Self> {
        let scheme_len = ["ldap://", "ldaps://", "ldapi://"]
            .iter()
            .find(|s| url.get(..s.len()).is_some_and(|p| p.eq_ignore_ascii_case(s)))?
            .len();

        let rest = &url[scheme_len..];
        let (host_len, path) = match rest.find('/') {
            Some(i) => (i, &rest[i + 1..]),
            None => (rest.find('?').unwrap_or(rest.len()), ""),
        };
        let base = &url[..scheme_len + host_len];

        let (dn, tail) = match path.find('?') {
            Some(i) => (&path[..i], &path[i..]),
            None => (path, ""),
        };

        Some(Self {
            base,
            dn: percent_decode(dn)?,
            tail,
        })
    }

    fn with_dn(&self, dn: &str) -> String {
        format!("{}/{}{}", self.base, percent_encode(dn), self.tail)
    }
}

/// Rewrite default referral URLs so they name `target`
///
/// Non-LDAP URLs are passed through.
pub fn rewrite_referrals(urls: &[String], target: &Dn) -> Vec<String> {
    urls.iter()
        .map(|url| match LdapUrl::parse(url) {
            Some(parsed) => parsed.with_dn(target.raw()),
            None => url.clone(),
        })
        .collect()
}

/// Rewrite the `ref` URLs of the referral object at `referral_dn` for a
/// request targeting `target` below (or at) it
///
/// The RDNs of `target` under `referral_dn`, spelled as the client sent them,
/// are prepended to the DN each URL names; a URL without a DN gets `target`
/// itself.
pub fn chase_referrals(urls: &[String], referral_dn: &Dn, target: &Dn) -> Vec<String> {
    let relative = target.relative_to(referral_dn).unwrap_or_default();

    urls.iter()
        .map(|url| match LdapUrl::parse(url) {
            Some(parsed) if parsed.dn.is_empty() => parsed.with_dn(target.raw()),
            Some(parsed) if relative.is_empty() => parsed.with_dn(&parsed.dn),
            Some(parsed) => parsed.with_dn(&format!("{},{}", relative, parsed.dn)),
            None => url.clone(),
        })
        .collect()
}

fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b' ' | b'"' | b'#' | b'%' | b'<' | b'>' | b'?' | b'/' | b'[' | b']' | b'{' | b'}'
            | b'|' | b'\\' | b'^' | b'`' => out.push_str(&format!("%{:02X}", byte)),
            b if b.is_ascii_control() || !b.is_ascii() => out.push_str(&format!("%{:02X}", b)),
            b => out.push(b as char),
        }
    }
    out
}

fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = text.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(raw: &str) -> Dn {
        Dn::parse(raw).unwrap()
    }

    #[test]
    fn test_rewrite_default_referrals() {
        let urls = vec![
            "ldap://ldap.example.net/".to_string(),
            "ldaps://ldap2.example.net:636/o=ignored??sub".to_string(),
            "https://example.net/".to_string(),
        ];
        let target = dn("cn=John Smith,dc=example,dc=com");
        let rewritten = rewrite_referrals(&urls, &target);
        assert_eq!(
            rewritten,
            vec![
                "ldap://ldap.example.net/cn=John%20Smith,dc=example,dc=com".to_string(),
                "ldaps://ldap2.example.net:636/cn=John%20Smith,dc=example,dc=com??sub".to_string(),
                "https://example.net/".to_string(),
            ]
        );

        let bare = vec!["ldap://host".to_string()];
        assert_eq!(rewrite_referrals(&bare, &dn("dc=x")), vec!["ldap://host/dc=x".to_string()]);
    }

    #[test]
    fn test_chase_referrals() {
        let urls = vec!["ldap://other.example.net/ou=Sales,dc=other,dc=net".to_string()];
        let referral = dn("ou=sales,dc=example,dc=com");

        let below = chase_referrals(&urls, &referral, &dn("cn=Bob,ou=Sales,dc=example,dc=com"));
        assert_eq!(below, vec!["ldap://other.example.net/cn=Bob,ou=Sales,dc=other,dc=net".to_string()]);

        let at = chase_referrals(&urls, &referral, &referral);
        assert_eq!(at, urls);

        let no_dn = vec!["ldap://other.example.net/".to_string()];
        let target = dn("cn=Bob,ou=Sales,dc=example,dc=com");
        assert_eq!(
            chase_referrals(&no_dn, &referral, &target),
            vec!["ldap://other.example.net/cn=Bob,ou=Sales,dc=example,dc=com".to_string()]
        );
    }

    #[test]
    fn test_non_ascii_scheme_is_passed_through() {
        let urls = vec!["ldap:/é".to_string(), "é".to_string(), "ldaps:/".to_string()];
        assert_eq!(rewrite_referrals(&urls, &dn("dc=elsewhere,dc=org")), urls);
        assert_eq!(
            chase_referrals(&urls, &dn("dc=org"), &dn("dc=elsewhere,dc=org")),
            urls
        );
    }

    #[test]
    fn test_percent_roundtrip() {
        let text = "cn=a b/c?d";
        assert_eq!(percent_decode(&percent_encode(text)).unwrap(), text);
        assert!(percent_decode("%zz").is_none());
    }
}
