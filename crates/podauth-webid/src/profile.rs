//! The slice of a WebID profile document the authentication core needs.

use serde_json::Value;
use url::Url;

/// Predicate naming an authorized OIDC issuer in a Solid profile.
pub const OIDC_ISSUER_IRI: &str = "http://www.w3.org/ns/solid/terms#oidcIssuer";

/// A parsed WebID profile: the subject and its declared issuers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebIdProfile {
    /// The WebID the document describes.
    pub web_id: Url,
    /// Issuers authorized to assert this identity, in declaration order.
    pub oidc_issuers: Vec<Url>,
}

impl WebIdProfile {
    /// Extract the profile from a JSON-LD-shaped document.
    ///
    /// Accepts the common serializations seen in the wild: the issuer
    /// predicate spelled as `solid:oidcIssuer`, its full IRI, or bare
    /// `oidcIssuer`; objects as a plain string, an `{"@id": ...}` node, or
    /// arrays of either; and subject nodes either at the document root or
    /// inside a top-level `@graph`.
    pub fn from_document(web_id: Url, document: &Value) -> Self {
        let mut oidc_issuers = Vec::new();
        collect_issuers(document, &mut oidc_issuers);
        Self {
            web_id,
            oidc_issuers,
        }
    }

    /// Whether the profile declares at least one issuer.
    pub fn has_issuers(&self) -> bool {
        !self.oidc_issuers.is_empty()
    }
}

fn collect_issuers(node: &Value, out: &mut Vec<Url>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                if is_issuer_key(key) {
                    push_issuer_objects(value, out);
                } else if key == "@graph" {
                    collect_issuers(value, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_issuers(item, out);
            }
        }
        _ => {}
    }
}

fn is_issuer_key(key: &str) -> bool {
    key == OIDC_ISSUER_IRI || key == "solid:oidcIssuer" || key == "oidcIssuer"
}

fn push_issuer_objects(value: &Value, out: &mut Vec<Url>) {
    match value {
        Value::String(s) => push_issuer(s, out),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("@id") {
                push_issuer(s, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                push_issuer_objects(item, out);
            }
        }
        _ => {}
    }
}

fn push_issuer(raw: &str, out: &mut Vec<Url>) {
    if let Ok(url) = Url::parse(raw) {
        if matches!(url.scheme(), "http" | "https") && !out.contains(&url) {
            out.push(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn web_id() -> Url {
        Url::parse("https://alice.pod.example/profile/card#me").unwrap()
    }

    #[test]
    fn extracts_prefixed_string_issuer() {
        let doc = json!({
            "@id": "https://alice.pod.example/profile/card#me",
            "solid:oidcIssuer": "https://idp.example"
        });
        let profile = WebIdProfile::from_document(web_id(), &doc);
        assert_eq!(
            profile.oidc_issuers,
            vec![Url::parse("https://idp.example").unwrap()]
        );
    }

    #[test]
    fn extracts_full_iri_id_node_from_graph() {
        let doc = json!({
            "@graph": [
                { "@id": "https://alice.pod.example/profile/card" },
                {
                    "@id": "https://alice.pod.example/profile/card#me",
                    "http://www.w3.org/ns/solid/terms#oidcIssuer": { "@id": "https://idp.example" }
                }
            ]
        });
        let profile = WebIdProfile::from_document(web_id(), &doc);
        assert_eq!(
            profile.oidc_issuers,
            vec![Url::parse("https://idp.example").unwrap()]
        );
    }

    #[test]
    fn preserves_declaration_order_and_dedupes() {
        let doc = json!({
            "oidcIssuer": [
                "https://first.example",
                { "@id": "https://second.example" },
                "https://first.example"
            ]
        });
        let profile = WebIdProfile::from_document(web_id(), &doc);
        assert_eq!(
            profile.oidc_issuers,
            vec![
                Url::parse("https://first.example").unwrap(),
                Url::parse("https://second.example").unwrap(),
            ]
        );
    }

    #[test]
    fn ignores_non_http_objects() {
        let doc = json!({
            "solid:oidcIssuer": ["mailto:alice@example.org", 42, null]
        });
        let profile = WebIdProfile::from_document(web_id(), &doc);
        assert!(!profile.has_issuers());
    }
}
