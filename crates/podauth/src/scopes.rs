//! Effective scope and prompt computation.
//!
//! Scope sets are deduplicated and deterministically ordered so equal
//! inputs always produce byte-identical authorization requests.

use std::collections::BTreeSet;
use std::sync::Arc;

/// Scopes every Solid session requests unless overridden.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "webid", "offline_access"];

pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";
pub const PROMPT_CONSENT: &str = "consent";

/// The default scope set as owned strings.
pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect()
}

/// Deduplicated, sorted union of base and extra scopes.
pub fn effective_scopes(base: &[String], extra: &[String]) -> Vec<String> {
    base.iter()
        .chain(extra)
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Pluggable prompt computation over the effective scopes.
///
/// Injecting `consent` for `offline_access` is provider policy, not
/// protocol, so callers can swap the calculator out.
pub type PromptCalculator = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// Default policy: providers only hand out refresh tokens when the user
/// consents, so `offline_access` pulls in the `consent` prompt.
pub fn default_prompts(scopes: &[String]) -> Vec<String> {
    if scopes.iter().any(|s| s == SCOPE_OFFLINE_ACCESS) {
        vec![PROMPT_CONSENT.to_owned()]
    } else {
        Vec::new()
    }
}
