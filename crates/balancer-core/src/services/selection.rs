//! Endpoint selection policy.
//!
//! Selection is encapsulated behind a trait so a future policy — round-robin,
//! weighted, least-recent — can replace [`UniformRandomSelector`] without
//! touching the prober or the forwarder. A round-robin policy would need its
//! own per-site counter; the locking discipline in
//! [`crate::models::site::HealthyEndpoints`] extends to that unchanged, since
//! the critical section stays just as short.

use reqwest::Url;

/// Chooses one endpoint from an already-filtered healthy list.
///
/// Implementations must not assume exclusive access: the same selector
/// instance is shared across every concurrent request for a site.
pub trait EndpointSelector: Send + Sync {
    /// Returns `None` iff `healthy` is empty. Callers never pass anything
    /// else for a selector to reject.
    fn select(&self, healthy: &[Url]) -> Option<Url>;
}

/// The only selection policy this balancer ships with. Stateless across
/// calls — no round-robin counter, no per-request shared mutable state on
/// the hot path.
#[derive(Debug, Default)]
pub struct UniformRandomSelector;

impl EndpointSelector for UniformRandomSelector {
    fn select(&self, healthy: &[Url]) -> Option<Url> {
        if healthy.is_empty() {
            return None;
        }
        use rand::Rng;
        let index = rand::thread_rng().gen_range(0..healthy.len());
        Some(healthy[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_yields_none() {
        let selector = UniformRandomSelector;
        assert!(selector.select(&[]).is_none());
    }

    #[test]
    fn selection_is_fair_over_many_draws() {
        let urls: Vec<Url> = (0..4)
            .map(|i| Url::parse(&format!("http://127.0.0.1:{}", 8000 + i)).unwrap())
            .collect();
        let selector = UniformRandomSelector;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 * urls.len() {
            let picked = selector.select(&urls).expect("non-empty list");
            seen.insert(picked);
        }
        assert_eq!(seen.len(), urls.len(), "every endpoint should surface at K >= 10*N draws");
    }
}
