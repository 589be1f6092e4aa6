//! Port router: builds the `port → (path → site)` index from the
//! constructed sites and resolves each request to a site by longest-prefix
//! path match.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::error::InitError;
use crate::models::site::Site;

/// Path-prefix routing table for a single port. Entries are kept sorted by
/// descending path length so the first match found is always the most
/// specific one — ties are impossible because `(port, path)` is unique,
/// enforced in [`build_port_index`].
#[derive(Debug, Default)]
pub struct PathTable {
    entries: Vec<(String, Arc<Site>)>,
}

impl PathTable {
    fn insert(&mut self, path: String, site: Arc<Site>) {
        self.entries.push((path, site));
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Longest-prefix match. Returns `None` if no configured path is a
    /// prefix of `request_path` — the caller answers 404.
    pub fn match_path(&self, request_path: &str) -> Option<Arc<Site>> {
        self.entries
            .iter()
            .find(|(path, _)| request_path.starts_with(path.as_str()))
            .map(|(_, site)| site.clone())
    }
}

pub type PortIndex = HashMap<u16, PathTable>;

/// Builds the full `port → path → site` index, failing with
/// [`InitError::PortConflict`] the first time two sites claim the same
/// `(port, path)`.
pub fn build_port_index(sites: &HashMap<String, Arc<Site>>) -> Result<PortIndex, InitError> {
    let mut index: PortIndex = HashMap::new();
    let mut claimed: HashMap<(u16, String), String> = HashMap::new();

    for site in sites.values() {
        let key = (site.port, site.path.clone());
        if let Some(existing) = claimed.get(&key) {
            return Err(InitError::PortConflict {
                port: site.port,
                path: site.path.clone(),
                first_site: existing.clone(),
                second_site: site.name.clone(),
            });
        }
        claimed.insert(key, site.name.clone());

        index
            .entry(site.port)
            .or_default()
            .insert(site.path.clone(), site.clone());
    }

    Ok(index)
}
