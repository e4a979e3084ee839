// Router bridge - keeps the displayed page in sync with the cursor

use tracing::{debug, info, warn};
use url::Url;

/// Routing collaborator, e.g. a browser history or a terminal renderer
pub trait Router {
    /// Location currently displayed, path plus optional query
    fn location(&self) -> Option<String>;

    /// Navigate to `url`, carrying over the listed query parameters from the
    /// current location
    fn push(&mut self, url: &str, preserve_params: &[String]);
}

/// Path part of a location (`/a/b?tab=x#y` -> `/a/b`)
pub fn path_of(location: &str) -> &str {
    location
        .split(['?', '#'])
        .next()
        .unwrap_or(location)
}

/// Drives router navigation from the cursor's URL. Stateless apart from the
/// allow-list of query parameters that survive a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterBridge {
    preserved_params: Vec<String>,
}

impl Default for RouterBridge {
    fn default() -> Self {
        Self::new(vec!["tab".to_string()])
    }
}

impl RouterBridge {
    pub fn new(preserved_params: Vec<String>) -> Self {
        Self { preserved_params }
    }

    pub fn preserved_params(&self) -> &[String] {
        &self.preserved_params
    }

    /// Navigate to `url` unless it is already displayed. Returns whether a
    /// navigation was issued.
    pub fn sync<R: Router + ?Sized>(&self, router: &mut R, url: &str) -> bool {
        if let Some(location) = router.location() {
            if path_of(&location) == path_of(url) {
                debug!(url = %url, "Already displayed, skipping navigation");
                return false;
            }
        }

        router.push(url, &self.preserved_params);
        true
    }
}

/// In-memory router keeping a navigation history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRouter {
    history: Vec<String>,
}

impl HistoryRouter {
    // Locations are relative; parsing needs some absolute base.
    const BASE: &'static str = "http://dashboard.local";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(location: impl Into<String>) -> Self {
        Self {
            history: vec![location.into()],
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn resolve(&self, url: &str, preserve_params: &[String]) -> Result<String, url::ParseError> {
        let base = Url::parse(Self::BASE)?;
        let mut target = base.join(url)?;

        if let Some(current) = self.history.last() {
            let current = base.join(current)?;
            let present: Vec<String> = target.query_pairs().map(|(k, _)| k.into_owned()).collect();
            let carried: Vec<(String, String)> = current
                .query_pairs()
                .filter(|(k, _)| preserve_params.iter().any(|p| p == k.as_ref()))
                .filter(|(k, _)| !present.iter().any(|p| p == k.as_ref()))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            if !carried.is_empty() {
                target.query_pairs_mut().extend_pairs(carried);
            }
        }

        Ok(match target.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", target.path(), query),
            _ => target.path().to_string(),
        })
    }
}

impl Router for HistoryRouter {
    fn location(&self) -> Option<String> {
        self.history.last().cloned()
    }

    fn push(&mut self, url: &str, preserve_params: &[String]) {
        let location = match self.resolve(url, preserve_params) {
            Ok(location) => location,
            Err(e) => {
                warn!(url = %url, "Could not carry query parameters: {}", e);
                url.to_string()
            }
        };

        info!(location = %location, "Navigating");
        self.history.push(location);
    }
}
