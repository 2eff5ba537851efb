//! Views the client can send the user to

use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// A dashboard view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Missions,
    MissionDetail(u64),
    Nfts,
    Rewards,
    Wallet,
    Profile,
    NotFound,
}

impl Route {
    /// The URL path of this view
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Missions => "/missions".to_string(),
            Route::MissionDetail(id) => format!("/missions/{}", id),
            Route::Nfts => "/nfts".to_string(),
            Route::Rewards => "/rewards".to_string(),
            Route::Wallet => "/wallet".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Resolve a URL path; anything unknown is [`Route::NotFound`]
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            "/missions" => Route::Missions,
            "/nfts" => Route::Nfts,
            "/rewards" => Route::Rewards,
            "/wallet" => Route::Wallet,
            "/profile" => Route::Profile,
            other => other
                .strip_prefix("/missions/")
                .and_then(|id| id.parse().ok())
                .map(Route::MissionDetail)
                .unwrap_or(Route::NotFound),
        }
    }

    /// Views only reachable with a session
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Route::Home | Route::Login | Route::Register | Route::NotFound
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Views remembered by [`Navigator::history`]
pub const HISTORY_LIMIT: usize = 20;

/// Records where the client has sent the user
#[derive(Debug)]
pub struct Navigator {
    history: RwLock<Vec<Route>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Start at [`Route::Home`]
    pub fn new() -> Self {
        Self {
            history: RwLock::new(vec![Route::Home]),
        }
    }

    pub fn navigate(&self, route: Route) {
        debug!(path = %route, "navigate");
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        if history.len() == HISTORY_LIMIT {
            history.remove(0);
        }
        history.push(route);
    }

    /// The view currently shown
    pub fn current(&self) -> Route {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or(Route::Home)
    }

    /// The most recent views visited, oldest first
    pub fn history(&self) -> Vec<Route> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_back_to_routes() {
        for route in [
            Route::Home,
            Route::Login,
            Route::Dashboard,
            Route::MissionDetail(42),
            Route::Wallet,
        ] {
            assert_eq!(Route::from_path(&route.path()), route);
        }
        assert_eq!(Route::from_path("/missions/abc"), Route::NotFound);
        assert_eq!(Route::from_path("/nowhere"), Route::NotFound);
    }

    #[test]
    fn navigator_tracks_current_view() {
        let navigator = Navigator::new();
        assert_eq!(navigator.current(), Route::Home);

        navigator.navigate(Route::Login);
        navigator.navigate(Route::Dashboard);

        assert_eq!(navigator.current(), Route::Dashboard);
        assert_eq!(
            navigator.history(),
            vec![Route::Home, Route::Login, Route::Dashboard]
        );
        assert!(Route::Dashboard.requires_auth());
        assert!(!Route::Login.requires_auth());
    }

    #[test]
    fn history_keeps_only_recent_views() {
        let navigator = Navigator::new();
        for id in 0..HISTORY_LIMIT as u64 + 5 {
            navigator.navigate(Route::MissionDetail(id));
        }

        let history = navigator.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0], Route::MissionDetail(5));
        assert_eq!(navigator.current(), Route::MissionDetail(HISTORY_LIMIT as u64 + 4));
    }
}
