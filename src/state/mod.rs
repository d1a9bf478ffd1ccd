pub(crate) mod collection;
pub(crate) mod reorder;
pub(crate) mod session;

use crate::api::ApiClient;
use crate::models::EpisodeSummary;
use leptos::prelude::*;

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Episode list, loaded from backend.
    pub episodes: RwSignal<Vec<EpisodeSummary>>,
    pub episodes_loading: RwSignal<bool>,
    pub episodes_error: RwSignal<Option<String>>,

    /// Bumped per list load; older responses are ignored.
    pub episodes_request_id: RwSignal<u64>,

    /// Season group to show expanded when the list is (re)shown.
    /// `Some(None)` is the "no season" group.
    pub open_season: RwSignal<Option<Option<String>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            api_client: RwSignal::new(ApiClient::from_env()),
            episodes: RwSignal::new(vec![]),
            episodes_loading: RwSignal::new(false),
            episodes_error: RwSignal::new(None),
            episodes_request_id: RwSignal::new(0),
            open_season: RwSignal::new(None),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
