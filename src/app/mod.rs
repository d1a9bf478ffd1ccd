use crate::pages::{EpisodeEditPage, EpisodeListPage};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new()));

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("episodes/:episode_id") view=EpisodeEditPage />
                <Route path=path!("") view=EpisodeListPage />
            </Routes>
        </Router>
    }
}
