use crate::api::{ApiClient, WordStore};
use crate::models::{DefinitionChoice, Level};
use crate::state::collection::{EntryId, EntrySlot};
use crate::state::reorder::{DragPhase, Placement};
use crate::state::session::{EditError, EditSession, Notice, NoticeLevel, SubView};
use crate::state::AppContext;
use crate::util::group_by_season;
use leptos::logging::{error, warn};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params};
use leptos_router::params::Params;
use std::future::Future;
use std::rc::Rc;
use std::str::FromStr;
use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;

/// The open episode. Lives in the local arena: the session is `!Send`.
type SessionSlot = RwSignal<Option<EditSession<ApiClient>>, LocalStorage>;

#[component]
pub fn EpisodeListPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    // Kick off a load with stale-response protection.
    let req_id = app_state
        .0
        .episodes_request_id
        .get_untracked()
        .saturating_add(1);
    app_state.0.episodes_request_id.set(req_id);
    app_state.0.episodes_loading.set(true);
    app_state.0.episodes_error.set(None);

    let api_client = app_state.0.api_client.get_untracked();
    spawn_local(async move {
        let result = api_client.list_episodes().await;

        // Ignore stale responses.
        if app_state.0.episodes_request_id.get_untracked() != req_id {
            return;
        }

        match result {
            Ok(episodes) => app_state.0.episodes.set(episodes),
            Err(e) => {
                error!("failed to load episodes: {e}");
                app_state.0.episodes_error.set(Some(e.to_string()));
            }
        }
        app_state.0.episodes_loading.set(false);
    });

    let groups = move || group_by_season(&app_state.0.episodes.get());

    view! {
        <div class="mx-auto w-full max-w-3xl px-4 py-6 space-y-4">
            <h1 class="text-lg font-semibold">"Episodes"</h1>

            <Show when=move || app_state.0.episodes_loading.get() fallback=|| ().into_view()>
                <div class="text-xs text-muted-foreground">"Loading…"</div>
            </Show>

            {move || {
                app_state.0.episodes_error.get().map(|e| {
                    view! {
                        <div class="rounded-md border border-destructive/30 px-3 py-2 text-xs text-destructive">
                            {e}
                        </div>
                    }
                })
            }}

            <div class="space-y-2">
                {move || {
                    let open_season = app_state.0.open_season.get_untracked();
                    groups()
                        .into_iter()
                        .map(|g| {
                            let open = open_season.as_ref() == Some(&g.season);
                            let label = g.label();
                            let season = g.season.clone();
                            view! {
                                <details class="rounded-md border" open=open>
                                    <summary class="cursor-pointer px-3 py-2 text-sm font-medium">
                                        {label}
                                    </summary>
                                    <ul class="divide-y">
                                        {g
                                            .episodes
                                            .into_iter()
                                            .map(|ep| {
                                                let season = season.clone();
                                                let href = format!(
                                                    "/episodes/{}",
                                                    urlencoding::encode(&ep.episode_id),
                                                );
                                                view! {
                                                    <li class="flex items-center gap-3 px-3 py-2 text-sm">
                                                        <span class="w-10 text-xs text-muted-foreground">
                                                            {ep.episode_number.clone()}
                                                        </span>
                                                        <a
                                                            href=href
                                                            class="min-w-0 flex-1 truncate hover:underline"
                                                            on:click=move |_| {
                                                                app_state.0.open_season.set(Some(season.clone()))
                                                            }
                                                        >
                                                            {ep.episode_name.clone()}
                                                        </a>
                                                        {ep
                                                            .publishable
                                                            .then(|| {
                                                                view! {
                                                                    <span class="rounded bg-primary/10 px-1.5 text-xs text-primary">
                                                                        "Publishable"
                                                                    </span>
                                                                }
                                                            })}
                                                    </li>
                                                }
                                            })
                                            .collect_view()}
                                    </ul>
                                </details>
                            }
                        })
                        .collect_view()
                }}
            </div>
        </div>
    }
}

#[derive(Params, PartialEq, Clone, Debug)]
pub struct EpisodeRouteParams {
    pub episode_id: Option<String>,
}

fn word_of(session: SessionSlot, id: EntryId) -> Option<String> {
    session
        .with_untracked(|s| s.as_ref().and_then(|s| s.entry_by_id(id)))
        .map(|slot| slot.entry.word)
}

fn tracked_slot(session: SessionSlot, revision: RwSignal<u64>, id: EntryId) -> Option<EntrySlot> {
    revision.track();
    session.with(|s| s.as_ref().and_then(|s| s.entry_by_id(id)))
}

/// Run a session operation in the background. Remote failures already raise
/// a notice on the session; anything else is shown next to the form.
fn spawn_edit<F, Fut, T>(session: SessionSlot, form_error: RwSignal<Option<String>>, f: F)
where
    F: FnOnce(EditSession<ApiClient>) -> Fut + 'static,
    Fut: Future<Output = Result<T, EditError>> + 'static,
{
    let Some(s) = session.get_untracked() else {
        return;
    };
    spawn_local(async move {
        match f(s).await {
            Ok(_) => {
                let _ = form_error.try_set(None);
            }
            Err(EditError::Remote(e)) => warn!("remote edit failed: {e}"),
            Err(EditError::Closed) => {}
            Err(e) => {
                let _ = form_error.try_set(Some(e.to_string()));
            }
        }
    });
}

fn drain_notices(session: SessionSlot, notices: RwSignal<Vec<Notice>>) {
    let Some(s) = session.try_get_untracked().flatten() else {
        return;
    };
    let fresh = s.take_notices();
    if !fresh.is_empty() {
        let _ = notices.try_update(|n| n.extend(fresh));
    }
}

fn placement_of(ev: &web_sys::DragEvent) -> Placement {
    // Decide above/below by cursor position inside the target row.
    ev.current_target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(|el| el.get_bounding_client_rect())
        .map(|rect| Placement::from_pointer(ev.client_y() as f64, rect.top(), rect.height()))
        .unwrap_or(Placement::Below)
}

#[component]
pub fn EpisodeEditPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<EpisodeRouteParams>();
    let navigate = StoredValue::new(use_navigate());

    let episode_id = move || {
        params
            .get()
            .ok()
            .and_then(|p| p.episode_id)
            .unwrap_or_default()
    };

    let session: SessionSlot = RwSignal::new_local(None);
    let revision: RwSignal<u64> = RwSignal::new(0);
    let notices: RwSignal<Vec<Notice>> = RwSignal::new(vec![]);
    let load_error: RwSignal<Option<String>> = RwSignal::new(None);
    let form_error: RwSignal<Option<String>> = RwSignal::new(None);
    let new_word: RwSignal<String> = RwSignal::new(String::new());

    Effect::new(move |_| {
        let id = episode_id();
        if id.trim().is_empty() {
            return;
        }

        if let Some(prev) = session.get_untracked() {
            prev.close();
        }
        session.set(None);
        load_error.set(None);
        notices.set(vec![]);

        let store = Rc::new(app_state.0.api_client.get_untracked());
        spawn_local(async move {
            match EditSession::open(store, &id).await {
                Ok(s) => {
                    // The route moved on while this episode was loading.
                    let current = params
                        .get_untracked()
                        .ok()
                        .and_then(|p| p.episode_id)
                        .unwrap_or_default();
                    if current != id {
                        s.close();
                        return;
                    }
                    s.set_on_change(move |r| {
                        let _ = revision.try_set(r);
                        drain_notices(session, notices);
                    });
                    revision.set(s.revision());
                    session.set(Some(s.clone()));
                    s.prefetch_expanded().await;
                }
                Err(e) => load_error.set(Some(e.to_string())),
            }
        });
    });

    on_cleanup(move || {
        if let Some(s) = session.try_get_untracked().flatten() {
            s.close();
        }
    });

    let go_back = move |_: web_sys::MouseEvent| {
        if let Some(s) = session.get_untracked() {
            let season = s.close();
            app_state.0.open_season.set(Some(season));
        }
        navigate.with_value(|nav| nav("/", Default::default()));
    };

    let has_session = move || session.with(|s| s.is_some());
    let header = move || {
        revision.track();
        session.with(|s| s.as_ref().map(|s| s.header()))
    };
    let view_mode = move || {
        revision.track();
        session
            .with(|s| s.as_ref().map(|s| s.view()))
            .unwrap_or(SubView::Vocabulary)
    };
    let persisting = move || {
        revision.track();
        session.with(|s| {
            s.as_ref()
                .map(|s| matches!(s.drag_phase(), DragPhase::Persisting { .. }))
                .unwrap_or(false)
        })
    };
    let row_ids = move || {
        revision.track();
        session.with(|s| {
            s.as_ref()
                .map(|s| s.snapshot().into_iter().map(|slot| slot.id).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    };

    let on_add = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let raw = new_word.get_untracked();
        let Some(s) = session.get_untracked() else {
            return;
        };
        spawn_local(async move {
            match s.add_word(&raw).await {
                Ok(()) => {
                    let _ = new_word.try_set(String::new());
                    let _ = form_error.try_set(None);
                }
                Err(EditError::Remote(e)) => warn!("add word failed: {e}"),
                Err(e) => {
                    let _ = form_error.try_set(Some(e.to_string()));
                }
            }
        });
    };

    view! {
        <div class="mx-auto w-full max-w-3xl px-4 py-6 space-y-4">
            <button class="text-xs text-muted-foreground hover:underline" on:click=go_back>
                "← Episodes"
            </button>

            {move || {
                load_error.get().map(|e| {
                    view! {
                        <div class="rounded-md border border-destructive/30 px-3 py-2 text-xs text-destructive">
                            {e}
                        </div>
                    }
                })
            }}

            <Show
                when=has_session
                fallback=move || {
                    view! {
                        <Show when=move || load_error.get().is_none() fallback=|| ().into_view()>
                            <div class="text-xs text-muted-foreground">"Loading episode…"</div>
                        </Show>
                    }
                }
            >
                <div class="space-y-1">
                    <h1 class="text-lg font-semibold">
                        {move || header().map(|h| h.episode_name).unwrap_or_default()}
                    </h1>
                    <div class="text-xs text-muted-foreground">
                        {move || {
                            header()
                                .map(|h| match h.season {
                                    Some(s) => format!("Season {s} · Episode {}", h.episode_number),
                                    None => format!("Episode {}", h.episode_number),
                                })
                                .unwrap_or_default()
                        }}
                    </div>
                    <label class="flex items-center gap-2 text-sm">
                        <input
                            type="checkbox"
                            prop:checked=move || header().map(|h| h.publishable).unwrap_or(false)
                            on:change=move |ev| {
                                let publishable = event_target_checked(&ev);
                                spawn_edit(session, form_error, move |s| async move {
                                    s.set_publishable(publishable).await
                                });
                            }
                        />
                        "Publishable"
                    </label>
                </div>

                <div class="space-y-1">
                    {move || {
                        notices
                            .get()
                            .into_iter()
                            .map(|n| {
                                let class = match n.level {
                                    NoticeLevel::Error => "rounded-md border border-destructive/30 px-3 py-1.5 text-xs text-destructive",
                                    NoticeLevel::Info => "rounded-md border px-3 py-1.5 text-xs text-muted-foreground",
                                };
                                view! { <div class=class>{n.message}</div> }
                            })
                            .collect_view()
                    }}
                    <Show when=move || !notices.get().is_empty() fallback=|| ().into_view()>
                        <button
                            class="text-xs text-muted-foreground hover:underline"
                            on:click=move |_| notices.set(vec![])
                        >
                            "Dismiss"
                        </button>
                    </Show>
                    {move || {
                        form_error
                            .get()
                            .map(|e| view! { <div class="text-xs text-destructive">{e}</div> })
                    }}
                </div>

                <div class="flex items-center gap-2 text-sm">
                    <button
                        class=move || {
                            if view_mode() == SubView::Vocabulary {
                                "rounded-md bg-primary/10 px-2 py-1 font-medium"
                            } else {
                                "rounded-md px-2 py-1 text-muted-foreground"
                            }
                        }
                        on:click=move |_| {
                            spawn_edit(session, form_error, |s| async move { s.show_vocabulary().await })
                        }
                    >
                        "Vocabulary"
                    </button>
                    <button
                        class=move || {
                            if view_mode() == SubView::AllWords {
                                "rounded-md bg-primary/10 px-2 py-1 font-medium"
                            } else {
                                "rounded-md px-2 py-1 text-muted-foreground"
                            }
                        }
                        on:click=move |_| {
                            spawn_edit(session, form_error, |s| async move { s.show_all_words().await })
                        }
                    >
                        "All words"
                    </button>
                </div>

                <Show
                    when=move || view_mode() == SubView::Vocabulary
                    fallback=move || {
                        view! { <AllWordsTable session=session revision=revision form_error=form_error /> }
                    }
                >
                    <form class="flex items-center gap-2" on:submit=on_add>
                        <input
                            class="h-8 w-full min-w-0 flex-1 rounded-md border border-input bg-transparent px-3 py-1 text-sm outline-none"
                            placeholder="Add a word"
                            prop:value=move || new_word.get()
                            on:input=move |ev| new_word.set(event_target_value(&ev))
                        />
                        <button class="h-8 rounded-md border px-3 text-sm" type="submit">
                            "Add"
                        </button>
                    </form>

                    <ul class=move || {
                        if persisting() { "space-y-1 opacity-60" } else { "space-y-1" }
                    }>
                        <For
                            each=row_ids
                            key=|id| *id
                            children=move |id| {
                                view! {
                                    <WordRow session=session id=id revision=revision form_error=form_error />
                                }
                            }
                        />
                    </ul>
                </Show>
            </Show>
        </div>
    }
}

#[component]
fn WordRow(
    session: SessionSlot,
    id: EntryId,
    revision: RwSignal<u64>,
    form_error: RwSignal<Option<String>>,
) -> impl IntoView {
    let slot = move || tracked_slot(session, revision, id);
    let word = move || slot().map(|s| s.entry.word).unwrap_or_default();
    let level = move || slot().map(|s| s.entry.level).unwrap_or_default();
    let expanded = move || slot().map(|s| s.ui.expanded).unwrap_or(false);
    let renaming = move || slot().map(|s| s.ui.rename_draft.is_some()).unwrap_or(false);

    let drop_hint = move || {
        revision.track();
        let phase = session.with(|s| s.as_ref().map(|s| s.drag_phase()));
        let Some(DragPhase::Hovering {
            target, placement, ..
        }) = phase
        else {
            return "";
        };
        if Some(target) != word_of(session, id) {
            return "";
        }
        match placement {
            Placement::Above => "border-t-2 border-t-primary",
            Placement::Below => "border-b-2 border-b-primary",
        }
    };

    let on_dragstart = move |ev: web_sys::DragEvent| {
        let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) else {
            return;
        };
        match s.begin_drag(&w) {
            Ok(()) => {
                if let Some(dt) = ev.data_transfer() {
                    let _ = dt.set_data("text/plain", &w);
                    dt.set_effect_allowed("move");
                }
            }
            Err(e) => {
                ev.prevent_default();
                form_error.set(Some(e.to_string()));
            }
        }
    };
    let on_dragover = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        if let Some(dt) = ev.data_transfer() {
            dt.set_drop_effect("move");
        }
        if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
            s.hover(&w, placement_of(&ev));
        }
    };
    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let Some(target) = word_of(session, id) else {
            return;
        };
        let placement = placement_of(&ev);
        spawn_edit(session, form_error, move |s| async move {
            s.drop_on(&target, placement).await
        });
    };
    let on_dragend = move |_: web_sys::DragEvent| {
        if let Some(s) = session.get_untracked() {
            s.cancel_drag();
        }
    };

    let commit_rename = move || {
        let Some(w) = word_of(session, id) else {
            return;
        };
        spawn_edit(session, form_error, move |s| async move { s.commit_rename(&w).await });
    };

    view! {
        <li
            class=move || format!("rounded-md border px-3 py-2 {}", drop_hint())
            draggable="true"
            on:dragstart=on_dragstart
            on:dragover=on_dragover
            on:drop=on_drop
            on:dragend=on_dragend
        >
            <div class="flex items-center gap-2 text-sm">
                <span class="cursor-grab select-none text-muted-foreground">"⋮⋮"</span>
                <button
                    class="w-4 text-xs text-muted-foreground"
                    on:click=move |_| {
                        let Some(w) = word_of(session, id) else {
                            return;
                        };
                        spawn_edit(session, form_error, move |s| async move { s.expand(&w).await });
                    }
                >
                    {move || if expanded() { "▾" } else { "▸" }}
                </button>
                <input
                    type="checkbox"
                    title="Used"
                    prop:checked=move || slot().map(|s| s.entry.is_used).unwrap_or(false)
                    on:change=move |ev| {
                        let is_used = event_target_checked(&ev);
                        let Some(w) = word_of(session, id) else {
                            return;
                        };
                        spawn_edit(session, form_error, move |s| async move {
                            s.set_used(&w, is_used).await
                        });
                    }
                />

                <Show
                    when=renaming
                    fallback=move || {
                        view! {
                            <span
                                class="cursor-text font-medium"
                                title="Double-click to rename"
                                on:dblclick=move |_| {
                                    if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
                                        let _ = s.start_rename(&w);
                                    }
                                }
                            >
                                {word}
                            </span>
                        }
                    }
                >
                    <input
                        class="h-7 min-w-0 rounded-md border border-input bg-transparent px-2 text-sm outline-none"
                        value=word_of(session, id).unwrap_or_default()
                        autofocus=true
                        on:input=move |ev| {
                            if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
                                let _ = s.edit_rename(&w, &event_target_value(&ev));
                            }
                        }
                        on:keydown=move |ev: web_sys::KeyboardEvent| {
                            match ev.key().as_str() {
                                "Enter" => {
                                    ev.prevent_default();
                                    commit_rename();
                                }
                                "Escape" => {
                                    if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
                                        let _ = s.cancel_rename(&w);
                                    }
                                }
                                _ => {}
                            }
                        }
                        on:blur=move |_| commit_rename()
                    />
                </Show>

                {move || {
                    slot()
                        .and_then(|s| s.entry.distinct_original_form().map(str::to_string))
                        .map(|f| view! { <span class="text-xs text-muted-foreground">{format!("({f})")}</span> })
                }}

                <select
                    class="ml-auto h-7 rounded-md border border-input bg-transparent px-1 text-xs"
                    on:change=move |ev| {
                        let level = Level::from_str(&event_target_value(&ev)).unwrap_or_default();
                        let Some(w) = word_of(session, id) else {
                            return;
                        };
                        spawn_edit(session, form_error, move |s| async move {
                            s.set_level(&w, level).await
                        });
                    }
                >
                    {Level::iter()
                        .map(|l| {
                            view! {
                                <option value=l.as_ref().to_string() prop:selected=move || level() == l>
                                    {l.label()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </div>

            <Show when=expanded fallback=|| ().into_view()>
                <DefinitionsPanel session=session id=id revision=revision form_error=form_error />
            </Show>
        </li>
    }
}

#[component]
fn DefinitionsPanel(
    session: SessionSlot,
    id: EntryId,
    revision: RwSignal<u64>,
    form_error: RwSignal<Option<String>>,
) -> impl IntoView {
    let slot = move || tracked_slot(session, revision, id);
    let loading = move || slot().map(|s| s.ui.definitions_loading).unwrap_or(false);
    let custom_selected = move || {
        slot()
            .map(|s| {
                s.ui.custom_active || matches!(s.entry.definition_choice(), DefinitionChoice::Custom(_))
            })
            .unwrap_or(false)
    };
    let group = format!("definition-{id}");
    let group2 = group.clone();

    // Follows the session draft; typing writes the same text back.
    let draft = move || slot().map(|s| s.ui.custom_draft).unwrap_or_default();

    let focus_custom = move || {
        if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
            let _ = s.focus_custom(&w);
        }
    };

    view! {
        <div class="mt-2 space-y-1 pl-8 text-sm">
            <Show when=loading fallback=|| ().into_view()>
                <div class="text-xs text-muted-foreground">"Loading definitions…"</div>
            </Show>

            {move || {
                let Some(current) = slot() else {
                    return ().into_any();
                };
                let candidates = current.entry.definitions.clone().unwrap_or_default();
                if current.entry.definitions.is_some() && candidates.is_empty() {
                    return view! {
                        <div class="text-xs text-muted-foreground">"No definitions found."</div>
                    }
                    .into_any();
                }
                let choice = current.entry.definition_choice();
                let custom = current.ui.custom_active;
                candidates
                    .into_iter()
                    .enumerate()
                    .map(|(i, d)| {
                        let checked = !custom && choice == DefinitionChoice::Candidate(i);
                        let pick = d.clone();
                        view! {
                            <label class="flex items-start gap-2">
                                <input
                                    type="radio"
                                    name=group.clone()
                                    prop:checked=checked
                                    on:change=move |_| {
                                        let Some(w) = word_of(session, id) else {
                                            return;
                                        };
                                        let d = pick.clone();
                                        spawn_edit(session, form_error, move |s| async move {
                                            s.pick_definition(&w, &d).await
                                        });
                                    }
                                />
                                <span>{d}</span>
                            </label>
                        }
                    })
                    .collect_view()
                    .into_any()
            }}

            <label class="flex items-start gap-2">
                <input
                    type="radio"
                    name=group2
                    prop:checked=custom_selected
                    on:change=move |_| focus_custom()
                />
                <textarea
                    class="min-h-12 w-full rounded-md border border-input bg-transparent px-2 py-1 text-sm outline-none"
                    placeholder="Custom definition"
                    prop:value=draft
                    on:focus=move |_| focus_custom()
                    on:input=move |ev| {
                        if let (Some(s), Some(w)) = (session.get_untracked(), word_of(session, id)) {
                            let _ = s.edit_custom(&w, &event_target_value(&ev));
                        }
                    }
                    on:blur=move |_| {
                        let Some(w) = word_of(session, id) else {
                            return;
                        };
                        spawn_edit(session, form_error, move |s| async move {
                            s.commit_custom(&w).await
                        });
                    }
                ></textarea>
            </label>
        </div>
    }
}

#[component]
fn AllWordsTable(
    session: SessionSlot,
    revision: RwSignal<u64>,
    form_error: RwSignal<Option<String>>,
) -> impl IntoView {
    let rows = move || {
        revision.track();
        session.with(|s| s.as_ref().map(|s| s.snapshot()).unwrap_or_default())
    };

    view! {
        <table class="w-full text-sm">
            <thead>
                <tr class="border-b text-left text-xs text-muted-foreground">
                    <th class="py-1">"Word"</th>
                    <th class="py-1">"Original form"</th>
                    <th class="py-1">"Used"</th>
                    <th class="py-1">"Vocabulary"</th>
                </tr>
            </thead>
            <tbody>
                {move || {
                    rows()
                        .into_iter()
                        .map(|slot| {
                            let word = slot.entry.word.clone();
                            view! {
                                <tr class="border-b">
                                    <td class="py-1 font-medium">{slot.entry.word.clone()}</td>
                                    <td class="py-1 text-muted-foreground">
                                        {slot.entry.distinct_original_form().map(str::to_string)}
                                    </td>
                                    <td class="py-1">{if slot.entry.is_used { "✓" } else { "" }}</td>
                                    <td class="py-1">
                                        <input
                                            type="checkbox"
                                            prop:checked=slot.entry.is_vocabulary
                                            on:change=move |ev| {
                                                let is_vocabulary = event_target_checked(&ev);
                                                let w = word.clone();
                                                spawn_edit(session, form_error, move |s| async move {
                                                    s.set_vocabulary(&w, is_vocabulary).await
                                                });
                                            }
                                        />
                                    </td>
                                </tr>
                            }
                        })
                        .collect_view()
                }}
            </tbody>
        </table>
    }
}
