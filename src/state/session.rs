use crate::api::{ApiError, WordOrder, WordStore};
use crate::models::{EpisodeDetail, EpisodeSummary, Level, VocabularyEntry};
use crate::state::collection::{CollectionError, EntryCollection, EntryId, EntrySlot};
use crate::state::reorder::{DragError, DragPhase, Placement, ReorderEngine};
use leptos::logging::{error, log, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub(crate) enum EditError {
    #[error("{0}")]
    Validation(String),
    #[error("\"{word}\" already exists in this episode")]
    Conflict { word: String },
    #[error("\"{word}\" is not in this episode")]
    NotFound { word: String },
    #[error("a reorder is still being saved")]
    ReorderInFlight,
    #[error("the episode is no longer open")]
    Closed,
    #[error(transparent)]
    Remote(#[from] ApiError),
}

impl From<CollectionError> for EditError {
    fn from(e: CollectionError) -> Self {
        match e {
            CollectionError::NotFound(word) => EditError::NotFound { word },
            CollectionError::Conflict(word) => EditError::Conflict { word },
            CollectionError::NotAPermutation => EditError::Validation(e.to_string()),
        }
    }
}

impl From<DragError> for EditError {
    fn from(e: DragError) -> Self {
        match e {
            DragError::InFlight => EditError::ReorderInFlight,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SubView {
    /// Vocabulary-filtered words; orderable and editable.
    Vocabulary,
    /// Every word of the episode, with the vocabulary flag.
    AllWords,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticeLevel {
    Info,
    Error,
}

/// Non-blocking user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Entry(EntryId),
    Episode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Word,
    Used,
    Vocabulary,
    Definition,
    Level,
    Publishable,
}

impl Field {
    fn describe(self) -> &'static str {
        match self {
            Field::Word => "rename word",
            Field::Used => "update word use",
            Field::Vocabulary => "update vocabulary status",
            Field::Definition => "save definition",
            Field::Level => "update word level",
            Field::Publishable => "update episode publishable status",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum FieldValue {
    Word(String),
    Flag(bool),
    Definition(Option<String>),
    Level(Level),
}

/// An optimistic write whose response has not settled yet.
#[derive(Clone, Debug)]
struct PendingWrite {
    target: Target,
    field: Field,
    previous: FieldValue,
    value: FieldValue,
}

struct SessionState {
    closed: bool,
    header: EpisodeSummary,
    entries: EntryCollection,
    view: SubView,
    reorder: ReorderEngine,
    /// Keyed by request token; at most one record per (target, field).
    pending: BTreeMap<u64, PendingWrite>,
    next_token: u64,
    /// Latest issued reload; older reload responses are dropped.
    load_token: u64,
    notices: Vec<Notice>,
    revision: u64,
}

impl SessionState {
    fn touch(&mut self) {
        self.revision += 1;
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
        self.touch();
    }

    fn take_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn read_field(&self, target: Target, field: Field) -> Option<FieldValue> {
        match target {
            Target::Episode => match field {
                Field::Publishable => Some(FieldValue::Flag(self.header.publishable)),
                _ => None,
            },
            Target::Entry(id) => {
                let e = &self.entries.by_id(id)?.entry;
                match field {
                    Field::Word => Some(FieldValue::Word(e.word.clone())),
                    Field::Used => Some(FieldValue::Flag(e.is_used)),
                    Field::Vocabulary => Some(FieldValue::Flag(e.is_vocabulary)),
                    Field::Definition => Some(FieldValue::Definition(e.selected_definition.clone())),
                    Field::Level => Some(FieldValue::Level(e.level)),
                    Field::Publishable => None,
                }
            }
        }
    }

    fn apply_field(
        &mut self,
        target: Target,
        field: Field,
        value: &FieldValue,
    ) -> Result<(), CollectionError> {
        match (target, field, value) {
            (Target::Episode, Field::Publishable, FieldValue::Flag(b)) => {
                self.header.publishable = *b;
            }
            (Target::Entry(id), Field::Word, FieldValue::Word(new_word)) => {
                let current = self
                    .entries
                    .by_id(id)
                    .map(|s| s.entry.word.clone())
                    .ok_or_else(|| CollectionError::NotFound(new_word.clone()))?;
                self.entries.rename(&current, new_word)?;
            }
            (Target::Entry(id), _, value) => {
                let slot = self
                    .entries
                    .by_id_mut(id)
                    .ok_or_else(|| CollectionError::NotFound(format!("#{id}")))?;
                match (field, value) {
                    (Field::Used, FieldValue::Flag(b)) => slot.entry.is_used = *b,
                    (Field::Vocabulary, FieldValue::Flag(b)) => slot.entry.is_vocabulary = *b,
                    (Field::Definition, FieldValue::Definition(d)) => {
                        slot.entry.selected_definition = d.clone()
                    }
                    (Field::Level, FieldValue::Level(l)) => slot.entry.level = *l,
                    _ => {}
                }
            }
            _ => {}
        }
        self.touch();
        Ok(())
    }

    /// Re-apply optimistic values of writes still in flight on top of freshly
    /// loaded state, so a reload cannot drop them.
    fn reapply_pending(&mut self) {
        // Renames first: they may move an entry to a fresh id that other
        // pending writes must follow.
        let mut tokens: Vec<(bool, u64)> = self
            .pending
            .iter()
            .map(|(t, p)| (p.field != Field::Word, *t))
            .collect();
        tokens.sort();
        for (_, token) in tokens {
            let Some(p) = self.pending.get(&token).cloned() else {
                continue;
            };
            let Target::Entry(old_id) = p.target else {
                let _ = self.apply_field(p.target, p.field, &p.value);
                continue;
            };

            let located = match (&p.field, &p.previous, &p.value) {
                (Field::Word, FieldValue::Word(prev), FieldValue::Word(next)) => self
                    .entries
                    .id_of(next)
                    .or_else(|| self.entries.id_of(prev)),
                _ => self.entries.by_id(old_id).map(|s| s.id),
            };
            let Some(new_id) = located else {
                continue;
            };

            if new_id != old_id {
                for rec in self.pending.values_mut() {
                    if rec.target == Target::Entry(old_id) {
                        rec.target = Target::Entry(new_id);
                    }
                }
            }
            if let Err(e) = self.apply_field(Target::Entry(new_id), p.field, &p.value) {
                warn!("could not re-apply pending {:?} after reload: {e}", p.field);
            }
        }
    }
}

/// Per-view context for one open episode.
///
/// Clones share state; handlers may hold a clone across awaits. No borrow is
/// ever held across a suspension point.
pub(crate) struct EditSession<S: WordStore> {
    store: Rc<S>,
    episode_id: String,
    state: Rc<RefCell<SessionState>>,
    on_change: Rc<RefCell<Option<Rc<dyn Fn(u64)>>>>,
}

impl<S: WordStore> Clone for EditSession<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            episode_id: self.episode_id.clone(),
            state: self.state.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

fn entries_from_detail(detail: &EpisodeDetail) -> Vec<VocabularyEntry> {
    detail
        .words
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, w)| VocabularyEntry::from_episode_word(w, i as u32 + 1))
        .collect()
}

fn expand_used(entries: &mut EntryCollection) {
    let words = entries.words();
    for w in words {
        if let Some(slot) = entries.get_mut(&w) {
            if slot.entry.is_used {
                slot.ui.expanded = true;
            }
        }
    }
}

fn normalize_new_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl<S: WordStore + 'static> EditSession<S> {
    /// Load the episode wholesale and start a session for it.
    pub async fn open(store: Rc<S>, episode_id: &str) -> Result<Self, EditError> {
        let detail = store.get_episode(episode_id).await.map_err(|e| {
            error!("failed to load episode {episode_id}: {e}");
            e
        })?;

        let mut entries = EntryCollection::from_entries(entries_from_detail(&detail));
        expand_used(&mut entries);

        log!("opened episode {episode_id} with {} words", entries.len());
        let state = SessionState {
            closed: false,
            header: detail.summary,
            entries,
            view: SubView::Vocabulary,
            reorder: ReorderEngine::new(),
            pending: BTreeMap::new(),
            next_token: 0,
            load_token: 0,
            notices: Vec::new(),
            revision: 1,
        };

        Ok(Self {
            store,
            episode_id: episode_id.to_string(),
            state: Rc::new(RefCell::new(state)),
            on_change: Rc::new(RefCell::new(None)),
        })
    }

    /// Called with the new revision after every state change.
    pub fn set_on_change(&self, f: impl Fn(u64) + 'static) {
        *self.on_change.borrow_mut() = Some(Rc::new(f));
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.borrow())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (out, before, after) = {
            let mut st = self.state.borrow_mut();
            let before = st.revision;
            let out = f(&mut st);
            (out, before, st.revision)
        };
        if after != before {
            let cb = self.on_change.borrow().clone();
            if let Some(cb) = cb {
                cb(after);
            }
        }
        out
    }

    pub fn revision(&self) -> u64 {
        self.read(|s| s.revision)
    }

    pub fn header(&self) -> EpisodeSummary {
        self.read(|s| s.header.clone())
    }

    pub fn view(&self) -> SubView {
        self.read(|s| s.view)
    }

    /// Render projection, in position order.
    pub fn snapshot(&self) -> Vec<EntrySlot> {
        self.read(|s| s.entries.iter().cloned().collect())
    }

    pub fn entry(&self, word: &str) -> Option<EntrySlot> {
        self.read(|s| s.entries.get(word).cloned())
    }

    pub fn entry_by_id(&self, id: EntryId) -> Option<EntrySlot> {
        self.read(|s| s.entries.by_id(id).cloned())
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.read(|s| s.reorder.phase().clone())
    }

    pub fn has_pending_writes(&self) -> bool {
        self.read(|s| !s.pending.is_empty())
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.mutate(|s| std::mem::take(&mut s.notices))
    }

    pub fn is_closed(&self) -> bool {
        self.read(|s| s.closed)
    }

    /// Leave the edit view. Returns the season the list should re-open.
    /// Responses that arrive afterwards no longer touch this session.
    pub fn close(&self) -> Option<String> {
        self.mutate(|s| {
            s.closed = true;
            s.reorder.finish();
            s.touch();
            s.header.season.clone()
        })
    }

    fn ensure_open(&self) -> Result<(), EditError> {
        if self.is_closed() {
            Err(EditError::Closed)
        } else {
            Ok(())
        }
    }

    fn entry_id(&self, word: &str) -> Result<EntryId, EditError> {
        self.read(|s| s.entries.id_of(word))
            .ok_or_else(|| EditError::NotFound {
                word: word.to_string(),
            })
    }

    /// Optimistic write: apply locally, send, then settle.
    ///
    /// Only the latest write per (target, field) may settle. A failed latest
    /// write restores the last value the server confirmed, so a superseded
    /// write hands its own `previous` on, and a superseded success moves the
    /// survivor's `previous` up to the value it stored.
    ///
    /// Requests address entries by their current local key. A field write sent
    /// while a rename of the same entry is unsettled carries the new key.
    async fn write<Fut>(
        &self,
        target: Target,
        field: Field,
        value: FieldValue,
        send: impl FnOnce(Rc<S>, String) -> Fut,
    ) -> Result<(), EditError>
    where
        Fut: std::future::Future<Output = Result<(), ApiError>>,
    {
        self.ensure_open()?;

        let (token, path_word) = self.mutate(|s| {
            let current = match s.read_field(target, field) {
                Some(v) => v,
                None => {
                    return Err(EditError::NotFound {
                        word: format!("{target:?}"),
                    })
                }
            };
            // The request addresses the entry by its key before this write.
            let path_word = match (&current, target) {
                (FieldValue::Word(w), _) => w.clone(),
                (_, Target::Entry(id)) => s
                    .entries
                    .by_id(id)
                    .map(|slot| slot.entry.word.clone())
                    .unwrap_or_default(),
                (_, Target::Episode) => String::new(),
            };

            s.apply_field(target, field, &value)?;

            let superseded = s
                .pending
                .iter()
                .find(|(_, p)| p.target == target && p.field == field)
                .map(|(t, p)| (*t, p.previous.clone()));
            let previous = match superseded {
                Some((old, confirmed)) => {
                    s.pending.remove(&old);
                    confirmed
                }
                None => current,
            };
            let token = s.take_token();
            s.pending.insert(
                token,
                PendingWrite {
                    target,
                    field,
                    previous,
                    value: value.clone(),
                },
            );
            Ok((token, path_word))
        })?;

        let result = send(self.store.clone(), path_word.clone()).await;

        self.mutate(|s| {
            if s.closed {
                return;
            }
            let Some(p) = s.pending.remove(&token) else {
                match &result {
                    Ok(()) => {
                        if let Some(newer) = s
                            .pending
                            .values_mut()
                            .find(|p| p.target == target && p.field == field)
                        {
                            newer.previous = value.clone();
                        }
                    }
                    Err(_) => warn!(
                        "discarding stale failure for {} on \"{path_word}\" (superseded)",
                        field.describe()
                    ),
                }
                return;
            };
            if let Err(e) = &result {
                error!("failed to {} for \"{path_word}\": {e}", field.describe());
                if let Err(rb) = s.apply_field(p.target, p.field, &p.previous) {
                    warn!("rollback of {} skipped: {rb}", field.describe());
                }
                s.notify(
                    NoticeLevel::Error,
                    format!("Failed to {}. The change was undone.", field.describe()),
                );
            }
        });

        result.map_err(EditError::from)
    }

    pub async fn set_used(&self, word: &str, is_used: bool) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        let episode_id = self.episode_id.clone();
        self.write(
            Target::Entry(id),
            Field::Used,
            FieldValue::Flag(is_used),
            move |store, w| async move { store.set_word_used(&episode_id, &w, is_used).await },
        )
        .await
    }

    pub async fn set_vocabulary(&self, word: &str, is_vocabulary: bool) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.write(
            Target::Entry(id),
            Field::Vocabulary,
            FieldValue::Flag(is_vocabulary),
            move |store, w| async move { store.set_word_vocabulary(&w, is_vocabulary).await },
        )
        .await
    }

    pub async fn set_level(&self, word: &str, level: Level) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        let episode_id = self.episode_id.clone();
        self.write(
            Target::Entry(id),
            Field::Level,
            FieldValue::Level(level),
            move |store, w| async move { store.set_word_level(&episode_id, &w, level).await },
        )
        .await
    }

    pub async fn set_publishable(&self, publishable: bool) -> Result<(), EditError> {
        let episode_id = self.episode_id.clone();
        self.write(
            Target::Episode,
            Field::Publishable,
            FieldValue::Flag(publishable),
            move |store, _| async move { store.set_publishable(&episode_id, publishable).await },
        )
        .await
    }

    /// Persist `definition` verbatim as the selected definition.
    async fn save_definition(&self, id: EntryId, definition: String) -> Result<(), EditError> {
        let episode_id = self.episode_id.clone();
        let body = definition.clone();
        self.write(
            Target::Entry(id),
            Field::Definition,
            FieldValue::Definition(Some(definition)),
            move |store, w| async move { store.set_word_definition(&episode_id, &w, &body).await },
        )
        .await
    }

    /// Pick one of the fetched candidates (radio option).
    pub async fn pick_definition(&self, word: &str, definition: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.custom_active = false;
            }
            s.touch();
        });
        self.save_definition(id, definition.to_string()).await
    }

    /// Focusing the custom text box selects the "custom" option before any
    /// text is typed.
    pub fn focus_custom(&self, word: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.custom_active = true;
                if slot.ui.custom_draft.is_empty() && slot.entry.definitions.is_some() {
                    slot.ui.custom_draft = custom_text(&slot.entry).unwrap_or_default();
                }
            }
            s.touch();
        });
        Ok(())
    }

    pub fn edit_custom(&self, word: &str, text: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.custom_draft = text.to_string();
            }
            s.touch();
        });
        Ok(())
    }

    /// Focus left the custom box. Persists the trimmed draft only when the
    /// custom option is still selected and the draft is non-empty.
    /// Returns whether a write was issued.
    pub async fn commit_custom(&self, word: &str) -> Result<bool, EditError> {
        let id = self.entry_id(word)?;
        let draft = self.read(|s| {
            s.entries
                .by_id(id)
                .filter(|slot| slot.ui.custom_active)
                .map(|slot| slot.ui.custom_draft.trim().to_string())
        });
        let Some(text) = draft.filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        self.save_definition(id, text).await?;
        Ok(true)
    }

    pub fn start_rename(&self, word: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.rename_draft = Some(slot.entry.word.clone());
            }
            s.touch();
        });
        Ok(())
    }

    pub fn edit_rename(&self, word: &str, text: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.rename_draft = Some(text.to_string());
            }
            s.touch();
        });
        Ok(())
    }

    pub fn cancel_rename(&self, word: &str) -> Result<(), EditError> {
        let id = self.entry_id(word)?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.rename_draft = None;
            }
            s.touch();
        });
        Ok(())
    }

    /// Save the inline rename buffer. An unchanged buffer just closes the editor.
    pub async fn commit_rename(&self, word: &str) -> Result<bool, EditError> {
        let id = self.entry_id(word)?;
        let draft = self.read(|s| s.entries.by_id(id).and_then(|slot| slot.ui.rename_draft.clone()));
        let Some(draft) = draft else {
            return Ok(false);
        };
        if draft.trim() == word {
            self.cancel_rename(word)?;
            return Ok(false);
        }

        self.rename_word(word, &draft).await?;
        self.mutate(|s| {
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.rename_draft = None;
            }
            s.touch();
        });
        Ok(true)
    }

    /// Rekey `old_word` to `new_word` locally, then persist. On failure the
    /// entry is renamed back when the old key is still free.
    pub async fn rename_word(&self, old_word: &str, new_word: &str) -> Result<(), EditError> {
        let new_word = new_word.trim().to_string();
        if new_word.is_empty() {
            return Err(EditError::Validation("word cannot be empty".to_string()));
        }
        if new_word == old_word {
            return Err(EditError::Validation("word is unchanged".to_string()));
        }
        let id = self.entry_id(old_word)?;
        if self.read(|s| s.entries.contains(&new_word)) {
            return Err(EditError::Conflict { word: new_word });
        }

        let episode_id = self.episode_id.clone();
        let target = new_word.clone();
        self.write(
            Target::Entry(id),
            Field::Word,
            FieldValue::Word(new_word),
            move |store, w| async move { store.rename_word(&episode_id, &w, &target).await },
        )
        .await
    }

    /// Toggle the definitions panel. The first open fetches candidates; a
    /// failed fetch is retried on the next open.
    pub async fn expand(&self, word: &str) -> Result<(), EditError> {
        self.ensure_open()?;
        let id = self.entry_id(word)?;

        let fetch = self.mutate(|s| {
            let slot = s.entries.by_id_mut(id)?;
            if slot.ui.expanded {
                slot.ui.expanded = false;
                s.touch();
                return None;
            }
            slot.ui.expanded = true;
            let needs_fetch = slot.entry.definitions.is_none() && !slot.ui.definitions_loading;
            if needs_fetch {
                slot.ui.definitions_loading = true;
            }
            s.touch();
            needs_fetch.then(|| slot_word(s, id))
        });
        let Some(fetch_word) = fetch else {
            return Ok(());
        };
        self.fetch_definitions(id, fetch_word).await
    }

    /// Fetch candidates for panels that are open without them, such as used
    /// words expanded on load. Failures raise a notice per word.
    pub async fn prefetch_expanded(&self) {
        if self.is_closed() {
            return;
        }
        let wanted = self.mutate(|s| {
            let mut wanted = Vec::new();
            for word in s.entries.words() {
                if let Some(slot) = s.entries.get_mut(&word) {
                    if slot.ui.expanded
                        && slot.entry.definitions.is_none()
                        && !slot.ui.definitions_loading
                    {
                        slot.ui.definitions_loading = true;
                        wanted.push((slot.id, word));
                    }
                }
            }
            if !wanted.is_empty() {
                s.touch();
            }
            wanted
        });
        for (id, word) in wanted {
            let _ = self.fetch_definitions(id, word).await;
        }
    }

    async fn fetch_definitions(&self, id: EntryId, fetch_word: String) -> Result<(), EditError> {
        let result = self.store.get_definitions(&fetch_word).await;

        self.mutate(|s| {
            if s.closed {
                return;
            }
            if let Some(slot) = s.entries.by_id_mut(id) {
                slot.ui.definitions_loading = false;
                if let Ok(defs) = &result {
                    slot.entry.definitions = Some(defs.clone());
                    if slot.ui.custom_draft.is_empty() {
                        slot.ui.custom_draft = custom_text(&slot.entry).unwrap_or_default();
                    }
                }
            }
            s.touch();
            if let Err(e) = &result {
                error!("failed to fetch definitions for \"{fetch_word}\": {e}");
                s.notify(
                    NoticeLevel::Error,
                    format!("Could not load definitions for \"{fetch_word}\"."),
                );
            }
        });

        result.map(|_| ()).map_err(EditError::from)
    }

    pub fn begin_drag(&self, word: &str) -> Result<(), EditError> {
        self.ensure_open()?;
        if self.view() != SubView::Vocabulary {
            return Err(EditError::Validation(
                "words can only be reordered in the vocabulary view".to_string(),
            ));
        }
        self.entry_id(word)?;
        self.mutate(|s| {
            let r = s.reorder.begin(word);
            s.touch();
            r
        })?;
        Ok(())
    }

    pub fn hover(&self, target: &str, placement: Placement) {
        self.mutate(|s| {
            let before = s.reorder.phase().clone();
            s.reorder.hover(target, placement);
            if *s.reorder.phase() != before {
                s.touch();
            }
        });
    }

    pub fn cancel_drag(&self) {
        self.mutate(|s| {
            if !s.reorder.is_persisting() && *s.reorder.phase() != DragPhase::Idle {
                s.reorder.cancel();
                s.touch();
            }
        });
    }

    /// Finish the gesture on `target`. Returns `Ok(false)` for a drop that
    /// changes nothing. On persist failure the episode is reloaded in full.
    pub async fn drop_on(&self, target: &str, placement: Placement) -> Result<bool, EditError> {
        self.ensure_open()?;

        let word_orders = self.mutate(|s| {
            let current = s.entries.words();
            let order = s.reorder.drop_on(&current, target, placement);
            s.touch();
            let order = order?;
            if let Err(e) = s.entries.reorder_from(&order) {
                warn!("drop produced an invalid order: {e}");
                s.reorder.finish();
                return None;
            }
            Some(
                s.entries
                    .iter()
                    .map(|slot| WordOrder {
                        word: slot.entry.word.clone(),
                        order: slot.entry.position,
                    })
                    .collect::<Vec<_>>(),
            )
        });
        let Some(word_orders) = word_orders else {
            return Ok(false);
        };

        let result = self
            .store
            .reorder_words(&self.episode_id, word_orders)
            .await;

        self.mutate(|s| {
            s.reorder.finish();
            s.touch();
        });

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("failed to save word order for {}: {e}", self.episode_id);
                if self.is_closed() {
                    return Err(e.into());
                }
                self.mutate(|s| {
                    s.notify(
                        NoticeLevel::Error,
                        "Failed to update word order. Reloaded from the server.".to_string(),
                    )
                });
                if let Err(reload) = self.reload().await {
                    warn!("reload after failed reorder also failed: {reload}");
                }
                Err(e.into())
            }
        }
    }

    /// Append a word, then reload the episode for the server's canonical fields.
    pub async fn add_word(&self, raw: &str) -> Result<(), EditError> {
        self.ensure_open()?;
        let word = normalize_new_word(raw);
        if word.is_empty() {
            return Err(EditError::Validation("word cannot be empty".to_string()));
        }
        if self.read(|s| s.entries.contains(&word)) {
            return Err(EditError::Conflict { word });
        }

        self.mutate(|s| {
            let position = s.entries.max_position() + 1;
            s.entries.upsert(VocabularyEntry::new(&word, position));
            s.touch();
        });

        let result = self.store.add_word(&self.episode_id, &word).await;
        if result.is_ok() {
            log!("added \"{word}\" to {}", self.episode_id);
            self.mutate(|s| s.notify(NoticeLevel::Info, format!("Added \"{word}\".")));
        }
        if let Err(e) = &result {
            error!("failed to add \"{word}\" to {}: {e}", self.episode_id);
            self.mutate(|s| {
                s.notify(
                    NoticeLevel::Error,
                    "Failed to add word. Please try again.".to_string(),
                )
            });
        }

        if !self.is_closed() {
            if let Err(reload) = self.reload().await {
                warn!("reload after adding \"{word}\" failed: {reload}");
            }
        }

        result.map(|_| ()).map_err(EditError::from)
    }

    pub async fn show_all_words(&self) -> Result<(), EditError> {
        self.switch_view(SubView::AllWords).await
    }

    pub async fn show_vocabulary(&self) -> Result<(), EditError> {
        self.switch_view(SubView::Vocabulary).await
    }

    async fn switch_view(&self, view: SubView) -> Result<(), EditError> {
        self.ensure_open()?;
        if self.read(|s| s.reorder.is_persisting()) {
            return Err(EditError::ReorderInFlight);
        }
        self.mutate(|s| {
            s.view = view;
            s.reorder.finish();
            s.touch();
        });
        self.reload().await
    }

    /// Replace local entries with authoritative state for the active view.
    /// Writes still in flight are re-applied on top.
    pub async fn reload(&self) -> Result<(), EditError> {
        self.ensure_open()?;
        let (token, view) = self.mutate(|s| {
            s.load_token += 1;
            (s.load_token, s.view)
        });

        let fetched = match view {
            SubView::Vocabulary => self
                .store
                .get_episode(&self.episode_id)
                .await
                .map(|d| (Some(d.summary.clone()), entries_from_detail(&d))),
            SubView::AllWords => self
                .store
                .get_all_words(&self.episode_id)
                .await
                .map(|rows| {
                    let entries = rows
                        .into_iter()
                        .enumerate()
                        .map(|(i, r)| VocabularyEntry::from_all_words_row(r, i as u32 + 1))
                        .collect();
                    (None, entries)
                }),
        };

        let (header, entries) = match fetched {
            Ok(x) => x,
            Err(e) => {
                error!("failed to reload episode {}: {e}", self.episode_id);
                self.mutate(|s| {
                    s.notify(
                        NoticeLevel::Error,
                        "Failed to reload the episode from the server.".to_string(),
                    )
                });
                return Err(e.into());
            }
        };

        self.mutate(|s| {
            if s.closed || s.load_token != token || s.view != view {
                log!("dropping stale reload of {}", self.episode_id);
                return;
            }
            if let Some(h) = header {
                s.header = h;
            }
            s.entries.replace_all(entries);
            if view == SubView::Vocabulary {
                expand_used(&mut s.entries);
            }
            s.reapply_pending();
            s.touch();
        });
        if view == SubView::Vocabulary {
            self.prefetch_expanded().await;
        }
        Ok(())
    }
}

fn slot_word(s: &SessionState, id: EntryId) -> String {
    s.entries
        .by_id(id)
        .map(|slot| slot.entry.word.clone())
        .unwrap_or_default()
}

/// The selected definition when it is custom text.
fn custom_text(entry: &VocabularyEntry) -> Option<String> {
    match entry.definition_choice() {
        crate::models::DefinitionChoice::Custom(t) => Some(t),
        _ => None,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
