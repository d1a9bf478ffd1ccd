use super::*;
use crate::api::ApiResult;
use crate::models::{AddedWord, AllWordsRow, EpisodeWord};
use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::block_on;
use std::collections::{HashMap, HashSet};

struct ServerWord {
    word: EpisodeWord,
    is_vocabulary: bool,
}

/// In-memory collaborator API. Writes land only when they succeed; any
/// operation can be made to fail or be held until released.
struct FakeStore {
    summary: RefCell<EpisodeSummary>,
    words: RefCell<Vec<ServerWord>>,
    definitions: HashMap<String, Vec<String>>,
    failing: RefCell<HashSet<&'static str>>,
    holds: RefCell<HashMap<&'static str, oneshot::Receiver<()>>>,
    calls: RefCell<Vec<String>>,
    reorders: RefCell<Vec<Vec<WordOrder>>>,
}

impl FakeStore {
    fn with_words(words: &[&str]) -> Rc<Self> {
        let mut definitions = HashMap::new();
        definitions.insert(
            "cat".to_string(),
            vec!["a small feline".to_string(), "a jazz enthusiast".to_string()],
        );
        Rc::new(Self {
            summary: RefCell::new(EpisodeSummary {
                episode_id: "s01e01".to_string(),
                episode_name: "Pilot".to_string(),
                season: Some("1".to_string()),
                episode_number: "1".to_string(),
                publishable: false,
            }),
            words: RefCell::new(
                words
                    .iter()
                    .map(|w| ServerWord {
                        word: EpisodeWord {
                            word: w.to_string(),
                            original_form: Some(w.to_string()),
                            is_used: false,
                            selected_definition: None,
                            level: Level::None,
                        },
                        is_vocabulary: true,
                    })
                    .collect(),
            ),
            definitions,
            failing: RefCell::new(HashSet::new()),
            holds: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            reorders: RefCell::new(Vec::new()),
        })
    }

    fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    fn heal(&self, op: &'static str) {
        self.failing.borrow_mut().remove(op);
    }

    fn hold(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.holds.borrow_mut().insert(op, rx);
        tx
    }

    fn count(&self, op: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == op).count()
    }

    fn server_words(&self) -> Vec<String> {
        self.words.borrow().iter().map(|w| w.word.word.clone()).collect()
    }

    fn with_server_word<R>(&self, word: &str, f: impl FnOnce(&mut ServerWord) -> R) -> Option<R> {
        self.words
            .borrow_mut()
            .iter_mut()
            .find(|w| w.word.word == word)
            .map(f)
    }

    async fn gate(&self, op: &'static str) -> ApiResult<()> {
        self.calls.borrow_mut().push(op.to_string());
        let held = self.holds.borrow_mut().remove(op);
        if let Some(rx) = held {
            let _ = rx.await;
        }
        if self.failing.borrow().contains(op) {
            Err(ApiError::rejected(500, "Internal Server Error", op))
        } else {
            Ok(())
        }
    }
}

#[async_trait(?Send)]
impl WordStore for FakeStore {
    async fn list_episodes(&self) -> ApiResult<Vec<EpisodeSummary>> {
        self.gate("list_episodes").await?;
        Ok(vec![self.summary.borrow().clone()])
    }

    async fn get_episode(&self, _episode_id: &str) -> ApiResult<EpisodeDetail> {
        self.gate("get_episode").await?;
        Ok(EpisodeDetail {
            summary: self.summary.borrow().clone(),
            words: self
                .words
                .borrow()
                .iter()
                .filter(|w| w.is_vocabulary)
                .map(|w| w.word.clone())
                .collect(),
        })
    }

    async fn get_all_words(&self, _episode_id: &str) -> ApiResult<Vec<AllWordsRow>> {
        self.gate("get_all_words").await?;
        Ok(self
            .words
            .borrow()
            .iter()
            .map(|w| AllWordsRow {
                word: w.word.word.clone(),
                original_form: w.word.original_form.clone(),
                is_used: w.word.is_used,
                is_vocabulary: w.is_vocabulary,
            })
            .collect())
    }

    async fn get_definitions(&self, word: &str) -> ApiResult<Vec<String>> {
        self.gate("get_definitions").await?;
        Ok(self.definitions.get(word).cloned().unwrap_or_default())
    }

    async fn rename_word(&self, _episode_id: &str, word: &str, new_word: &str) -> ApiResult<()> {
        self.gate("rename_word").await?;
        self.with_server_word(word, |w| w.word.word = new_word.to_string());
        Ok(())
    }

    async fn set_word_used(&self, _episode_id: &str, word: &str, is_used: bool) -> ApiResult<()> {
        self.gate("set_word_used").await?;
        self.with_server_word(word, |w| w.word.is_used = is_used);
        Ok(())
    }

    async fn set_word_definition(
        &self,
        _episode_id: &str,
        word: &str,
        definition: &str,
    ) -> ApiResult<()> {
        self.gate("set_word_definition").await?;
        self.with_server_word(word, |w| {
            w.word.selected_definition = Some(definition.to_string())
        });
        Ok(())
    }

    async fn set_word_level(&self, _episode_id: &str, word: &str, level: Level) -> ApiResult<()> {
        self.gate("set_word_level").await?;
        self.with_server_word(word, |w| w.word.level = level);
        Ok(())
    }

    async fn set_word_vocabulary(&self, word: &str, is_vocabulary: bool) -> ApiResult<()> {
        self.gate("set_word_vocabulary").await?;
        self.with_server_word(word, |w| w.is_vocabulary = is_vocabulary);
        Ok(())
    }

    async fn set_publishable(&self, _episode_id: &str, publishable: bool) -> ApiResult<()> {
        self.gate("set_publishable").await?;
        self.summary.borrow_mut().publishable = publishable;
        Ok(())
    }

    async fn add_word(&self, _episode_id: &str, word: &str) -> ApiResult<AddedWord> {
        self.gate("add_word").await?;
        self.words.borrow_mut().push(ServerWord {
            word: EpisodeWord {
                word: word.to_string(),
                original_form: Some(word.to_string()),
                is_used: false,
                selected_definition: None,
                level: Level::None,
            },
            is_vocabulary: true,
        });
        Ok(AddedWord {
            word: word.to_string(),
            is_used: false,
            definitions: vec![],
        })
    }

    async fn reorder_words(&self, _episode_id: &str, word_orders: Vec<WordOrder>) -> ApiResult<()> {
        self.gate("reorder_words").await?;
        self.reorders.borrow_mut().push(word_orders.clone());
        let rank: HashMap<String, u32> = word_orders
            .into_iter()
            .map(|o| (o.word, o.order))
            .collect();
        self.words
            .borrow_mut()
            .sort_by_key(|w| rank.get(&w.word.word).copied().unwrap_or(u32::MAX));
        Ok(())
    }
}

fn open(store: &Rc<FakeStore>) -> EditSession<FakeStore> {
    block_on(EditSession::open(store.clone(), "s01e01")).expect("episode should open")
}

fn positions(session: &EditSession<FakeStore>) -> Vec<(String, u32)> {
    session
        .snapshot()
        .into_iter()
        .map(|s| (s.entry.word, s.entry.position))
        .collect()
}

fn pairs(xs: &[(&str, u32)]) -> Vec<(String, u32)> {
    xs.iter().map(|(w, p)| (w.to_string(), *p)).collect()
}

#[test]
fn test_open_loads_dense_positions_and_expands_used_words() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    store.with_server_word("dog", |w| w.word.is_used = true);

    let session = open(&store);
    assert_eq!(positions(&session), pairs(&[("cat", 1), ("dog", 2), ("fox", 3)]));
    assert!(session.entry("dog").expect("dog").ui.expanded);
    assert!(!session.entry("cat").expect("cat").ui.expanded);
    assert_eq!(session.header().episode_name, "Pilot");
}

#[test]
fn test_drag_fox_above_cat_persists_full_order() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);

    session.begin_drag("fox").expect("begin");
    session.hover("cat", Placement::Above);
    let changed = block_on(session.drop_on("cat", Placement::Above)).expect("reorder");

    assert!(changed);
    assert_eq!(positions(&session), pairs(&[("fox", 1), ("cat", 2), ("dog", 3)]));
    assert_eq!(
        store.reorders.borrow().last().cloned(),
        Some(vec![
            WordOrder { word: "fox".to_string(), order: 1 },
            WordOrder { word: "cat".to_string(), order: 2 },
            WordOrder { word: "dog".to_string(), order: 3 },
        ])
    );
    assert_eq!(session.drag_phase(), DragPhase::Idle);
}

#[test]
fn test_drop_on_self_or_cancel_is_noop() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);

    session.begin_drag("dog").expect("begin");
    let changed = block_on(session.drop_on("dog", Placement::Below)).expect("noop");
    assert!(!changed);
    assert_eq!(session.drag_phase(), DragPhase::Idle);

    session.begin_drag("dog").expect("begin");
    session.hover("fox", Placement::Below);
    session.cancel_drag();
    assert_eq!(session.drag_phase(), DragPhase::Idle);

    assert_eq!(positions(&session), pairs(&[("cat", 1), ("dog", 2), ("fox", 3)]));
    assert_eq!(store.count("reorder_words"), 0);
}

#[test]
fn test_reorder_failure_reloads_server_state() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);
    store.fail("reorder_words");

    session.begin_drag("cat").expect("begin");
    let err = block_on(session.drop_on("fox", Placement::Below)).unwrap_err();
    assert!(matches!(err, EditError::Remote(_)));

    assert_eq!(session.snapshot().iter().map(|s| s.entry.word.clone()).collect::<Vec<_>>(), store.server_words());
    assert_eq!(positions(&session), pairs(&[("cat", 1), ("dog", 2), ("fox", 3)]));
    assert_eq!(store.count("get_episode"), 2);
    assert_eq!(session.drag_phase(), DragPhase::Idle);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_new_gesture_rejected_while_reorder_persists() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);
    let release = store.hold("reorder_words");

    session.begin_drag("fox").expect("begin");
    let (persisted, second) = block_on(async {
        futures::join!(session.drop_on("cat", Placement::Above), async {
            let r = session.begin_drag("dog");
            let _ = release.send(());
            r
        })
    });

    assert!(persisted.expect("first reorder"));
    assert!(matches!(second, Err(EditError::ReorderInFlight)));
    session.begin_drag("dog").expect("idle again after persisting");
}

#[test]
fn test_rename_conflict_is_rejected_before_any_request() {
    let store = FakeStore::with_words(&["cat", "dog"]);
    let session = open(&store);
    block_on(session.set_level("cat", Level::High)).expect("level");
    let cat = session.entry("cat");
    let dog = session.entry("dog");

    let err = block_on(session.rename_word("cat", " dog ")).unwrap_err();
    assert!(matches!(err, EditError::Conflict { ref word } if word == "dog"));
    assert_eq!(session.entry("cat"), cat);
    assert_eq!(session.entry("dog"), dog);
    assert_eq!(store.count("rename_word"), 0);
}

#[test]
fn test_rename_validation() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    assert!(matches!(
        block_on(session.rename_word("cat", "   ")),
        Err(EditError::Validation(_))
    ));
    assert!(matches!(
        block_on(session.rename_word("cat", "cat")),
        Err(EditError::Validation(_))
    ));
    assert!(matches!(
        block_on(session.rename_word("owl", "hawk")),
        Err(EditError::NotFound { .. })
    ));
    assert_eq!(store.count("rename_word"), 0);
}

#[test]
fn test_rename_moves_definitions_and_selection_to_new_key() {
    let store = FakeStore::with_words(&["cat", "dog"]);
    let session = open(&store);

    block_on(session.expand("cat")).expect("definitions");
    block_on(session.pick_definition("cat", "a jazz enthusiast")).expect("pick");
    block_on(session.rename_word("cat", "kitten")).expect("rename");

    assert!(session.entry("cat").is_none());
    let kitten = session.entry("kitten").expect("kitten");
    assert_eq!(kitten.entry.selected_definition.as_deref(), Some("a jazz enthusiast"));
    assert_eq!(kitten.entry.definitions.as_ref().map(|d| d.len()), Some(2));
    assert!(kitten.ui.expanded);
    assert_eq!(kitten.entry.position, 1);
    assert_eq!(store.server_words(), vec!["kitten".to_string(), "dog".to_string()]);

    // Cached under the new key: no refetch on re-open.
    block_on(session.expand("kitten")).expect("collapse");
    block_on(session.expand("kitten")).expect("expand");
    assert_eq!(store.count("get_definitions"), 1);
}

#[test]
fn test_rename_failure_restores_old_key() {
    let store = FakeStore::with_words(&["cat", "dog"]);
    let session = open(&store);
    store.fail("rename_word");

    let err = block_on(session.rename_word("cat", "kitten")).unwrap_err();
    assert!(matches!(err, EditError::Remote(_)));
    assert!(session.entry("kitten").is_none());
    assert_eq!(session.entry("cat").expect("cat").entry.position, 1);
    assert!(!session.has_pending_writes());
    assert_eq!(session.take_notices().len(), 1);
}

#[test]
fn test_inline_rename_buffer() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);

    session.start_rename("cat").expect("start");
    assert!(!block_on(session.commit_rename("cat")).expect("unchanged closes editor"));
    assert!(session.entry("cat").expect("cat").ui.rename_draft.is_none());

    session.start_rename("cat").expect("start");
    session.edit_rename("cat", "kitten ").expect("edit");
    assert!(block_on(session.commit_rename("cat")).expect("commit"));
    let kitten = session.entry("kitten").expect("kitten");
    assert!(kitten.ui.rename_draft.is_none());
}

#[test]
fn test_custom_definition_persists_trimmed_text() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);

    session.focus_custom("cat").expect("focus");
    assert!(session.entry("cat").expect("cat").ui.custom_active);
    session.edit_custom("cat", "  a pet that purrs \n").expect("edit");

    assert!(block_on(session.commit_custom("cat")).expect("commit"));
    let cat = session.entry("cat").expect("cat");
    assert_eq!(cat.entry.selected_definition.as_deref(), Some("a pet that purrs"));
    assert_eq!(
        store
            .with_server_word("cat", |w| w.word.selected_definition.clone())
            .flatten()
            .as_deref(),
        Some("a pet that purrs")
    );
}

#[test]
fn test_empty_custom_box_persists_nothing() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);

    session.focus_custom("cat").expect("focus");
    session.edit_custom("cat", "   ").expect("edit");
    assert!(!block_on(session.commit_custom("cat")).expect("nothing to save"));
    assert_eq!(store.count("set_word_definition"), 0);
    assert!(session.entry("cat").expect("cat").entry.selected_definition.is_none());
}

#[test]
fn test_custom_text_ignored_once_a_candidate_is_picked() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    block_on(session.expand("cat")).expect("definitions");

    session.focus_custom("cat").expect("focus");
    session.edit_custom("cat", "typed but abandoned").expect("edit");
    block_on(session.pick_definition("cat", "a small feline")).expect("pick");
    assert!(!block_on(session.commit_custom("cat")).expect("no write"));

    assert_eq!(store.count("set_word_definition"), 1);
    assert_eq!(
        session.entry("cat").expect("cat").entry.definition_choice(),
        crate::models::DefinitionChoice::Candidate(0)
    );
}

#[test]
fn test_definitions_fetch_is_retried_after_failure() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    store.fail("get_definitions");

    assert!(block_on(session.expand("cat")).is_err());
    assert!(session.entry("cat").expect("cat").entry.definitions.is_none());

    store.heal("get_definitions");
    block_on(session.expand("cat")).expect("collapse");
    block_on(session.expand("cat")).expect("expand retries");
    assert_eq!(store.count("get_definitions"), 2);
    assert_eq!(
        session.entry("cat").expect("cat").entry.definitions.map(|d| d.len()),
        Some(2)
    );
}

#[test]
fn test_failed_level_write_rolls_back() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    block_on(session.set_level("cat", Level::Middle)).expect("level");

    store.fail("set_word_level");
    assert!(block_on(session.set_level("cat", Level::Graduate)).is_err());
    assert_eq!(session.entry("cat").expect("cat").entry.level, Level::Middle);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("level"));
}

#[test]
fn test_stale_failure_does_not_undo_newer_write() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    let release = store.hold("set_word_level");

    let (first, second) = block_on(async {
        futures::join!(session.set_level("cat", Level::High), async {
            let r = session.set_level("cat", Level::College).await;
            store.fail("set_word_level");
            let _ = release.send(());
            r
        })
    });

    assert!(second.is_ok());
    assert!(first.is_err());
    assert_eq!(session.entry("cat").expect("cat").entry.level, Level::College);
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_failed_flag_writes_roll_back() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    store.fail("set_word_used");
    store.fail("set_publishable");

    assert!(block_on(session.set_used("cat", true)).is_err());
    assert!(!session.entry("cat").expect("cat").entry.is_used);

    assert!(block_on(session.set_publishable(true)).is_err());
    assert!(!session.header().publishable);
    assert_eq!(session.take_notices().len(), 2);

    store.heal("set_publishable");
    block_on(session.set_publishable(true)).expect("publishable");
    assert!(session.header().publishable);
    assert!(store.summary.borrow().publishable);
}

#[test]
fn test_add_word_appends_and_reloads() {
    let store = FakeStore::with_words(&["a", "b", "c", "d", "e"]);
    let session = open(&store);

    block_on(session.add_word("  Whale ")).expect("add");

    let whale = session.entry("whale").expect("whale");
    assert_eq!(whale.entry.position, 6);
    assert!(!whale.entry.is_used);
    assert_eq!(whale.entry.level, Level::None);
    assert!(whale.entry.definitions.is_none());
    assert_eq!(store.count("get_episode"), 2);
    assert_eq!(store.count("get_definitions"), 0);
}

#[test]
fn test_add_word_validation_and_failure() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);

    assert!(matches!(
        block_on(session.add_word("  ")),
        Err(EditError::Validation(_))
    ));
    assert!(matches!(
        block_on(session.add_word("CAT")),
        Err(EditError::Conflict { .. })
    ));

    store.fail("add_word");
    assert!(block_on(session.add_word("owl")).is_err());
    // The reload drops the optimistic entry the server never stored.
    assert!(session.entry("owl").is_none());
    assert_eq!(positions(&session), pairs(&[("cat", 1)]));
}

#[test]
fn test_used_toggle_and_reorder_interleaved() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);
    let release = store.hold("set_word_used");

    session.begin_drag("fox").expect("begin");
    let (used, reordered) = block_on(async {
        futures::join!(session.set_used("cat", true), async {
            let r = session.drop_on("cat", Placement::Above).await;
            let _ = release.send(());
            r
        })
    });

    used.expect("use update");
    assert!(reordered.expect("reorder"));
    assert_eq!(positions(&session), pairs(&[("fox", 1), ("cat", 2), ("dog", 3)]));
    assert!(session.entry("cat").expect("cat").entry.is_used);
    assert_eq!(store.server_words(), vec!["fox", "cat", "dog"]);
    assert_eq!(store.with_server_word("cat", |w| w.word.is_used), Some(true));
}

#[test]
fn test_reload_keeps_in_flight_write() {
    let store = FakeStore::with_words(&["cat", "dog", "fox"]);
    let session = open(&store);
    let release = store.hold("set_word_used");
    store.fail("reorder_words");

    session.begin_drag("fox").expect("begin");
    let (used, reordered) = block_on(async {
        futures::join!(session.set_used("cat", true), async {
            let r = session.drop_on("cat", Placement::Above).await;
            // The reload ran while the use update was still in flight.
            let still_used = session.entry("cat").map(|s| s.entry.is_used);
            let _ = release.send(());
            (r, still_used)
        })
    });

    used.expect("use update");
    assert!(reordered.0.is_err());
    assert_eq!(reordered.1, Some(true));
    assert_eq!(positions(&session), pairs(&[("cat", 1), ("dog", 2), ("fox", 3)]));
    assert!(session.entry("cat").expect("cat").entry.is_used);
    assert!(!session.has_pending_writes());
}

#[test]
fn test_reload_follows_pending_rename() {
    let store = FakeStore::with_words(&["cat", "dog"]);
    let session = open(&store);
    let release = store.hold("rename_word");

    let (renamed, _) = block_on(async {
        futures::join!(session.rename_word("cat", "kitten"), async {
            session.reload().await.expect("reload");
            assert!(session.entry("kitten").is_some());
            assert!(session.entry("cat").is_none());
            let _ = release.send(());
        })
    });

    renamed.expect("rename");
    assert_eq!(session.entry("kitten").expect("kitten").entry.position, 1);
}

#[test]
fn test_closed_session_ignores_late_responses() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    let release = store.hold("set_word_level");
    store.fail("set_word_level");

    let (result, season) = block_on(async {
        futures::join!(session.set_level("cat", Level::High), async {
            let season = session.close();
            let _ = release.send(());
            season
        })
    });

    assert!(result.is_err());
    assert_eq!(season.as_deref(), Some("1"));
    // No rollback or notice after the view was left.
    assert_eq!(session.entry("cat").expect("cat").entry.level, Level::High);
    assert!(session.take_notices().is_empty());
    assert!(matches!(
        block_on(session.set_used("cat", true)),
        Err(EditError::Closed)
    ));
}

#[test]
fn test_all_words_view() {
    let store = FakeStore::with_words(&["cat", "the"]);
    store.with_server_word("the", |w| w.is_vocabulary = false);
    let session = open(&store);
    assert_eq!(session.snapshot().len(), 1);

    block_on(session.show_all_words()).expect("all words");
    assert_eq!(session.view(), SubView::AllWords);
    assert_eq!(session.snapshot().len(), 2);
    assert!(!session.entry("the").expect("the").entry.is_vocabulary);
    assert!(matches!(
        session.begin_drag("cat"),
        Err(EditError::Validation(_))
    ));

    block_on(session.set_vocabulary("the", true)).expect("vocabulary");
    assert!(session.entry("the").expect("the").entry.is_vocabulary);

    block_on(session.show_vocabulary()).expect("vocabulary view");
    assert_eq!(session.view(), SubView::Vocabulary);
    assert_eq!(session.snapshot().len(), 2);
}

#[test]
fn test_on_change_reports_revisions() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen2 = seen.clone();
    session.set_on_change(move |r| seen2.borrow_mut().push(r));

    block_on(session.set_used("cat", true)).expect("used");
    let seen = seen.borrow();
    assert!(!seen.is_empty());
    assert_eq!(seen.last().copied(), Some(session.revision()));
}

#[test]
fn test_two_failed_writes_roll_back_to_server_value() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    store.fail("set_word_used");
    let release = store.hold("set_word_used");

    let (first, second) = block_on(async {
        futures::join!(session.set_used("cat", true), async {
            let r = session.set_used("cat", false).await;
            let _ = release.send(());
            r
        })
    });

    assert!(first.is_err());
    assert!(second.is_err());
    assert!(!session.entry("cat").expect("cat").entry.is_used);
    assert_eq!(store.with_server_word("cat", |w| w.word.is_used), Some(false));
    assert!(!session.has_pending_writes());
}

#[test]
fn test_superseded_success_becomes_rollback_target() {
    let store = FakeStore::with_words(&["cat"]);
    let session = open(&store);
    let release = store.hold("set_word_level");

    let (first, second) = block_on(async {
        futures::join!(session.set_level("cat", Level::High), async {
            let release_second = store.hold("set_word_level");
            let (second, _) = futures::join!(session.set_level("cat", Level::College), async {
                let _ = release.send(());
                // The first write lands before the second one answers.
                futures::pending!();
                store.fail("set_word_level");
                let _ = release_second.send(());
            });
            second
        })
    });

    assert!(first.is_ok());
    assert!(second.is_err());
    assert_eq!(store.with_server_word("cat", |w| w.word.level), Some(Level::High));
    assert_eq!(session.entry("cat").expect("cat").entry.level, Level::High);
}

#[test]
fn test_used_words_fetch_definitions_after_open() {
    let store = FakeStore::with_words(&["cat", "dog"]);
    store.with_server_word("cat", |w| w.word.is_used = true);
    let session = open(&store);

    block_on(session.prefetch_expanded());

    let cat = session.entry("cat").expect("cat");
    assert!(cat.ui.expanded);
    assert!(!cat.ui.definitions_loading);
    assert_eq!(cat.entry.definitions.map(|d| d.len()), Some(2));
    assert_eq!(store.count("get_definitions"), 1);

    // Already cached: nothing to fetch on reload.
    block_on(session.reload()).expect("reload");
    assert_eq!(store.count("get_definitions"), 1);
}

#[test]
fn test_selected_candidate_is_not_copied_into_custom_box() {
    let store = FakeStore::with_words(&["cat"]);
    store.with_server_word("cat", |w| {
        w.word.selected_definition = Some("a small feline".to_string())
    });
    let session = open(&store);
    assert!(session.entry("cat").expect("cat").ui.custom_draft.is_empty());

    session.focus_custom("cat").expect("focus");
    assert!(!block_on(session.commit_custom("cat")).expect("nothing typed"));
    assert_eq!(store.count("set_word_definition"), 0);

    block_on(session.expand("cat")).expect("definitions");
    assert!(session.entry("cat").expect("cat").ui.custom_draft.is_empty());
}

#[test]
fn test_custom_selection_fills_box_once_definitions_load() {
    let store = FakeStore::with_words(&["cat"]);
    store.with_server_word("cat", |w| {
        w.word.selected_definition = Some("a pet that purrs".to_string())
    });
    let session = open(&store);

    block_on(session.expand("cat")).expect("definitions");
    assert_eq!(
        session.entry("cat").expect("cat").ui.custom_draft,
        "a pet that purrs"
    );
}
