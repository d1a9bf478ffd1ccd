use crate::models::VocabularyEntry;
use std::collections::HashMap;

/// Stable handle for an entry; survives renames and reloads (matched by word).
pub(crate) type EntryId = u64;

/// View-adjacent state bound to an entry. Lives next to the entry so a rename
/// carries it along with the data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EntryUi {
    pub expanded: bool,
    pub definitions_loading: bool,
    /// The "custom" radio option is the active definition choice.
    pub custom_active: bool,
    pub custom_draft: String,
    /// Inline rename buffer while the word text is being edited.
    pub rename_draft: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EntrySlot {
    pub id: EntryId,
    pub entry: VocabularyEntry,
    pub ui: EntryUi,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum CollectionError {
    #[error("word not found: {0}")]
    NotFound(String),
    #[error("word already exists in this episode: {0}")]
    Conflict(String),
    #[error("new order must list every word exactly once")]
    NotAPermutation,
}

/// Ordered, word-keyed entries of the open episode.
///
/// `position` is kept dense (1..=N) in `order` sequence after every mutation.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntryCollection {
    slots: HashMap<EntryId, EntrySlot>,
    by_word: HashMap<String, EntryId>,
    order: Vec<EntryId>,
    next_id: EntryId,
}

impl EntryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<VocabularyEntry>) -> Self {
        let mut c = Self::new();
        c.replace_all(entries);
        c
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, word: &str) -> Option<&EntrySlot> {
        self.by_word.get(word).and_then(|id| self.slots.get(id))
    }

    pub fn get_mut(&mut self, word: &str) -> Option<&mut EntrySlot> {
        let id = *self.by_word.get(word)?;
        self.slots.get_mut(&id)
    }

    pub fn by_id(&self, id: EntryId) -> Option<&EntrySlot> {
        self.slots.get(&id)
    }

    pub fn by_id_mut(&mut self, id: EntryId) -> Option<&mut EntrySlot> {
        self.slots.get_mut(&id)
    }

    pub fn id_of(&self, word: &str) -> Option<EntryId> {
        self.by_word.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.by_word.contains_key(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntrySlot> + '_ {
        self.order.iter().filter_map(|id| self.slots.get(id))
    }

    pub fn words(&self) -> Vec<String> {
        self.iter().map(|s| s.entry.word.clone()).collect()
    }

    pub fn max_position(&self) -> u32 {
        self.iter().map(|s| s.entry.position).max().unwrap_or(0)
    }

    fn alloc_id(&mut self) -> EntryId {
        self.next_id += 1;
        self.next_id
    }

    fn renumber(&mut self) {
        for (idx, id) in self.order.iter().enumerate() {
            if let Some(slot) = self.slots.get_mut(id) {
                slot.entry.position = idx as u32 + 1;
            }
        }
    }

    /// Replace an existing entry's data (view state kept) or append a new one
    /// at the end.
    pub fn upsert(&mut self, entry: VocabularyEntry) -> EntryId {
        if let Some(id) = self.by_word.get(&entry.word).copied() {
            if let Some(slot) = self.slots.get_mut(&id) {
                let position = slot.entry.position;
                slot.entry = entry;
                slot.entry.position = position;
            }
            return id;
        }

        let id = self.alloc_id();
        self.by_word.insert(entry.word.clone(), id);
        self.order.push(id);
        self.slots.insert(
            id,
            EntrySlot {
                id,
                entry,
                ui: EntryUi::default(),
            },
        );
        self.renumber();
        id
    }

    /// Rekey an entry. Either everything moves to `new_word` or nothing changes.
    pub fn rename(&mut self, old_word: &str, new_word: &str) -> Result<EntryId, CollectionError> {
        let id = self
            .id_of(old_word)
            .ok_or_else(|| CollectionError::NotFound(old_word.to_string()))?;
        if old_word == new_word {
            return Ok(id);
        }
        if self.by_word.contains_key(new_word) {
            return Err(CollectionError::Conflict(new_word.to_string()));
        }

        self.by_word.remove(old_word);
        self.by_word.insert(new_word.to_string(), id);
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.entry.word = new_word.to_string();
        }
        Ok(id)
    }

    /// Apply a full new order. `words` must be a permutation of the current keys.
    pub fn reorder_from(&mut self, words: &[String]) -> Result<(), CollectionError> {
        if words.len() != self.order.len() {
            return Err(CollectionError::NotAPermutation);
        }

        let mut next: Vec<EntryId> = Vec::with_capacity(words.len());
        for w in words {
            let id = self
                .id_of(w)
                .ok_or_else(|| CollectionError::NotFound(w.clone()))?;
            if next.contains(&id) {
                return Err(CollectionError::NotAPermutation);
            }
            next.push(id);
        }

        self.order = next;
        self.renumber();
        Ok(())
    }

    /// Swap in authoritative state. Entries whose word survives keep their id,
    /// view state, and a previously fetched definitions list.
    pub fn replace_all(&mut self, entries: Vec<VocabularyEntry>) {
        let mut old_slots = std::mem::take(&mut self.slots);
        let old_by_word = std::mem::take(&mut self.by_word);
        self.order.clear();

        for entry in entries {
            if self.by_word.contains_key(&entry.word) {
                // The backend joins uses; keep the first occurrence only.
                continue;
            }

            let reused = old_by_word
                .get(&entry.word)
                .and_then(|id| old_slots.remove(id));

            let slot = match reused {
                Some(old) => {
                    let mut entry = entry;
                    if entry.definitions.is_none() {
                        entry.definitions = old.entry.definitions;
                    }
                    EntrySlot {
                        id: old.id,
                        entry,
                        ui: old.ui,
                    }
                }
                None => {
                    let id = self.alloc_id();
                    EntrySlot {
                        id,
                        entry,
                        ui: EntryUi::default(),
                    }
                }
            };

            self.by_word.insert(slot.entry.word.clone(), slot.id);
            self.order.push(slot.id);
            self.slots.insert(slot.id, slot);
        }

        self.renumber();
    }
}
