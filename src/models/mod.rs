use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Educational level attached to a word use.
///
/// The backend stores the wire string verbatim (`NULL` or `""` for "no level"),
/// so `AsRefStr` yields exactly what is sent in `PUT .../level`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
)]
pub(crate) enum Level {
    #[default]
    #[strum(serialize = "")]
    None,
    #[strum(serialize = "elementary")]
    Elementary,
    #[strum(serialize = "middle")]
    Middle,
    #[strum(serialize = "high")]
    High,
    #[strum(serialize = "college")]
    College,
    #[strum(serialize = "graduate")]
    Graduate,
    #[strum(serialize = "not vocabulary")]
    NotVocabulary,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::None => "-",
            Level::Elementary => "Elementary",
            Level::Middle => "Middle",
            Level::High => "High",
            Level::College => "College",
            Level::Graduate => "Graduate",
            Level::NotVocabulary => "Not Vocabulary",
        }
    }

    /// Unknown or missing values map to `Level::None` (rendered as "-").
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.map(|s| s.trim().to_lowercase())
            .and_then(|s| Level::from_str(&s).ok())
            .unwrap_or_default()
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Level::parse_lenient(raw.as_deref()))
    }
}

// SQLite hands booleans back as 0/1; accept both shapes (and null).
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}

// Episode numbers/ids are sometimes integers and sometimes strings.
fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(de_opt_text(deserializer)?.unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// One row of `GET /api/episodes`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct EpisodeSummary {
    #[serde(deserialize_with = "de_text")]
    pub episode_id: String,

    #[serde(default, deserialize_with = "de_text")]
    pub episode_name: String,

    #[serde(default, deserialize_with = "de_opt_text")]
    pub season: Option<String>,

    #[serde(default, deserialize_with = "de_text")]
    pub episode_number: String,

    #[serde(default, deserialize_with = "de_flag")]
    pub publishable: bool,
}

/// `GET /api/episodes/{id}`: the summary plus its vocabulary-filtered words,
/// already in persisted order.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EpisodeDetail {
    #[serde(flatten)]
    pub summary: EpisodeSummary,

    #[serde(default)]
    pub words: Vec<EpisodeWord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct EpisodeWord {
    pub word: String,

    #[serde(default, deserialize_with = "de_opt_text")]
    pub original_form: Option<String>,

    #[serde(default, deserialize_with = "de_flag")]
    pub is_used: bool,

    #[serde(default, deserialize_with = "de_opt_text")]
    pub selected_definition: Option<String>,

    #[serde(default)]
    pub level: Level,
}

/// One row of `GET /api/episodes/{id}/all-words`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct AllWordsRow {
    pub word: String,

    #[serde(default, deserialize_with = "de_opt_text")]
    pub original_form: Option<String>,

    #[serde(default, deserialize_with = "de_flag")]
    pub is_used: bool,

    #[serde(default, deserialize_with = "de_flag")]
    pub is_vocabulary: bool,
}

/// Response of `POST /api/episodes/{id}/uses`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct AddedWord {
    pub word: String,

    #[serde(default, deserialize_with = "de_flag")]
    pub is_used: bool,

    #[serde(default)]
    pub definitions: Vec<String>,
}

/// One vocabulary word's metadata within the open episode.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VocabularyEntry {
    pub word: String,
    pub original_form: String,
    pub is_used: bool,
    /// Only meaningful in the all-words sub-view.
    pub is_vocabulary: bool,
    pub level: Level,
    pub selected_definition: Option<String>,
    /// `None` until a definitions fetch has succeeded.
    pub definitions: Option<Vec<String>>,
    /// 1-based, dense within the episode.
    pub position: u32,
}

impl VocabularyEntry {
    pub fn new(word: &str, position: u32) -> Self {
        Self {
            word: word.to_string(),
            original_form: word.to_string(),
            is_used: false,
            is_vocabulary: true,
            level: Level::None,
            selected_definition: None,
            definitions: None,
            position,
        }
    }

    pub fn from_episode_word(w: EpisodeWord, position: u32) -> Self {
        let original_form = w
            .original_form
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| w.word.clone());
        Self {
            word: w.word,
            original_form,
            is_used: w.is_used,
            is_vocabulary: true,
            level: w.level,
            selected_definition: w.selected_definition.filter(|s| !s.is_empty()),
            definitions: None,
            position,
        }
    }

    pub fn from_all_words_row(w: AllWordsRow, position: u32) -> Self {
        let original_form = w
            .original_form
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| w.word.clone());
        Self {
            word: w.word,
            original_form,
            is_used: w.is_used,
            is_vocabulary: w.is_vocabulary,
            level: Level::None,
            selected_definition: None,
            definitions: None,
            position,
        }
    }

    /// The original surface form, only when it differs from the key.
    pub fn distinct_original_form(&self) -> Option<&str> {
        if self.original_form != self.word {
            Some(self.original_form.as_str())
        } else {
            None
        }
    }

    pub fn definition_choice(&self) -> DefinitionChoice {
        let Some(selected) = self.selected_definition.as_deref() else {
            return DefinitionChoice::Unset;
        };
        let candidates = self.definitions.as_deref().unwrap_or_default();
        match candidates.iter().position(|d| d == selected) {
            Some(idx) => DefinitionChoice::Candidate(idx),
            None => DefinitionChoice::Custom(selected.to_string()),
        }
    }
}

/// Which radio option a definitions panel shows as selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DefinitionChoice {
    Unset,
    Candidate(usize),
    /// A selected definition not among the candidates is custom text.
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_detail_contract_deserialize() {
        // Shape produced by the Flask + SQLite backend.
        let json = r#"{
            "episode_id": "s01e03",
            "episode_name": "Pilot",
            "season": 1,
            "episode_number": "s01e03",
            "publishable": 0,
            "words": [
                {"word": "cat", "original_form": "cats", "is_used": 1,
                 "selected_definition": "a small feline", "level": "middle"},
                {"word": "dog", "original_form": null, "is_used": 0,
                 "selected_definition": null, "level": null}
            ]
        }"#;
        let parsed: EpisodeDetail = serde_json::from_str(json).expect("detail should parse");
        assert_eq!(parsed.summary.episode_id, "s01e03");
        assert_eq!(parsed.summary.season.as_deref(), Some("1"));
        assert!(!parsed.summary.publishable);
        assert_eq!(parsed.words.len(), 2);
        assert!(parsed.words[0].is_used);
        assert_eq!(parsed.words[0].level, Level::Middle);
        assert_eq!(parsed.words[1].level, Level::None);
        assert!(parsed.words[1].original_form.is_none());
    }

    #[test]
    fn test_episode_summary_accepts_null_season_and_numeric_number() {
        let json = r#"[{"episode_id": 7, "episode_name": "Extra", "season": null,
                        "episode_number": 7, "publishable": true}]"#;
        let parsed: Vec<EpisodeSummary> = serde_json::from_str(json).expect("list should parse");
        assert_eq!(parsed[0].episode_id, "7");
        assert_eq!(parsed[0].episode_number, "7");
        assert!(parsed[0].season.is_none());
        assert!(parsed[0].publishable);
    }

    #[test]
    fn test_all_words_row_deserialize() {
        let json = r#"{"word": "run", "original_form": "ran", "is_used": 0,
                       "is_vocabulary": 1, "first_appearance": 4}"#;
        let row: AllWordsRow = serde_json::from_str(json).expect("row should parse");
        assert!(row.is_vocabulary);
        assert!(!row.is_used);
        let entry = VocabularyEntry::from_all_words_row(row, 1);
        assert_eq!(entry.distinct_original_form(), Some("ran"));
    }

    #[test]
    fn test_level_wire_strings() {
        assert_eq!(Level::NotVocabulary.as_ref(), "not vocabulary");
        assert_eq!(Level::None.as_ref(), "");
        assert_eq!(
            serde_json::to_value(Level::Graduate).expect("serialize"),
            serde_json::json!("graduate")
        );
        assert_eq!(Level::parse_lenient(Some(" High ")), Level::High);
        assert_eq!(Level::parse_lenient(Some("expert")), Level::None);
        assert_eq!(Level::parse_lenient(None), Level::None);
    }

    #[test]
    fn test_definition_choice_projection() {
        let mut e = VocabularyEntry::new("cat", 1);
        assert_eq!(e.definition_choice(), DefinitionChoice::Unset);

        e.definitions = Some(vec!["feline".to_string(), "jazz fan".to_string()]);
        e.selected_definition = Some("jazz fan".to_string());
        assert_eq!(e.definition_choice(), DefinitionChoice::Candidate(1));

        e.selected_definition = Some("my own words".to_string());
        assert_eq!(
            e.definition_choice(),
            DefinitionChoice::Custom("my own words".to_string())
        );
    }

    #[test]
    fn test_original_form_falls_back_to_word() {
        let w = EpisodeWord {
            word: "fox".to_string(),
            original_form: Some(String::new()),
            is_used: false,
            selected_definition: Some(String::new()),
            level: Level::None,
        };
        let e = VocabularyEntry::from_episode_word(w, 3);
        assert_eq!(e.original_form, "fox");
        assert!(e.distinct_original_form().is_none());
        assert!(e.selected_definition.is_none());
        assert_eq!(e.position, 3);
    }
}
