use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

/// Fixed note color palette
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NoteColor {
    #[default]
    White,
    Yellow,
    Orange,
    Pink,
    Purple,
    Blue,
    Green,
    Gray,
}

impl NoteColor {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// Display color used by the UI
    pub fn hex(&self) -> &'static str {
        match self {
            Self::White => "#ffffff",
            Self::Yellow => "#fff475",
            Self::Orange => "#fbbc04",
            Self::Pink => "#f28b82",
            Self::Purple => "#d7aefb",
            Self::Blue => "#aecbfa",
            Self::Green => "#ccff90",
            Self::Gray => "#e8eaed",
        }
    }

    /// Parse a palette name or its hex value. Returns None for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.starts_with('#') {
            return Self::iter().find(|c| c.hex().eq_ignore_ascii_case(s));
        }
        s.parse().ok()
    }

    /// Parse from string, defaulting to White if invalid
    pub fn from_str_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

/// A stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub color: NoteColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a note
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Kept raw so an unknown color falls back to the default instead of rejecting the request
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial update. Blank fields and unknown colors leave the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl UpdateNoteRequest {
    pub fn title_change(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    pub fn content_change(&self) -> Option<&str> {
        non_blank(self.content.as_deref())
    }

    pub fn color_change(&self) -> Option<NoteColor> {
        self.color.as_deref().and_then(NoteColor::parse)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Input to the store's create operation.
///
/// Timestamps are normally left unset and assigned by the store; they can be
/// supplied when importing notes that already have a history.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub color: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Unset or unknown colors become the palette default
    pub fn resolved_color(&self) -> NoteColor {
        self.color
            .as_deref()
            .map(NoteColor::from_str_or_default)
            .unwrap_or_default()
    }
}

impl From<CreateNoteRequest> for NewNote {
    fn from(req: CreateNoteRequest) -> Self {
        let new = Self::new(req.title, req.content);
        match req.color {
            Some(color) => new.with_color(color),
            None => new,
        }
    }
}

/// Response body for the count endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteCount {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(NoteColor::parse("yellow"), Some(NoteColor::Yellow));
        assert_eq!(NoteColor::parse("  Blue "), Some(NoteColor::Blue));
        assert_eq!(NoteColor::parse("#F28B82"), Some(NoteColor::Pink));
        assert_eq!(NoteColor::parse("not-a-color"), None);
        assert_eq!(NoteColor::parse(""), None);
        assert_eq!(NoteColor::parse("#123456"), None);
    }

    #[test]
    fn test_color_default() {
        assert_eq!(NoteColor::default(), NoteColor::White);
        assert_eq!(NoteColor::from_str_or_default("magenta"), NoteColor::White);
        assert_eq!(NoteColor::from_str_or_default("gray"), NoteColor::Gray);
    }

    #[test]
    fn test_color_names_round_trip() {
        for color in NoteColor::iter() {
            assert_eq!(NoteColor::parse(color.as_str()), Some(color));
            assert_eq!(NoteColor::parse(color.hex()), Some(color));
        }
        assert_eq!(NoteColor::iter().count(), 8);
    }

    #[test]
    fn test_color_serialization() {
        let json = serde_json::to_string(&NoteColor::Purple).unwrap();
        assert_eq!(json, "\"purple\"");
    }

    #[test]
    fn test_update_request_blank_fields_are_no_change() {
        let req = UpdateNoteRequest {
            title: Some("   ".to_string()),
            content: Some(String::new()),
            color: Some("not-a-color".to_string()),
        };
        assert_eq!(req.title_change(), None);
        assert_eq!(req.content_change(), None);
        assert_eq!(req.color_change(), None);

        let req = UpdateNoteRequest {
            title: Some("New".to_string()),
            content: None,
            color: Some("green".to_string()),
        };
        assert_eq!(req.title_change(), Some("New"));
        assert_eq!(req.color_change(), Some(NoteColor::Green));
    }

    #[test]
    fn test_new_note_color_resolution() {
        assert_eq!(NewNote::new("a", "b").resolved_color(), NoteColor::White);
        assert_eq!(NewNote::new("a", "b").with_color("orange").resolved_color(), NoteColor::Orange);
        assert_eq!(NewNote::new("a", "b").with_color("chartreuse").resolved_color(), NoteColor::White);
    }

    #[test]
    fn test_new_note_from_request() {
        let req: CreateNoteRequest =
            serde_json::from_str(r#"{"title": "t", "content": "c", "color": "blue"}"#).unwrap();
        let new = NewNote::from(req);
        assert_eq!(new.title, "t");
        assert_eq!(new.resolved_color(), NoteColor::Blue);
        assert!(new.created_at.is_none() && new.updated_at.is_none());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateNoteRequest = serde_json::from_str(r#"{"title": "Only title"}"#).unwrap();
        assert_eq!(req.title, "Only title");
        assert_eq!(req.content, "");
        assert!(req.color.is_none());
    }
}
