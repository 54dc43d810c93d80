use serde::{Deserialize, Serialize};

/// Replaces the contents of the element whose id is `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiUpdate {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub patches: Vec<Patch>,
}

impl UiUpdate {
    pub fn new(event: impl Into<String>, patches: Vec<Patch>) -> Self {
        Self {
            event: event.into(),
            payload: None,
            patches,
        }
    }
}

pub mod targets {
    pub const PANEL_TOTALS: &str = "panel.totals";
    pub const PANEL_STATUS: &str = "panel.status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub row: u8,
    pub col: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdolView {
    pub id: u64,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CellView>,
    /// Prefix 1, prefix 2, suffix 1, suffix 2; `null` for an empty slot.
    pub slots: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub rows: u8,
    pub cols: u8,
    pub blocked: Vec<CellView>,
    pub idols: Vec<IdolView>,
    pub totals: Vec<String>,
    /// Percent-encoded board, ready to append after `#`.
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierOptions {
    pub size: String,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropInput {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddIdolInput {
    pub size: String,
    #[serde(default)]
    pub prefix1: Option<String>,
    #[serde(default)]
    pub prefix2: Option<String>,
    #[serde(default)]
    pub suffix1: Option<String>,
    #[serde(default)]
    pub suffix2: Option<String>,
    /// Drop the new idol straight onto the board at this point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DropInput>,
}

impl AddIdolInput {
    pub fn slots(&self) -> [Option<&str>; 4] {
        [
            self.prefix1.as_deref(),
            self.prefix2.as_deref(),
            self.suffix1.as_deref(),
            self.suffix2.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    /// Raw `item;item` encoding.
    pub state: String,
    pub fragment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreInput {
    /// Percent-encoded fragment, with or without the leading `#`.
    pub fragment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreView {
    pub placed: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_input_defaults_missing_slots() {
        let input: AddIdolInput =
            serde_json::from_str(r#"{"size":"1x1","suffix1":"of Haste (2)"}"#).unwrap();
        assert_eq!(input.slots(), [None, None, Some("of Haste (2)"), None]);
        assert!(input.at.is_none());
    }

    #[test]
    fn patch_omits_missing_html_and_payload() {
        let patch: Patch = serde_json::from_str(r#"{"target":"panel.totals"}"#).unwrap();
        assert_eq!(patch.target, targets::PANEL_TOTALS);
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json.get("html").is_none());
        assert!(json.get("payload").is_none());
    }
}
