use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six idol footprints, `width x height` in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size {
    width: u8,
    height: u8,
}

impl Size {
    pub const ALL: [Size; 6] = [
        Size::new_unchecked(1, 1),
        Size::new_unchecked(1, 2),
        Size::new_unchecked(2, 1),
        Size::new_unchecked(1, 3),
        Size::new_unchecked(3, 1),
        Size::new_unchecked(2, 2),
    ];

    const fn new_unchecked(width: u8, height: u8) -> Self {
        Self { width, height }
    }

    pub fn new(width: u8, height: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.width == width && s.height == height)
    }

    pub fn width(self) -> u8 {
        self.width
    }

    pub fn height(self) -> u8 {
        self.height
    }

    /// Single-character code used in encoded boards.
    pub fn id(self) -> char {
        match (self.width, self.height) {
            (1, 1) => '1',
            (1, 2) => '2',
            (2, 1) => '3',
            (1, 3) => '4',
            (3, 1) => '5',
            _ => '6',
        }
    }

    pub fn from_id(id: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Vertical sizes share the modifier pool of their horizontal twin.
    pub fn source_size(self) -> Size {
        match (self.width, self.height) {
            (1, 2) => Size::new_unchecked(2, 1),
            (1, 3) => Size::new_unchecked(3, 1),
            _ => self,
        }
    }

    pub fn source_file_name(self) -> String {
        format!("{}_mods.txt", self.source_size())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown idol size {0:?}")]
pub struct UnknownSize(pub String);

impl FromStr for Size {
    type Err = UnknownSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s
            .trim()
            .split_once('x')
            .and_then(|(w, h)| Some((w.parse::<u8>().ok()?, h.parse::<u8>().ok()?)))
            .and_then(|(w, h)| Size::new(w, h));
        parsed.ok_or_else(|| UnknownSize(s.to_string()))
    }
}

impl TryFrom<String> for Size {
    type Error = UnknownSize;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(value: Size) -> Self {
        value.to_string()
    }
}
