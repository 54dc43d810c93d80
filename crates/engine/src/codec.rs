//! Compact board encoding for shareable links.
//!
//! `item;item;...` where each item is `<row><col>/<sizeId>/<p1>/<p2>/<s1>/<s2>`. Row and column are
//! single digits written back to back; each slot is a registry ID or `0` for an empty slot.

use crate::grid::{Board, Cell, SLOT_COUNT};
use crate::registry::{ModifierId, Registry};
use crate::size::Size;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const ITEM_SEPARATOR: char = ';';
pub const FIELD_SEPARATOR: char = '/';
pub const EMPTY_SLOT: &str = "0";

/// Characters left alone by `encodeURIComponent`.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// An idol recovered from an encoded board, not yet checked against the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIdol {
    pub at: Cell,
    pub size: Size,
    pub slots: [Option<String>; SLOT_COUNT],
}

pub fn encode(board: &Board, registry: &Registry) -> String {
    let mut items = Vec::new();
    for idol in board.placed() {
        let Some(at) = idol.position else {
            continue;
        };
        let mut item = format!("{}{}", at.row, at.col);
        item.push(FIELD_SEPARATOR);
        item.push(idol.size.id());
        for slot in &idol.slots {
            item.push(FIELD_SEPARATOR);
            match slot.as_ref().and_then(|m| registry.id_of(&m.text)) {
                Some(id) => item.push_str(&id.to_string()),
                None => item.push_str(EMPTY_SLOT),
            }
        }
        items.push(item);
    }
    items.join(&ITEM_SEPARATOR.to_string())
}

fn decode_item(raw: &str, registry: &Registry) -> Option<DecodedIdol> {
    let mut fields = raw.split(FIELD_SEPARATOR);
    let position = fields.next()?;
    let mut chars = position.chars();
    let row = chars.next()?.to_digit(10)?;
    let col: u32 = chars.as_str().parse().ok()?;
    let size = fields.next()?.chars().next().and_then(Size::from_id)?;

    let mut slots: [Option<String>; SLOT_COUNT] = Default::default();
    for slot in slots.iter_mut() {
        let Some(field) = fields.next() else {
            break;
        };
        if field == EMPTY_SLOT {
            continue;
        }
        *slot = field
            .parse::<u32>()
            .ok()
            .and_then(|id| registry.text_of(ModifierId(id)))
            .map(str::to_string);
        if slot.is_none() {
            log::debug!("encoded board references unknown modifier id {field:?}");
        }
    }

    Some(DecodedIdol {
        at: Cell::new(u8::try_from(row).ok()?, u8::try_from(col).ok()?),
        size,
        slots,
    })
}

/// Decodes every well-formed item. Malformed items are skipped; unknown modifier IDs become empty
/// slots. Grid legality is left to the caller.
pub fn decode(state: &str, registry: &Registry) -> Vec<DecodedIdol> {
    if state.is_empty() {
        return Vec::new();
    }
    state
        .split(ITEM_SEPARATOR)
        .filter_map(|raw| {
            let decoded = decode_item(raw, registry);
            if decoded.is_none() {
                log::debug!("dropping malformed board item {raw:?}");
            }
            decoded
        })
        .collect()
}

/// Sizes mentioned by an encoded board, in order of first appearance.
pub fn referenced_sizes(state: &str) -> Vec<Size> {
    let mut sizes = Vec::new();
    for raw in state.split(ITEM_SEPARATOR) {
        let size = raw
            .split(FIELD_SEPARATOR)
            .nth(1)
            .and_then(|id| id.chars().next())
            .and_then(Size::from_id);
        if let Some(size) = size {
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
    }
    sizes
}

pub fn to_fragment(state: &str) -> String {
    utf8_percent_encode(state, FRAGMENT).to_string()
}

/// Accepts a fragment with or without its leading `#`.
pub fn from_fragment(fragment: &str) -> String {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Slots;
    use crate::modifier::Modifier;
    use crate::parser::parse_modifier_text;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        parse_modifier_text(
            "Prefixes\n10681increased Life\n5681increased Mana\nSuffixes\n1681Culling Strike (x1)\n",
            &mut reg,
        );
        reg
    }

    fn sample_board() -> Board {
        let mut board = Board::new();
        let a = board.add(
            "2x1".parse().unwrap(),
            [
                Some(Modifier::new("increased Life (10)")),
                None,
                Some(Modifier::new("Culling Strike (x1) (1)")),
                None,
            ],
        );
        let b = board.add(
            "1x2".parse().unwrap(),
            [
                Some(Modifier::new("increased Mana (5)")),
                Some(Modifier::new("free text nobody registered")),
                None,
                None,
            ],
        );
        board.add("1x1".parse().unwrap(), Slots::default());
        assert!(board.place(a, Cell::new(0, 1)));
        assert!(board.place(b, Cell::new(5, 3)));
        board
    }

    #[test]
    fn encodes_placed_idols_only() {
        let reg = registry();
        let board = sample_board();
        assert_eq!(encode(&board, &reg), "01/3/1/0/3/0;53/2/2/0/0/0");
    }

    #[test]
    fn round_trips_positions_sizes_and_registered_text() {
        let reg = registry();
        let board = sample_board();
        let decoded = decode(&encode(&board, &reg), &reg);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].at, Cell::new(0, 1));
        assert_eq!(decoded[0].size.to_string(), "2x1");
        assert_eq!(
            decoded[0].slots,
            [
                Some("increased Life (10)".to_string()),
                None,
                Some("Culling Strike (x1) (1)".to_string()),
                None
            ]
        );
        assert_eq!(decoded[1].at, Cell::new(5, 3));
        assert_eq!(decoded[1].size.to_string(), "1x2");
        assert_eq!(decoded[1].slots[0].as_deref(), Some("increased Mana (5)"));
        // Unregistered text was written as 0 and comes back empty.
        assert_eq!(decoded[1].slots[1], None);
    }

    #[test]
    fn unknown_ids_and_garbage_degrade_quietly() {
        let reg = registry();
        let decoded = decode("11/1/99/1;zz/1/0/0/0/0;22/9/0/0/0/0;3/1", &reg);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].at, Cell::new(1, 1));
        assert_eq!(decoded[0].slots, [None, Some("increased Life (10)".to_string()), None, None]);
        assert!(decode("", &reg).is_empty());
    }

    #[test]
    fn referenced_sizes_keep_first_appearance_order() {
        let sizes = referenced_sizes("00/6/0/0/0/0;11/2/0/0/0/0;22/6/0/0/0/0;bad");
        let labels: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["2x2", "1x2"]);
    }

    #[test]
    fn fragment_matches_uri_component_encoding() {
        let state = "01/3/1/0/3/0;53/2/2/0/0/0";
        let fragment = to_fragment(state);
        assert_eq!(fragment, "01%2F3%2F1%2F0%2F3%2F0%3B53%2F2%2F2%2F0%2F0%2F0");
        assert_eq!(from_fragment(&format!("#{fragment}")), state);
    }
}
