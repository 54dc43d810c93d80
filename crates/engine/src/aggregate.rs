use crate::grid::Board;
use crate::modifier::{same_base, Modifier};
use serde::{Deserialize, Serialize};

/// One line of the totals panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusGroup {
    /// Literal text of the first modifier seen for this group.
    pub key: String,
    pub representative: Modifier,
    pub count: u32,
}

impl BonusGroup {
    pub fn display(&self) -> String {
        if self.count > 1 && !self.representative.record.shape.is_summable() {
            format!("{} x{}", self.key, self.count)
        } else {
            self.representative.text.clone()
        }
    }
}

/// Folds modifiers in order. Percentage-like modifiers merge with the first group sharing their
/// base; counts and unrecognised text only merge with a group whose key is the same literal string.
pub fn aggregate<'a>(modifiers: impl IntoIterator<Item = &'a Modifier>) -> Vec<BonusGroup> {
    let mut groups: Vec<BonusGroup> = Vec::new();
    for modifier in modifiers {
        let combinable = modifier.is_combinable();
        let existing = groups.iter_mut().find(|group| {
            if combinable {
                same_base(&modifier.record, &group.representative.record)
            } else {
                modifier.text == group.key
            }
        });
        match existing {
            Some(group) => {
                if combinable {
                    group.representative = group.representative.combined_with(modifier);
                }
                group.count += 1;
            }
            None => groups.push(BonusGroup {
                key: modifier.text.clone(),
                representative: modifier.clone(),
                count: 1,
            }),
        }
    }
    groups
}

/// Totals for every placed idol, in board order then slot order.
pub fn board_totals(board: &Board) -> Vec<BonusGroup> {
    aggregate(board.placed().flat_map(|idol| idol.modifiers()))
}

pub fn render(groups: &[BonusGroup]) -> Vec<String> {
    groups.iter().map(BonusGroup::display).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Slots};

    fn mods(texts: &[&str]) -> Vec<Modifier> {
        texts.iter().map(|t| Modifier::new(*t)).collect()
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        render(&aggregate(&mods(texts)))
    }

    #[test]
    fn percentages_sum_without_count_suffix() {
        assert_eq!(
            lines(&["increased Life (10)", "increased Life (15)"]),
            vec!["increased Life (25)"]
        );
    }

    #[test]
    fn counts_stack_with_suffix() {
        assert_eq!(
            lines(&["Culling Strike (x1)", "Culling Strike (x1)"]),
            vec!["Culling Strike (x1) x2"]
        );
        // Different literal counts stay apart.
        assert_eq!(
            lines(&["Culling Strike (x1)", "Culling Strike (x2)"]),
            vec!["Culling Strike (x1)", "Culling Strike (x2)"]
        );
    }

    #[test]
    fn unknown_text_merges_only_when_identical() {
        assert_eq!(
            lines(&["Mystery", "Mystery", "mystery"]),
            vec!["Mystery x2", "mystery"]
        );
    }

    #[test]
    fn order_follows_first_appearance() {
        assert_eq!(
            lines(&[
                "increased Mana (5)",
                "(1–2)% more Damage",
                "increased Mana (5)",
                "(3–4)% more Damage",
            ]),
            vec!["increased Mana (10)", "(4–6)% more Damage"]
        );
    }

    #[test]
    fn single_modifier_keeps_its_literal_text() {
        assert_eq!(lines(&["Chance (10%) to Bleed"]), vec!["Chance (10%) to Bleed"]);
    }

    #[test]
    fn unplaced_idols_do_not_count() {
        let mut board = Board::new();
        let slots: Slots = [Some(Modifier::new("increased Life (10)")), None, None, None];
        let placed = board.add("1x1".parse().unwrap(), slots.clone());
        board.add("1x1".parse().unwrap(), slots);
        assert!(board.place(placed, Cell::new(1, 1)));
        assert_eq!(render(&board_totals(&board)), vec!["increased Life (10)"]);
    }
}
