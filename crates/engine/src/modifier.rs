//! Structured modifier records.
//!
//! A modifier line reads like `"<prefix> (<payload>)<%> <suffix>"`. The payload between the first
//! pair of parentheses decides the shape; the surrounding text decides whether two modifiers can be
//! summed. Classification happens once, when a [`Modifier`] is built, and the record travels with
//! the literal text from then on.

use serde::{Deserialize, Serialize};

/// Separator between the two bounds of a range payload.
pub const RANGE_DASH: char = '–';

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierShape {
    Percentage { value: f64 },
    PercentageRange { min: f64, max: f64 },
    Count { count: u32 },
    Unknown,
}

impl ModifierShape {
    fn same_kind(&self, other: &ModifierShape) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Percentages and ranges fold into one summed value; counts and unknown text only stack.
    pub fn is_summable(&self) -> bool {
        matches!(
            self,
            ModifierShape::Percentage { .. } | ModifierShape::PercentageRange { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierRecord {
    pub shape: ModifierShape,
    pub prefix_text: String,
    pub suffix_text: String,
    /// A `%` was attached to the payload, inside or right after the parentheses.
    pub percent_sign: bool,
}

impl ModifierRecord {
    pub fn unknown() -> Self {
        Self {
            shape: ModifierShape::Unknown,
            prefix_text: String::new(),
            suffix_text: String::new(),
            percent_sign: false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.shape == ModifierShape::Unknown
    }
}

pub fn classify(text: &str) -> ModifierRecord {
    let (Some(open), Some(close)) = (text.find('('), text.find(')')) else {
        return ModifierRecord::unknown();
    };
    if close < open {
        return ModifierRecord::unknown();
    }

    let payload = text[open + 1..close].trim();
    let after = text[close + 1..].trim();
    // The first `%` after the payload is dropped wherever it sits; `format` puts it back after `)`.
    let sign_after = after.contains('%');
    let suffix = after.replacen('%', "", 1);
    let suffix = suffix.trim();

    let shape = if let Some((lo, hi)) = payload.split_once(RANGE_DASH) {
        match (parse_number(lo), parse_number(hi)) {
            (Some(min), Some(max)) => ModifierShape::PercentageRange { min, max },
            _ => ModifierShape::Unknown,
        }
    } else if let Some(count) = payload.strip_prefix('x') {
        match count.trim().parse::<u32>() {
            Ok(count) => ModifierShape::Count { count },
            Err(_) => ModifierShape::Unknown,
        }
    } else {
        match parse_number(payload) {
            Some(value) => ModifierShape::Percentage { value },
            None => ModifierShape::Unknown,
        }
    };

    if shape == ModifierShape::Unknown {
        return ModifierRecord::unknown();
    }

    let percent_sign = match shape {
        ModifierShape::Count { .. } => false,
        _ => sign_after || payload.contains('%'),
    };

    ModifierRecord {
        shape,
        prefix_text: text[..open].trim().to_string(),
        suffix_text: suffix.to_string(),
        percent_sign,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('%', "");
    let value: f64 = cleaned.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

pub fn same_base(a: &ModifierRecord, b: &ModifierRecord) -> bool {
    !a.is_unknown()
        && a.shape.same_kind(&b.shape)
        && a.prefix_text == b.prefix_text
        && a.suffix_text == b.suffix_text
}

/// Sums `b` into `a`. Records that do not share a base come back as `a`.
pub fn combine(a: &ModifierRecord, b: &ModifierRecord) -> ModifierRecord {
    if !same_base(a, b) {
        return a.clone();
    }
    let shape = match (a.shape, b.shape) {
        (ModifierShape::Percentage { value: x }, ModifierShape::Percentage { value: y }) => {
            ModifierShape::Percentage { value: x + y }
        }
        (
            ModifierShape::PercentageRange { min: a_min, max: a_max },
            ModifierShape::PercentageRange { min: b_min, max: b_max },
        ) => ModifierShape::PercentageRange {
            min: a_min + b_min,
            max: a_max + b_max,
        },
        (ModifierShape::Count { count: x }, ModifierShape::Count { count: y }) => {
            ModifierShape::Count {
                count: x.saturating_add(y),
            }
        }
        _ => return a.clone(),
    };
    ModifierRecord {
        shape,
        ..a.clone()
    }
}

/// Renders a record back to display text. Unknown records have no canonical form and render empty.
pub fn format(record: &ModifierRecord) -> String {
    let payload = match record.shape {
        ModifierShape::Percentage { value } => value.to_string(),
        ModifierShape::PercentageRange { min, max } => format!("{min}{RANGE_DASH}{max}"),
        ModifierShape::Count { count } => format!("x{count}"),
        ModifierShape::Unknown => return String::new(),
    };

    let mut out = String::with_capacity(
        record.prefix_text.len() + payload.len() + record.suffix_text.len() + 5,
    );
    if !record.prefix_text.is_empty() {
        out.push_str(&record.prefix_text);
        out.push(' ');
    }
    out.push('(');
    out.push_str(&payload);
    out.push(')');
    if record.percent_sign {
        out.push('%');
    }
    if !record.suffix_text.is_empty() {
        out.push(' ');
        out.push_str(&record.suffix_text);
    }
    out
}

/// A modifier as the user picked it: the literal text plus its parsed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub text: String,
    pub record: ModifierRecord,
}

impl Modifier {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let record = classify(&text);
        Self { text, record }
    }

    fn from_record(record: ModifierRecord) -> Self {
        Self {
            text: format(&record),
            record,
        }
    }

    /// Only percentage-like modifiers fold by base; everything else matches on exact text.
    pub fn is_combinable(&self) -> bool {
        self.record.shape.is_summable()
    }

    pub fn combined_with(&self, other: &Modifier) -> Modifier {
        Modifier::from_record(combine(&self.record, &other.record))
    }
}
