//! Report pipeline: tolerant parsing of the tagged-record report, plus the
//! interactive rendering. The paginated export lives in [`crate::export`].
//!
//! Condition order is the likelihood ranking and is preserved end to end.

mod markup;
mod parse;
mod render;

pub use markup::to_markup;
pub use parse::parse_report;
pub use render::{ConditionView, MedicineCard, render_interactive};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub dosage: String,
    pub alternatives: Vec<String>,
}

/// One diagnosis entry. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub likelihood: String,
    pub description: String,
    pub treatments: Vec<String>,
    pub medicines: Vec<Medicine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text() -> impl Strategy<Value = String> {
        // Printable text including markup-significant characters, without
        // leading or trailing whitespace the model never emits in leaf values.
        prop_oneof![
            Just(String::new()),
            "[a-zA-Z0-9<>&\"'/(),.% -]{0,24}".prop_map(|s| s.trim().to_string()),
        ]
    }

    fn medicine() -> impl Strategy<Value = Medicine> {
        (text(), text(), prop::collection::vec(text(), 0..3)).prop_map(
            |(name, dosage, alternatives)| Medicine {
                name,
                dosage,
                alternatives,
            },
        )
    }

    fn condition() -> impl Strategy<Value = Condition> {
        (
            text(),
            text(),
            text(),
            prop::collection::vec(text(), 0..4),
            prop::collection::vec(medicine(), 0..3),
        )
            .prop_map(|(name, likelihood, description, treatments, medicines)| Condition {
                name,
                likelihood,
                description,
                treatments,
                medicines,
            })
    }

    proptest! {
        #[test]
        fn markup_round_trips(conditions in prop::collection::vec(condition(), 0..4)) {
            prop_assert_eq!(parse_report(&to_markup(&conditions)), conditions);
        }
    }
}
