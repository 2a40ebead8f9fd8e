use serde::Serialize;

use super::{Condition, Medicine};

/// A medicine card inside a condition block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicineCard {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

/// One visual block per condition. Absent sub-sections are `None` or empty
/// and left out of the serialised view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionView {
    pub rank: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub treatments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub medicines: Vec<MedicineCard>,
}

pub fn render_interactive(conditions: &[Condition]) -> Vec<ConditionView> {
    conditions
        .iter()
        .enumerate()
        .map(|(i, condition)| ConditionView {
            rank: i + 1,
            name: condition.name.trim().to_string(),
            likelihood: present(&condition.likelihood),
            description: present(&condition.description),
            treatments: bullets(&condition.treatments),
            medicines: condition.medicines.iter().map(medicine_card).collect(),
        })
        .collect()
}

fn medicine_card(medicine: &Medicine) -> MedicineCard {
    MedicineCard {
        name: medicine.name.trim().to_string(),
        dosage: present(&medicine.dosage),
        alternatives: bullets(&medicine.alternatives),
    }
}

fn present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn bullets(items: &[String]) -> Vec<String> {
    items.iter().filter_map(|item| present(item)).collect()
}
