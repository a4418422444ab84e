use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Upsell")]
    Upsell,
    #[serde(rename = "Top Value")]
    TopValue,
    #[serde(rename = "Dormant")]
    Dormant,
    #[serde(rename = "At Risk")]
    AtRisk,
}

impl Classification {
    pub const ALL: [Self; 4] = [Self::Upsell, Self::TopValue, Self::Dormant, Self::AtRisk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsell => "Upsell",
            Self::TopValue => "Top Value",
            Self::Dormant => "Dormant",
            Self::AtRisk => "At Risk",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "upsell" => Ok(Self::Upsell),
            "top value" => Ok(Self::TopValue),
            "dormant" => Ok(Self::Dormant),
            "at risk" => Ok(Self::AtRisk),
            _ => Err(DomainError::InvariantViolation(format!(
                "unknown classification `{value}` (expected Upsell|Top Value|Dormant|At Risk)"
            ))),
        }
    }
}

/// Revenue-only reporting bucket. Never feeds into [`Classification`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueCategory {
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Medium Value")]
    MediumValue,
    #[serde(rename = "Low Value")]
    LowValue,
}

impl ValueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighValue => "High Value",
            Self::MediumValue => "Medium Value",
            Self::LowValue => "Low Value",
        }
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high value" => Ok(Self::HighValue),
            "medium value" => Ok(Self::MediumValue),
            "low value" => Ok(Self::LowValue),
            _ => Err(DomainError::InvariantViolation(format!("unknown value category `{value}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub classification: Classification,
    pub reason: String,
    pub value_category: ValueCategory,
}

#[cfg(test)]
mod tests {
    use super::{Classification, ValueCategory};

    #[test]
    fn classification_serializes_with_display_labels() {
        let encoded = serde_json::to_string(&Classification::AtRisk).expect("serialize");
        assert_eq!(encoded, "\"At Risk\"");

        let decoded: Classification = serde_json::from_str("\"Top Value\"").expect("deserialize");
        assert_eq!(decoded, Classification::TopValue);
    }

    #[test]
    fn classification_parses_query_friendly_spellings() {
        assert_eq!("at_risk".parse::<Classification>().ok(), Some(Classification::AtRisk));
        assert_eq!("Top-Value".parse::<Classification>().ok(), Some(Classification::TopValue));
        assert!("churned".parse::<Classification>().is_err());
    }

    #[test]
    fn value_category_round_trips_through_label() {
        for category in
            [ValueCategory::HighValue, ValueCategory::MediumValue, ValueCategory::LowValue]
        {
            assert_eq!(category.as_str().parse::<ValueCategory>().ok(), Some(category));
        }
    }
}
