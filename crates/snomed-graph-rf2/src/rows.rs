//! Typed RF2 rows.
//!
//! Field names follow the RF2 header names (`moduleId`, `conceptId`, ...)
//! via serde renames; columns the graph model does not carry
//! (`effectiveTime`, `caseSignificanceId`, `relationshipGroup`, ...) are
//! matched by header name and ignored.

use serde::{Deserialize, Deserializer};

/// Strict active-flag parse: `"1"` is true, `"0"` is false, anything else
/// is a malformed row. No silent coercion of other literals.
fn active_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid active flag {other:?}, expected \"0\" or \"1\""
        ))),
    }
}

/// One row of `sct2_Concept_Snapshot*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConceptRow {
    pub id: String,
    #[serde(deserialize_with = "active_flag")]
    pub active: bool,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    #[serde(rename = "definitionStatusId")]
    pub definition_status_id: String,
}

/// One row of `sct2_Description_Snapshot*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DescriptionRow {
    pub id: String,
    #[serde(deserialize_with = "active_flag")]
    pub active: bool,
    #[serde(rename = "conceptId")]
    pub concept_id: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
    pub term: String,
}

/// One row of `sct2_Relationship_Snapshot*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationshipRow {
    pub id: String,
    #[serde(deserialize_with = "active_flag")]
    pub active: bool,
    #[serde(rename = "sourceId")]
    pub source_id: String,
    #[serde(rename = "destinationId")]
    pub destination_id: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
    #[serde(rename = "characteristicTypeId")]
    pub characteristic_type_id: String,
    #[serde(rename = "modifierId")]
    pub modifier_id: String,
}
