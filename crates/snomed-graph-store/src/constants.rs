//! Well-known SNOMED CT identifiers.
//!
//! These are release-invariant concept ids the rest of the system treats as
//! constants; they must match the distribution exactly.

/// `Is a (attribute)`, the one relationship type materialized as the
/// dedicated hierarchy edge.
pub const IS_A_TYPE_ID: &str = "116680003";

/// `Fully specified name` description type.
pub const FSN_TYPE_ID: &str = "900000000000003001";

/// `Synonym` description type, used for preferred terms.
pub const PREFERRED_TERM_TYPE_ID: &str = "900000000000013009";

/// `Acceptable synonym` description type.
pub const ACCEPTABLE_TERM_TYPE_ID: &str = "900000000000549004";

/// `SNOMED CT Concept`, the root of the whole hierarchy.
pub const ROOT_CONCEPT_ID: &str = "138875005";

/// Top-level subhierarchies, the usual roots handed to the slim reducer.
pub const TOP_LEVEL_HIERARCHIES: &[(&str, &str)] = &[
    ("root", ROOT_CONCEPT_ID),
    ("clinical_finding", "404684003"),
    ("procedure", "71388002"),
    ("body_structure", "123037004"),
    ("organism", "410607006"),
    ("substance", "105590001"),
    ("pharmaceutical_product", "373873005"),
    ("situation", "243796009"),
    ("event", "272379006"),
    ("physical_object", "260787004"),
    ("qualifier_value", "362981000"),
];

/// Common relationship types, the usual allow-list entries for the slim
/// reducer's type filter.
pub const COMMON_RELATIONSHIP_TYPES: &[(&str, &str)] = &[
    ("is_a", IS_A_TYPE_ID),
    ("finding_site", "363698007"),
    ("associated_morphology", "116676008"),
    ("causative_agent", "246075003"),
    ("has_active_ingredient", "127489000"),
    ("method", "260686004"),
    ("pathological_process", "370135005"),
    ("procedure_site", "363704007"),
    ("severity", "246112005"),
];

/// Format a concept id for display, grouped in threes: `123456789` →
/// `123 456 789`.
pub fn format_concept_id(concept_id: &str) -> String {
    let digits: Vec<char> = concept_id.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(' ');
        }
        out.push(*c);
    }
    out
}

/// Strip display spacing from a formatted concept id.
pub fn parse_concept_id(formatted: &str) -> String {
    formatted.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_left_alone() {
        assert_eq!(format_concept_id(""), "");
        assert_eq!(format_concept_id("123"), "123");
    }

    #[test]
    fn long_ids_group_in_threes_from_the_left() {
        assert_eq!(format_concept_id("138875005"), "138 875 005");
        assert_eq!(format_concept_id("1234"), "123 4");
    }

    #[test]
    fn parse_undoes_format() {
        assert_eq!(parse_concept_id("138 875 005"), "138875005");
    }
}
