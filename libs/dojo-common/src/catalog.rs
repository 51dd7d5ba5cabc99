// Challenge catalog management
// Loads and validates challenges from challenges.json

use crate::types::{Challenge, Language};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse challenges.json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate challenge id {0}")]
    DuplicateId(Uuid),

    #[error("Challenge '{title}': {reason}")]
    Invalid { title: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengesFile {
    pub challenges: Vec<Challenge>,
}

/// Registry of gradable challenges, in file order
#[derive(Debug, Clone, Default)]
pub struct ChallengeCatalog {
    challenges: Vec<Challenge>,
}

impl ChallengeCatalog {
    /// Load and validate a challenge catalog file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: ChallengesFile = serde_json::from_str(content)?;
        Self::new(file.challenges)
    }

    /// Build a catalog, rejecting the whole set on the first invalid challenge
    pub fn new(challenges: Vec<Challenge>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for challenge in &challenges {
            if !seen.insert(challenge.id) {
                return Err(CatalogError::DuplicateId(challenge.id));
            }
            validate_challenge(challenge)?;
        }
        Ok(Self { challenges })
    }

    pub fn get(&self, id: &Uuid) -> Option<&Challenge> {
        self.challenges.iter().find(|c| &c.id == id)
    }

    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

fn validate_challenge(challenge: &Challenge) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::Invalid {
        title: challenge.title.clone(),
        reason,
    };

    if let Err(e) = challenge.language.parse::<Language>() {
        return Err(invalid(e.to_string()));
    }

    if !is_identifier(&challenge.function_name) {
        return Err(invalid(format!(
            "function_name '{}' is not a valid identifier",
            challenge.function_name
        )));
    }

    let mut names = HashSet::new();
    for test_case in &challenge.test_cases {
        if !names.insert(test_case.name.as_str()) {
            return Err(invalid(format!("duplicate test case name '{}'", test_case.name)));
        }
    }

    Ok(())
}

/// Identifier rule shared by python and javascript (ASCII subset)
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "challenges": [
            {
                "id": "8a4b7c1e-2f3d-4e5a-9b6c-7d8e9f0a1b2c",
                "title": "Double It",
                "difficulty": "easy",
                "language": "python",
                "function_name": "double",
                "test_cases": [
                    {"name": "basic", "input": "5", "expected": "10"},
                    {"name": "zero", "input": "0", "expected": "0"}
                ]
            },
            {
                "id": "1f2e3d4c-5b6a-4978-8a9b-0c1d2e3f4a5b",
                "title": "Sum",
                "difficulty": "medium",
                "language": "javascript",
                "function_name": "sum",
                "test_cases": [
                    {"name": "pair", "input": [2, 3], "expected": "5"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_load_catalog_in_file_order() {
        let catalog = ChallengeCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.challenges()[0].title, "Double It");
        assert_eq!(catalog.challenges()[1].test_cases[0].input, "[2,3]");

        let id = Uuid::parse_str("1f2e3d4c-5b6a-4978-8a9b-0c1d2e3f4a5b").unwrap();
        assert_eq!(catalog.get(&id).map(|c| c.title.as_str()), Some("Sum"));
        assert!(catalog.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_rejects_unsupported_language() {
        let json = CATALOG.replace("\"javascript\"", "\"cobol\"");
        let err = ChallengeCatalog::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("Unsupported language: cobol"));
    }

    #[test]
    fn test_rejects_duplicate_test_names() {
        let json = CATALOG.replace("\"zero\"", "\"basic\"");
        let err = ChallengeCatalog::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate test case name 'basic'"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = CATALOG.replace(
            "1f2e3d4c-5b6a-4978-8a9b-0c1d2e3f4a5b",
            "8a4b7c1e-2f3d-4e5a-9b6c-7d8e9f0a1b2c",
        );
        assert!(matches!(
            ChallengeCatalog::from_json(&json),
            Err(CatalogError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_identifier_rule() {
        assert!(is_identifier("two_sum"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("$jq"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2sum"));
        assert!(!is_identifier("print(1)"));
    }

    #[test]
    fn test_missing_file() {
        let err = ChallengeCatalog::load_from_file("does/not/exist.json").unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
