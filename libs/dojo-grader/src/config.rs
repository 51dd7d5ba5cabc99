// Runtime table: which execution-service runtime and version serves each language
use anyhow::{bail, Context, Result};
use dojo_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Selector sent to the execution service as `{ language, version }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSelector {
    pub language: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub name: String,
    pub version: String,
    /// Runtime name on the execution service when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesJson {
    pub languages: Vec<LanguageEntry>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, RuntimeSelector>,
}

impl Default for LanguageConfigManager {
    fn default() -> Self {
        let configs = [
            (Language::Python, "3.10.0"),
            (Language::JavaScript, "20.11.1"),
            (Language::TypeScript, "5.0.3"),
        ]
        .into_iter()
        .map(|(lang, version)| {
            (
                lang,
                RuntimeSelector {
                    language: lang.to_string(),
                    version: version.to_string(),
                },
            )
        })
        .collect();

        Self { configs }
    }
}

impl LanguageConfigManager {
    /// Load languages.json and overlay it on the built-in defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path).context("Failed to read languages.json")?;
        Self::from_json(&content)
    }

    /// Load the file when present, otherwise use the built-in table
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;

        let mut manager = Self::default();
        for entry in languages_json.languages {
            let language: Language = entry
                .name
                .parse()
                .with_context(|| format!("Unknown language '{}' in languages.json", entry.name))?;
            if entry.version.trim().is_empty() {
                bail!("Empty version for language '{}' in languages.json", entry.name);
            }
            manager.configs.insert(
                language,
                RuntimeSelector {
                    language: entry.runtime.unwrap_or_else(|| language.as_str().to_string()),
                    version: entry.version,
                },
            );
        }

        Ok(manager)
    }

    /// Get the runtime selector for a language
    pub fn get_config(&self, language: Language) -> Result<&RuntimeSelector> {
        self.configs
            .get(&language)
            .ok_or_else(|| anyhow::anyhow!("No runtime configured for language: {}", language))
    }

    /// All configured languages with their selectors, in a stable order
    pub fn list_languages(&self) -> Vec<(Language, &RuntimeSelector)> {
        Language::ALL
            .iter()
            .filter_map(|lang| self.configs.get(lang).map(|sel| (*lang, sel)))
            .collect()
    }

    /// The table in languages.json form
    pub fn to_json(&self) -> LanguagesJson {
        LanguagesJson {
            languages: self
                .list_languages()
                .into_iter()
                .map(|(lang, sel)| LanguageEntry {
                    name: lang.to_string(),
                    version: sel.version.clone(),
                    runtime: (sel.language != lang.as_str()).then(|| sel.language.clone()),
                })
                .collect(),
        }
    }
}
