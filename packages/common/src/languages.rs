use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A submittable language: canonical identifier plus the tags players may
/// write on their code fence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDescriptor {
    /// Canonical identifier, also the name sent to the execution sandbox.
    pub id: String,
    /// Accepted aliases, matched case-insensitively. The canonical id
    /// matches implicitly.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageDescriptor {
    pub fn new(id: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            id: id.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn matches(&self, tag: &str) -> bool {
        self.id.eq_ignore_ascii_case(tag) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(tag))
    }
}

/// A set of languages collapsed into a single ranking bucket.
///
/// Submissions in any member language are stored and ranked under the
/// representative (e.g. `node` and `deno` both count as `javascript`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    pub name: String,
    /// Canonical id the members collapse to. Must be a registered language.
    pub representative: String,
    /// Canonical ids of the collapsed languages.
    pub members: Vec<String>,
}

/// Error raised while validating a language set at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageConfigError {
    #[error("language '{id}' is declared twice")]
    DuplicateLanguage { id: String },

    #[error("alias '{alias}' is claimed by both '{first}' and '{second}'")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("equivalence group '{name}' is declared twice")]
    DuplicateGroup { name: String },

    #[error("group '{group}' references unknown language '{language}'")]
    UnknownMember { group: String, language: String },

    #[error("group '{group}' has unknown representative '{representative}'")]
    UnknownRepresentative { group: String, representative: String },

    #[error("language '{language}' belongs to groups '{first}' and '{second}' (groups must be disjoint)")]
    OverlappingGroups {
        language: String,
        first: String,
        second: String,
    },
}

/// Validated set of languages and equivalence groups.
///
/// Construction fails fast on ambiguous aliases or overlapping groups, so
/// resolution never has to disambiguate at submission time.
#[derive(Clone, Debug)]
pub struct LanguageRegistry {
    languages: Vec<LanguageDescriptor>,
    /// member canonical id -> index of the representative descriptor
    representative_of: HashMap<String, usize>,
}

impl LanguageRegistry {
    pub fn new(
        languages: Vec<LanguageDescriptor>,
        groups: Vec<EquivalenceGroup>,
    ) -> Result<Self, LanguageConfigError> {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (i, lang) in languages.iter().enumerate() {
            if index_of.insert(lang.id.as_str(), i).is_some() {
                return Err(LanguageConfigError::DuplicateLanguage {
                    id: lang.id.clone(),
                });
            }
        }

        // Aliases must be unambiguous across the whole set, canonical ids
        // included: resolution returns the first match and must never
        // depend on declaration order.
        let mut alias_owner: HashMap<String, &str> = HashMap::new();
        for lang in &languages {
            for tag in std::iter::once(&lang.id).chain(lang.aliases.iter()) {
                let key = tag.to_ascii_lowercase();
                if let Some(first) = alias_owner.get(&key) {
                    if *first != lang.id.as_str() {
                        return Err(LanguageConfigError::AmbiguousAlias {
                            alias: tag.clone(),
                            first: first.to_string(),
                            second: lang.id.clone(),
                        });
                    }
                } else {
                    alias_owner.insert(key, lang.id.as_str());
                }
            }
        }

        let mut group_of: HashMap<&str, &str> = HashMap::new();
        let mut seen_groups: HashSet<&str> = HashSet::new();
        let mut representative_of = HashMap::new();
        for group in &groups {
            if !seen_groups.insert(group.name.as_str()) {
                return Err(LanguageConfigError::DuplicateGroup {
                    name: group.name.clone(),
                });
            }
            let rep_index = *index_of.get(group.representative.as_str()).ok_or_else(|| {
                LanguageConfigError::UnknownRepresentative {
                    group: group.name.clone(),
                    representative: group.representative.clone(),
                }
            })?;
            for member in &group.members {
                if !index_of.contains_key(member.as_str()) {
                    return Err(LanguageConfigError::UnknownMember {
                        group: group.name.clone(),
                        language: member.clone(),
                    });
                }
                if let Some(first) = group_of.insert(member.as_str(), group.name.as_str()) {
                    return Err(LanguageConfigError::OverlappingGroups {
                        language: member.clone(),
                        first: first.to_string(),
                        second: group.name.clone(),
                    });
                }
                representative_of.insert(member.clone(), rep_index);
            }
        }

        Ok(Self {
            languages,
            representative_of,
        })
    }

    /// The built-in language set shipped with the engine.
    pub fn default_set() -> Self {
        let languages = vec![
            LanguageDescriptor::new("python", &["py", "python3"]),
            LanguageDescriptor::new("javascript", &["js"]),
            LanguageDescriptor::new("node", &["nodejs", "node.js"]),
            LanguageDescriptor::new("deno", &[]),
            LanguageDescriptor::new("typescript", &["ts"]),
            LanguageDescriptor::new("rust", &["rs"]),
            LanguageDescriptor::new("c", &[]),
            LanguageDescriptor::new("cpp", &["c++"]),
            LanguageDescriptor::new("csharp", &["c#", "cs"]),
            LanguageDescriptor::new("java", &[]),
            LanguageDescriptor::new("go", &["golang"]),
            LanguageDescriptor::new("ruby", &["rb"]),
            LanguageDescriptor::new("php", &[]),
            LanguageDescriptor::new("bash", &["sh", "shell"]),
            LanguageDescriptor::new("lua", &[]),
            LanguageDescriptor::new("haskell", &["hs"]),
            LanguageDescriptor::new("perl", &[]),
            LanguageDescriptor::new("kotlin", &["kt"]),
            LanguageDescriptor::new("swift", &[]),
        ];
        let groups = vec![EquivalenceGroup {
            name: "javascript".into(),
            representative: "javascript".into(),
            members: vec!["javascript".into(), "node".into(), "deno".into()],
        }];
        Self::new(languages, groups).expect("builtin language set is valid")
    }

    /// Case-insensitive lookup of a raw submission tag. Returns the first
    /// descriptor whose id or alias set matches, or None.
    pub fn resolve(&self, raw_tag: &str) -> Option<&LanguageDescriptor> {
        let tag = raw_tag.trim();
        if tag.is_empty() {
            return None;
        }
        self.languages.iter().find(|lang| lang.matches(tag))
    }

    /// Substitutes the descriptor's equivalence-group representative, or
    /// returns the descriptor unchanged when it belongs to no group.
    pub fn collapse<'a>(&'a self, descriptor: &'a LanguageDescriptor) -> &'a LanguageDescriptor {
        match self.representative_of.get(descriptor.id.as_str()) {
            Some(&rep) => &self.languages[rep],
            None => descriptor,
        }
    }

    /// Exact lookup by canonical id.
    pub fn get(&self, id: &str) -> Option<&LanguageDescriptor> {
        self.languages.iter().find(|lang| lang.id == id)
    }
}
