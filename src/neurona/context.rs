//! Typed context carried by each Neurona.
//!
//! Each Neurona type has its own set of context attributes. The union is a
//! plain enum; every variant answers `field()` lookups and `cleanup()`, and
//! serializes tagged by `type`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value resolved from a Neurona field for filter evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl FieldValue {
    /// Numeric view of the value. Text is parsed when it holds a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::List(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NeuronaContext {
    Requirement {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        verification_method: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        effort_points: Option<u32>,
        #[serde(default)]
        sprint: Option<String>,
    },
    TestCase {
        #[serde(default)]
        framework: Option<String>,
        #[serde(default)]
        test_file: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
        #[serde(default)]
        assignee: Option<String>,
        /// Last run duration in milliseconds.
        #[serde(default)]
        duration: Option<u64>,
        #[serde(default)]
        last_run: Option<String>,
    },
    Issue {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        created: Option<String>,
        #[serde(default)]
        resolved: Option<String>,
        #[serde(default)]
        closed: Option<String>,
        #[serde(default)]
        blocked_by: Vec<String>,
    },
    Artifact {
        #[serde(default)]
        runtime: Option<String>,
        #[serde(default)]
        file_path: Option<String>,
        #[serde(default)]
        safe_to_exec: bool,
        #[serde(default)]
        language_version: Option<String>,
        #[serde(default)]
        last_modified: Option<String>,
    },
    StateMachine {
        #[serde(default)]
        entry_action: Option<String>,
        #[serde(default)]
        exit_action: Option<String>,
        #[serde(default)]
        allowed_transitions: Vec<String>,
    },
    Concept {
        #[serde(default)]
        definition: Option<String>,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    Reference {
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        author: Option<String>,
    },
    Lesson {
        #[serde(default)]
        learned_from: Option<String>,
        #[serde(default)]
        applies_to: Vec<String>,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    Custom(BTreeMap<String, String>),
    #[default]
    None,
}

fn text(value: &Option<String>) -> Option<FieldValue> {
    value.as_ref().map(|s| FieldValue::Text(s.clone()))
}

fn number<N: Into<f64> + Copy>(value: &Option<N>) -> Option<FieldValue> {
    value.map(|n| FieldValue::Number(n.into()))
}

fn list(values: &[String]) -> Option<FieldValue> {
    Some(FieldValue::List(values.to_vec()))
}

fn clean(value: &mut Option<String>) {
    if let Some(s) = value {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            *value = None;
        } else if trimmed.len() != s.len() {
            *s = trimmed.to_string();
        }
    }
}

fn clean_list(values: &mut Vec<String>) {
    for v in values.iter_mut() {
        *v = v.trim().to_string();
    }
    values.retain(|v| !v.is_empty());
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

impl NeuronaContext {
    /// Look up a context attribute by name.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match self {
            Self::Requirement {
                status,
                verification_method,
                priority,
                assignee,
                effort_points,
                sprint,
            } => match name {
                "status" => text(status),
                "verification_method" => text(verification_method),
                "priority" => number(priority),
                "assignee" => text(assignee),
                "effort_points" => number(effort_points),
                "sprint" => text(sprint),
                _ => None,
            },
            Self::TestCase {
                framework,
                test_file,
                status,
                priority,
                assignee,
                duration,
                last_run,
            } => match name {
                "framework" => text(framework),
                "test_file" => text(test_file),
                "status" => text(status),
                "priority" => number(priority),
                "assignee" => text(assignee),
                "duration" => duration.map(|d| FieldValue::Number(d as f64)),
                "last_run" => text(last_run),
                _ => None,
            },
            Self::Issue {
                status,
                priority,
                assignee,
                created,
                resolved,
                closed,
                blocked_by,
            } => match name {
                "status" => text(status),
                "priority" => number(priority),
                "assignee" => text(assignee),
                "created" => text(created),
                "resolved" => text(resolved),
                "closed" => text(closed),
                "blocked_by" => list(blocked_by),
                _ => None,
            },
            Self::Artifact {
                runtime,
                file_path,
                safe_to_exec,
                language_version,
                last_modified,
            } => match name {
                "runtime" => text(runtime),
                "file_path" => text(file_path),
                "safe_to_exec" => Some(FieldValue::Text(safe_to_exec.to_string())),
                "language_version" => text(language_version),
                "last_modified" => text(last_modified),
                _ => None,
            },
            Self::StateMachine {
                entry_action,
                exit_action,
                allowed_transitions,
            } => match name {
                "entry_action" => text(entry_action),
                "exit_action" => text(exit_action),
                "allowed_transitions" => list(allowed_transitions),
                _ => None,
            },
            Self::Concept {
                definition,
                difficulty,
            } => match name {
                "definition" => text(definition),
                "difficulty" => number(difficulty),
                _ => None,
            },
            Self::Reference {
                source,
                url,
                author,
            } => match name {
                "source" => text(source),
                "url" => text(url),
                "author" => text(author),
                _ => None,
            },
            Self::Lesson {
                learned_from,
                applies_to,
                difficulty,
            } => match name {
                "learned_from" => text(learned_from),
                "applies_to" => list(applies_to),
                "difficulty" => number(difficulty),
                _ => None,
            },
            Self::Custom(fields) => fields.get(name).map(|v| FieldValue::Text(v.clone())),
            Self::None => None,
        }
    }

    /// Normalize in place: trim strings, drop empty optionals and empty
    /// list entries.
    pub fn cleanup(&mut self) {
        match self {
            Self::Requirement {
                status,
                verification_method,
                assignee,
                sprint,
                ..
            } => {
                clean(status);
                clean(verification_method);
                clean(assignee);
                clean(sprint);
            }
            Self::TestCase {
                framework,
                test_file,
                status,
                assignee,
                last_run,
                ..
            } => {
                clean(framework);
                clean(test_file);
                clean(status);
                clean(assignee);
                clean(last_run);
            }
            Self::Issue {
                status,
                assignee,
                created,
                resolved,
                closed,
                blocked_by,
                ..
            } => {
                clean(status);
                clean(assignee);
                clean(created);
                clean(resolved);
                clean(closed);
                clean_list(blocked_by);
            }
            Self::Artifact {
                runtime,
                file_path,
                language_version,
                last_modified,
                ..
            } => {
                clean(runtime);
                clean(file_path);
                clean(language_version);
                clean(last_modified);
            }
            Self::StateMachine {
                entry_action,
                exit_action,
                allowed_transitions,
            } => {
                clean(entry_action);
                clean(exit_action);
                clean_list(allowed_transitions);
            }
            Self::Concept { definition, .. } => clean(definition),
            Self::Reference {
                source,
                url,
                author,
            } => {
                clean(source);
                clean(url);
                clean(author);
            }
            Self::Lesson {
                learned_from,
                applies_to,
                ..
            } => {
                clean(learned_from);
                clean_list(applies_to);
            }
            Self::Custom(fields) => {
                fields.retain(|_, v| {
                    *v = v.trim().to_string();
                    !v.is_empty()
                });
            }
            Self::None => {}
        }
    }
}
