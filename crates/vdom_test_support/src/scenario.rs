//! Declarative diff scenarios stored as TOML.
//!
//! ```toml
//! [[scenario]]
//! name = "swap"
//! before = { tag = "ul", children = [{ tag = "li", key = "a" }, { tag = "li", key = "b" }] }
//! after = { tag = "ul", children = [{ tag = "li", key = "b" }, { tag = "li", key = "a" }] }
//! expect = { total = 1, MoveChild = 1 }
//! opcodes = ["MoveChild"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use vdom::{Node, Opcode, Patch};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("scenario node needs exactly one of `tag` or `text`")]
    AmbiguousNode,
    #[error("unknown opcode name `{0}` in expectation")]
    UnknownOpcode(String),
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Vec<Scenario>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub before: SceneNode,
    pub after: SceneNode,
    #[serde(default)]
    pub expect: Expectation,
    /// Exact patch variant sequence, when order matters.
    #[serde(default)]
    pub opcodes: Option<Vec<String>>,
}

/// Element (`tag`) or text (`text`) node.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneNode {
    pub tag: Option<String>,
    pub text: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Event names bound to a fixed unit message.
    #[serde(default)]
    pub on: Vec<String>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

/// Expected patch counts; `total` plus per-opcode counts keyed by variant name.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Expectation {
    pub total: Option<usize>,
    #[serde(flatten)]
    pub per_opcode: BTreeMap<String, usize>,
}

impl SceneNode {
    pub fn build(&self) -> Result<Node<()>, ScenarioError> {
        match (&self.tag, &self.text) {
            (Some(tag), None) => {
                let mut node = Node::element(tag);
                if let Some(key) = &self.key {
                    node = node.with_key(key.clone());
                }
                for (name, value) in &self.attrs {
                    node = node.attr(name, value.clone());
                }
                for event in &self.on {
                    node = node.on(event, ());
                }
                for child in &self.children {
                    node = node.child(child.build()?);
                }
                Ok(node)
            }
            (None, Some(text)) => Ok(Node::text(text.clone())),
            _ => Err(ScenarioError::AmbiguousNode),
        }
    }
}

impl Expectation {
    /// Mismatches between the expectation and `patches`, one line each.
    pub fn check(&self, patches: &[Patch]) -> Result<Vec<String>, ScenarioError> {
        let mut problems = Vec::new();
        if let Some(total) = self.total {
            if patches.len() != total {
                problems.push(format!("total: expected {total}, got {}", patches.len()));
            }
        }
        for (name, expected) in &self.per_opcode {
            let opcode = opcode_by_name(name)?;
            let got = patches.iter().filter(|p| p.opcode() == opcode).count();
            if got != *expected {
                problems.push(format!("{name}: expected {expected}, got {got}"));
            }
        }
        Ok(problems)
    }
}

fn opcode_by_name(name: &str) -> Result<Opcode, ScenarioError> {
    Ok(match name {
        "SetAttribute" => Opcode::SetAttribute,
        "RemoveAttribute" => Opcode::RemoveAttribute,
        "InsertBefore" => Opcode::InsertBefore,
        "RemoveChild" => Opcode::RemoveChild,
        "MoveChild" => Opcode::MoveChild,
        "SetText" => Opcode::SetText,
        "ClearChildren" => Opcode::ClearChildren,
        "AddHandler" => Opcode::AddHandler,
        "RemoveHandler" => Opcode::RemoveHandler,
        "SetTitle" => Opcode::SetTitle,
        other => return Err(ScenarioError::UnknownOpcode(other.to_string())),
    })
}

pub fn parse_scenarios(path: &Path, source: &str) -> Result<Vec<Scenario>, ScenarioError> {
    let file: ScenarioFile = toml::from_str(source).map_err(|source| ScenarioError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.scenario)
}

pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, ScenarioError> {
    let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenarios(path, &source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[scenario]]
name = "swap"
before = { tag = "ul", children = [{ tag = "li", key = "a" }, { tag = "li", key = "b" }] }
after = { tag = "ul", children = [{ tag = "li", key = "b" }, { tag = "li", key = "a" }] }
expect = { total = 1, MoveChild = 1 }
"#;

    #[test]
    fn parses_inline_scenarios() {
        let scenarios = parse_scenarios(Path::new("inline"), SAMPLE).unwrap();
        assert_eq!(scenarios.len(), 1);
        let s = &scenarios[0];
        assert_eq!(s.name, "swap");
        assert_eq!(s.expect.total, Some(1));
        assert_eq!(s.expect.per_opcode.get("MoveChild"), Some(&1));
        let tree = s.before.build().unwrap();
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[1].key(), Some("b"));
    }

    #[test]
    fn rejects_node_with_tag_and_text() {
        let node = SceneNode {
            tag: Some("p".into()),
            text: Some("x".into()),
            ..SceneNode::default()
        };
        assert!(matches!(node.build(), Err(ScenarioError::AmbiguousNode)));
    }

    #[test]
    fn unknown_opcode_names_are_reported() {
        let expect = Expectation {
            total: None,
            per_opcode: BTreeMap::from([("Teleport".to_string(), 1)]),
        };
        assert!(matches!(
            expect.check(&[]),
            Err(ScenarioError::UnknownOpcode(name)) if name == "Teleport"
        ));
    }
}
