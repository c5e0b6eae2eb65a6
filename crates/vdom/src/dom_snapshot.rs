use crate::dom_patch::PatchNode;
use std::fmt::{self, Write};

/// Deterministic line-per-node rendering of a tree for test comparisons.
/// Not a public stable format.
///
/// Equivalence rules:
/// - Node kinds, tags and text values must match.
/// - Attribute names and values must match; order matters unless `sort_attributes` is set
///   (hosts append attributes created by later patches).
/// - Node ids are compared unless `ignore_ids` is set. Attribute ids never are; hosts key
///   attributes by name.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotOptions {
    pub ignore_ids: bool,
    pub sort_attributes: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_ids: false,
            sort_attributes: true,
        }
    }
}

#[derive(Debug)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

impl TreeSnapshot {
    pub fn new(root: &PatchNode, options: SnapshotOptions) -> Self {
        let mut lines = Vec::new();
        walk(root, &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn walk(node: &PatchNode, options: &SnapshotOptions, depth: usize, out: &mut Vec<String>) {
    let mut line = "  ".repeat(depth);
    match node {
        PatchNode::Element {
            id,
            tag,
            attributes,
            children,
        } => {
            let _ = write!(&mut line, "<{tag}");
            if !options.ignore_ids {
                let _ = write!(&mut line, " #{id}");
            }
            let mut attrs: Vec<_> = attributes
                .iter()
                .map(|a| (a.name.as_ref(), a.value.as_str()))
                .collect();
            if options.sort_attributes {
                attrs.sort();
            }
            for (name, value) in attrs {
                let _ = write!(&mut line, " {name}={value:?}");
            }
            line.push('>');
            out.push(line);
            for child in children {
                walk(child, options, depth + 1, out);
            }
        }
        PatchNode::Text { id, value } => {
            let _ = write!(&mut line, "{value:?}");
            if !options.ignore_ids {
                let _ = write!(&mut line, " #{id}");
            }
            out.push(line);
        }
    }
}

/// First differing line between two snapshots, with both renderings for context.
#[derive(Debug)]
pub struct TreeMismatch {
    pub line: usize,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for TreeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tree mismatch at line {}", self.line + 1)?;
        writeln!(f, "expected:\n{}", self.expected)?;
        write!(f, "actual:\n{}", self.actual)
    }
}

impl std::error::Error for TreeMismatch {}

pub fn compare_trees(
    expected: &PatchNode,
    actual: &PatchNode,
    options: SnapshotOptions,
) -> Result<(), TreeMismatch> {
    let expected = TreeSnapshot::new(expected, options);
    let actual = TreeSnapshot::new(actual, options);
    let (left, right) = (expected.as_lines(), actual.as_lines());
    let first_diff = left
        .iter()
        .zip(right)
        .position(|(a, b)| a != b)
        .or_else(|| (left.len() != right.len()).then(|| left.len().min(right.len())));
    match first_diff {
        None => Ok(()),
        Some(line) => Err(TreeMismatch {
            line,
            expected: expected.render(),
            actual: actual.render(),
        }),
    }
}

pub fn assert_tree_eq(expected: &PatchNode, actual: &PatchNode, options: SnapshotOptions) {
    if let Err(mismatch) = compare_trees(expected, actual, options) {
        panic!("{mismatch}");
    }
}
