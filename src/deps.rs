//! Dependency tracking and build-rule emission.
//!
//! Every include and every source-to-output step records an edge keyed by
//! the consuming file. Edges are never removed during a run; the whole map
//! is rendered as a makefile when running with `-M`.

use indexmap::IndexMap;
use std::fmt::{self, Display};
use std::path::Path;
use std::time::SystemTime;

/// A generated output together with what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub source: String,
    pub project: Option<String>,
}

/// Accumulated dependency edges and generated outputs of a run.
#[derive(Debug, Clone, Default)]
pub struct DependencyTracker {
    edges: IndexMap<String, Vec<String>>,
    outputs: IndexMap<String, GeneratedFile>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `target` must be rebuilt when `prerequisite` changes.
    pub fn add_edge<T: Into<String>, P: Into<String>>(&mut self, target: T, prerequisite: P) {
        self.edges.entry(target.into()).or_default().push(prerequisite.into());
    }

    /// Records a generated output and the edge from its source.
    pub fn add_output(&mut self, target: &str, source: &str, project: Option<&str>) {
        self.add_edge(target, source);
        self.outputs.insert(
            target.to_string(),
            GeneratedFile { source: source.to_string(), project: project.map(String::from) },
        );
    }

    /// Prerequisites of `target`, in insertion order.
    pub fn prerequisites(&self, target: &str) -> &[String] {
        self.edges.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &GeneratedFile)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Returns true when `target` exists and is not older than `source`.
pub fn is_up_to_date(source: &Path, target: &Path) -> bool {
    match (modified(source), modified(target)) {
        (Some(source), Some(target)) => target >= source,
        _ => false,
    }
}

/// Makefile view over a tracker.
pub struct Makefile<'a> {
    tracker: &'a DependencyTracker,
    program: &'a str,
}

impl<'a> Makefile<'a> {
    pub fn new(tracker: &'a DependencyTracker, program: &'a str) -> Self {
        Self { tracker, program }
    }
}

impl Display for Makefile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Generated by gtml, do not edit.")?;
        writeln!(f)?;
        let all: Vec<&str> = self.tracker.outputs().map(|(target, _)| target).collect();
        writeln!(f, "all: {}", all.join(" "))?;
        writeln!(f)?;
        writeln!(f, ".PHONY: all")?;

        for (target, prerequisites) in self.tracker.edges() {
            writeln!(f)?;
            writeln!(f, "{}: {}", target, prerequisites.join(" ").trim_start())?;
            if let Some(generated) = self.tracker.outputs.get(target) {
                match &generated.project {
                    Some(project) => writeln!(
                        f,
                        "\t{} -F {} {}",
                        self.program, generated.source, project
                    )?,
                    None => writeln!(f, "\t{} {}", self.program, generated.source)?,
                }
            }
        }
        Ok(())
    }
}
