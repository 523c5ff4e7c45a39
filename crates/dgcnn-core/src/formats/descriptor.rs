//! JSON dataset descriptor.
//!
//! A descriptor holds one corpus as parallel per-graph lists:
//!
//! ```text
//! {
//!   "graphs":          [[[1, 2], [2, 3]], ...],   edge list per graph
//!   "nodes_size_list": [3, ...],                  node count per graph
//!   "labels":          [1, ...],                  raw label per graph
//!   "vertex_tag":      [[1, 2, 1], ...] | null,   optional tag per node
//!   "feature":         [[[0.5], ...], ...] | null, optional features per node
//!   "index_from":      1                          id of the first node
//! }
//! ```
//!
//! Empty `vertex_tag` / `feature` lists are treated the same as `null`.

use crate::{Dataset, Error, RawGraph, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub graphs: Vec<Vec<(usize, usize)>>,
    pub nodes_size_list: Vec<usize>,
    pub labels: Vec<i64>,
    #[serde(default)]
    pub vertex_tag: Option<Vec<Vec<i64>>>,
    #[serde(default)]
    pub feature: Option<Vec<Vec<Vec<f32>>>>,
    #[serde(default)]
    pub index_from: usize,
}

impl DatasetDescriptor {
    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Validate list lengths and build a [`Dataset`].
    pub fn into_dataset(self) -> Result<Dataset> {
        let n = self.graphs.len();
        if self.labels.len() != n {
            return Err(Error::MissingLabel {
                graphs: n,
                labels: self.labels.len(),
            });
        }
        if self.nodes_size_list.len() != n {
            return Err(Error::LengthMismatch {
                graph: n.min(self.nodes_size_list.len()),
                what: "nodes_size_list",
                expected: n,
                got: self.nodes_size_list.len(),
            });
        }

        let tags = self.vertex_tag.filter(|t| !t.is_empty());
        if let Some(tags) = &tags {
            if tags.len() != n {
                return Err(Error::LengthMismatch {
                    graph: n.min(tags.len()),
                    what: "vertex_tag",
                    expected: n,
                    got: tags.len(),
                });
            }
        }
        let features = self.feature.filter(|f| !f.is_empty());
        if let Some(features) = &features {
            if features.len() != n {
                return Err(Error::LengthMismatch {
                    graph: n.min(features.len()),
                    what: "feature",
                    expected: n,
                    got: features.len(),
                });
            }
        }

        let mut tags = tags.map(Vec::into_iter);
        let mut features = features.map(Vec::into_iter);
        let graphs = self
            .graphs
            .into_iter()
            .zip(self.nodes_size_list)
            .zip(self.labels)
            .map(|((edges, node_count), label)| RawGraph {
                node_count,
                edges,
                tags: tags.as_mut().and_then(Iterator::next),
                features: features.as_mut().and_then(Iterator::next),
                label,
            })
            .collect();

        Dataset::new(graphs, self.index_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MUTAG_LIKE: &str = r#"{
        "graphs": [[[1, 2], [2, 3]], [[1, 2], [1, 3], [2, 3]]],
        "nodes_size_list": [3, 3],
        "labels": [1, -1],
        "vertex_tag": [[1, 2, 1], [2, 2, 3]],
        "feature": null,
        "index_from": 1
    }"#;

    #[test]
    fn test_parse_descriptor() {
        let ds = DatasetDescriptor::from_json_str(MUTAG_LIKE)
            .unwrap()
            .into_dataset()
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.index_from(), 1);
        assert_eq!(ds.graphs()[0].edges, vec![(1, 2), (2, 3)]);
        assert_eq!(ds.graphs()[1].tags.as_deref(), Some(&[2, 2, 3][..]));
        assert_eq!(ds.graphs()[1].class(), 0);
        assert_eq!(ds.tag_vocabulary(), Some(3));
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"graphs": [[[0, 1]]], "nodes_size_list": [2], "labels": [0]}"#;
        let ds = DatasetDescriptor::from_json_str(json)
            .unwrap()
            .into_dataset()
            .unwrap();
        assert_eq!(ds.index_from(), 0);
        assert!(ds.graphs()[0].tags.is_none());
        assert!(ds.graphs()[0].features.is_none());
    }

    #[test]
    fn test_empty_tag_list_means_untagged() {
        let json = r#"{"graphs": [[[0, 1]]], "nodes_size_list": [2], "labels": [0], "vertex_tag": []}"#;
        let ds = DatasetDescriptor::from_json_str(json)
            .unwrap()
            .into_dataset()
            .unwrap();
        assert!(!ds.has_tags());
    }

    #[test]
    fn test_missing_label() {
        let json = r#"{"graphs": [[[0, 1]], [[0, 1]]], "nodes_size_list": [2, 2], "labels": [0]}"#;
        let err = DatasetDescriptor::from_json_str(json)
            .unwrap()
            .into_dataset()
            .unwrap_err();
        assert!(matches!(err, Error::MissingLabel { graphs: 2, labels: 1 }));
    }

    #[test]
    fn test_node_size_length_mismatch() {
        let json = r#"{"graphs": [[[0, 1]]], "nodes_size_list": [], "labels": [0]}"#;
        let err = DatasetDescriptor::from_json_str(json)
            .unwrap()
            .into_dataset()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                what: "nodes_size_list",
                ..
            }
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MUTAG_LIKE.as_bytes()).unwrap();
        let desc = DatasetDescriptor::from_json_file(file.path()).unwrap();
        assert_eq!(desc.nodes_size_list, vec![3, 3]);
    }
}
