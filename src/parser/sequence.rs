use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named collection of sequences, one per source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceGroup {
    pub name: String,
    pub sequences: Vec<Vec<f64>>,
}

impl SequenceGroup {
    pub fn new(name: impl Into<String>, sequences: Vec<Vec<f64>>) -> Self {
        Self {
            name: name.into(),
            sequences,
        }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Total number of sequences across all groups
pub fn sequence_count(groups: &[SequenceGroup]) -> usize {
    groups.iter().map(SequenceGroup::len).sum()
}

/// Iterate every sequence of every group in source order
pub fn iter_sequences(groups: &[SequenceGroup]) -> impl Iterator<Item = &[f64]> {
    groups
        .iter()
        .flat_map(|group| group.sequences.iter().map(Vec::as_slice))
}

/// Key sequences as `S1`, `S2`, ... in group order, then sequence order
pub fn label_sequences(groups: &[SequenceGroup]) -> IndexMap<String, Vec<f64>> {
    iter_sequences(groups)
        .enumerate()
        .map(|(i, sequence)| (format!("S{}", i + 1), sequence.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_source_order() {
        let groups = vec![
            SequenceGroup::new("a", vec![vec![1.0, 2.0], vec![3.0]]),
            SequenceGroup::new("empty", Vec::new()),
            SequenceGroup::new("b", vec![vec![4.0, 5.0, 6.0]]),
        ];

        let labelled = label_sequences(&groups);

        let keys: Vec<&str> = labelled.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["S1", "S2", "S3"]);
        assert_eq!(labelled["S2"], vec![3.0]);
        assert_eq!(labelled["S3"], vec![4.0, 5.0, 6.0]);
        assert_eq!(sequence_count(&groups), 3);
    }
}
