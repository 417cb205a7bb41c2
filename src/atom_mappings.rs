//! Decoder for the BioCyc `download-atom-mappings` text format.
//!
//! Each mapping is a block of six `KEY - value` lines. Side lists are
//! sequences of `(id start end)` triples, where `id` may itself be written
//! `(id n)`; every triple expands to one atom label per index in its range.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::CycError;
use crate::identity::Identity;

static BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"REACTION - ([^\n]+)\n",
        r"NTH-ATOM-MAPPING - ([^\n]+)\n",
        r"MAPPING-TYPE - ([^\n]+)\n",
        r"FROM-SIDE - ([^\n]+)\n",
        r"TO-SIDE - ([^\n]+)\n",
        r"INDICES - ([^\n]+)(?:\n|$)",
    ))
    .expect("atom mapping block pattern is valid")
});

static SIDE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((\([^()]+\)|[^\s()]+)\s+(0|[1-9][0-9]*)\s+(0|[1-9][0-9]*)\)")
        .expect("side entry pattern is valid")
});

static ID_WITH_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\((\S+)\s+(?:0|[1-9][0-9]*)\)$").expect("indexed id pattern is valid")
});

static INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0|[1-9][0-9]*").expect("index pattern is valid"));

/// One atom mapping of a reaction: from-side atom label → to-side atom label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtomMapping {
    pub reaction: String,
    pub nth_atom_mapping: String,
    pub mapping_type: String,
    pub atoms: BTreeMap<String, String>,
}

/// Where a reaction's atom mappings come from.
pub trait AtomMappingSource: Send + Sync {
    fn atom_mappings(&self, reaction: &Identity) -> Result<Vec<AtomMapping>, CycError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SideEntry {
    id: String,
    occurrence: usize,
    start: usize,
    end: usize,
}

pub fn parse(text: &str) -> Result<Vec<AtomMapping>, CycError> {
    BLOCK
        .captures_iter(text)
        .map(|caps| -> Result<AtomMapping, CycError> {
            let from = atom_labels(&parse_side(&caps[4])?);
            let to = atom_labels(&parse_side(&caps[5])?);
            let indices = parse_indices(&caps[6])?;

            let mut atoms = BTreeMap::new();
            for (position, index) in indices.into_iter().enumerate() {
                let from_atom = from.get(position).ok_or_else(|| {
                    CycError::InvalidAtomMapping(format!(
                        "{}: {} indices for {} from-side atoms",
                        caps[1].trim(),
                        position + 1,
                        from.len()
                    ))
                })?;
                let to_atom = to.get(index).ok_or_else(|| {
                    CycError::InvalidAtomMapping(format!(
                        "{}: index {index} out of range for {} to-side atoms",
                        caps[1].trim(),
                        to.len()
                    ))
                })?;
                atoms.insert(from_atom.clone(), to_atom.clone());
            }

            Ok(AtomMapping {
                reaction: caps[1].trim().to_string(),
                nth_atom_mapping: caps[2].trim().to_string(),
                mapping_type: caps[3].trim().to_string(),
                atoms,
            })
        })
        .collect()
}

fn parse_side(text: &str) -> Result<Vec<SideEntry>, CycError> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    SIDE_ENTRY
        .captures_iter(text)
        .map(|caps| -> Result<SideEntry, CycError> {
            let raw_id = &caps[1];
            let id = ID_WITH_INDEX
                .captures(raw_id)
                .map_or(raw_id, |inner| inner.get(1).map_or(raw_id, |m| m.as_str()))
                .to_string();
            let occurrence = seen.entry(id.clone()).or_insert(0);
            *occurrence += 1;
            Ok(SideEntry {
                occurrence: *occurrence,
                start: parse_number(&caps[2])?,
                end: parse_number(&caps[3])?,
                id,
            })
        })
        .collect()
}

fn atom_labels(entries: &[SideEntry]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| {
            let count = (entry.start..=entry.end).count();
            (1..=count).map(move |k| format!("{}-{}-atom{k}", entry.occurrence, entry.id))
        })
        .collect()
}

fn parse_indices(text: &str) -> Result<Vec<usize>, CycError> {
    INDEX
        .find_iter(text)
        .map(|m| parse_number(m.as_str()))
        .collect()
}

fn parse_number(text: &str) -> Result<usize, CycError> {
    text.parse()
        .map_err(|_| CycError::InvalidAtomMapping(format!("bad atom index {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_occurrences_count_per_id() {
        let entries = parse_side("((A 1 2) (B 0 0) (A 3 3))").unwrap();
        let occurrences: Vec<_> = entries
            .iter()
            .map(|entry| (entry.id.as_str(), entry.occurrence))
            .collect();
        assert_eq!(occurrences, vec![("A", 1), ("B", 1), ("A", 2)]);
    }

    #[test]
    fn indexed_ids_are_unwrapped() {
        let entries = parse_side("(((WATER 2) 4 4))").unwrap();
        assert_eq!(entries[0].id, "WATER");
        assert_eq!((entries[0].start, entries[0].end), (4, 4));
    }

    #[test]
    fn labels_expand_ranges() {
        let labels = atom_labels(&parse_side("((A 1 3) (B 7 7))").unwrap());
        assert_eq!(labels, vec!["1-A-atom1", "1-A-atom2", "1-A-atom3", "1-B-atom1"]);
    }

    #[test]
    fn indices_parse_in_order() {
        assert_eq!(parse_indices("3 0 12 1").unwrap(), vec![3, 0, 12, 1]);
    }
}
