use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;
use kira_cyc::atom_mappings::{AtomMapping, AtomMappingSource, parse};
use kira_cyc::cache::find_object;
use kira_cyc::error::CycError;
use kira_cyc::identity::Identity;
use kira_cyc::record::Record;
use kira_cyc::xml::Document;

fn atoms(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

#[test]
fn decode_single_block() {
    let text = "REACTION - X\nNTH-ATOM-MAPPING - 1\nMAPPING-TYPE - AA\nFROM-SIDE - ((A 1 2))\nTO-SIDE - ((B 1 2))\nINDICES - 0 1\n";
    let mappings = parse(text).unwrap();

    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].reaction, "X");
    assert_eq!(mappings[0].nth_atom_mapping, "1");
    assert_eq!(mappings[0].mapping_type, "AA");
    assert_eq!(
        mappings[0].atoms,
        atoms(&[("1-A-atom1", "1-B-atom1"), ("1-A-atom2", "1-B-atom2")])
    );
}

#[test]
fn decode_downloaded_file() {
    let raw = fs::read_to_string("tests/fixtures/argsuccinlya.atom-mappings").unwrap();
    let mappings = parse(&raw).unwrap();
    assert_eq!(mappings.len(), 2);

    assert_eq!(mappings[0].mapping_type, "NO-HYDROGEN-ENCODING");
    assert_eq!(
        mappings[0].atoms,
        atoms(&[
            ("1-L-ARGININO-SUCCINATE-atom1", "1-ARG-atom2"),
            ("1-L-ARGININO-SUCCINATE-atom2", "1-FUM-atom1"),
            ("1-L-ARGININO-SUCCINATE-atom3", "1-ARG-atom1"),
        ])
    );

    // the second occurrence of the same compound gets its own counter
    assert_eq!(mappings[1].nth_atom_mapping, "2");
    assert_eq!(
        mappings[1].atoms,
        atoms(&[
            ("1-L-ARGININO-SUCCINATE-atom1", "1-ARG-atom1"),
            ("1-L-ARGININO-SUCCINATE-atom2", "1-ARG-atom2"),
            ("2-L-ARGININO-SUCCINATE-atom1", "1-FUM-atom1"),
        ])
    );
}

#[test]
fn final_block_without_trailing_newline() {
    let text = "REACTION - X\nNTH-ATOM-MAPPING - 1\nMAPPING-TYPE - AA\nFROM-SIDE - ((A 0 0))\nTO-SIDE - ((B 0 0))\nINDICES - 0";
    assert_eq!(parse(text).unwrap()[0].atoms, atoms(&[("1-A-atom1", "1-B-atom1")]));
}

#[test]
fn out_of_range_index_is_rejected() {
    let text = "REACTION - X\nNTH-ATOM-MAPPING - 1\nMAPPING-TYPE - AA\nFROM-SIDE - ((A 1 2))\nTO-SIDE - ((B 1 2))\nINDICES - 0 5\n";
    assert_matches!(parse(text), Err(CycError::InvalidAtomMapping(_)));
}

#[test]
fn too_many_indices_are_rejected() {
    let text = "REACTION - X\nNTH-ATOM-MAPPING - 1\nMAPPING-TYPE - AA\nFROM-SIDE - ((A 1 1))\nTO-SIDE - ((B 1 2))\nINDICES - 0 1\n";
    assert_matches!(parse(text), Err(CycError::InvalidAtomMapping(_)));
}

#[test]
fn text_without_blocks_is_empty() {
    assert!(parse("").unwrap().is_empty());
    assert!(parse("REACTION - X\nsomething else\n").unwrap().is_empty());
}

/// Serves one canned mapping file and counts downloads.
#[derive(Default)]
struct CannedSource {
    downloads: AtomicUsize,
}

impl AtomMappingSource for CannedSource {
    fn atom_mappings(&self, reaction: &Identity) -> Result<Vec<AtomMapping>, CycError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        assert_eq!(reaction.to_string(), "ECOLI:ARGSUCCINLYA-RXN");
        parse(&fs::read_to_string("tests/fixtures/argsuccinlya.atom-mappings").unwrap())
    }
}

fn fixture_record(fixture: &str, id: &str) -> Record {
    let raw = fs::read_to_string(format!("tests/fixtures/{fixture}")).unwrap();
    let doc = Document::parse(&raw).unwrap();
    let identity: Identity = id.parse().unwrap();
    Record::parse(find_object(&doc, &identity).unwrap()).unwrap()
}

#[test]
fn reaction_atom_mappings_download_once() {
    let reaction = fixture_record("reaction_argsuccinlya.xml", "ECOLI:ARGSUCCINLYA-RXN");
    let source = CannedSource::default();

    let first = reaction.atom_mappings(&source).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].mapping_type, "NO-HYDROGEN-ENCODING");
    let again = reaction.atom_mappings(&source).unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
}

#[test]
fn atom_mappings_only_for_reactions() {
    let pathway = fixture_record("pathway_argsyn.xml", "ECOLI:ARGSYN-PWY");
    let source = CannedSource::default();
    assert_matches!(
        pathway.atom_mappings(&source),
        Err(CycError::UnknownField { ref field, .. }) if field == "atom_mappings"
    );
    assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
}
