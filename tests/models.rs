use std::fs;

use chrono::NaiveDate;
use kira_cyc::cache::find_object;
use kira_cyc::identity::Identity;
use kira_cyc::link::Refs;
use kira_cyc::quantity::Quantity;
use kira_cyc::record::Record;
use kira_cyc::xml::Document;

fn load(fixture: &str, id: &str) -> Record {
    let raw = fs::read_to_string(format!("tests/fixtures/{fixture}")).unwrap();
    let doc = Document::parse(&raw).unwrap();
    let identity: Identity = id.parse().unwrap();
    Record::parse(find_object(&doc, &identity).unwrap()).unwrap()
}

fn ids(refs: Refs<Identity>) -> Vec<String> {
    refs.iter().map(ToString::to_string).collect()
}

#[test]
fn parse_pathway() {
    let pathway = load("pathway_argsyn.xml", "ECOLI:ARGSYN-PWY");

    assert_eq!(pathway.kind(), "Pathway");
    assert_eq!(pathway.identity().unwrap().to_string(), "ECOLI:ARGSYN-PWY");
    assert_eq!(pathway.detail(), Some("full"));
    assert_eq!(pathway.get("class").unwrap().as_bool(), Some(false));
    assert_eq!(
        pathway.get("common_name").unwrap().as_str(),
        Some("L-arginine biosynthesis I (via L-ornithine)")
    );
    assert_eq!(
        pathway.get("synonym").unwrap().strings(),
        vec!["arginine biosynthesis", "arginine synthesis"]
    );
    assert!(pathway.get("comment").unwrap().as_str().unwrap().contains("<i>E. coli</i>"));

    assert_eq!(ids(pathway.ids("parent").unwrap()), vec!["ECOLI:ARGININE-SYN"]);
    assert_eq!(ids(pathway.ids("citation").unwrap()), vec!["ECOLI:PUB-8898"]);
    assert_eq!(
        ids(pathway.ids("reaction_list").unwrap()),
        vec![
            "ECOLI:ARGSUCCINLYA-RXN",
            "ECOLI:ARGSUCCINSYN-RXN",
            "ECOLI:ORNCARBAMTRANSFER-RXN"
        ]
    );
    assert!(pathway.ids("sub_pathway").unwrap().is_empty());
    assert_eq!(ids(pathway.ids("super_pathway").unwrap()), vec!["ECOLI:ARG-PRO-PWY"]);
}

#[test]
fn parse_pathway_nested_records() {
    let pathway = load("pathway_argsyn.xml", "ECOLI:ARGSYN-PWY");

    let credits = pathway.get("credits").unwrap().as_record().unwrap();
    assert_eq!(credits.kind(), "Credits");
    assert!(credits.identity().is_none());
    let created = credits.get("created").unwrap().as_record().unwrap();
    assert_eq!(
        created.get("date").unwrap().as_date(),
        NaiveDate::from_ymd_opt(1996, 8, 27)
    );
    assert_eq!(
        created.ids("person").unwrap(),
        Refs::One(Some("ECOLI:KARP".parse().unwrap()))
    );
    let last_curated = credits.get("last_curated").unwrap().as_record().unwrap();
    assert_eq!(last_curated.ids("organization").unwrap(), Refs::One(None));

    let evidence = pathway.get("evidence").unwrap().as_list().unwrap();
    assert_eq!(evidence.len(), 1);
    let evidence = evidence[0].as_record().unwrap();
    assert_eq!(
        ids(evidence.ids("evidence_code").unwrap()),
        vec!["ECOLI:EV-EXP"]
    );

    let layout = pathway.get("reaction_layout").unwrap().as_list().unwrap();
    let layout = layout[0].as_record().unwrap();
    assert_eq!(layout.get("direction").unwrap().as_str(), Some("L2R"));
    assert_eq!(ids(layout.ids("object").unwrap()), vec!["ECOLI:ARGSUCCINLYA-RXN"]);
    assert_eq!(ids(layout.ids("right_primaries").unwrap()), vec!["ECOLI:ARG"]);

    let ordering = pathway.get("reaction_ordering").unwrap().as_list().unwrap();
    let ordering = ordering[0].as_record().unwrap();
    assert_eq!(
        ids(ordering.ids("predecessor_reactions").unwrap()),
        vec!["ECOLI:ARGSUCCINSYN-RXN"]
    );
}

#[test]
fn parse_compound() {
    let compound = load("compound_water.xml", "META:WATER");

    assert_eq!(compound.kind(), "Compound");
    assert_eq!(compound.get("common_name").unwrap().as_str(), Some("H2O"));
    assert_eq!(compound.get("synonym").unwrap().strings().len(), 3);
    assert_eq!(
        compound.get("molecular_weight").unwrap().as_float_quantity(),
        Some(&Quantity::new(18.015, Some("Daltons".to_string())))
    );
    assert_eq!(
        compound.get("gibbs_0").unwrap().as_float_quantity(),
        Some(&Quantity::new(-37.54, Some("kcal/mol".to_string())))
    );
    assert_eq!(
        compound.get("inchi_key").unwrap().as_str(),
        Some("InChIKey=XLYOFNOQVPJJNP-UHFFFAOYSA-N")
    );

    let dblinks = compound.get("dblink").unwrap().as_list().unwrap();
    assert_eq!(dblinks.len(), 2);
    let chebi = dblinks[0].as_record().unwrap();
    assert_eq!(chebi.get("db").unwrap().as_str(), Some("CHEBI"));
    assert_eq!(
        chebi.get("url").unwrap().as_str(),
        Some("http://www.ebi.ac.uk/chebi/searchId.do?chebiId=15377")
    );
    assert!(dblinks[1].as_record().unwrap().get("url").unwrap().is_null());

    assert_eq!(compound.ids("appears_in_right_side_of").unwrap().len(), 2);
    assert!(compound.ids("regulates").unwrap().is_empty());
}

#[test]
fn parse_compound_structure() {
    let compound = load("compound_water.xml", "META:WATER");
    let molecule = compound.get("cml_molecule").unwrap().as_record().unwrap();

    assert_eq!(molecule.get("title").unwrap().as_str(), Some("H2O"));
    assert_eq!(molecule.get("formal_charge").unwrap().as_i64(), Some(0));
    assert_eq!(molecule.get("formula").unwrap().as_str(), Some("H 2 O 1"));
    assert_eq!(molecule.get("smiles").unwrap().as_str(), Some("O"));
    assert_eq!(
        molecule.get("molecular_weight").unwrap().as_float_quantity(),
        Some(&Quantity::new(18.015, Some("g/mol".to_string())))
    );

    let atoms = molecule.get("atoms").unwrap().as_list().unwrap();
    assert_eq!(atoms.len(), 3);
    let hydrogen = atoms[1].as_record().unwrap();
    assert_eq!(hydrogen.get("element_type").unwrap().as_str(), Some("H"));
    assert_eq!(hydrogen.get("y2").unwrap().as_f64(), Some(0.866));
    // formalCharge is absent on atoms, so the default applies
    assert_eq!(hydrogen.get("formal_charge").unwrap().as_i64(), Some(0));

    let bonds = molecule.get("bonds").unwrap().as_list().unwrap();
    let second = bonds[1].as_record().unwrap();
    assert_eq!(second.get("atom_refs").unwrap().strings(), vec!["a1", "a3"]);
    assert_eq!(second.get("order").unwrap().as_i64(), Some(1));
}

#[test]
fn parse_reaction() {
    let reaction = load("reaction_argsuccinlya.xml", "ECOLI:ARGSUCCINLYA-RXN");

    assert_eq!(reaction.get("physiologically_relevant").unwrap().as_bool(), Some(true));
    let ec = reaction.get("ec_number").unwrap().as_record().unwrap();
    assert_eq!(ec.get("value").unwrap().as_str(), Some("4.3.2.1"));
    assert_eq!(ec.get("official").unwrap().as_str(), Some("Y"));

    let direction = reaction.get("reaction_direction").unwrap().as_record().unwrap();
    assert_eq!(direction.get("value").unwrap().as_str(), Some("REVERSIBLE"));

    let right = reaction.get("right").unwrap().as_list().unwrap();
    let coefficients: Vec<_> = right
        .iter()
        .map(|side| side.as_record().unwrap().get("coefficient").unwrap().as_i64())
        .collect();
    assert_eq!(coefficients, vec![Some(1), Some(2)]);
    let arg = right[1].as_record().unwrap();
    assert_eq!(ids(arg.ids("object").unwrap()), vec!["ECOLI:ARG"]);
    assert_eq!(ids(reaction.ids("in_pathway").unwrap()), vec!["ECOLI:ARGSYN-PWY"]);
}

#[test]
fn serialize_record_as_json() {
    let reaction = load("reaction_argsuccinlya.xml", "ECOLI:ARGSUCCINLYA-RXN");
    let json = serde_json::to_value(&reaction).unwrap();

    assert_eq!(json["kind"], "Reaction");
    assert_eq!(json["id"], "ECOLI:ARGSUCCINLYA-RXN");
    assert_eq!(json["in_pathway"], serde_json::json!(["ECOLI:ARGSYN-PWY"]));
    assert_eq!(json["right"][1]["coefficient"], 2);
    assert_eq!(json["right"][1]["object"], "ECOLI:ARG");
    assert_eq!(json["synonym"], serde_json::json!([]));
    assert!(json["comment"].is_null());
}

#[test]
fn unknown_element_is_rejected() {
    let doc = Document::parse(r#"<ptools-xml><Widget orgid="X" frameid="Y"/></ptools-xml>"#)
        .unwrap();
    let node = doc.root().child_elements().next().unwrap();
    assert!(matches!(
        Record::parse(node),
        Err(kira_cyc::error::CycError::UnknownKind(kind)) if kind == "Widget"
    ));
}

#[test]
fn unmapped_kinds_keep_identity() {
    let doc = Document::parse(
        r#"<ptools-xml><Transcription-Unit orgid="ECOLI" frameid="TU0-42" detail="low"/></ptools-xml>"#,
    )
    .unwrap();
    let unit = Record::parse(doc.root().child_elements().next().unwrap()).unwrap();
    assert_eq!(unit.kind(), "TranscriptionUnit");
    assert_eq!(unit.identity().unwrap().frame(), "TU0-42");
    assert_eq!(unit.slots().count(), 0);
}

#[test]
fn parse_all_keeps_identified_objects_in_order() {
    let doc = Document::parse(
        r#"<ptools-xml>
             <metadata><query>[x:x&lt;-ECOLI^^Pathways]</query></metadata>
             <Pathway orgid="ECOLI" frameid="ARGSYN-PWY" detail="none"/>
             <Widget orgid="ECOLI" frameid="W"/>
             <Gene orgid="ECOLI" frameid="EG10063" detail="none"/>
           </ptools-xml>"#,
    )
    .unwrap();
    let records = Record::parse_all(&doc).unwrap();
    let kinds: Vec<_> = records.iter().map(Record::kind).collect();
    assert_eq!(kinds, vec!["Pathway", "Gene"]);
    assert_eq!(records[1].identity().unwrap().frame(), "EG10063");
}
