//! Record kinds of the BioCyc `ptools-xml` schema.
//!
//! Identified kinds appear as top-level elements of `getxml` responses and as
//! reference targets. Nested kinds only ever appear inside another record.

use once_cell::sync::Lazy;

use crate::schema::{FieldDecl, Registry, Schema};
use crate::value::{ScalarType, Value};

static REGISTRY: Lazy<Registry> = Lazy::new(build);

pub fn registry() -> &'static Registry {
    &REGISTRY
}

fn string(name: &'static str, selector: &'static str) -> FieldDecl {
    FieldDecl::attr(name, selector)
}

fn typed(name: &'static str, selector: &'static str, scalar: ScalarType) -> FieldDecl {
    FieldDecl::attr(name, selector).scalar(scalar)
}

fn nested(name: &'static str, selector: &'static str, kind: &'static str) -> FieldDecl {
    FieldDecl::attr(name, selector).record(kind)
}

fn class_flag(schema: Schema) -> Schema {
    schema.field(typed("class", "@class", ScalarType::Boolean).default(false))
}

fn described(schema: Schema) -> Schema {
    schema
        .field(string("comment", "comment[@datatype = 'string']/text()"))
        .field(string("common_name", "common-name[@datatype = 'string']/text()"))
        .field(string("synonym", "synonym[@datatype = 'string']/text()").collection())
}

fn physiologically_relevant() -> FieldDecl {
    typed(
        "physiologically_relevant",
        "physiologically-relevant[@datatype = 'boolean']/text()",
        ScalarType::Boolean,
    )
    .default(false)
}

fn coefficient() -> FieldDecl {
    typed(
        "coefficient",
        "coefficient[@datatype = 'integer']/text()",
        ScalarType::Integer,
    )
    .default(1i64)
}

fn curation_event(name: &'static str) -> Schema {
    Schema::nested(name)
        .field(typed("date", "date[@datatype = 'date']/text()", ScalarType::Date))
        .has_one("organization", "Organization")
        .has_one("person", "Person")
}

fn split_whitespace(value: Value) -> Value {
    match value {
        Value::String(text) => Value::List(text.split_whitespace().map(Value::from).collect()),
        Value::Null => Value::List(Vec::new()),
        other => other,
    }
}

fn build() -> Registry {
    let mut registry = Registry::new();

    // Chemical Markup Language structures embedded in compounds.
    registry
        .register(
            Schema::nested("CMLMolecule")
                .field(string("id", "@id"))
                .field(string("title", "@title"))
                .field(typed("formal_charge", "@formalCharge", ScalarType::Integer).default(0i64))
                .field(string("formula", "formula/@concise"))
                .field(typed(
                    "molecular_weight",
                    "float[@title = 'molecularWeight']/text()",
                    ScalarType::FloatWithUnits,
                ))
                .field(string("smiles", "string[@title = 'smiles']/text()"))
                .field(nested("atoms", "atomArray/atom", "CMLAtom").collection())
                .field(nested("bonds", "bondArray/bond", "CMLBond").collection()),
        )
        .register(
            Schema::nested("CMLAtom")
                .field(string("id", "@id"))
                .field(string("element_type", "@elementType"))
                .field(typed("formal_charge", "@formalCharge", ScalarType::Integer).default(0i64))
                .field(typed("x2", "@x2", ScalarType::Float))
                .field(typed("y2", "@y2", ScalarType::Float)),
        )
        .register(
            Schema::nested("CMLBond")
                .field(string("id", "@id"))
                .field(
                    string("atom_refs", "@atomRefs")
                        .default("")
                        .transform(split_whitespace),
                )
                .field(typed("order", "@order", ScalarType::Integer)),
        );

    registry
        .register(
            Schema::nested("Cofactor")
                .has_one("citation", "citation/Publication")
                .has_one("compound", "Compound"),
        )
        .register(
            Schema::nested("Component")
                .field(coefficient())
                .has_one("citation", "citation/Publication")
                .has_one("protein", "Protein"),
        )
        .register(curation_event("Created"))
        .register(curation_event("LastCurated"))
        .register(
            Schema::nested("Credits")
                .field(nested("created", "created", "Created"))
                .field(nested("last_curated", "last-curated", "LastCurated")),
        )
        .register(
            Schema::nested("DbLink")
                .field(string("db", "dblink-db/text()"))
                .field(string("oid", "dblink-oid/text()"))
                .field(string("relationship", "dblink-relationship/text()"))
                .field(string("url", "dblink-url/text() | dblink-URL/text()")),
        )
        .register(
            Schema::nested("ECNumber")
                .field(string("value", "text()"))
                .field(string("official", "official/text()")),
        )
        .register(
            Schema::nested("Evidence")
                .field(string("with", "with[@datatype = 'string']/text()"))
                .has_one("evidence_code", "Evidence-Code")
                .has_one("publication", "Publication"),
        )
        .register(
            Schema::nested("Km")
                .field(typed("value", "value/text()", ScalarType::IntegerWithUnits))
                .has_one("citation", "citation/Publication")
                .has_one("substrate", "substrate/Compound"),
        )
        .register(
            Schema::nested("Left")
                .field(coefficient())
                .has_one("object", "Compound | Protein | RNA"),
        )
        .register(
            Schema::nested("Right")
                .field(coefficient())
                .has_one("object", "Compound | Protein | RNA"),
        )
        .register(
            Schema::nested("MolecularWeightExp")
                .field(typed("value", "text()", ScalarType::FloatWithUnits))
                .has_one("citation", "citation/Publication"),
        )
        .register(
            Schema::nested("Pi")
                .field(typed("value", "text()", ScalarType::FloatWithUnits))
                .has_one("citation", "citation/Publication"),
        )
        .register(
            Schema::nested("ReactionDirection")
                .field(string("value", "text()"))
                .has_one("citation", "citation/Publication"),
        )
        .register(
            Schema::nested("ReactionLayout")
                .field(string("direction", "direction/text()"))
                .has_many("left_primaries", "left-primaries/*")
                .has_one("object", "Reaction | Pathway")
                .has_many("right_primaries", "right-primaries/*"),
        )
        .register(
            Schema::nested("ReactionOrdering")
                .has_many("predecessor_reactions", "predecessor-reactions/Reaction")
                .has_one("reaction", "Reaction"),
        );

    registry
        .register(
            described(
                class_flag(Schema::identified("Compound"))
                    .has_many("instance", "instance/Compound")
                    .has_many("parent", "parent/Compound"),
            )
            .field(typed(
                "gibbs_0",
                "gibbs-0[@datatype = 'float']/text()",
                ScalarType::FloatWithUnits,
            ))
            .field(string("inchi", "inchi[@datatype = 'string']/text()"))
            .field(string("inchi_key", "inchi-key[@datatype = 'string']/text()"))
            .field(typed(
                "molecular_weight",
                "molecular-weight[@datatype = 'float']/text()",
                ScalarType::FloatWithUnits,
            ))
            .has_many("appears_in_left_side_of", "appears-in-left-side-of/Reaction")
            .has_many("appears_in_right_side_of", "appears-in-right-side-of/Reaction")
            .field(nested("cml_molecule", "cml/molecule", "CMLMolecule"))
            .field(nested("dblink", "dblink", "DbLink").collection())
            .has_many("regulates", "regulates/Regulation"),
        )
        .register(
            described(class_flag(Schema::identified("EnzymaticReaction")))
                .field(physiologically_relevant())
                .field(nested("cofactor", "cofactor", "Cofactor").collection())
                .has_many("enzyme", "enzyme/Protein")
                .field(nested("evidence", "evidence", "Evidence").collection())
                .field(nested("km", "km", "Km"))
                .field(nested(
                    "reaction_direction",
                    "reaction-direction",
                    "ReactionDirection",
                ))
                .has_many("reaction", "reaction/Reaction")
                .has_many("regulated_by", "regulated-by/Regulation"),
        )
        .register(described(
            class_flag(Schema::identified("EvidenceCode"))
                .has_many("instance", "instance/Evidence-Code")
                .has_one("parent", "parent/Evidence-Code"),
        ))
        .register(
            Schema::identified("Organization")
                .field(string("abbrev_name", "abbrev-name[@datatype = 'string']/text()"))
                .field(string("common_name", "common-name[@datatype = 'string']/text()"))
                .field(string("email", "email[@datatype = 'string']/text()"))
                .field(string("url", "url[@datatype = 'string']/text()")),
        )
        .register(
            described(
                class_flag(Schema::identified("Pathway"))
                    .has_many("instance", "instance/Pathway")
                    .has_many("parent", "parent/Pathway"),
            )
            .has_many("citation", "citation/Publication")
            .field(nested("credits", "credits", "Credits"))
            .field(nested("evidence", "evidence", "Evidence").collection())
            .has_many("in_pathway", "in-pathway/Pathway")
            .field(nested("reaction_layout", "reaction-layout", "ReactionLayout").collection())
            .has_many("reaction_list", "reaction-list/*")
            .field(
                nested("reaction_ordering", "reaction-ordering", "ReactionOrdering").collection(),
            )
            .has_many("sub_pathway", "sub-pathway/Pathway")
            .has_many("super_pathway", "super-pathway/Pathway"),
        )
        .register(
            Schema::identified("Person")
                .field(string("common_name", "common-name[@datatype = 'string']/text()"))
                .field(string("email", "email[@datatype = 'string']/text()"))
                .has_many("affiliations", "affiliations/Organization"),
        )
        .register(
            described(
                class_flag(Schema::identified("Protein"))
                    .has_many("instance", "instance/Protein")
                    .has_many("parent", "parent/Protein"),
            )
            .field(nested(
                "molecular_weight_exp",
                "molecular-weight-exp[@datatype = 'float']",
                "MolecularWeightExp",
            ))
            .has_many("catalyzes", "catalyzes/Enzymatic-Reaction")
            .has_many("citation", "citation/Publication")
            .has_many("component_of", "component-of/Protein")
            .field(nested("component", "component", "Component").collection())
            .field(nested("credits", "credits", "Credits"))
            .field(nested("dblink", "dblink", "DbLink").collection())
            .has_many("has_feature", "has-feature/Feature")
            .has_many("gene", "gene/Gene")
            .field(nested("pi", "pi[@datatype = 'float']", "Pi")),
        )
        .register(
            Schema::identified("Publication")
                .field(string("author", "author[@datatype = 'string']/text()").collection())
                .field(string("pubmed_id", "pubmed-id[@datatype = 'string']/text()"))
                .field(string("source", "source[@datatype = 'string']/text()"))
                .field(string("title", "title[@datatype = 'string']/text()"))
                .field(typed(
                    "year",
                    "year[@datatype = 'integer']/text()",
                    ScalarType::Integer,
                )),
        )
        .register(
            described(
                class_flag(Schema::identified("Reaction"))
                    .has_many("instance", "instance/Reaction")
                    .has_many("parent", "parent/Reaction"),
            )
            .field(physiologically_relevant())
            .field(nested("ec_number", "ec-number", "ECNumber"))
            .has_many("enzymatic_reaction", "enzymatic-reaction/Enzymatic-Reaction")
            .has_many("in_pathway", "in-pathway/Pathway")
            .field(nested("left", "left", "Left").collection())
            .field(nested(
                "reaction_direction",
                "reaction-direction",
                "ReactionDirection",
            ))
            .field(nested("right", "right", "Right").collection()),
        )
        .register(
            class_flag(Schema::identified("Regulation"))
                .has_many("instance", "instance/Reaction")
                .has_many("parent", "parent/Reaction")
                .field(string("comment", "comment[@datatype = 'string']/text()"))
                .field(string("mode", "mode[@datatype = 'string']/text()"))
                .field(physiologically_relevant())
                .has_one("citation", "citation/Publication")
                .has_one("regulated_entity", "regulated-entity/Enzymatic-Reaction")
                .has_one("regulator", "regulator/Compound"),
        );

    // Kinds the web service returns but whose fields are not mapped yet;
    // they still resolve to records carrying their identity.
    for kind in [
        "Complex",
        "DNABindingSite",
        "Feature",
        "Gene",
        "GeneticElement",
        "GOTerm",
        "MRNABindingSite",
        "Organism",
        "Promoter",
        "RNA",
        "Terminator",
        "TranscriptionUnit",
    ] {
        registry.register(Schema::identified(kind));
    }

    registry
}
