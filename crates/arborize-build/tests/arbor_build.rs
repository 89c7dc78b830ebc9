//! Arbor-style cable cell template tests

use arborize_build::{arbor_build, BuildError, Paint};
use arborize_model::{define_model, ModelDefinition, ModelDefinitionDict};
use arborize_schematic::{swc, Schematic};

const P75_LIKE: &str = "\
1 1 0 0 0 6.0 -1
2 1 0 8 0 6.0 1
3 4 0 8 0 0.8 2
4 4 0 20 0 0.7 3
5 4 0 32 0 0.6 4
6 3 0 0 0 0.9 1
7 3 0 -14 0 0.8 6
";

fn pas_model() -> ModelDefinition {
    let dict: ModelDefinitionDict = serde_json::from_str(
        r#"{
            "cable_types": {
                "soma": {
                    "cable": {"Ra": 10.0, "cm": 1.0},
                    "mechanisms": {"pas": {"e": -70.0, "g": 0.01}},
                    "ions": {"ca": {"rev_pot": 10.0, "int_con": 10.0, "ext_con": 10.0}}
                },
                "apical_dendrite": {"cable": {"Ra": 10.0, "cm": 1.0}},
                "basal_dendrite": {"cable": {"Ra": 10.0, "cm": 1.0}}
            }
        }"#,
    )
    .expect("test dict parses");
    define_model(dict).expect("test model is valid")
}

fn p75() -> Schematic {
    let mut schematic = swc::parse(P75_LIKE, Some("p75")).expect("fixture parses");
    schematic.set_definition(pas_model()).unwrap();
    schematic
}

#[test]
fn segments_are_appended_pairwise() {
    let mut schematic = p75();
    let template = arbor_build(&mut schematic).unwrap();

    // Every cable contributes points-1 segments: 1 + 2 + 1.
    assert_eq!(template.tree.segments().len(), 4);
    // The apical cable starts from the soma's endpoint segment.
    let apical_first = &template.tree.segments()[1];
    assert_eq!(apical_first.parent, Some(0));
    assert_eq!(apical_first.prox.coords, [0.0, 8.0, 0.0]);
    assert_eq!(apical_first.dist.coords, [0.0, 20.0, 0.0]);
    // The basal cable also attaches to the soma.
    assert_eq!(template.tree.segments()[3].parent, Some(0));
}

#[test]
fn label_sets_intern_in_first_seen_order() {
    let mut schematic = p75();
    let template = arbor_build(&mut schematic).unwrap();

    assert_eq!(template.labels.get("soma"), Some("(tag 0)"));
    assert_eq!(template.labels.get("apical_dendrite"), Some("(tag 1)"));
    assert_eq!(template.labels.get("basal_dendrite"), Some("(tag 2)"));
}

#[test]
fn decor_paints_membrane_ions_and_mechanisms() {
    let mut schematic = p75();
    let template = arbor_build(&mut schematic).unwrap();

    let soma_membrane = template
        .decor
        .paints()
        .iter()
        .find_map(|paint| match paint {
            Paint::Membrane { region, rl, cm } if region == "soma" => Some((*rl, *cm)),
            _ => None,
        })
        .expect("soma membrane paint");
    assert_eq!(soma_membrane.0, Some(10.0));
    // 1 µF/cm² is 0.01 F/m².
    assert_eq!(soma_membrane.1, Some(0.01));

    let ca = template
        .decor
        .paints()
        .iter()
        .find_map(|paint| match paint {
            Paint::Ion {
                region,
                ion,
                rev_pot,
                ..
            } if region == "soma" && ion == "ca" => Some(*rev_pot),
            _ => None,
        })
        .expect("soma calcium paint");
    assert_eq!(ca, Some(10.0));

    assert!(template.decor.paints().iter().any(|paint| matches!(
        paint,
        Paint::Density {
            region,
            mechanism,
            parameters,
        } if region == "soma" && mechanism == "pas" && parameters["e"] == -70.0
    )));
}

#[test]
fn single_point_branches_are_rejected() {
    let mut schematic = Schematic::new();
    schematic
        .create_location((0, 0), [0.0; 3], 5.0, ["soma"], None)
        .unwrap();
    schematic.set_definition(pas_model().with_use_defaults(true)).unwrap();
    let err = arbor_build(&mut schematic).unwrap_err();
    assert!(matches!(err, BuildError::BranchTooShort { branch: 0 }));
}

#[test]
fn templates_assemble_into_cable_cells() {
    let mut schematic = p75();
    let template = arbor_build(&mut schematic).unwrap();
    let cell = template.build();
    assert_eq!(cell.tree.segments().len(), template.tree.segments().len());
    assert_eq!(cell.decor.paints().len(), template.decor.paints().len());
}
