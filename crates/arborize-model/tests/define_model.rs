//! End-to-end tests for parsing and merging model definitions

use arborize_model::{
    define_model, define_model_with, MechId, ModelDefinitionDict, ModelError,
};

fn parse(json: &str) -> ModelDefinitionDict {
    serde_json::from_str(json).expect("test dict parses")
}

#[test]
fn parses_a_passive_model() {
    let model = define_model(parse(
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
    ))
    .unwrap();

    assert_eq!(model.len(), 3);
    let soma = model.get_cable_type("soma").unwrap();
    assert_eq!(soma.cable.ra, Some(10.0));
    assert_eq!(soma.mechs[&MechId::new("pas")].parameters["e"], -70.0);
    assert_eq!(soma.ions["ca"].rev_pot, Some(10.0));
}

#[test]
fn parses_synapse_types_in_both_forms() {
    let model = define_model(parse(
        r#"{
            "cable_types": {
                "soma": {
                    "cable": {"Ra": 10.0, "cm": 1.0},
                    "synapses": {"ExpSyn": {"tau": 2.0}}
                }
            },
            "synapse_types": {
                "expsyn2": {"mechanism": "ExpSyn", "parameters": {"tau": 3.0}}
            }
        }"#,
    ))
    .unwrap()
    .with_use_defaults(true);

    let soma = model.get_cable_type("soma").unwrap();
    assert_eq!(soma.synapses["ExpSyn"].mech_id, MechId::new("ExpSyn"));
    assert_eq!(soma.synapses["ExpSyn"].parameters["tau"], 2.0);
    let expsyn2 = &model.synapse_types()["expsyn2"];
    assert_eq!(expsyn2.mech_id, MechId::new("ExpSyn"));
    assert_eq!(expsyn2.parameters["tau"], 3.0);
}

#[test]
fn template_merge_overrides_and_appends() {
    let template = define_model(parse(
        r#"{
            "cable_types": {
                "soma": {
                    "cable": {"Ra": 10.0, "cm": 1.0},
                    "mechanisms": {"pas": {"e": -70.0, "g": 0.01}}
                }
            }
        }"#,
    ))
    .unwrap();

    let model = define_model_with(
        &template,
        parse(
            r#"{
                "cable_types": {
                    "soma": {"mechanisms": {"pas": {"e": -60.0}}},
                    "axon": {"cable": {"Ra": 120.0, "cm": 1.0}}
                }
            }"#,
        ),
    )
    .unwrap();

    let soma = model.get_cable_type("soma").unwrap();
    let pas = &soma.mechs[&MechId::new("pas")];
    assert_eq!(pas.parameters["e"], -60.0);
    assert_eq!(pas.parameters["g"], 0.01);
    // Appended labels keep their position after the template's labels.
    assert_eq!(model.position_of("axon"), Some(1));
    // The template itself is untouched.
    let template_pas = &template.get_cable_type("soma").unwrap().mechs[&MechId::new("pas")];
    assert_eq!(template_pas.parameters["e"], -70.0);
}

#[test]
fn toml_definitions_parse_like_json() {
    let dict: ModelDefinitionDict = toml::from_str(
        r#"
            [cable_types.soma.cable]
            Ra = 10.0
            cm = 1.0

            [cable_types.soma.mechanisms.pas]
            e = -70.0
            g = 0.01

            [cable_types.soma.mechanisms.hh]

            [synapse_types.expsyn2]
            mechanism = "ExpSyn"
            parameters = { tau = 3.0 }
        "#,
    )
    .expect("toml dict parses");
    let model = define_model(dict).unwrap();
    let soma = model.get_cable_type("soma").unwrap();
    assert!(soma.mechs.contains_key(&MechId::new("hh")));
    assert!(soma.mechs[&MechId::new("hh")].parameters.is_empty());
}

#[test]
fn rejects_malformed_mechanism_ids() {
    let err = define_model(parse(
        r#"{
            "cable_types": {
                "soma": {"mechanisms": {"a/b/c/d": {}}}
            }
        }"#,
    ))
    .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDefinition { .. }));
}
