//! File-backed schematic loading tests

use std::io::Write as _;

use arborize_schematic::{file_schematic, swc, Schematic, SchematicError};

const P75_LIKE: &str = "\
# soma, one apical and one basal dendrite
1 1 0 0 0 6.0 -1
2 1 0 8 0 6.0 1
3 4 0 8 0 0.8 2
4 4 0 20 0 0.7 3
5 4 0 32 0 0.6 4
6 3 0 0 0 0.9 1
7 3 0 -14 0 0.8 6
";

fn write_swc(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create morphology file");
    file.write_all(text.as_bytes()).expect("write morphology");
    path
}

#[test]
fn loads_labels_from_structure_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_swc(&dir, "p75.swc", P75_LIKE);
    let schematic: Schematic = file_schematic(path, None, None).unwrap();

    let mut labels: Vec<String> = schematic
        .sections()
        .map(|section| section.labels[0].clone())
        .collect();
    labels.sort();
    labels.dedup();
    assert_eq!(labels, ["apical_dendrite", "basal_dendrite", "soma"]);
}

#[test]
fn names_default_to_the_file_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_swc(&dir, "cell010.swc", P75_LIKE);
    let schematic: Schematic = file_schematic(&path, None, None).unwrap();
    assert_eq!(schematic.name(), Some("cell010"));

    let named: Schematic = file_schematic(&path, None, Some("purkinje")).unwrap();
    assert_eq!(named.name(), Some("purkinje"));
}

#[test]
fn non_swc_extensions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_swc(&dir, "p75.asc", P75_LIKE);
    let err = file_schematic::<f64>(path, None, None).unwrap_err();
    assert!(matches!(err, SchematicError::UnsupportedFormat { .. }));
}

#[test]
fn loaded_morphologies_survive_a_write_read_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_swc(&dir, "p75.swc", P75_LIKE);
    let schematic: Schematic = file_schematic(path, None, None).unwrap();

    let text = swc::write(&schematic);
    let reparsed: Schematic = swc::parse(&text, None).unwrap();
    assert_eq!(reparsed.cables().len(), schematic.cables().len());
    assert_eq!(reparsed.section_count(), schematic.section_count());
}

mod generated {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Unbranched neurites of any length parse into soma + one cable.
        #[test]
        fn chains_parse_into_two_cables(n in 1usize..40) {
            let mut text = String::from("1 1 0 0 0 5.0 -1\n");
            for i in 0..n {
                let id = i as u64 + 2;
                text.push_str(&format!("{} 3 0 {} 0 0.5 {}\n", id, 6 * (i + 1), id - 1));
            }
            let schematic: Schematic = swc::parse(&text, None).unwrap();
            prop_assert_eq!(schematic.cables().len(), 2);
            prop_assert_eq!(schematic.cables()[1].points.len(), n);
        }
    }
}
