//! SWC morphology I/O
//!
//! Reads cell reconstructions in the SWC sample format into schematics and
//! writes schematics back out. Samples are grouped into a soma cable (all
//! structure-type-1 samples, first) plus neurite sections emitted depth-first.
//! A section is a maximal unbranched chain of samples sharing one structure
//! type; chains split at branch points and at type changes.
//!
//! Structure types map to labels as `1 → soma`, `2 → axon`,
//! `3 → basal_dendrite`, `4 → apical_dendrite`, and any other tag to
//! `tag_{n}`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use arborize_model::{Definition, Value};

use crate::error::{Result, SchematicError};
use crate::schematic::{Location, Schematic};

/// Structure type of the soma in SWC files
pub const SOMA_TAG: u32 = 1;

/// One parsed SWC sample line
#[derive(Debug, Clone, Copy)]
struct Sample {
    id: u64,
    tag: u32,
    coords: [f64; 3],
    radius: f64,
    parent: Option<u64>,
}

/// Label for an SWC structure type
pub fn tag_label(tag: u32) -> String {
    match tag {
        1 => "soma".to_string(),
        2 => "axon".to_string(),
        3 => "basal_dendrite".to_string(),
        4 => "apical_dendrite".to_string(),
        other => format!("tag_{other}"),
    }
}

/// Structure type for a label, if the label maps back to one
pub fn label_tag(label: &str) -> Option<u32> {
    match label {
        "soma" => Some(1),
        "axon" => Some(2),
        "basal_dendrite" => Some(3),
        "apical_dendrite" => Some(4),
        other => other.strip_prefix("tag_").and_then(|n| n.parse().ok()),
    }
}

/// Load an SWC file into a schematic, optionally attaching a definition.
///
/// The schematic is named after the file stem unless `name` is given. Only
/// `.swc` files are accepted.
pub fn file_schematic<V: Value>(
    path: impl AsRef<Path>,
    definition: Option<Definition<V>>,
    name: Option<&str>,
) -> Result<Schematic<V>> {
    let path = path.as_ref();
    let supported = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("swc"))
        .unwrap_or(false);
    if !supported {
        return Err(SchematicError::UnsupportedFormat {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    let stem = path.file_stem().and_then(|s| s.to_str());
    let mut schematic = parse(&text, name.or(stem))?;
    if let Some(definition) = definition {
        schematic.set_definition(definition)?;
    }
    Ok(schematic)
}

/// Parse SWC text into a schematic
pub fn parse<V: Value>(text: &str, name: Option<&str>) -> Result<Schematic<V>> {
    let samples = parse_samples(text)?;
    if samples.is_empty() {
        return Err(SchematicError::EmptyMorphology);
    }

    let mut schematic = match name {
        Some(name) => Schematic::with_name(name),
        None => Schematic::new(),
    };

    let index: HashMap<u64, usize> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i))
        .collect();
    let mut children: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, sample) in samples.iter().enumerate() {
        if let Some(parent) = sample.parent {
            children.entry(parent).or_default().push(i);
        }
    }

    // Sample id -> schematic location, filled as points are emitted.
    let mut locations: HashMap<u64, Location> = HashMap::new();

    // The soma cable comes first, even when it is empty.
    let soma: Vec<usize> = (0..samples.len())
        .filter(|&i| samples[i].tag == SOMA_TAG)
        .collect();
    if soma.is_empty() {
        schematic.create_empty()?;
    } else {
        for (pid, &i) in soma.iter().enumerate() {
            let sample = &samples[i];
            schematic.create_location(
                (0, pid),
                sample.coords,
                sample.radius,
                [tag_label(sample.tag)],
                None,
            )?;
            locations.insert(sample.id, (0, pid));
        }
    }

    // Neurite roots: non-soma samples whose parent is absent or part of the soma.
    let mut stack: Vec<usize> = Vec::new();
    for (i, sample) in samples.iter().enumerate().rev() {
        if sample.tag == SOMA_TAG {
            continue;
        }
        let parent_is_soma = sample
            .parent
            .and_then(|p| index.get(&p))
            .map(|&pi| samples[pi].tag == SOMA_TAG)
            .unwrap_or(true);
        if parent_is_soma {
            stack.push(i);
        }
    }

    let mut bid = 1;
    while let Some(start) = stack.pop() {
        let endpoint = samples[start]
            .parent
            .and_then(|p| locations.get(&p))
            .copied();

        // Grow the section along single-child chains of the same type.
        let mut chain = vec![start];
        loop {
            let last = *chain.last().expect("chain starts non-empty");
            let last_id = samples[last].id;
            match children.get(&last_id).map(Vec::as_slice) {
                Some([only]) if samples[*only].tag == samples[last].tag => chain.push(*only),
                _ => break,
            }
        }

        for (pid, &i) in chain.iter().enumerate() {
            let sample = &samples[i];
            let endpoint = if pid == 0 { endpoint } else { None };
            schematic.create_location(
                (bid, pid),
                sample.coords,
                sample.radius,
                [tag_label(sample.tag)],
                endpoint,
            )?;
            locations.insert(sample.id, (bid, pid));
        }
        bid += 1;

        // Sections that continue from the chain's end, in file order.
        let last_id = samples[*chain.last().expect("chain is non-empty")].id;
        if let Some(rest) = children.get(&last_id) {
            for &child in rest.iter().rev() {
                stack.push(child);
            }
        }
    }

    log::debug!(
        "parsed SWC morphology: {} samples, {} branches",
        samples.len(),
        schematic.cables().len()
    );
    Ok(schematic)
}

fn parse_samples(text: &str) -> Result<Vec<Sample>> {
    let mut samples: Vec<Sample> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let lineno = lineno + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(SchematicError::malformed_sample(
                lineno,
                format!("expected 7 fields, found {}", fields.len()),
            ));
        }
        let id: u64 = parse_field(fields[0], "sample id", lineno)?;
        let tag: u32 = parse_field(fields[1], "structure type", lineno)?;
        let x: f64 = parse_field(fields[2], "x coordinate", lineno)?;
        let y: f64 = parse_field(fields[3], "y coordinate", lineno)?;
        let z: f64 = parse_field(fields[4], "z coordinate", lineno)?;
        let radius: f64 = parse_field(fields[5], "radius", lineno)?;
        let parent: i64 = parse_field(fields[6], "parent id", lineno)?;

        if seen.contains(&id) {
            return Err(SchematicError::DuplicateSample { line: lineno, id });
        }
        let parent = match parent {
            -1 => None,
            p if p < 0 => {
                return Err(SchematicError::malformed_sample(
                    lineno,
                    format!("negative parent id {p}"),
                ))
            }
            p => {
                let p = p as u64;
                if p == id || !seen.contains(&p) {
                    return Err(SchematicError::UnknownParent {
                        line: lineno,
                        parent: p as i64,
                    });
                }
                Some(p)
            }
        };
        seen.insert(id);
        samples.push(Sample {
            id,
            tag,
            coords: [x, y, z],
            radius,
            parent,
        });
    }
    Ok(samples)
}

fn parse_field<T: std::str::FromStr>(raw: &str, what: &str, line: usize) -> Result<T> {
    raw.parse().map_err(|_| {
        SchematicError::malformed_sample(line, format!("invalid {what} '{raw}'"))
    })
}

/// Serialize a schematic to SWC text.
///
/// Sections are written depth-first; a section's first sample references the
/// sample its attachment location mapped to. Labels without a structure-type
/// mapping fall back to tag 5 (custom).
pub fn write<V: Value>(schematic: &Schematic<V>) -> String {
    let mut out = String::new();
    let mut next_id: u64 = 1;
    let mut ids: HashMap<Location, u64> = HashMap::new();
    for section in schematic.sections() {
        let tag = section
            .labels
            .first()
            .and_then(|label| label_tag(label))
            .unwrap_or(5);
        let mut parent: i64 = section
            .attachment
            .and_then(|loc| ids.get(&loc))
            .map(|&id| id as i64)
            .unwrap_or(-1);
        for &loc in &section.points {
            let point = schematic
                .point(loc)
                .expect("sections index valid points");
            let id = next_id;
            next_id += 1;
            ids.insert(loc, id);
            out.push_str(&format!(
                "{} {} {} {} {} {} {}\n",
                id,
                tag,
                point.coords[0],
                point.coords[1],
                point.coords[2],
                point.radius,
                parent
            ));
            parent = id as i64;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_BRANCH: &str = "\
# soma with a single dendrite
1 1 0 0 0 5.0 -1
2 1 0 6 0 5.0 1
3 3 0 6 0 0.3 2
4 3 0 12 0 0.3 3
";

    const TWO_BRANCH: &str = "\
1 1 0 0 0 5.0 -1
2 1 0 6 0 5.0 1
3 3 0 6 0 0.3 2
4 3 0 12 0 0.3 3
5 3 6 12 0 0.2 4
6 3 -6 12 0 0.2 4
";

    #[test]
    fn one_branch_splits_into_soma_and_dendrite() {
        let schematic = parse::<f64>(ONE_BRANCH, Some("one_branch")).unwrap();
        assert_eq!(schematic.cables().len(), 2, "expected 2 branches");
        assert_eq!(schematic.cables()[0].points.len(), 2, "expected 2 soma points");
        assert_eq!(schematic.cables()[1].points.len(), 2, "expected 2 branch points");
        let soma_section = schematic.cables()[0].points[0].section;
        assert_eq!(
            schematic.section_slice()[soma_section].labels.as_slice(),
            ["soma".to_string()]
        );
    }

    #[test]
    fn forked_dendrite_splits_at_the_branch_point() {
        let schematic = parse::<f64>(TWO_BRANCH, None).unwrap();
        assert_eq!(schematic.cables().len(), 4, "soma + parent + 2 children");
        assert_eq!(schematic.cables()[1].points[0].radius, 0.3);
        assert_eq!(schematic.cables()[1].points[0].coords, [0.0, 6.0, 0.0]);
        // Children attach to the end of the parent chain.
        assert_eq!(schematic.cables()[2].parent, Some(1));
        assert_eq!(schematic.cables()[3].parent, Some(1));
    }

    #[test]
    fn custom_tags_become_tag_labels() {
        let text = "\
1 1 0 0 0 5.0 -1
2 7 0 6 0 0.3 1
3 7 0 12 0 0.3 2
";
        let schematic = parse::<f64>(text, None).unwrap();
        let labels: Vec<String> = schematic
            .sections()
            .map(|s| s.labels[0].clone())
            .collect();
        assert_eq!(labels, ["soma", "tag_7"]);
    }

    #[test]
    fn forward_parent_references_are_rejected() {
        let text = "1 1 0 0 0 5.0 2\n2 1 0 6 0 5.0 -1\n";
        let err = parse::<f64>(text, None).unwrap_err();
        assert!(matches!(err, SchematicError::UnknownParent { line: 1, .. }));
    }

    #[test]
    fn malformed_lines_carry_line_numbers() {
        let text = "1 1 0 0 0 5.0 -1\n2 1 zero 6 0 5.0 1\n";
        let err = parse::<f64>(text, None).unwrap_err();
        match err {
            SchematicError::MalformedSample { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("x coordinate"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_files_are_rejected() {
        let err = parse::<f64>("# nothing here\n", None).unwrap_err();
        assert!(matches!(err, SchematicError::EmptyMorphology));
    }

    #[test]
    fn write_emits_parseable_samples() {
        let schematic = parse::<f64>(TWO_BRANCH, None).unwrap();
        let text = write(&schematic);
        let reparsed = parse::<f64>(&text, None).unwrap();
        assert_eq!(reparsed.cables().len(), schematic.cables().len());
        assert_eq!(reparsed.point_count(), schematic.point_count());
        let first = text.lines().next().unwrap();
        assert_eq!(first, "1 1 0 0 0 5 -1");
    }
}
