//! Arbor-style builder
//!
//! Lowers a finished schematic into a [`CableCellTemplate`]: a segment tree
//! built pairwise from the cable points, a label dictionary mapping labels to
//! tagged regions, and a decor listing the membrane, ion, and density-
//! mechanism paints per declared cable type.

use std::collections::{BTreeMap, HashMap};

use arborize_schematic::Schematic;

use crate::error::{BuildError, Result};

/// Conversion from µF/cm² to F/m²
const CM_TO_F_PER_M2: f64 = 0.01;

/// A 3-D sample bounding a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MPoint {
    /// Position in µm
    pub coords: [f64; 3],
    /// Radius in µm
    pub radius: f64,
}

/// One frustum of the segment tree
#[derive(Debug, Clone)]
pub struct MSegment {
    /// Parent segment; `None` attaches to the root
    pub parent: Option<usize>,
    /// Proximal sample
    pub prox: MPoint,
    /// Distal sample
    pub dist: MPoint,
    /// Tag of the distal sample's label set
    pub tag: usize,
}

/// Sample-pair tree describing the morphology
#[derive(Debug, Clone, Default)]
pub struct SegmentTree {
    segments: Vec<MSegment>,
}

impl SegmentTree {
    /// Append a segment, returning its id
    pub fn append(
        &mut self,
        parent: Option<usize>,
        prox: MPoint,
        dist: MPoint,
        tag: usize,
    ) -> usize {
        self.segments.push(MSegment {
            parent,
            prox,
            dist,
            tag,
        });
        self.segments.len() - 1
    }

    /// All segments, in append order
    pub fn segments(&self) -> &[MSegment] {
        &self.segments
    }
}

/// Region expressions keyed by label
#[derive(Debug, Clone, Default)]
pub struct LabelDict {
    regions: BTreeMap<String, String>,
}

impl LabelDict {
    /// Define a region expression for a label
    pub fn insert(&mut self, label: impl Into<String>, region: impl Into<String>) {
        self.regions.insert(label.into(), region.into());
    }

    /// Region expression of a label
    pub fn get(&self, label: &str) -> Option<&str> {
        self.regions.get(label).map(String::as_str)
    }

    /// Iterate `(label, region)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.regions.iter().map(|(l, r)| (l.as_str(), r.as_str()))
    }
}

/// A single decor paint instruction
#[derive(Debug, Clone)]
pub enum Paint {
    /// Membrane properties painted over a region
    Membrane {
        /// Target region label
        region: String,
        /// Axial resistivity `rL` in Ω·cm
        rl: Option<f64>,
        /// Membrane capacitance in F/m²
        cm: Option<f64>,
    },
    /// Ion data painted over a region
    Ion {
        /// Target region label
        region: String,
        /// Ion name
        ion: String,
        /// Reversal potential in mV
        rev_pot: Option<f64>,
        /// Internal concentration in mM
        int_con: Option<f64>,
        /// External concentration in mM
        ext_con: Option<f64>,
    },
    /// A density mechanism painted over a region
    Density {
        /// Target region label
        region: String,
        /// Mechanism name
        mechanism: String,
        /// Parameter assignments
        parameters: BTreeMap<String, f64>,
    },
}

/// Ordered list of paint instructions
#[derive(Debug, Clone, Default)]
pub struct Decor {
    paints: Vec<Paint>,
}

impl Decor {
    /// Append a paint instruction
    pub fn paint(&mut self, paint: Paint) {
        self.paints.push(paint);
    }

    /// All paints, in paint order
    pub fn paints(&self) -> &[Paint] {
        &self.paints
    }
}

/// Morphology, labels, and decor ready to assemble into a cable cell
#[derive(Debug, Clone)]
pub struct CableCellTemplate {
    /// Segment tree of the morphology
    pub tree: SegmentTree,
    /// Label dictionary
    pub labels: LabelDict,
    /// Decor paints
    pub decor: Decor,
}

/// A fully assembled Arbor-style cable cell
#[derive(Debug, Clone)]
pub struct CableCell {
    /// Segment tree of the morphology
    pub tree: SegmentTree,
    /// Label dictionary
    pub labels: LabelDict,
    /// Decor paints
    pub decor: Decor,
}

impl CableCellTemplate {
    /// Assemble the template into a cable cell
    pub fn build(&self) -> CableCell {
        CableCell {
            tree: self.tree.clone(),
            labels: self.labels.clone(),
            decor: self.decor.clone(),
        }
    }
}

/// Textual hash of a label set: sorted labels joined with `&`, escaping `&`
pub fn hash_labelset<'a>(labels: impl IntoIterator<Item = &'a String>) -> String {
    let mut sorted: Vec<&String> = labels.into_iter().collect();
    sorted.sort();
    sorted
        .iter()
        .map(|l| l.replace('&', "&&"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build an Arbor-style cable cell template from a schematic.
///
/// Freezes the schematic, so definition resolution errors surface here. Every
/// cable needs at least two points to contribute a segment.
pub fn arbor_build(schematic: &mut Schematic<f64>) -> Result<CableCellTemplate> {
    schematic.freeze()?;
    log::debug!(
        "building cable cell template '{}'",
        schematic.name().unwrap_or_default()
    );

    let (labelsets, labels) = label_dict(schematic);

    let mut tree = SegmentTree::default();
    // Segment id each finished cable ends on, for attaching children.
    let mut branch_endpoints: HashMap<usize, usize> = HashMap::new();
    for (bid, branch) in schematic.cables().iter().enumerate() {
        if branch.points.len() < 2 {
            return Err(BuildError::BranchTooShort { branch: bid });
        }
        let mut ptid = match branch.parent {
            Some(parent) => Some(
                *branch_endpoints
                    .get(&parent)
                    .expect("parents are earlier cables"),
            ),
            None => None,
        };
        for pair in branch.points.windows(2) {
            let dist_section = &schematic.section_slice()[pair[1].section];
            let tag = labelsets[&hash_labelset(dist_section.labels.iter())];
            ptid = Some(tree.append(ptid, mkpt(&pair[0]), mkpt(&pair[1]), tag));
        }
        branch_endpoints.insert(bid, ptid.expect("branches contribute a segment"));
    }

    Ok(CableCellTemplate {
        tree,
        labels,
        decor: decor(schematic),
    })
}

fn mkpt(point: &arborize_schematic::SchematicPoint) -> MPoint {
    MPoint {
        coords: point.coords,
        radius: point.radius,
    }
}

/// Intern label sets in first-seen order and derive the label dictionary
fn label_dict(schematic: &Schematic<f64>) -> (HashMap<String, usize>, LabelDict) {
    let mut labelsets: HashMap<String, usize> = HashMap::new();
    let mut label_tags: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for branch in schematic.cables() {
        for point in &branch.points {
            let section = &schematic.section_slice()[point.section];
            let hash = hash_labelset(section.labels.iter());
            if !labelsets.contains_key(&hash) {
                let tag = labelsets.len();
                for label in &section.labels {
                    label_tags.entry(label.clone()).or_default().push(tag);
                }
                labelsets.insert(hash, tag);
            }
        }
    }

    let mut labels = LabelDict::default();
    for (label, tags) in label_tags {
        let region = match tags.as_slice() {
            [tag] => format!("(tag {tag})"),
            tags => format!(
                "(join {})",
                tags.iter()
                    .map(|t| format!("(tag {t})"))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        };
        labels.insert(label, region);
    }
    (labelsets, labels)
}

/// Paint every declared cable type over its labelled region
fn decor(schematic: &Schematic<f64>) -> Decor {
    let mut decor = Decor::default();
    let labels: Vec<String> = schematic
        .definition()
        .cable_types()
        .map(|(label, _)| label.to_string())
        .collect();
    for label in labels {
        let cable_type = schematic.resolve_labels([label.as_str()]);
        decor.paint(Paint::Membrane {
            region: label.clone(),
            rl: cable_type.cable.ra,
            cm: cable_type.cable.cm.map(|cm| cm * CM_TO_F_PER_M2),
        });
        for (ion, settings) in &cable_type.ions {
            decor.paint(Paint::Ion {
                region: label.clone(),
                ion: ion.clone(),
                rev_pot: settings.rev_pot,
                int_con: settings.int_con,
                ext_con: settings.ext_con,
            });
        }
        for (mech_id, mech) in &cable_type.mechs {
            decor.paint(Paint::Density {
                region: label.clone(),
                mechanism: mech_id.to_string(),
                parameters: mech.parameters.clone(),
            });
        }
    }
    decor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelset_hash_sorts_and_escapes() {
        let labels = vec!["b&b".to_string(), "a".to_string()];
        assert_eq!(hash_labelset(labels.iter()), "a&b&&b");
    }

    #[test]
    fn segment_tree_appends_in_order() {
        let mut tree = SegmentTree::default();
        let p = |x: f64| MPoint {
            coords: [x, 0.0, 0.0],
            radius: 1.0,
        };
        let root = tree.append(None, p(0.0), p(1.0), 0);
        let child = tree.append(Some(root), p(1.0), p(2.0), 1);
        assert_eq!(root, 0);
        assert_eq!(child, 1);
        assert_eq!(tree.segments()[1].parent, Some(0));
    }
}
