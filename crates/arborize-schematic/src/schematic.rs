//! Labelled branch/point graphs and definition resolution
//!
//! A schematic is the intermediate between a morphology and a built model. It
//! records locations (3-D coordinates plus a radius) tagged with labels, in
//! ascending branch/point order, and carries the model definition that applies
//! to them.
//!
//! The user-facing layer is the list of *cables*: the branches exactly as they
//! were constructed. Beneath it, consecutive points of a cable that share a
//! label set form *sections* — the granularity at which cable types are folded
//! and at which backend builders create compartments. Freezing the schematic
//! resolves every section's definition and locks the structure.

use std::collections::VecDeque;

use rand::Rng;
use smallvec::SmallVec;

use arborize_model::{CableType, Definition, ModelError, Synapse, Value};

use crate::error::{Result, SchematicError};

/// A `(branch, point)` address within a schematic
pub type Location = (usize, usize);

/// Small set of labels attached to a point or section
pub type LabelSet = SmallVec<[String; 4]>;

/// A single located sample of the morphology
#[derive(Debug, Clone)]
pub struct SchematicPoint {
    /// Branch/point address of this sample
    pub loc: Location,
    /// 3-D position in µm
    pub coords: [f64; 3],
    /// Radius in µm
    pub radius: f64,
    /// Section the sample belongs to
    pub section: usize,
}

/// A branch as constructed by the user or a morphology loader
#[derive(Debug, Clone, Default)]
pub struct CableBranch {
    /// Samples of the branch, in construction order
    pub points: Vec<SchematicPoint>,
    /// Parent cable, if the branch was attached to an endpoint
    pub parent: Option<usize>,
    /// Child cables attached to this branch
    pub children: Vec<usize>,
}

/// A run of equally-labelled points within one cable
#[derive(Debug, Clone)]
pub struct Section<V = f64> {
    /// Cable the section belongs to
    pub cable: usize,
    /// Locations of the section's points, in order
    pub points: Vec<Location>,
    /// Labels shared by the section's points
    pub labels: LabelSet,
    /// Parent section, if any
    pub parent: Option<usize>,
    /// Child sections
    pub children: Vec<usize>,
    /// Location on the parent cable this section attaches to
    pub attachment: Option<Location>,
    /// Resolved cable type; set by [`Schematic::freeze`]
    pub definition: Option<CableType<V>>,
}

impl<V> Section<V> {
    fn new(cable: usize, labels: LabelSet) -> Self {
        Self {
            cable,
            points: Vec::new(),
            labels,
            parent: None,
            children: Vec::new(),
            attachment: None,
            definition: None,
        }
    }

    /// Human-readable location string: `location (b.p)` or `interval (b.p1-p2)`
    pub fn location_name(&self) -> String {
        location_name(&self.points)
    }

    /// Resolved cable type of a frozen schematic
    pub fn resolved(&self) -> &CableType<V> {
        self.definition
            .as_ref()
            .expect("section definitions are resolved when the schematic freezes")
    }
}

/// Human-readable name for a list of locations
pub fn location_name(points: &[Location]) -> String {
    match points {
        [] => "empty interval".to_string(),
        [(b, p)] => format!("location ({b}.{p})"),
        [first, .., last] => format!("interval ({}.{}-{})", first.0, first.1, last.1),
    }
}

/// A morphology skeleton with an attached model definition
#[derive(Debug, Clone)]
pub struct Schematic<V = f64> {
    name: Option<String>,
    frozen: bool,
    named: usize,
    definition: Definition<V>,
    cables: Vec<CableBranch>,
    sections: Vec<Section<V>>,
    roots: Vec<usize>,
}

impl<V: Value> Default for Schematic<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Schematic<V> {
    /// Create an empty, unnamed schematic
    pub fn new() -> Self {
        Self {
            name: None,
            frozen: false,
            named: 0,
            definition: Definition::default(),
            cables: Vec::new(),
            sections: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Create an empty schematic with a base name
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut schematic = Self::new();
        schematic.name = Some(name.into());
        schematic
    }

    /// Base name for instances of this model, if one was set
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the base name; fails on a finished schematic
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "change the name",
            });
        }
        self.name = Some(name.into());
        Ok(())
    }

    /// Whether the schematic has been finished
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The attached model definition
    pub fn definition(&self) -> &Definition<V> {
        &self.definition
    }

    /// Attach a model definition; fails on a finished schematic
    pub fn set_definition(&mut self, definition: Definition<V>) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "change the definitions",
            });
        }
        self.definition = definition;
        Ok(())
    }

    /// Cables in construction order
    pub fn cables(&self) -> &[CableBranch] {
        &self.cables
    }

    /// All sections, in creation order
    pub fn section_slice(&self) -> &[Section<V>] {
        &self.sections
    }

    /// Section ids of the roots
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Iterate sections depth-first from the roots
    pub fn sections(&self) -> impl Iterator<Item = &Section<V>> {
        self.section_order()
            .into_iter()
            .map(move |id| &self.sections[id])
    }

    /// Section ids in depth-first order from the roots
    pub fn section_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.sections.len());
        let mut stack: VecDeque<usize> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop_back() {
            order.push(id);
            for &child in self.sections[id].children.iter().rev() {
                stack.push_back(child);
            }
        }
        order
    }

    /// Number of sections
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Total number of points across all cables
    pub fn point_count(&self) -> usize {
        self.cables.iter().map(|c| c.points.len()).sum()
    }

    /// Look up the point at a location
    pub fn point(&self, loc: Location) -> Option<&SchematicPoint> {
        self.cables.get(loc.0).and_then(|c| c.points.get(loc.1))
    }

    /// Add a location to the schematic.
    ///
    /// Locations must be appended in ascending order: a branch id equal to the
    /// current cable count starts a new branch, the previous branch id extends
    /// it, anything else is rejected. The point id must equal the branch's
    /// current point count. Passing an `endpoint` attaches the branch to a
    /// location on an earlier branch; a branch-starting point without an
    /// endpoint becomes a root.
    pub fn create_location(
        &mut self,
        location: Location,
        coords: [f64; 3],
        radius: f64,
        labels: impl IntoIterator<Item = impl Into<String>>,
        endpoint: Option<Location>,
    ) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "extend the branches",
            });
        }
        let (bid, pid) = location;
        let next_bid = self.cables.len();
        if bid == next_bid {
            self.cables.push(CableBranch::default());
        } else if bid + 1 != next_bid {
            let expected = match self.cables.last() {
                Some(last) => format!(
                    "({}.{}) or ({}.0)",
                    next_bid - 1,
                    last.points.len(),
                    next_bid
                ),
                None => "(0.0)".to_string(),
            };
            return Err(SchematicError::out_of_order(
                format!("({bid}.{pid})"),
                expected,
            ));
        }
        let n_points = self.cables[bid].points.len();
        if pid != n_points {
            return Err(SchematicError::out_of_order(
                format!("({bid}.{pid})"),
                format!("({bid}.{n_points}) or ({}.0)", bid + 1),
            ));
        }

        let labels: LabelSet = labels.into_iter().map(Into::into).collect();
        let section = self.assign_section(bid, labels);
        self.cables[bid].points.push(SchematicPoint {
            loc: location,
            coords,
            radius,
            section,
        });
        self.sections[section].points.push(location);

        if let Some(endpoint) = endpoint {
            let parent_point = self
                .point(endpoint)
                .ok_or(SchematicError::UnknownEndpoint { endpoint })?
                .clone();
            let parent_section = parent_point.section;
            self.cables[bid].parent = Some(endpoint.0);
            self.cables[endpoint.0].children.push(bid);
            self.sections[section].parent = Some(parent_section);
            self.sections[section].attachment = Some(endpoint);
            self.sections[parent_section].children.push(section);
        } else if pid == 0 {
            self.roots.push(section);
        }
        Ok(())
    }

    /// Apply a coordinate transform to every point; fails on a finished
    /// schematic
    pub fn transform_points(&mut self, f: impl Fn([f64; 3]) -> [f64; 3]) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "transform the points",
            });
        }
        for cable in &mut self.cables {
            for point in &mut cable.points {
                point.coords = f(point.coords);
            }
        }
        Ok(())
    }

    /// Append an empty branch, keeping branch numbering aligned with sources
    /// that contain pointless sections
    pub fn create_empty(&mut self) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "extend the branches",
            });
        }
        self.cables.push(CableBranch::default());
        Ok(())
    }

    /// Pick the section for the next point of `bid`: the previous point's
    /// section if the labels match, a fresh child section otherwise.
    fn assign_section(&mut self, bid: usize, labels: LabelSet) -> usize {
        let previous = self.cables[bid].points.last().map(|p| p.section);
        match previous {
            Some(section) if self.sections[section].labels == labels => section,
            Some(section) => {
                let prev_loc = self.cables[bid]
                    .points
                    .last()
                    .map(|p| p.loc)
                    .expect("branch has a previous point");
                let id = self.sections.len();
                let mut fresh = Section::new(bid, labels);
                fresh.parent = Some(section);
                fresh.attachment = Some(prev_loc);
                self.sections.push(fresh);
                self.sections[section].children.push(id);
                id
            }
            None => {
                let id = self.sections.len();
                self.sections.push(Section::new(bid, labels));
                id
            }
        }
    }

    /// Finish the schematic: resolve every section's definition, give the
    /// schematic a name if it has none, and lock it against mutation.
    ///
    /// Freezing an already-finished schematic is a no-op.
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        for id in 0..self.sections.len() {
            let folded = self.resolve_labels(&self.sections[id].labels);
            if let Err(source) = folded.assert_complete() {
                let section = &self.sections[id];
                let location = section.location_name();
                return Err(if section.labels.is_empty() {
                    SchematicError::UnlabeledSection { location, source }
                } else {
                    SchematicError::IncompleteSection {
                        location,
                        labels: quote_join(section.labels.iter()),
                        source,
                    }
                });
            }
            self.sections[id].definition = Some(folded);
        }
        if self.name.is_none() {
            self.name = Some(random_name());
        }
        log::debug!(
            "froze schematic '{}' with {} sections",
            self.name.as_deref().unwrap_or_default(),
            self.sections.len()
        );
        self.frozen = true;
        Ok(())
    }

    /// Fold the definition's cable types for a set of labels, in label
    /// priority order
    pub fn resolve_labels(
        &self,
        labels: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> CableType<V> {
        let sorted = self.sort_labels(labels);
        self.definition.fold_labels(sorted.iter().map(String::as_str))
    }

    /// Sort labels by the declaration order of their cable types.
    ///
    /// Labels without a declared cable type sort first; ties break
    /// lexicographically. The last label in the resulting order has the final
    /// say when folding.
    pub fn sort_labels(
        &self,
        labels: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Vec<String> {
        let mut sorted: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();
        sorted.sort_by(|a, b| {
            let key = |label: &str| {
                self.definition
                    .position_of(label)
                    .map(|i| i as i64)
                    .unwrap_or(-1)
            };
            key(a).cmp(&key(b)).then_with(|| a.cmp(b))
        });
        sorted
    }

    /// Generate the next unique instance name; requires a finished schematic
    pub fn create_name(&mut self) -> Result<String> {
        if !self.frozen {
            return Err(SchematicError::NotFrozen {
                operation: "naming instances of it",
            });
        }
        self.named += 1;
        let base = self.name.as_deref().expect("frozen schematics are named");
        Ok(format!("{}_{}", base, self.named))
    }

    /// Map compound label names to the resolved per-section cable types;
    /// requires a finished schematic
    pub fn compound_cable_types(&self) -> Result<Vec<(String, &CableType<V>)>> {
        if !self.frozen {
            return Err(SchematicError::NotFrozen {
                operation: "compounding cable types",
            });
        }
        let mut compound: Vec<(String, &CableType<V>)> = Vec::new();
        for section in self.sections() {
            let name = self.compound_name(&section.labels);
            if !compound.iter().any(|(existing, _)| *existing == name) {
                compound.push((name, section.resolved()));
            }
        }
        Ok(compound)
    }

    /// Compound name of a label set: priority-sorted labels joined with `_`,
    /// escaping `_` as `__`
    pub fn compound_name(
        &self,
        labels: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> String {
        self.sort_labels(labels)
            .iter()
            .map(|l| l.replace('_', "__"))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Global synapse types of the attached definition
    pub fn synapse_types(&self) -> &std::collections::BTreeMap<String, Synapse<V>> {
        self.definition.synapse_types()
    }

    /// Apply a parameter override to a named cable type of the definition;
    /// fails on a finished schematic or an unknown label
    pub fn set_param(&mut self, label: &str, param: Param<V>) -> Result<()> {
        if self.frozen {
            return Err(SchematicError::Frozen {
                operation: "change the definitions",
            });
        }
        let cable_type = self
            .definition
            .get_cable_type_mut(label)
            .ok_or_else(|| {
                SchematicError::Model(ModelError::invalid_definition(
                    label,
                    "no such cable type",
                ))
            })?;
        match param {
            Param::Ra(value) => cable_type.cable.ra = Some(value),
            Param::Cm(value) => cable_type.cable.cm = Some(value),
            Param::Ion { ion, prop, value } => {
                let entry = cable_type.ions.entry(ion).or_default();
                match prop {
                    IonProp::RevPot => entry.rev_pot = Some(value),
                    IonProp::IntCon => entry.int_con = Some(value),
                    IonProp::ExtCon => entry.ext_con = Some(value),
                }
            }
        }
        Ok(())
    }
}

/// A parameter override applied to a cable type
#[derive(Debug, Clone)]
pub enum Param<V = f64> {
    /// Override the axial resistivity
    Ra(V),
    /// Override the membrane capacitance
    Cm(V),
    /// Override an ion property
    Ion {
        /// Ion name
        ion: String,
        /// Which property to override
        prop: IonProp,
        /// New value
        value: V,
    },
}

/// Ion property selector for [`Param::Ion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IonProp {
    /// Reversal potential
    RevPot,
    /// Internal concentration
    IntCon,
    /// External concentration
    ExtCon,
}

/// Split a compound name back into its labels, unescaping `__`
pub fn split_compound(name: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            if chars.peek() == Some(&'_') {
                chars.next();
                current.push('_');
            } else {
                labels.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    labels.push(current);
    labels
}

/// Quote-join labels for error messages: `'a', 'b'`
pub fn quote_join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn random_name() -> String {
    let mut rng = rand::thread_rng();
    (0..10)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect()
}
