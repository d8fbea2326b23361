#![allow(confusable_idents)]
#![allow(mixed_script_confusables)]

//! Serializes a molecule (or query molecule) to MDL Molfile text, in either
//! the fixed-column V2000 dialect or the free-form V3000 dialect, with
//! content-driven auto-detection between the two.
//!
//! The `generic` label convention from upstream crates in this lineage
//! (fields shared across more than one file format) isn't needed here:
//! every type in this crate exists for one reason, writing Molfiles, so
//! names are plain (`Atom`, `Bond`) rather than suffixed.

pub mod dispatch;
pub mod error;
pub mod fmt;
pub mod header;
pub mod query_atom;
pub mod rgroup;
pub mod sgroup;
pub mod sink;
pub mod v2000;
pub mod v3000;

use std::collections::BTreeMap;

pub use dispatch::{DialectMode, MolfileSaver, SaveOptions};
pub use error::MolfileResult;
use lin_alg::f64::Vec3;
use na_seq::Element;
pub use query_atom::{QueryAtomSpec, QueryBondKind};
pub use rgroup::{Occurrence, RGroup, RGroups};
pub use sgroup::{
    Connectivity, DataSGroup, GenericSGroup, MultipleGroup, RepeatingUnit, SGroupBase, Superatom,
};

/// An attachment-point neighbor slot on an R-site, in priority order.
/// `None` is the undefined sentinel: an R-site can declare an
/// allowed-groups list without yet pinning every attachment neighbor.
pub type AttachmentNeighbor = Option<u32>;

#[derive(Clone, Debug, Default)]
pub struct RSite {
    pub allowed_groups: Vec<u32>,
    /// Indexed by attachment order (0 = first). Values are atom indices
    /// into the owning `Molecule`.
    pub attachment_order: Vec<AttachmentNeighbor>,
}

/// Per-atom data. Shared between `Molecule` (concrete) and the `Molecule`
/// embedded in `QueryMolecule`; query-only classification (A/Q/X/list) is
/// layered on top in `QueryMolecule::query_atoms`, not stored here, since a
/// concrete `Molecule` never needs it.
#[derive(Clone, Debug)]
pub struct Atom {
    pub element: Element,
    /// `false` means the atomic number is unspecified (a query atom).
    /// `element` still holds a placeholder value in that case, since
    /// `na_seq::Element` has no "none" variant, but it must not be read
    /// unless this is `true`.
    pub elem_known: bool,
    pub isotope: u32,
    /// `None` is `CHARGE_UNKNOWN`, meaningful only on query atoms.
    pub charge: Option<i32>,
    pub posit: Vec3,
    /// 0 = unset.
    pub explicit_valence: i32,
    /// Override used in place of `explicit_valence` for concrete molecules
    /// that track an "unusual" valence separately. `None` falls back to
    /// `explicit_valence`.
    pub unusual_valence: Option<i32>,
    pub is_aromatic: bool,
    /// `None` is the "no_throw" unknown fallback (-1 in the original).
    pub implicit_h: Option<i32>,
    /// 0 = none; MDL radical codes are 1 (singlet) .. 3 (triplet).
    pub radical: u8,
    pub pseudo_label: Option<String>,
    pub r_site: Option<RSite>,
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            element: Element::Carbon,
            elem_known: true,
            isotope: 0,
            charge: Some(0),
            posit: Vec3::new(0.0, 0.0, 0.0),
            explicit_valence: 0,
            unusual_valence: None,
            is_aromatic: false,
            implicit_h: None,
            radical: 0,
            pseudo_label: None,
            r_site: None,
        }
    }
}

impl Atom {
    pub fn is_pseudo(&self) -> bool {
        self.pseudo_label.is_some()
    }

    pub fn is_r_site(&self) -> bool {
        self.r_site.is_some()
    }

    /// The valence a concrete molecule reports; query molecules use
    /// `explicit_valence` directly.
    pub fn valence_for(&self, is_query: bool) -> i32 {
        if is_query {
            self.explicit_valence
        } else {
            self.unusual_valence.unwrap_or(self.explicit_valence)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BondDirection {
    #[default]
    None,
    Up,
    Down,
    Either,
}

#[derive(Clone, Debug)]
pub struct Bond {
    pub beg: u32,
    pub end: u32,
    /// Concrete order is 1 (single) .. 4 (aromatic). A negative sentinel
    /// means this bond's real kind lives in `QueryMolecule::query_bonds`
    /// instead. Only ever negative inside a `QueryMolecule`.
    pub order: i32,
    pub direction: BondDirection,
    pub cis_trans_ignored: bool,
}

impl Bond {
    pub fn is_query_order(&self) -> bool {
        self.order < 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StereoType {
    Abs,
    Or,
    And,
}

/// Marked stereocenters, keyed by atom index: each carries a type (ABS/OR/
/// AND) and a group number. `BTreeMap` keeps iteration in atom-index order,
/// which the V3000 collection-block grouping walk and the V2000 chiral-flag
/// check both depend on.
#[derive(Clone, Debug, Default)]
pub struct Stereocenters(BTreeMap<u32, (StereoType, u32)>);

impl Stereocenters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, atom: u32, type_: StereoType, group: u32) {
        self.0.insert(atom, (type_, group));
    }

    pub fn get_type(&self, atom: u32) -> Option<StereoType> {
        self.0.get(&atom).map(|(t, _)| *t)
    }

    pub fn get_group(&self, atom: u32) -> Option<u32> {
        self.0.get(&atom).map(|(_, g)| *g)
    }

    pub fn same_group(&self, a: u32, b: u32) -> bool {
        match (self.0.get(&a), self.0.get(&b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every marked stereocenter is ABS. Vacuously true when
    /// there are no stereocenters.
    pub fn have_all_abs_any(&self) -> bool {
        self.0.values().all(|(t, _)| *t == StereoType::Abs)
    }

    pub fn have_all_and_any(&self) -> bool {
        self.0.values().all(|(t, _)| *t == StereoType::And)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, StereoType, u32)> + '_ {
        self.0.iter().map(|(&a, &(t, g))| (a, t, g))
    }
}

/// Highlighted atoms/bonds. Kept as an explicit view rather than flags on
/// `Atom`/`Bond` because it's always supplied per-call rather than stored
/// on the molecule.
#[derive(Clone, Debug, Default)]
pub struct Highlighting {
    pub atoms: Vec<u32>,
    pub bonds: Vec<u32>,
}

impl Highlighting {
    pub fn num_vertices(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_edges(&self) -> usize {
        self.bonds.len()
    }
}

/// A molecule graph: sparse vertices/edges. Slots can be vacated without
/// shifting indices, so iteration always walks only occupied slots, in
/// index order.
#[derive(Clone, Debug, Default)]
pub struct Molecule {
    pub name: Option<String>,
    atoms: Vec<Option<Atom>>,
    bonds: Vec<Option<Bond>>,
    pub stereocenters: Stereocenters,
    /// `attachment_points[0]` is attachment group 1's member atoms in
    /// declared order, `attachment_points[1]` is group 2, and so on.
    pub attachment_points: Vec<Vec<u32>>,
    pub superatoms: Vec<Superatom>,
    pub data_sgroups: Vec<DataSGroup>,
    pub repeating_units: Vec<RepeatingUnit>,
    pub multiple_groups: Vec<MultipleGroup>,
    pub generic_sgroups: Vec<GenericSGroup>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> u32 {
        self.atoms.push(Some(atom));
        (self.atoms.len() - 1) as u32
    }

    pub fn add_bond(&mut self, bond: Bond) -> u32 {
        self.bonds.push(Some(bond));
        (self.bonds.len() - 1) as u32
    }

    pub fn remove_atom(&mut self, idx: u32) {
        if let Some(slot) = self.atoms.get_mut(idx as usize) {
            *slot = None;
        }
    }

    pub fn remove_bond(&mut self, idx: u32) {
        if let Some(slot) = self.bonds.get_mut(idx as usize) {
            *slot = None;
        }
    }

    pub fn get_atom(&self, idx: u32) -> Option<&Atom> {
        self.atoms.get(idx as usize).and_then(|a| a.as_ref())
    }

    pub fn get_bond(&self, idx: u32) -> Option<&Bond> {
        self.bonds.get(idx as usize).and_then(|b| b.as_ref())
    }

    pub fn vertex_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.is_some()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.bonds.iter().filter(|b| b.is_some()).count()
    }

    /// Upper bound for index-keyed scratch allocation, not the dense
    /// vertex count.
    pub fn vertex_end(&self) -> u32 {
        self.atoms.len() as u32
    }

    pub fn edge_end(&self) -> u32 {
        self.bonds.len() as u32
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = (u32, &Atom)> {
        self.atoms
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (i as u32, a)))
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = (u32, &Bond)> {
        self.bonds
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (i as u32, b)))
    }

    /// Degree of a vertex: number of incident bonds. Computed on demand
    /// (O(E)); this crate serializes molecules once rather than mutating
    /// them repeatedly, so there's no hot loop that would justify a
    /// maintained adjacency index.
    pub fn degree(&self, atom_idx: u32) -> usize {
        self.iter_edges()
            .filter(|(_, b)| b.beg == atom_idx || b.end == atom_idx)
            .count()
    }

    pub fn attachment_point_count(&self) -> usize {
        self.attachment_points.len()
    }

    pub fn get_attachment_point(&self, idx_1based: usize, j: usize) -> Option<u32> {
        self.attachment_points
            .get(idx_1based - 1)
            .and_then(|v| v.get(j))
            .copied()
    }

    pub fn has_z_coord(&self) -> bool {
        self.iter_vertices().any(|(_, a)| a.posit.z != 0.0)
    }

    /// Builds fresh atom/bond re-indexings for one save call: each occupied
    /// atom gets a 1-based output ordinal in iteration order, and likewise
    /// for bonds. Shared by both dialect writers so the mapping rule lives
    /// in one place.
    pub fn index_mapping(&self) -> IndexMapping {
        let mut atoms = vec![0u32; self.atoms.len()];
        let mut bonds = vec![0u32; self.bonds.len()];

        for (ord, (idx, _)) in self.iter_vertices().enumerate() {
            atoms[idx as usize] = ord as u32 + 1;
        }
        for (ord, (idx, _)) in self.iter_edges().enumerate() {
            bonds[idx as usize] = ord as u32 + 1;
        }

        IndexMapping { atoms, bonds }
    }
}

/// Per-call atom/bond re-indexing. Index 0 in the backing arrays is never a
/// valid slot since ordinals are 1-based, so a `0` read for a removed or
/// unmapped index is a safe sentinel rather than an ambiguous one.
#[derive(Clone, Debug, Default)]
pub struct IndexMapping {
    atoms: Vec<u32>,
    bonds: Vec<u32>,
}

impl IndexMapping {
    pub fn atom(&self, idx: u32) -> u32 {
        self.atoms[idx as usize]
    }

    pub fn bond(&self, idx: u32) -> u32 {
        self.bonds[idx as usize]
    }
}

/// A query molecule: a `Molecule` plus the per-atom/per-bond query
/// classification a concrete molecule never carries, and an R-group table.
/// Composition (rather than inheritance) mirrors how the teacher relates
/// sibling format structs (e.g. `Sdf::from(Mol2)`).
#[derive(Clone, Debug, Default)]
pub struct QueryMolecule {
    pub mol: Molecule,
    pub query_atoms: std::collections::HashMap<u32, QueryAtomSpec>,
    pub query_bonds: std::collections::HashMap<u32, QueryBondKind>,
    pub rgroups: RGroups,
}

impl QueryMolecule {
    pub fn new(mol: Molecule) -> Self {
        Self {
            mol,
            query_atoms: Default::default(),
            query_bonds: Default::default(),
            rgroups: RGroups::default(),
        }
    }
}

/// Either molecule shape the dispatcher can be handed. A concrete
/// `Molecule` reads through this the same way a query molecule does: every
/// read goes through the shared graph, and query-only reads fail closed.
pub enum AnyMolecule<'a> {
    Concrete(&'a Molecule),
    Query(&'a QueryMolecule),
}

impl<'a> AnyMolecule<'a> {
    pub fn mol(&self) -> &Molecule {
        match self {
            AnyMolecule::Concrete(m) => m,
            AnyMolecule::Query(q) => &q.mol,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, AnyMolecule::Query(_))
    }

    pub fn as_query(&self) -> Option<&QueryMolecule> {
        match self {
            AnyMolecule::Query(q) => Some(q),
            AnyMolecule::Concrete(_) => None,
        }
    }
}

impl<'a> From<&'a Molecule> for AnyMolecule<'a> {
    fn from(m: &'a Molecule) -> Self {
        AnyMolecule::Concrete(m)
    }
}

impl<'a> From<&'a QueryMolecule> for AnyMolecule<'a> {
    fn from(q: &'a QueryMolecule) -> Self {
        AnyMolecule::Query(q)
    }
}
