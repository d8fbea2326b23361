//! Query-atom and query-bond classification.
//!
//! A save-time classifier would walk each atom's constraint tree on every
//! write. This crate's `QueryMolecule` instead stores the classification
//! directly per atom (`query_atoms`), the same way `bio_files::mol2::BondType`
//! stores a parsed enum rather than re-deriving it from raw text on every
//! write. Parsing/construction is out of this crate's scope, so callers
//! building a `QueryMolecule` are expected to classify atoms once, up
//! front.

use na_seq::Element;

/// Classification of a query atom whose atomic number is unspecified.
/// Concrete atoms (known element, known pseudo-atom, or R-site) never need
/// an entry here.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryAtomSpec {
    /// Any atom.
    A,
    /// Any atom other than hydrogen.
    Q,
    /// Any halogen.
    X,
    /// Inclusive list of allowed elements, e.g. `[C,N,O]`.
    List(Vec<Element>),
    /// Exclusive list, emitted as `NOT[...]`.
    NotList(Vec<Element>),
}

impl QueryAtomSpec {
    pub fn is_list(&self) -> bool {
        matches!(self, QueryAtomSpec::List(_) | QueryAtomSpec::NotList(_))
    }
}

/// Query bond kinds for bonds whose order is encoded as a negative
/// sentinel. Values match the MDL codes 5..8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryBondKind {
    SingleOrDouble,
    SingleOrAromatic,
    DoubleOrAromatic,
    Any,
}

impl QueryBondKind {
    pub fn mdl_code(self) -> i32 {
        match self {
            QueryBondKind::SingleOrDouble => 5,
            QueryBondKind::SingleOrAromatic => 6,
            QueryBondKind::DoubleOrAromatic => 7,
            QueryBondKind::Any => 8,
        }
    }
}
