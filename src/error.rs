//! Error handling for the saver.
//!
//! The teacher (`bio_files`) never reaches for `thiserror`; every fallible
//! function across `sdf.rs`, `mol2.rs`, and `amber_params.rs` returns
//! `std::io::Result` and builds an `io::Error` with `ErrorKind::InvalidData`
//! and a `format!` message. This module keeps that idiom and just adds
//! named constructors for the three failure classes, so every call site in
//! `v2000.rs`/`v3000.rs` raises them consistently.

use std::io;

pub type MolfileResult<T> = io::Result<T>;

/// A query atom that the classifier can't reduce to `{A, Q, X, LIST,
/// NOTLIST, concrete}` in V3000 context.
pub fn unsupported_query_atom(atom_idx: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("molfile 3000: can not save atom {atom_idx} because of unsupported query feature"),
    )
}

/// A bond with negative order that doesn't map to any of {5,6,7,8} via the
/// query-bond-type enum.
pub fn unrepresentable_query_bond(bond_idx: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("unrepresentable query bond (bond {bond_idx})"),
    )
}

/// Internal invariant violations: atom-list classification missing/empty
/// when the atom label is `L`, unknown S-group type tag, atom number -1
/// with no query context.
pub fn internal(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("internal: {}", msg.into()))
}
