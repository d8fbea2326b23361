//! The free-form V3000 CTAB writer, including nested R-group CTABs.

use std::io::{self, Write};

use crate::dispatch::ReactionAnnotations;
use crate::error;
use crate::fmt::{attachment_order_ok, element_label, format_occurrence_ranges, hydrogen_isotope_label, write_multiline};
use crate::query_atom::QueryAtomSpec;
use crate::sink::MolWriter;
use crate::{AnyMolecule, BondDirection, Highlighting, IndexMapping, QueryMolecule, StereoType};

/// Fragments nest at most one level in well-formed input, but a depth bound
/// keeps a malformed `if_then` cycle from recursing forever.
const MAX_RGROUP_DEPTH: u32 = 64;

/// Writes one `BEGIN CTAB .. END CTAB` block plus any nested R-group
/// blocks that follow it. Nested fragments never inherit the caller's
/// reaction annotations or highlighting: those are per-call views keyed by
/// the *top-level* molecule's atom/bond indices, which are meaningless
/// against a fragment's own index space.
pub fn write_ctab_3000<W: Write>(
    out: &mut MolWriter<W>,
    any: AnyMolecule,
    reaction: &ReactionAnnotations,
    highlighting: Option<&Highlighting>,
) -> io::Result<IndexMapping> {
    write_ctab_3000_at_depth(out, any, reaction, highlighting, 0)
}

fn write_ctab_3000_at_depth<W: Write>(
    out: &mut MolWriter<W>,
    any: AnyMolecule,
    reaction: &ReactionAnnotations,
    highlighting: Option<&Highlighting>,
    depth: u32,
) -> io::Result<IndexMapping> {
    if depth > MAX_RGROUP_DEPTH {
        return Err(error::internal("R-group nesting too deep"));
    }

    let mol = any.mol();
    let qmol = any.as_query();
    let mapping = mol.index_mapping();

    out.write_str_cr("M  V30 BEGIN CTAB")?;
    out.printf_cr(format_args!("M  V30 COUNTS {} {} 0 0 0", mol.vertex_count(), mol.edge_count()))?;
    out.write_str_cr("M  V30 BEGIN ATOM")?;

    for (idx, atom) in mol.iter_vertices() {
        let ord = mapping.atom(idx);
        let mut rec = format!("{ord} ");

        let mut isotope = atom.isotope;

        if let Some(h) = hydrogen_isotope_label(atom.element, atom.isotope) {
            rec.push_str(h);
            isotope = 0;
        } else if let Some(pseudo) = &atom.pseudo_label {
            rec.push_str(pseudo);
        } else if atom.is_r_site() {
            rec.push_str("R#");
        } else if atom.elem_known {
            rec.push_str(&element_label(atom.element));
        } else {
            match qmol.and_then(|q| q.query_atoms.get(&idx)) {
                Some(QueryAtomSpec::A) => rec.push('A'),
                Some(QueryAtomSpec::Q) => rec.push('Q'),
                Some(QueryAtomSpec::X) => rec.push('X'),
                Some(QueryAtomSpec::List(els)) => {
                    rec.push('[');
                    rec.push_str(&els.iter().map(|e| element_label(*e)).collect::<Vec<_>>().join(","));
                    rec.push(']');
                }
                Some(QueryAtomSpec::NotList(els)) => {
                    rec.push_str("NOT[");
                    rec.push_str(&els.iter().map(|e| element_label(*e)).collect::<Vec<_>>().join(","));
                    rec.push(']');
                }
                None if qmol.is_some() => rec.push('A'),
                None => return Err(error::internal("atom number = -1, but qmol == 0")),
            }
        }

        let aam = reaction.atom_mapping_at(idx);
        let irflag = reaction.atom_inversion_at(idx);
        let ecflag = reaction.atom_exact_change_at(idx);

        rec.push_str(&format!(" {:.6} {:.6} {:.6} {}", atom.posit.x, atom.posit.y, atom.posit.z, aam));

        let charge_is_default = match any.is_query() {
            true => atom.charge.is_none(),
            false => atom.charge.unwrap_or(0) == 0,
        };
        if !charge_is_default {
            if let Some(c) = atom.charge {
                rec.push_str(&format!(" CHG={c}"));
            }
        }

        if !any.is_query()
            && atom.is_aromatic
            && ((atom.element != na_seq::Element::Carbon && atom.element != na_seq::Element::Oxygen)
                || atom.charge != Some(0))
        {
            if let Some(h) = atom.implicit_h {
                if h >= 0 {
                    rec.push_str(&format!(" HCOUNT={}", h + 1));
                }
            }
        }

        let radical = if atom.is_r_site() || atom.pseudo_label.is_some() { 0 } else { atom.radical };
        if radical > 0 {
            rec.push_str(&format!(" RAD={radical}"));
        }
        if isotope > 0 {
            rec.push_str(&format!(" MASS={isotope}"));
        }
        let valence = atom.valence_for(any.is_query());
        if valence > 0 {
            rec.push_str(&format!(" VAL={valence}"));
        }
        if irflag > 0 {
            rec.push_str(&format!(" INVRET={irflag}"));
        }
        if ecflag > 0 {
            rec.push_str(&format!(" EXACHG={ecflag}"));
        }

        if let Some(site) = &atom.r_site {
            if !site.allowed_groups.is_empty() {
                rec.push_str(&format!(
                    " RGROUPS=({}",
                    site.allowed_groups.len()
                ));
                for g in &site.allowed_groups {
                    rec.push_str(&format!(" {g}"));
                }
                rec.push(')');

                if !attachment_order_ok(&site.attachment_order) {
                    let degree = mol.degree(idx);
                    rec.push_str(&format!(" ATTCHORD=({}", degree * 2));
                    for (k, neighbor) in site.attachment_order.iter().enumerate() {
                        let n_ord = neighbor.map(|n| mapping.atom(n)).unwrap_or(0);
                        rec.push_str(&format!(" {n_ord} {}", k + 1));
                    }
                    rec.push(')');
                }
            }
        }

        if mol.attachment_point_count() > 0 {
            let mut val = 0u32;
            for group in 1..=mol.attachment_point_count() {
                let mut j = 0;
                while let Some(member) = mol.get_attachment_point(group, j) {
                    if member == idx {
                        val |= 1 << (group - 1);
                        break;
                    }
                    j += 1;
                }
            }
            if val > 0 {
                let val = if val == 3 { -1 } else { val as i32 };
                rec.push_str(&format!(" ATTCHPT={val}"));
            }
        }

        write_multiline(out, &rec)?;
    }

    out.write_str_cr("M  V30 END ATOM")?;
    out.write_str_cr("M  V30 BEGIN BOND")?;

    for (idx, bond) in mol.iter_edges() {
        let bond_ord = mapping.bond(idx);
        let order = if bond.is_query_order() {
            let qmol = qmol.ok_or_else(|| error::internal("bond order < 0, but qmol == 0"))?;
            match qmol.query_bonds.get(&idx) {
                Some(k) => k.mdl_code(),
                None => return Err(error::unrepresentable_query_bond(idx)),
            }
        } else {
            bond.order
        };

        let mut rec = format!("{bond_ord} {order} {} {}", mapping.atom(bond.beg), mapping.atom(bond.end));

        match bond.direction {
            BondDirection::Up => rec.push_str(" CFG=1"),
            BondDirection::Either => rec.push_str(" CFG=2"),
            BondDirection::Down => rec.push_str(" CFG=3"),
            BondDirection::None => {
                if bond.cis_trans_ignored {
                    rec.push_str(" CFG=2");
                }
            }
        }

        let reacting_center = reaction.bond_reacting_center_at(idx);
        if reacting_center != 0 {
            rec.push_str(&format!(" RXCTR={reacting_center}"));
        }

        write_multiline(out, &rec)?;
    }

    out.write_str_cr("M  V30 END BOND")?;

    if !mol.stereocenters.is_empty() || highlighting.is_some() {
        out.write_str_cr("M  V30 BEGIN COLLECTION")?;

        let mut processed = vec![false; mol.vertex_end() as usize];

        for (idx, _) in mol.iter_vertices() {
            if processed[idx as usize] {
                continue;
            }

            let Some(stereo_type) = mol.stereocenters.get_type(idx) else { continue };
            let group = mol.stereocenters.get_group(idx);

            let mut list = vec![idx];
            for (other, _) in mol.iter_vertices() {
                if other > idx && mol.stereocenters.same_group(idx, other) {
                    list.push(other);
                    processed[other as usize] = true;
                }
            }

            let mut rec = match stereo_type {
                StereoType::Abs => "MDLV30/STEABS ATOMS=(".to_string(),
                StereoType::Or => format!("MDLV30/STEREL{} ATOMS=(", group.unwrap_or(0)),
                StereoType::And => format!("MDLV30/STERAC{} ATOMS=(", group.unwrap_or(0)),
            };
            rec.push_str(&list.len().to_string());
            for a in &list {
                rec.push_str(&format!(" {}", mapping.atom(*a)));
            }
            rec.push(')');

            write_multiline(out, &rec)?;
        }

        if let Some(h) = highlighting {
            if h.num_edges() > 0 {
                let mut rec = format!("MDLV30/HILITE BONDS=({}", h.num_edges());
                for (idx, _) in mol.iter_edges() {
                    if h.bonds.contains(&idx) {
                        rec.push_str(&format!(" {}", mapping.bond(idx)));
                    }
                }
                rec.push(')');
                write_multiline(out, &rec)?;
            }
            if h.num_vertices() > 0 {
                let mut rec = format!("MDLV30/HILITE ATOMS=({}", h.num_vertices());
                for (idx, _) in mol.iter_vertices() {
                    if h.atoms.contains(&idx) {
                        rec.push_str(&format!(" {}", mapping.atom(idx)));
                    }
                }
                rec.push(')');
                write_multiline(out, &rec)?;
            }
        }

        out.write_str_cr("M  V30 END COLLECTION")?;
    }

    out.write_str_cr("M  V30 END CTAB")?;

    if let Some(qmol) = qmol {
        for (rg_idx, rgroup) in qmol.rgroups.iter_non_empty() {
            write_rgroup_3000(out, rgroup, rg_idx, depth + 1)?;
        }
    }

    Ok(mapping)
}

fn write_rgroup_3000<W: Write>(
    out: &mut MolWriter<W>,
    rgroup: &crate::RGroup,
    rg_idx: u32,
    depth: u32,
) -> io::Result<()> {
    out.printf_cr(format_args!("M  V30 BEGIN RGROUP {rg_idx}"))?;

    let rec = format!(
        "RLOGIC {} {} {}",
        rgroup.if_then,
        if rgroup.rest_h { 1 } else { 0 },
        format_occurrence_ranges(&rgroup.occurrence),
    );
    write_multiline(out, &rec)?;

    for fragment in &rgroup.fragments {
        write_ctab_3000_at_depth(
            out,
            AnyMolecule::Query(fragment),
            &ReactionAnnotations::default(),
            None,
            depth,
        )?;
    }

    out.write_str_cr("M  V30 END RGROUP")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Atom, Bond, Molecule, RGroup, RGroups, RSite};
    use na_seq::Element;

    #[test]
    fn counts_and_block_delimiters() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() });
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_ctab_3000(&mut w, AnyMolecule::Concrete(&mol), &ReactionAnnotations::default(), None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("M  V30 BEGIN CTAB\n"));
        assert!(text.contains("M  V30 COUNTS 1 0 0 0 0\n"));
        assert!(text.ends_with("M  V30 END CTAB\n"));
    }

    #[test]
    fn every_line_has_v30_prefix() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() });
        mol.add_atom(Atom { element: Element::Oxygen, ..Default::default() });
        mol.add_bond(Bond { beg: 0, end: 1, order: 1, direction: BondDirection::None, cis_trans_ignored: false });

        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_ctab_3000(&mut w, AnyMolecule::Concrete(&mol), &ReactionAnnotations::default(), None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        for line in text.lines() {
            assert!(line.starts_with("M  V30 "), "line missing prefix: {line:?}");
        }
    }

    #[test]
    fn or_group_stereocenter_collection_line() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() });
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() });
        mol.stereocenters.mark(0, StereoType::Or, 7);
        mol.stereocenters.mark(1, StereoType::Or, 7);

        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_ctab_3000(&mut w, AnyMolecule::Concrete(&mol), &ReactionAnnotations::default(), None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("MDLV30/STEREL7 ATOMS=(2 1 2)"));
    }

    #[test]
    fn rsite_emits_rgroups_and_attchord() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() }); // 1
        mol.add_atom(Atom { element: Element::Carbon, ..Default::default() }); // 2 (neighbor "3" 1-based -> idx 2)
        let rsite_idx = mol.add_atom(Atom {
            r_site: Some(RSite { allowed_groups: vec![2, 5], attachment_order: vec![Some(1), Some(0)] }),
            ..Default::default()
        });
        mol.add_bond(Bond { beg: rsite_idx, end: 0, order: 1, direction: BondDirection::None, cis_trans_ignored: false });
        mol.add_bond(Bond { beg: rsite_idx, end: 1, order: 1, direction: BondDirection::None, cis_trans_ignored: false });

        let mut rgroups = RGroups::default();
        rgroups.insert(2, RGroup { fragments: vec![QueryMolecule::new(Molecule::new())], ..Default::default() });
        rgroups.insert(5, RGroup { fragments: vec![QueryMolecule::new(Molecule::new())], ..Default::default() });
        let qmol = QueryMolecule { mol, rgroups, ..Default::default() };

        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_ctab_3000(&mut w, AnyMolecule::Query(&qmol), &ReactionAnnotations::default(), None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("RGROUPS=(2 2 5)"));
        assert!(text.contains("ATTCHORD=(4 2 1 1 2)"));
    }
}
