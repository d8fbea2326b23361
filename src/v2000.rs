//! The fixed-column V2000 CTAB writer.

use std::io::{self, Write};

use na_seq::Element;

use crate::dispatch::ReactionAnnotations;
use crate::error;
use crate::fmt::{element_label, hydrogen_isotope_label};
use crate::query_atom::QueryAtomSpec;
use crate::sgroup::Connectivity;
use crate::sink::MolWriter;
use crate::{AnyMolecule, IndexMapping, Molecule};

/// `chiral = 1` iff stereocenters exist, all are ABS-or-ANY (collapsed to
/// "all ABS" per `Stereocenters::have_all_abs_any`'s documented scope), and
/// the caller hasn't suppressed it.
pub fn chiral_flag(mol: &Molecule, no_chiral: bool) -> bool {
    !no_chiral && !mol.stereocenters.is_empty() && mol.stereocenters.have_all_abs_any()
}

/// The counts line, shared verbatim by the plain and RG-enveloped forms.
pub fn write_counts_line<W: Write>(out: &mut MolWriter<W>, mol: &Molecule, no_chiral: bool) -> io::Result<()> {
    let chiral = if chiral_flag(mol, no_chiral) { 1 } else { 0 };
    out.printf_cr(format_args!(
        "{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3} V2000",
        mol.vertex_count(),
        mol.edge_count(),
        0,
        0,
        chiral,
        0,
        0,
        0,
        0,
        0,
        999,
    ))
}

/// Writes the atom block, bond block, and every V2000 property line
/// (CHG/RAD/ISO/ALS/pseudo, then the S-group family) for `any`. Returns the
/// fresh index mapping so the dispatcher can reuse it for the R-group
/// post-blocks written outside the CTAB.
pub fn write_ctab_2000<W: Write>(
    out: &mut MolWriter<W>,
    any: AnyMolecule,
    reaction: &ReactionAnnotations,
) -> io::Result<IndexMapping> {
    let mol = any.mol();
    let qmol = any.as_query();
    let mapping = mol.index_mapping();

    let mut charges = Vec::new();
    let mut radicals: Vec<(u32, u8)> = Vec::new();
    let mut isotopes = Vec::new();
    let mut pseudoatoms = Vec::new();
    let mut atom_lists = Vec::new();

    for (idx, atom) in mol.iter_vertices() {
        let mut label = [' ', ' ', ' '];

        if atom.is_r_site() {
            label[0] = 'R';
            label[1] = '#';
        } else if let Some(pseudo) = &atom.pseudo_label {
            if pseudo.len() <= 3 {
                for (i, c) in pseudo.chars().enumerate() {
                    label[i] = c;
                }
            } else {
                label[0] = 'A';
                pseudoatoms.push(idx);
            }
        } else if !atom.elem_known {
            let qmol = qmol.ok_or_else(|| error::internal("atom number = -1, but qmol == 0"))?;
            match qmol.query_atoms.get(&idx) {
                Some(QueryAtomSpec::Q) => label[0] = 'Q',
                Some(QueryAtomSpec::X) => label[0] = 'X',
                Some(QueryAtomSpec::List(_)) | Some(QueryAtomSpec::NotList(_)) => {
                    label[0] = 'L';
                    atom_lists.push(idx);
                }
                Some(QueryAtomSpec::A) | None => label[0] = 'A',
            }
        } else if let Some(h) = hydrogen_isotope_label(atom.element, atom.isotope) {
            label[0] = h.chars().next().unwrap();
        } else {
            let sym = element_label(atom.element);
            let mut chars = sym.chars();
            label[0] = chars.next().unwrap_or(' ');
            if let Some(c2) = chars.next() {
                label[1] = c2;
            }
            if atom.isotope > 0 {
                isotopes.push(idx);
            }
        }

        let aam = reaction.atom_mapping_at(idx);
        let irflag = reaction.atom_inversion_at(idx);
        let ecflag = reaction.atom_exact_change_at(idx);

        let explicit_valence = atom.valence_for(any.is_query());
        let valence = if explicit_valence > 0 && explicit_valence < 14 { explicit_valence } else { 0 };

        if let Some(c) = atom.charge {
            if (-15..=15).contains(&c) && c != 0 {
                charges.push(idx);
            }
        }

        if (1..=3).contains(&atom.radical) {
            radicals.push((idx, atom.radical));
        }

        let hydrogens_count = if !any.is_query()
            && atom.is_aromatic
            && ((atom.element != Element::Carbon && atom.element != Element::Oxygen) || atom.charge != Some(0))
        {
            atom.implicit_h.unwrap_or(-1) + 1
        } else {
            0
        };

        out.printf_cr(format_args!(
            "{:>10.4}{:>10.4}{:>10.4} {}{}{}{:>2}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}",
            atom.posit.x,
            atom.posit.y,
            atom.posit.z,
            label[0],
            label[1],
            label[2],
            0,
            0,
            0,
            hydrogens_count,
            0,
            valence,
            0,
            0,
            0,
            aam,
            irflag,
            ecflag,
        ))?;
    }

    for (idx, bond) in mol.iter_edges() {
        let order = if bond.is_query_order() {
            let qmol = qmol.ok_or_else(|| error::internal("bond order < 0, but qmol == 0"))?;
            match qmol.query_bonds.get(&idx) {
                Some(k) => k.mdl_code(),
                None => return Err(error::unrepresentable_query_bond(idx)),
            }
        } else {
            bond.order
        };

        let stereo = match bond.direction {
            crate::BondDirection::Up => 1,
            crate::BondDirection::Down => 6,
            crate::BondDirection::Either => 4,
            crate::BondDirection::None => {
                if bond.cis_trans_ignored {
                    3
                } else {
                    0
                }
            }
        };

        let reacting_center = reaction.bond_reacting_center_at(idx);

        out.printf_cr(format_args!(
            "{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}",
            mapping.atom(bond.beg),
            mapping.atom(bond.end),
            order,
            stereo,
            0,
            0,
            reacting_center,
        ))?;
    }

    write_packed_pairs(out, "M  CHG", &charges, |i| mol.get_atom(i).and_then(|a| a.charge).unwrap_or(0), &mapping)?;
    write_packed_pairs(out, "M  RAD", &radicals.iter().map(|&(i, _)| i).collect::<Vec<_>>(), |i| {
        radicals.iter().find(|&&(j, _)| j == i).map(|&(_, r)| r as i32).unwrap_or(0)
    }, &mapping)?;
    write_packed_pairs(out, "M  ISO", &isotopes, |i| mol.get_atom(i).map(|a| a.isotope as i32).unwrap_or(0), &mapping)?;

    for idx in &atom_lists {
        let qmol = qmol.ok_or_else(|| error::internal("atom list not recognized"))?;
        let (not_list, elements) = match qmol.query_atoms.get(idx) {
            Some(QueryAtomSpec::List(els)) => (false, els),
            Some(QueryAtomSpec::NotList(els)) => (true, els),
            _ => return Err(error::internal("atom list not recognized")),
        };
        if elements.is_empty() {
            return Err(error::internal("atom list size is zero"));
        }

        out.write_str(&format!(
            "M  ALS {:>3}{:>3} {} ",
            mapping.atom(*idx),
            elements.len(),
            if not_list { 'T' } else { 'F' }
        ))?;
        for el in elements {
            let sym = element_label(*el);
            let mut chars = sym.chars();
            let c1 = chars.next().unwrap_or(' ');
            let c2 = chars.next().unwrap_or(' ');
            out.write_str(&format!("{c1}{c2} "))?;
        }
        out.write_cr()?;
    }

    for idx in &pseudoatoms {
        out.printf_cr(format_args!("A  {:>3}", mapping.atom(*idx)))?;
        let label = mol.get_atom(*idx).and_then(|a| a.pseudo_label.as_deref()).unwrap_or("");
        out.write_str_cr(label)?;
    }

    write_sgroups(out, mol, &mapping)?;

    Ok(mapping)
}

fn write_packed_pairs<W: Write>(
    out: &mut MolWriter<W>,
    tag: &str,
    indices: &[u32],
    value_of: impl Fn(u32) -> i32,
    mapping: &IndexMapping,
) -> io::Result<()> {
    if indices.is_empty() {
        return Ok(());
    }

    for chunk in indices.chunks(8) {
        out.write_str(&format!("{tag}{:>3}", chunk.len()))?;
        for &idx in chunk {
            out.write_str(&format!(" {:>3} {:>3}", mapping.atom(idx), value_of(idx)))?;
        }
        out.write_cr()?;
    }
    Ok(())
}

enum SGroupRef<'a> {
    Superatom(&'a crate::Superatom),
    Data(&'a crate::DataSGroup),
    Repeating(&'a crate::RepeatingUnit),
    Multiple(&'a crate::MultipleGroup),
    Generic(&'a crate::GenericSGroup),
}

impl<'a> SGroupRef<'a> {
    fn base(&self) -> &crate::SGroupBase {
        match self {
            SGroupRef::Superatom(s) => &s.base,
            SGroupRef::Data(s) => &s.base,
            SGroupRef::Repeating(s) => &s.base,
            SGroupRef::Multiple(s) => &s.base,
            SGroupRef::Generic(s) => &s.base,
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            SGroupRef::Superatom(_) => "SUP",
            SGroupRef::Data(_) => "DAT",
            SGroupRef::Repeating(_) => "SRU",
            SGroupRef::Multiple(_) => "MUL",
            SGroupRef::Generic(_) => "GEN",
        }
    }
}

fn write_sgroups<W: Write>(out: &mut MolWriter<W>, mol: &Molecule, mapping: &IndexMapping) -> io::Result<()> {
    let mut sgroups: Vec<SGroupRef> = Vec::new();
    sgroups.extend(mol.superatoms.iter().map(SGroupRef::Superatom));
    sgroups.extend(mol.data_sgroups.iter().map(SGroupRef::Data));
    let ru_start = sgroups.len();
    sgroups.extend(mol.repeating_units.iter().map(SGroupRef::Repeating));
    sgroups.extend(mol.multiple_groups.iter().map(SGroupRef::Multiple));
    sgroups.extend(mol.generic_sgroups.iter().map(SGroupRef::Generic));

    if sgroups.is_empty() {
        return Ok(());
    }

    let indices: Vec<usize> = (0..sgroups.len()).collect();

    for chunk in indices.chunks(8) {
        out.write_str(&format!("M  STY{:>3}", chunk.len()))?;
        for &i in chunk {
            out.write_str(&format!(" {:>3} {}", i + 1, sgroups[i].type_tag()))?;
        }
        out.write_cr()?;
    }

    for chunk in indices.chunks(8) {
        out.write_str(&format!("M  SLB{:>3}", chunk.len()))?;
        for &i in chunk {
            out.write_str(&format!(" {:>3} {:>3}", i + 1, i + 1))?;
        }
        out.write_cr()?;
    }

    let ru_indices: Vec<usize> = (ru_start..ru_start + mol.repeating_units.len()).collect();
    for chunk in ru_indices.chunks(8) {
        out.write_str(&format!("M  SCN{:>3}", chunk.len()))?;
        for &i in chunk {
            let ru = match &sgroups[i] {
                SGroupRef::Repeating(ru) => ru,
                _ => unreachable!(),
            };
            let tag = match ru.connectivity {
                Connectivity::HeadToHead => "HH  ",
                Connectivity::HeadToTail => "HT  ",
                Connectivity::EitherUnknown => "EU  ",
            };
            out.write_str(&format!(" {:>3} {tag}", i + 1))?;
        }
        out.write_cr()?;
    }

    for (i, sgroup) in sgroups.iter().enumerate() {
        let id = i + 1;
        let base = sgroup.base();

        for chunk in base.atoms.chunks(8) {
            out.write_str(&format!("M  SAL {:>3}{:>3}", id, chunk.len()))?;
            for &a in chunk {
                out.write_str(&format!(" {:>3}", mapping.atom(a)))?;
            }
            out.write_cr()?;
        }
        for chunk in base.bonds.chunks(8) {
            out.write_str(&format!("M  SBL {:>3}{:>3}", id, chunk.len()))?;
            for &b in chunk {
                out.write_str(&format!(" {:>3}", mapping.bond(b)))?;
            }
            out.write_cr()?;
        }

        match sgroup {
            SGroupRef::Superatom(s) => {
                if s.subscript.len() > 1 {
                    out.write_str(&format!("M  SMT {:>3} {}", id, s.subscript))?;
                }
                if let Some((bond_idx, (bx, by))) = s.bond {
                    out.write_str(&format!("M  SBV {:>3} {:>3} {:>9.4}{:>9.4}", id, mapping.bond(bond_idx), bx, by))?;
                }
                out.write_cr()?;
            }
            SGroupRef::Data(s) => {
                out.write_str(&format!("M  SDT {:>3} ", id))?;
                let mut k: i32 = 30;
                if s.description.len() > 1 {
                    out.write_str(&s.description)?;
                    k -= s.description.len() as i32 - 1;
                }
                while k > 0 {
                    out.write_char(' ')?;
                    k -= 1;
                }
                out.write_str_cr("F")?;

                out.write_str(&format!(
                    "M  SDD {:>3} {:>10.4}{:>10.4}    {}{}{}   ALL  1       {}  ",
                    id,
                    s.display_pos.0,
                    s.display_pos.1,
                    if s.attached { 'A' } else { 'D' },
                    if s.relative { 'R' } else { 'A' },
                    if s.display_units { 'U' } else { ' ' },
                    s.dasp_pos,
                ))?;
                out.write_cr()?;

                let bytes = s.data.as_bytes();
                let mut offset = 0;
                while bytes.len() - offset > 69 {
                    out.write_str(&format!("M  SCD {:>3} {:<69}", id, &s.data[offset..offset + 69]))?;
                    out.write_cr()?;
                    offset += 69;
                }
                out.write_str(&format!("M  SED {:>3} {}", id, &s.data[offset..]))?;
                out.write_cr()?;
            }
            SGroupRef::Multiple(s) => {
                for chunk in s.parent_atoms.chunks(8) {
                    out.write_str(&format!("M  SPA {:>3}{:>3}", id, chunk.len()))?;
                    for &a in chunk {
                        out.write_str(&format!(" {:>3}", mapping.atom(a)))?;
                    }
                    out.write_cr()?;
                }
                out.write_str_cr(&format!("M  SMT {:>3} {}", id, s.multiplier))?;
            }
            SGroupRef::Repeating(_) | SGroupRef::Generic(_) => {}
        }

        for (p0, p1) in &base.brackets {
            out.write_str_cr(&format!("M  SDI {:>3}  4 {:>9.4} {:>9.4} {:>9.4} {:>9.4}", id, p0.x, p0.y, p1.x, p1.y))?;
        }
    }

    Ok(())
}

/// `M  RGP` / `M  AAL`, written outside the CTAB.
pub fn write_rgroup_indices_2000<W: Write>(
    out: &mut MolWriter<W>,
    qmol: &crate::QueryMolecule,
    mapping: &IndexMapping,
) -> io::Result<()> {
    let mut pairs = Vec::new();
    for (idx, atom) in qmol.mol.iter_vertices() {
        if let Some(site) = &atom.r_site {
            for &g in &site.allowed_groups {
                pairs.push((mapping.atom(idx), g));
            }
        }
    }

    if !pairs.is_empty() {
        out.write_str(&format!("M  RGP{:>3}", pairs.len()))?;
        for (a, r) in &pairs {
            out.write_str(&format!(" {:>3} {:>3}", a, r))?;
        }
        out.write_cr()?;
    }

    for (idx, atom) in qmol.mol.iter_vertices() {
        let Some(site) = &atom.r_site else { continue };
        if crate::fmt::attachment_order_ok(&site.attachment_order) {
            continue;
        }

        out.write_str(&format!("M  AAL {:>3}{:>3}", mapping.atom(idx), site.attachment_order.len()))?;
        for (k, neighbor) in site.attachment_order.iter().enumerate() {
            if let Some(n) = neighbor {
                out.write_str(&format!(" {:>3} {:>3}", mapping.atom(*n), k + 1))?;
            }
        }
        out.write_cr()?;
    }

    Ok(())
}

/// `M  APO`: attachment-group membership collapsed into a per-atom bitmask,
/// `bit i-1` set for attachment group `i`. Unlike the V3000 `ATTCHPT` key,
/// V2000 never remaps the combined value `3` to `-1`.
pub fn write_attachment_values_2000<W: Write>(
    out: &mut MolWriter<W>,
    mol: &Molecule,
    mapping: &IndexMapping,
) -> io::Result<()> {
    if mol.attachment_point_count() == 0 {
        return Ok(());
    }

    let mut orders: std::collections::BTreeMap<u32, i32> = std::collections::BTreeMap::new();

    for i in 1..=mol.attachment_point_count() {
        let mut j = 0;
        while let Some(atom_idx) = mol.get_attachment_point(i, j) {
            let ord = mapping.atom(atom_idx);
            *orders.entry(ord).or_insert(0) |= 1 << (i - 1);
            j += 1;
        }
    }

    out.write_str(&format!("M  APO{:>3}", orders.len()))?;
    for (ord, val) in &orders {
        out.write_str(&format!(" {:>3} {:>3}", ord, val))?;
    }
    out.write_cr()
}
