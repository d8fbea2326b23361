//! The top-level saver: dialect selection, the three-line header, the
//! optional RG-file V2000 envelope, and the plain `M  END` terminator.

use std::collections::HashMap;
use std::io::{self, Write};

use chrono::{Datelike, Local, Timelike};

use crate::sink::MolWriter;
use crate::{AnyMolecule, Highlighting, Molecule, QueryMolecule};
use crate::{fmt, header, v2000, v3000};

/// Which dialect to emit. `Auto` reproduces the original's heuristic
/// exactly, quirk included (see `should_use_v2000`'s doc comment).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DialectMode {
    #[default]
    Auto,
    V2000,
    V3000,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SaveOptions {
    pub mode: DialectMode,
    pub no_chiral: bool,
}

/// Per-atom/per-bond reaction decorations, looked up by index with `0`
/// standing in for "absent". This matches the default a raw array lookup
/// produces for an untouched slot.
#[derive(Clone, Debug, Default)]
pub struct ReactionAnnotations {
    pub atom_mapping: Option<HashMap<u32, i32>>,
    pub atom_inversion: Option<HashMap<u32, i32>>,
    pub atom_exact_change: Option<HashMap<u32, i32>>,
    pub bond_reacting_center: Option<HashMap<u32, i32>>,
}

impl ReactionAnnotations {
    pub fn atom_mapping_at(&self, idx: u32) -> i32 {
        self.atom_mapping.as_ref().and_then(|m| m.get(&idx)).copied().unwrap_or(0)
    }

    pub fn atom_inversion_at(&self, idx: u32) -> i32 {
        self.atom_inversion.as_ref().and_then(|m| m.get(&idx)).copied().unwrap_or(0)
    }

    pub fn atom_exact_change_at(&self, idx: u32) -> i32 {
        self.atom_exact_change.as_ref().and_then(|m| m.get(&idx)).copied().unwrap_or(0)
    }

    pub fn bond_reacting_center_at(&self, idx: u32) -> i32 {
        self.bond_reacting_center.as_ref().and_then(|m| m.get(&idx)).copied().unwrap_or(0)
    }
}

/// The fixed, always-zero V3000 counts line: real atom/bond counts live in
/// the `M  V30 COUNTS` line inside the CTAB instead.
fn write_v3000_header_counts<W: Write>(out: &mut MolWriter<W>) -> io::Result<()> {
    out.printf_cr(format_args!(
        "{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3}{:>3} V3000",
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ))
}

/// Drives one complete save: header, CTAB (either dialect), and, only when
/// saving a query molecule with at least one declared R-group in V2000
/// mode, the `$MDL`/`$MOL`/`$RGP` envelope that carries R-group fragments
/// outside the main CTAB.
#[derive(Clone, Debug, Default)]
pub struct MolfileSaver {
    pub highlighting: Option<Highlighting>,
    pub reaction: ReactionAnnotations,
    pub mode: DialectMode,
    pub no_chiral: bool,
}

impl MolfileSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SaveOptions) -> Self {
        Self { mode: options.mode, no_chiral: options.no_chiral, ..Default::default() }
    }

    pub fn with_highlighting(mut self, highlighting: Highlighting) -> Self {
        self.highlighting = Some(highlighting);
        self
    }

    pub fn with_reaction(mut self, reaction: ReactionAnnotations) -> Self {
        self.reaction = reaction;
        self
    }

    /// Auto-detect: prefer V2000, fall back to V3000 only when V2000 can't
    /// represent the content. The highlighting check is reproduced exactly
    /// as `num_vertices() + num_vertices()`, not `+ num_edges()`: this quirk
    /// is kept deliberately rather than silently "fixed".
    fn should_use_v2000(&self, mol: &Molecule) -> bool {
        match self.mode {
            DialectMode::V2000 => return true,
            DialectMode::V3000 => return false,
            DialectMode::Auto => {}
        }

        let mut v2000 = true;
        if let Some(h) = &self.highlighting {
            if h.num_vertices() + h.num_vertices() > 0 {
                v2000 = false;
            }
        }
        if !mol.stereocenters.have_all_abs_any() && !mol.stereocenters.have_all_and_any() {
            v2000 = false;
        }
        v2000
    }

    pub fn save_molecule<W: Write>(&self, out: &mut MolWriter<W>, mol: &Molecule) -> io::Result<()> {
        self.save_base_molecule(out, AnyMolecule::Concrete(mol))
    }

    pub fn save_query_molecule<W: Write>(&self, out: &mut MolWriter<W>, mol: &QueryMolecule) -> io::Result<()> {
        self.save_base_molecule(out, AnyMolecule::Query(mol))
    }

    pub fn save_base_molecule<W: Write>(&self, out: &mut MolWriter<W>, any: AnyMolecule) -> io::Result<()> {
        let qmol = any.as_query();
        let v2000 = self.should_use_v2000(any.mol());
        let rg2000 = v2000 && qmol.map(|q| q.rgroups.count() > 0).unwrap_or(false);

        if rg2000 {
            let now = Local::now();
            out.printf_cr(format_args!(
                "$MDL  REV  1 {:02}{:02}{:02}{:02}{:02}",
                now.month(),
                now.day(),
                now.year() % 100,
                now.hour(),
                now.minute(),
            ))?;
            out.write_str_cr("$MOL")?;
            out.write_str_cr("$HDR")?;
        }

        header::write_header(out, any.mol(), any.mol().has_z_coord())?;

        if rg2000 {
            out.write_str_cr("$END HDR")?;
            out.write_str_cr("$CTAB")?;
        }

        let mapping = if v2000 {
            v2000::write_counts_line(out, any.mol(), self.no_chiral)?;
            v2000::write_ctab_2000(out, any, &self.reaction)?
        } else {
            write_v3000_header_counts(out)?;
            v3000::write_ctab_3000(out, any, &self.reaction, self.highlighting.as_ref())?
        };

        if v2000 {
            if let Some(q) = qmol {
                v2000::write_rgroup_indices_2000(out, q, &mapping)?;
            }
            v2000::write_attachment_values_2000(out, any.mol(), &mapping)?;
        }

        if rg2000 {
            let qmol = qmol.expect("rg2000 implies qmol.is_some()");

            for (i, rgroup) in qmol.rgroups.iter_non_empty() {
                out.write_str(&format!(
                    "M  LOG  1 {:>3} {:>3} {:>3}  ",
                    i,
                    rgroup.if_then,
                    if rgroup.rest_h { 1 } else { 0 },
                ))?;
                let occ_text = fmt::format_occurrence_ranges(&rgroup.occurrence);
                for _ in 0..3usize.saturating_sub(occ_text.len()) {
                    out.write_char(' ')?;
                }
                out.write_str(&occ_text)?;
                out.write_cr()?;
            }

            out.write_str_cr("M  END")?;
            out.write_str_cr("$END CTAB")?;

            for (i, rgroup) in qmol.rgroups.iter_non_empty() {
                out.write_str_cr("$RGP")?;
                out.printf_cr(format_args!("{i:>4}"))?;

                for fragment in &rgroup.fragments {
                    out.write_str_cr("$CTAB")?;
                    v2000::write_counts_line(out, &fragment.mol, self.no_chiral)?;
                    let frag_mapping =
                        v2000::write_ctab_2000(out, AnyMolecule::Query(fragment), &ReactionAnnotations::default())?;
                    v2000::write_rgroup_indices_2000(out, fragment, &frag_mapping)?;
                    v2000::write_attachment_values_2000(out, &fragment.mol, &frag_mapping)?;
                    out.write_str_cr("M  END")?;
                    out.write_str_cr("$END CTAB")?;
                }
                out.write_str_cr("$END RGP")?;
            }

            out.write_str_cr("$END MOL")?;
        } else {
            out.write_str_cr("M  END")?;
        }

        Ok(())
    }

    /// Writes a bare V3000 CTAB with no header and no counts-placeholder
    /// line, for callers embedding it in a larger document.
    pub fn save_ctab_3000<W: Write>(&self, out: &mut MolWriter<W>, mol: &Molecule) -> io::Result<()> {
        v3000::write_ctab_3000(out, AnyMolecule::Concrete(mol), &self.reaction, self.highlighting.as_ref())?;
        Ok(())
    }

    pub fn save_query_ctab_3000<W: Write>(&self, out: &mut MolWriter<W>, mol: &QueryMolecule) -> io::Result<()> {
        v3000::write_ctab_3000(out, AnyMolecule::Query(mol), &self.reaction, self.highlighting.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Atom, Bond, BondDirection, RGroup, StereoType};
    use na_seq::Element;

    fn carbon() -> Atom {
        Atom { element: Element::Carbon, ..Default::default() }
    }

    #[test]
    fn plain_molecule_ends_with_m_end() {
        let mut mol = Molecule::new();
        mol.add_atom(carbon());
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            MolfileSaver::new().save_molecule(&mut w, &mol).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.trim_end_matches('\n').ends_with("M  END"));
        assert!(text.contains(" V2000"));
    }

    #[test]
    fn auto_mode_is_deterministic_across_calls() {
        let mut mol = Molecule::new();
        mol.add_atom(carbon());
        mol.add_atom(carbon());
        mol.stereocenters.mark(0, StereoType::Abs, 0);

        let render = || {
            let mut buf = Vec::new();
            let mut w = MolWriter::new(&mut buf);
            MolfileSaver::new().save_molecule(&mut w, &mol).unwrap();
            buf
        };

        let first = render();
        let second = render();
        assert_eq!(first.len(), second.len());
        assert!(String::from_utf8(first).unwrap().contains(" V2000"));
    }

    #[test]
    fn mixed_stereo_groups_force_v3000() {
        let mut mol = Molecule::new();
        mol.add_atom(carbon());
        mol.add_atom(carbon());
        mol.stereocenters.mark(0, StereoType::Or, 1);
        mol.stereocenters.mark(1, StereoType::And, 2);

        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            MolfileSaver::new().save_molecule(&mut w, &mol).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains(" V3000"));
        assert!(text.contains("MDLV30/STEREL1"));
        assert!(text.contains("MDLV30/STERAC2"));
    }

    #[test]
    fn forced_v2000_mode_ignores_autodetect() {
        let mut mol = Molecule::new();
        mol.add_atom(carbon());
        mol.add_atom(carbon());
        mol.stereocenters.mark(0, StereoType::Or, 1);
        mol.stereocenters.mark(1, StereoType::And, 2);

        let saver = MolfileSaver::with_options(SaveOptions { mode: DialectMode::V2000, no_chiral: false });
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            saver.save_molecule(&mut w, &mol).unwrap();
        }
        assert!(String::from_utf8(buf).unwrap().contains(" V2000"));
    }

    #[test]
    fn rgroup_query_molecule_emits_rg_file_envelope() {
        let mut mol = Molecule::new();
        let rsite = mol.add_atom(Atom {
            r_site: Some(crate::RSite { allowed_groups: vec![1], attachment_order: vec![] }),
            ..Default::default()
        });
        mol.add_atom(carbon());
        mol.add_bond(Bond { beg: rsite, end: 1, order: 1, direction: BondDirection::None, cis_trans_ignored: false });

        let mut rgroups = crate::RGroups::default();
        let mut fragment_mol = Molecule::new();
        fragment_mol.add_atom(carbon());
        rgroups.insert(
            1,
            RGroup {
                fragments: vec![QueryMolecule::new(fragment_mol)],
                if_then: 0,
                rest_h: false,
                occurrence: vec![],
            },
        );
        let qmol = QueryMolecule { mol, rgroups, ..Default::default() };

        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            MolfileSaver::new().save_query_molecule(&mut w, &qmol).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("$MDL  REV  1"));
        assert!(text.contains("$MOL\n"));
        assert!(text.contains("$HDR\n"));
        assert!(text.contains("M  LOG  1   1   0   0  "));
        assert!(text.contains("$RGP\n"));
        assert!(text.contains("   1\n"));
        assert!(text.contains("$END RGP\n"));
        assert!(text.trim_end_matches('\n').ends_with("$END MOL"));
    }
}
