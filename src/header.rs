//! The three-line Molfile header.

use std::io::{self, Write};

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::Molecule;
use crate::sink::MolWriter;

/// Builds the fixed origin-stamp line: two leading spaces, the format's
/// standard program token, then `MMDDYYHHMM`, then `2D`/`3D`. The
/// `-INDIGO-` token is the wire format's own field, not this crate's
/// naming. Readers of this dialect key off its fixed width, so it's
/// reproduced literally rather than genericized.
pub fn format_stamp(when: DateTime<Local>, is_3d: bool) -> String {
    format!(
        "  -INDIGO-{:02}{:02}{:02}{:02}{:02}{}",
        when.month(),
        when.day(),
        when.year() % 100,
        when.hour(),
        when.minute(),
        if is_3d { "3D" } else { "2D" },
    )
}

/// Writes the three header lines for `mol`: name (or blank), origin stamp,
/// blank. `is_3d` should be `mol.has_z_coord()`; the dispatcher passes it
/// through rather than this module re-deriving it, since the dispatcher
/// already has the molecule in hand for dialect selection.
pub fn write_header<W: Write>(out: &mut MolWriter<W>, mol: &Molecule, is_3d: bool) -> io::Result<()> {
    out.write_str_cr(mol.name.as_deref().unwrap_or(""))?;
    out.write_str_cr(&format_stamp(Local::now(), is_3d))?;
    out.write_cr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamp_matches_fixed_width_layout() {
        let when = Local.with_ymd_and_hms(2026, 7, 27, 9, 5, 0).unwrap();
        assert_eq!(format_stamp(when, false), "  -INDIGO-07272609052D");
    }

    #[test]
    fn stamp_pads_single_digit_fields() {
        let when = Local.with_ymd_and_hms(2005, 1, 2, 3, 4, 0).unwrap();
        assert_eq!(format_stamp(when, true), "  -INDIGO-01020503043D");
    }

    #[test]
    fn header_emits_three_cr_terminated_lines() {
        let mut mol = Molecule::new();
        mol.name = Some("ethanol".to_string());
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_header(&mut w, &mol, false).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0], "ethanol");
        assert!(lines[1].starts_with("  -INDIGO-"));
        assert_eq!(lines[2], "");
    }
}
