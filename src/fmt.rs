//! Formatting helpers shared by both CTAB writers: the V3000
//! line-continuation wrapper, the atom-label special cases, the
//! occurrence-range formatter, and the attachment-point order check.

use std::io::{self, Write};

use na_seq::Element;

use crate::AttachmentNeighbor;
use crate::rgroup::Occurrence;
use crate::sink::MolWriter;

/// `M  V30 ` payload column budget.
const V3000_LINE_LIMIT: usize = 70;

/// Emits one logical V3000 record as one or more physical lines, each
/// prefixed with `M  V30 `. Payloads over 70 characters are split into
/// 70-character chunks, every non-terminal chunk suffixed with `-` before
/// its line terminator.
pub fn write_multiline<W: Write>(out: &mut MolWriter<W>, payload: &str) -> io::Result<()> {
    let bytes = payload.as_bytes();
    let mut offset = 0;

    loop {
        out.write_str("M  V30 ")?;
        let remaining = bytes.len() - offset;

        if remaining <= V3000_LINE_LIMIT {
            out.write_str(&payload[offset..])?;
            out.write_cr()?;
            return Ok(());
        }

        out.write_str(&payload[offset..offset + V3000_LINE_LIMIT])?;
        out.write_str_cr("-")?;
        offset += V3000_LINE_LIMIT;
    }
}

/// `D`/`T` for hydrogen isotopes 2/3. Returns `None` for every other
/// element/isotope combination, in which case the caller falls through to
/// the plain element-symbol path.
pub fn hydrogen_isotope_label(element: Element, isotope: u32) -> Option<&'static str> {
    if element != Element::Hydrogen {
        return None;
    }
    match isotope {
        2 => Some("D"),
        3 => Some("T"),
        _ => None,
    }
}

/// Writes the plain element symbol via the `na_seq::Element` table, before
/// the D/T and query-atom special cases the callers in `v2000.rs`/
/// `v3000.rs` layer on top.
pub fn element_label(element: Element) -> String {
    element.to_letter()
}

/// Renders a packed-range sequence, comma-space separated in list order:
/// - `low == high` -> `"N"`
/// - `high == 0xFFFF` -> `">N-1"`
/// - `low == 0` -> `"<N+1"`
/// - otherwise -> `"low-high"`
pub fn format_occurrence_ranges(occurrences: &[Occurrence]) -> String {
    let mut out = String::new();

    for (i, occ) in occurrences.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }

        if occ.high == 0xFFFF {
            out.push_str(&format!(">{}", occ.low as i32 - 1));
        } else if occ.low == occ.high {
            out.push_str(&occ.low.to_string());
        } else if occ.low == 0 {
            out.push_str(&format!("<{}", occ.high as i32 + 1));
        } else {
            out.push_str(&format!("{}-{}", occ.low, occ.high));
        }
    }

    out
}

/// True if the R-site's attachment neighbors are strictly ascending by
/// output ordinal, or if any neighbor is still undefined: an undefined slot
/// counts as ok, since there's nothing to reorder yet.
pub fn attachment_order_ok(order: &[AttachmentNeighbor]) -> bool {
    for pair in order.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        match (cur, next) {
            (Some(c), Some(n)) => {
                if c > n {
                    return false;
                }
            }
            _ => return true,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MolWriter;

    #[test]
    fn short_payload_is_one_line() {
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_multiline(&mut w, "1 C 0.0 0.0 0.0 0").unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "M  V30 1 C 0.0 0.0 0.0 0\n");
    }

    #[test]
    fn long_payload_wraps_with_continuation() {
        let payload = "x".repeat(140);
        let mut buf = Vec::new();
        {
            let mut w = MolWriter::new(&mut buf);
            write_multiline(&mut w, &payload).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("M  V30 "));
        assert!(lines[0].ends_with('-'));
        assert_eq!(&lines[0]["M  V30 ".len()..lines[0].len() - 1], &payload[..70]);
        assert_eq!(&lines[1]["M  V30 ".len()..], &payload[70..]);
    }

    #[test]
    fn occurrence_ranges_all_cases() {
        let occs = vec![
            Occurrence::exact(3),
            Occurrence::at_least(5),
            Occurrence::at_most(4),
            Occurrence::range(2, 3),
        ];
        assert_eq!(format_occurrence_ranges(&occs), "3, >4, <5, 2-3");
    }

    #[test]
    fn attachment_order_undefined_is_ok() {
        assert!(attachment_order_ok(&[Some(3), None, Some(1)]));
    }

    #[test]
    fn attachment_order_descending_is_not_ok() {
        assert!(!attachment_order_ok(&[Some(7), Some(3)]));
    }

    #[test]
    fn attachment_order_ascending_is_ok() {
        assert!(attachment_order_ok(&[Some(3), Some(7)]));
    }
}
