//! The five S-group kinds: superatoms, data S-groups, repeating units,
//! multiple groups, and generics. All carry atom/bond lists and bracket
//! coordinate pairs, so that common payload is factored into `SGroupBase`
//! and each kind adds only what's specific to it.

use lin_alg::f64::Vec3;

#[derive(Clone, Debug, Default)]
pub struct SGroupBase {
    pub atoms: Vec<u32>,
    pub bonds: Vec<u32>,
    /// Each bracket is a pair of corner coordinates, emitted as `M  SDI`.
    pub brackets: Vec<(Vec3, Vec3)>,
}

#[derive(Clone, Debug, Default)]
pub struct Superatom {
    pub base: SGroupBase,
    pub subscript: String,
    /// The optional bond-vector annotation: the bond index plus its
    /// display direction.
    pub bond: Option<(u32, (f64, f64))>,
}

#[derive(Clone, Debug, Default)]
pub struct DataSGroup {
    pub base: SGroupBase,
    pub description: String,
    pub data: String,
    pub display_pos: (f64, f64),
    pub attached: bool,
    pub relative: bool,
    pub display_units: bool,
    pub dasp_pos: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    HeadToHead,
    HeadToTail,
    EitherUnknown,
}

#[derive(Clone, Debug)]
pub struct RepeatingUnit {
    pub base: SGroupBase,
    pub connectivity: Connectivity,
}

#[derive(Clone, Debug, Default)]
pub struct MultipleGroup {
    pub base: SGroupBase,
    pub parent_atoms: Vec<u32>,
    pub multiplier: u32,
}

#[derive(Clone, Debug, Default)]
pub struct GenericSGroup {
    pub base: SGroupBase,
}
