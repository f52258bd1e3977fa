//! Canonical reference tables for the 8 information-processing functions,
//! the 16 candidate type codes, and the seat prototypes that map every
//! function to a position inside each type.
//!
//! | Seat pair                  | Block    | Reading                         |
//! |----------------------------|----------|---------------------------------|
//! | base / creative            | Core     | Primary engines                 |
//! | role / vulnerable          | Critic   | Pain points                     |
//! | suggestive / mobilizing    | Hidden   | Growth edges                    |
//! | ignoring / demonstrative   | Instinct | Background talents              |
//!
//! These tables are static reference data (not session-scoped). A deployment
//! may override the prototype table through configuration; the fallback here
//! is the shipped model.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the 8 information-processing functions scored from Likert items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Func {
    Ti,
    Te,
    Fi,
    Fe,
    Ni,
    Ne,
    Si,
    Se,
}

/// All functions in canonical order. Iteration order everywhere in the engine.
pub const FUNCS: [Func; 8] = [
    Func::Ti,
    Func::Te,
    Func::Fi,
    Func::Fe,
    Func::Ni,
    Func::Ne,
    Func::Si,
    Func::Se,
];

impl Func {
    pub fn as_str(&self) -> &'static str {
        match self {
            Func::Ti => "Ti",
            Func::Te => "Te",
            Func::Fi => "Fi",
            Func::Fe => "Fe",
            Func::Ni => "Ni",
            Func::Ne => "Ne",
            Func::Si => "Si",
            Func::Se => "Se",
        }
    }

    /// Parse a function code. Accepts the exact two-letter form only.
    pub fn parse(s: &str) -> Option<Func> {
        FUNCS.iter().copied().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the 16 candidate type classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeCode {
    Lie,
    Ili,
    Ese,
    Sei,
    Lii,
    Ile,
    Esi,
    See,
    Lse,
    Sli,
    Eie,
    Iei,
    Lsi,
    Sle,
    Eii,
    Iee,
}

/// All 16 candidates in canonical order.
pub const TYPE_CODES: [TypeCode; 16] = [
    TypeCode::Lie,
    TypeCode::Ili,
    TypeCode::Ese,
    TypeCode::Sei,
    TypeCode::Lii,
    TypeCode::Ile,
    TypeCode::Esi,
    TypeCode::See,
    TypeCode::Lse,
    TypeCode::Sli,
    TypeCode::Eie,
    TypeCode::Iei,
    TypeCode::Lsi,
    TypeCode::Sle,
    TypeCode::Eii,
    TypeCode::Iee,
];

impl TypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCode::Lie => "LIE",
            TypeCode::Ili => "ILI",
            TypeCode::Ese => "ESE",
            TypeCode::Sei => "SEI",
            TypeCode::Lii => "LII",
            TypeCode::Ile => "ILE",
            TypeCode::Esi => "ESI",
            TypeCode::See => "SEE",
            TypeCode::Lse => "LSE",
            TypeCode::Sli => "SLI",
            TypeCode::Eie => "EIE",
            TypeCode::Iei => "IEI",
            TypeCode::Lsi => "LSI",
            TypeCode::Sle => "SLE",
            TypeCode::Eii => "EII",
            TypeCode::Iee => "IEE",
        }
    }

    /// Parse a three-letter type code (case-sensitive).
    pub fn parse(s: &str) -> Option<TypeCode> {
        TYPE_CODES.iter().copied().find(|c| c.as_str() == s)
    }

    /// The function sitting in the base seat of this type's prototype.
    pub fn base_func(&self) -> Func {
        seat_of(*self, Seat::Base)
    }

    /// The function sitting in the creative seat of this type's prototype.
    pub fn creative_func(&self) -> Func {
        seat_of(*self, Seat::Creative)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position a function occupies inside a type prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Base,
    Creative,
    Role,
    Vulnerable,
    Mobilizing,
    Suggestive,
    Ignoring,
    Demonstrative,
}

impl Seat {
    /// Ego seats: the pair a well-fitting profile expresses at 3D/4D.
    #[inline]
    pub fn is_ego(&self) -> bool {
        matches!(self, Seat::Base | Seat::Creative)
    }

    /// Seats in direct opposition to the type's expected expression.
    #[inline]
    pub fn is_opposition(&self) -> bool {
        matches!(self, Seat::Vulnerable | Seat::Ignoring)
    }

    /// The behavioral block this seat belongs to.
    pub fn block(&self) -> BlockKind {
        match self {
            Seat::Base | Seat::Creative => BlockKind::Core,
            Seat::Role | Seat::Vulnerable => BlockKind::Critic,
            Seat::Suggestive | Seat::Mobilizing => BlockKind::Hidden,
            Seat::Ignoring | Seat::Demonstrative => BlockKind::Instinct,
        }
    }
}

/// One of the four behavioral blocks a composition is reported over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Core,
    Critic,
    Hidden,
    Instinct,
}

/// All four blocks in reporting order.
pub const BLOCK_KINDS: [BlockKind; 4] = [
    BlockKind::Core,
    BlockKind::Critic,
    BlockKind::Hidden,
    BlockKind::Instinct,
];

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Core => "Core",
            BlockKind::Critic => "Critic",
            BlockKind::Hidden => "Hidden",
            BlockKind::Instinct => "Instinct",
        }
    }
}

/// A full seat assignment for one type: every function mapped to its seat.
pub type SeatMap = BTreeMap<Func, Seat>;

fn seat_row(
    code: TypeCode,
    base: Func,
    creative: Func,
    role: Func,
    vulnerable: Func,
    mobilizing: Func,
    suggestive: Func,
    ignoring: Func,
    demonstrative: Func,
) -> (TypeCode, SeatMap) {
    let mut m = SeatMap::new();
    m.insert(base, Seat::Base);
    m.insert(creative, Seat::Creative);
    m.insert(role, Seat::Role);
    m.insert(vulnerable, Seat::Vulnerable);
    m.insert(mobilizing, Seat::Mobilizing);
    m.insert(suggestive, Seat::Suggestive);
    m.insert(ignoring, Seat::Ignoring);
    m.insert(demonstrative, Seat::Demonstrative);
    (code, m)
}

/// Shipped seat prototypes for all 16 types.
pub static TYPE_PROTOTYPES: Lazy<BTreeMap<TypeCode, SeatMap>> = Lazy::new(|| {
    use Func::*;
    use TypeCode::*;
    BTreeMap::from([
        seat_row(Lie, Te, Ni, Se, Fi, Ti, Ne, Si, Fe),
        seat_row(Ili, Ni, Te, Fi, Se, Ne, Ti, Fe, Si),
        seat_row(Ese, Fe, Si, Ne, Ti, Fi, Ni, Te, Se),
        seat_row(Sei, Si, Fe, Ti, Ne, Ni, Fi, Se, Te),
        seat_row(Lii, Ti, Ne, Ni, Fe, Te, Si, Fi, Se),
        seat_row(Ile, Ne, Ti, Fe, Ni, Si, Te, Se, Fi),
        seat_row(Esi, Fi, Se, Ni, Te, Fe, Ne, Ti, Si),
        seat_row(See, Se, Fi, Te, Ni, Ne, Fe, Si, Ti),
        seat_row(Lse, Te, Si, Se, Fi, Ti, Ne, Ni, Fe),
        seat_row(Sli, Si, Te, Fi, Se, Ni, Ti, Fe, Ne),
        seat_row(Eie, Fe, Ni, Ne, Ti, Fi, Si, Te, Se),
        seat_row(Iei, Ni, Fe, Ti, Ne, Si, Fi, Se, Te),
        seat_row(Lsi, Ti, Se, Ni, Fe, Te, Ne, Fi, Si),
        seat_row(Sle, Se, Ti, Fe, Ni, Ne, Te, Si, Fi),
        seat_row(Eii, Fi, Ne, Ni, Te, Fe, Si, Se, Ti),
        seat_row(Iee, Ne, Fi, Te, Ni, Si, Fe, Se, Ti),
    ])
});

/// Seat map for one type from the shipped prototype table.
pub fn prototype(code: TypeCode) -> &'static SeatMap {
    &TYPE_PROTOTYPES[&code]
}

fn seat_of(code: TypeCode, seat: Seat) -> Func {
    prototype(code)
        .iter()
        .find(|(_, s)| **s == seat)
        .map(|(f, _)| *f)
        .expect("prototype table covers every seat")
}
