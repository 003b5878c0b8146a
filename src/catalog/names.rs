//! Name codec: classifies a system name and packs it into a 64-bit id.
//!
//! The overwhelming majority of names follow the procedural grammar
//! `"<Region> <AA><BB>-<C> <mass><N1>-<N2>"` and encode fully into the id
//! with no stored text. Names with a plain numeric suffix pack the suffix.
//! Everything else is a catalogued name whose literal string is registered
//! keyed by the system address.

use std::borrow::Cow;

pub const NO_SECTOR_NAME: &str = "NoSectorName";

/// Known star-survey catalog prefixes, matched case-insensitively against
/// the first token of a non-procedural name.
const SURVEY_PREFIXES: [&str; 20] = [
    "2MASS", "HD", "LTT", "TYC", "NGC", "HR", "LFT", "LHS", "LP", "Wolf", "IHA2007", "USNO-A2.0",
    "2547", "DBP2006", "NOMAD1", "OJV2009", "PSR", "SSTGLMC", "StKM", "UGCS",
];

fn is_survey_prefix(token: &str) -> bool {
    SURVEY_PREFIXES.iter().any(|p| p.eq_ignore_ascii_case(token))
}

/// How a system name was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCode {
    /// Fully self-describing procedural name, no stored text.
    Procedural(u64),
    /// Numeric-suffix name; the suffix and its shape are packed, the prefix
    /// becomes the sector name.
    NumericSuffix(u64),
    /// Catalogued name; the id references the literal registered under the
    /// system address.
    Catalogued(i64),
}

impl NameCode {
    /// The raw 64-bit value persisted in the `nameid` column.
    pub fn raw(self) -> i64 {
        match self {
            NameCode::Procedural(v) | NameCode::NumericSuffix(v) => v as i64,
            NameCode::Catalogued(address) => address,
        }
    }
}

/// Result of encoding one display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedName<'a> {
    pub code: NameCode,
    /// Candidate sector name, combined with the grid cell to resolve the
    /// owning sector.
    pub sector_name: Cow<'a, str>,
    /// Literal to register under the system address, for catalogued names.
    pub literal: Option<String>,
}

/// Numeric fields of a matched procedural name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProceduralParts {
    /// 0-based letters of the `<AA><BB>-<C>` block, in grammar order.
    pub l1: u8,
    pub l2: u8,
    pub l3: u8,
    /// 0-based mass code (`a`..`h`).
    pub mass_code: u8,
    pub n1: u64,
    pub n2: u64,
}

/// Right-to-left scan of the procedural grammar. Returns the region text and
/// the matched numeric fields.
fn split_procedural(name: &str) -> Option<(&str, ProceduralParts)> {
    let b = name.as_bytes();
    // Shortest possible suffix is " AB-C d0", leaving at least one region byte.
    let mut i = b.len().checked_sub(1)?;
    if i < 9 || !b[i].is_ascii_digit() {
        return None;
    }

    let mut n2: u64 = 0;
    let mut mult: u64 = 1;
    while i > 8 && b[i].is_ascii_digit() {
        let digit = (b[i] - b'0') as u64;
        n2 = digit.checked_mul(mult).and_then(|v| v.checked_add(n2))?;
        mult = mult.checked_mul(10)?;
        i -= 1;
    }

    let mut n1: u64 = 0;
    if b[i] == b'-' {
        i -= 1;
        let before = i;
        mult = 1;
        while i > 8 && b[i].is_ascii_digit() {
            let digit = (b[i] - b'0') as u64;
            n1 = digit.checked_mul(mult).and_then(|v| v.checked_add(n1))?;
            mult = mult.checked_mul(10)?;
            i -= 1;
        }
        if i == before {
            return None;
        }
    }

    // The packed layout gives n2 16 bits and n1 8 bits; anything larger is
    // not a grammar match and would not survive a round trip.
    if n2 > 0xffff || n1 > 0xff {
        return None;
    }

    if !(b'a'..=b'h').contains(&b[i]) {
        return None;
    }
    let mass_code = b[i] - b'a';
    i -= 1;
    if b[i] != b' ' {
        return None;
    }
    i -= 1;
    if !b[i].is_ascii_uppercase() {
        return None;
    }
    let l3 = b[i] - b'A';
    i -= 1;
    if b[i] != b'-' {
        return None;
    }
    i -= 1;
    if !b[i].is_ascii_uppercase() {
        return None;
    }
    let l2 = b[i] - b'A';
    i -= 1;
    if !b[i].is_ascii_uppercase() {
        return None;
    }
    let l1 = b[i] - b'A';
    i -= 1;
    if b[i] != b' ' {
        return None;
    }

    Some((
        &name[..i],
        ProceduralParts {
            l1,
            l2,
            l3,
            mass_code,
            n1,
            n2,
        },
    ))
}

pub fn pack_procedural(parts: &ProceduralParts) -> u64 {
    parts.n2
        | (parts.n1 << 16)
        | ((parts.mass_code as u64) << 24)
        | (((parts.l3 as u64) + 1) << 28)
        | (((parts.l2 as u64) + 1) << 33)
        | (((parts.l1 as u64) + 1) << 38)
        | (1 << 47)
}

/// Inverse of [`pack_procedural`]. `None` when the tag bit is absent.
pub fn unpack_procedural(code: u64) -> Option<ProceduralParts> {
    if code & (1 << 47) == 0 {
        return None;
    }
    Some(ProceduralParts {
        n2: code & 0xffff,
        n1: (code >> 16) & 0xff,
        mass_code: ((code >> 24) & 0xf) as u8,
        l3: (((code >> 28) & 0x1f) as u8).wrapping_sub(1),
        l2: (((code >> 33) & 0x1f) as u8).wrapping_sub(1),
        l1: (((code >> 38) & 0x1f) as u8).wrapping_sub(1),
    })
}

/// Packed form of a trailing decimal suffix: the value plus enough shape
/// (dash position, digit count) to reproduce the original token.
fn pack_numeric_suffix(token: &str) -> Option<u64> {
    let dash_pos = token.find('-');
    let digits: Cow<str> = if dash_pos.is_some() && token.matches('-').count() == 1 {
        Cow::Owned(token.replace('-', ""))
    } else {
        Cow::Borrowed(token)
    };

    let value: u64 = digits.parse().ok()?;
    if value >= 1 << 38 {
        return None;
    }

    let dash_slot = dash_pos.map_or(0, |p| p as u64 + 1);
    Some(value | (1 << 46) | (dash_slot << 38) | ((digits.len() as u64) << 42))
}

/// Classify `name` and produce its code, sector-name candidate, and (for
/// catalogued names) the literal to register under `address`.
pub fn encode_name<'a>(name: &'a str, address: i64) -> CodedName<'a> {
    if let Some((region, parts)) = split_procedural(name) {
        return CodedName {
            code: NameCode::Procedural(pack_procedural(&parts)),
            sector_name: Cow::Borrowed(region),
            literal: None,
        };
    }

    let tokens: Vec<&str> = name.split(' ').collect();

    if tokens.len() >= 2 {
        // Survey names are checked before the numeric-suffix form: most
        // survey designations end in a number, and they must keep their
        // literal text rather than dissolve into a packed suffix.
        if is_survey_prefix(tokens[0]) {
            return CodedName {
                code: NameCode::Catalogued(address),
                sector_name: Cow::Borrowed(tokens[0]),
                literal: Some(tokens[1..].join(" ")),
            };
        }

        if let Some(packed) = pack_numeric_suffix(tokens[tokens.len() - 1]) {
            return CodedName {
                code: NameCode::NumericSuffix(packed),
                sector_name: Cow::Owned(tokens[..tokens.len() - 1].join(" ")),
                literal: None,
            };
        }
    }

    CodedName {
        code: NameCode::Catalogued(address),
        sector_name: Cow::Borrowed(NO_SECTOR_NAME),
        literal: Some(name.to_string()),
    }
}
