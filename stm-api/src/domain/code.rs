use serde::Serialize;
use strum_macros::{Display, EnumString};

/// The closed set of entry codes.
///
/// Each code carries its own classification rules, applied in
/// [`classifier::classify`](super::classifier::classify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Code {
    /// Internal department work, always booked on the fixed area label.
    Adi,
    /// Customer work, requires a known customer.
    Akn,
    /// Break, never billed.
    X,
}

impl TryFrom<String> for Code {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
