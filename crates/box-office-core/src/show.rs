use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Number of characters in a show id
pub const SHOW_ID_LEN: usize = 6;

/// Identifier of a show, e.g. `NSY103`
///
/// Always exactly [`SHOW_ID_LEN`] printable, non-space ASCII characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShowId([u8; SHOW_ID_LEN]);

impl ShowId {
    /// Validate `id` and turn it into a [`ShowId`]
    pub fn new(id: &str) -> Result<Self, Error> {
        let bytes: [u8; SHOW_ID_LEN] = id
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidShowId(id.into()))?;
        if !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(Error::InvalidShowId(id.into()));
        }
        Ok(Self(bytes))
    }

    /// The id as string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        // only ASCII gets past `new()`
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The raw id bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8; SHOW_ID_LEN] {
        &self.0
    }
}

impl FromStr for ShowId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq<str> for ShowId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShowId({})", self.as_str())
    }
}
