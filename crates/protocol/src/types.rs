use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Compression applied to each chunk before text encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Raw bytes are encoded as-is.
    #[default]
    None,
    /// Each chunk is zlib-framed deflate.
    Deflate,
}

impl Compression {
    /// Picks the tag for a transfer's compression flag.
    pub fn from_flag(compress: bool) -> Self {
        if compress {
            Self::Deflate
        } else {
            Self::None
        }
    }

    /// Wire value of the `compression` property.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Deflate => "deflate",
        }
    }

    pub fn is_compressed(self) -> bool {
        self == Self::Deflate
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ProtocolError;

    /// Parses the property value case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "deflate" => Ok(Self::Deflate),
            _ => Err(ProtocolError::UnknownCompression(s.to_string())),
        }
    }
}
