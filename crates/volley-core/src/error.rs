//! Error types for the Volley spike generator.
//!
//! Startup and resume failures are fatal for the core that hits them:
//! the platform traps the processor rather than running with a partial
//! configuration. Everything that can be tolerated at runtime (unknown
//! rate-update targets, fabric congestion, a busy record writer) is not
//! an error and never surfaces here.

use std::error::Error;
use std::fmt;

/// Errors decoding the shared-memory image at load or resume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The image does not start with the expected magic word.
    BadMagic {
        /// The word found where the magic was expected.
        found: u32,
    },
    /// The image format major version is not understood.
    UnsupportedVersion {
        /// Major version found in the header.
        major: u16,
        /// Minor version found in the header.
        minor: u16,
    },
    /// A region directory entry points outside the image.
    RegionOutOfBounds {
        /// Region index in directory order.
        region: usize,
        /// Declared offset of the region.
        offset: usize,
        /// Declared length of the region.
        len: usize,
        /// Total image length.
        image_len: usize,
    },
    /// A region is too short for the structure being decoded from it.
    Truncated {
        /// What was being decoded.
        what: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        got: usize,
    },
    /// A source record carries a regime tag that is neither fast nor slow.
    UnknownRegimeTag {
        /// Index of the offending record.
        index: usize,
        /// The tag word found.
        tag: u32,
    },
    /// The parameter block declares zero sources.
    NoSources,
    /// The host changed the source count between pause and resume.
    ///
    /// The table is re-read into its existing allocation on resume, so
    /// the count is fixed for the lifetime of the core.
    SourceCountChanged {
        /// Count the table was allocated for.
        was: u32,
        /// Count found in the re-read parameter block.
        now: u32,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { found } => {
                write!(f, "bad magic word {found:#010x}")
            }
            Self::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported image version {major}.{minor}")
            }
            Self::RegionOutOfBounds {
                region,
                offset,
                len,
                image_len,
            } => write!(
                f,
                "region {region} [{offset}, +{len}) outside image of {image_len} bytes"
            ),
            Self::Truncated { what, needed, got } => {
                write!(f, "{what} truncated: need {needed} bytes, have {got}")
            }
            Self::UnknownRegimeTag { index, tag } => {
                write!(f, "source record {index} has unknown regime tag {tag}")
            }
            Self::NoSources => write!(f, "parameter block declares zero sources"),
            Self::SourceCountChanged { was, now } => {
                write!(f, "source count changed across resume: {was} -> {now}")
            }
        }
    }
}

impl Error for LoadError {}

/// Errors writing state back to the shared-memory image at pause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The destination region cannot hold the encoded structure.
    RegionTooSmall {
        /// What was being stored.
        what: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        got: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionTooSmall { what, needed, got } => {
                write!(f, "{what} needs {needed} bytes, region has {got}")
            }
        }
    }
}

impl Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_messages_name_the_failure() {
        let e = LoadError::BadMagic { found: 0xDEAD_BEEF };
        assert!(e.to_string().contains("0xdeadbeef"));

        let e = LoadError::Truncated {
            what: "parameter block",
            needed: 68,
            got: 12,
        };
        assert!(e.to_string().contains("parameter block"));
        assert!(e.to_string().contains("68"));
    }

    #[test]
    fn store_error_reports_sizes() {
        let e = StoreError::RegionTooSmall {
            what: "source table",
            needed: 280,
            got: 64,
        };
        assert!(e.to_string().contains("280"));
        assert!(e.to_string().contains("64"));
    }
}
