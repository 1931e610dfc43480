//! HTTP status classification.
//!
//! A status code is routed by its hundreds digit. [`series`] is the raw
//! digit, [`StatusClass`] the named form used by the dispatcher.

/// Coarse category of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// 1xx.
    Informational,
    /// 2xx.
    Successful,
    /// 3xx.
    Redirection,
    /// 4xx.
    ClientError,
    /// 5xx.
    ServerError,
}

/// Hundreds digit of a status code (`code / 100`).
#[must_use]
pub const fn series(code: u16) -> u16 {
    code / 100
}

impl StatusClass {
    /// Classify a status code, `None` when it falls outside `100..=599`.
    #[must_use]
    pub const fn from_status(code: u16) -> Option<Self> {
        match series(code) {
            1 => Some(Self::Informational),
            2 => Some(Self::Successful),
            3 => Some(Self::Redirection),
            4 => Some(Self::ClientError),
            5 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// The hundreds digit this class stands for.
    #[must_use]
    pub const fn series(self) -> u16 {
        match self {
            Self::Informational => 1,
            Self::Successful => 2,
            Self::Redirection => 3,
            Self::ClientError => 4,
            Self::ServerError => 5,
        }
    }

    /// Returns `true` for 4xx and 5xx.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::ClientError | Self::ServerError)
    }
}
