use thiserror::Error;

use crate::geometry::Rect;

/// Failures of a localization call.
///
/// An empty detection is never an error: the search stages treat it as a
/// negative signal. Only malformed inputs and detector failures end up here.
#[derive(Debug, Error)]
pub enum LocalizeError {
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("base region {base} does not fit inside the {width}x{height} image")]
    RegionTooLarge { base: Rect, width: u32, height: u32 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("face detector failed")]
    Oracle(#[source] anyhow::Error),
}

impl LocalizeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, LocalizeError>;
