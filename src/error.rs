//! Error types for the render session

use thiserror::Error;

/// Result type for renderer and catalog operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can end (or degrade) a render session
#[derive(Error, Debug)]
pub enum RenderError {
    /// No usable graphics backend, or adapter/device acquisition failed
    #[error("graphics backend unavailable: {0}")]
    UnsupportedPlatform(String),

    /// A backend exists but the output surface cannot be rendered to
    #[error("render context unavailable: {0}")]
    ContextUnavailable(String),

    /// A catalog asset could not be read, or its stream failed mid-transfer
    #[error("failed to load {asset}: {reason}")]
    DataFetch { asset: String, reason: String },

    /// Catalog contents are malformed (bad JSON, misaligned binary)
    #[error("invalid catalog data in {asset}: {reason}")]
    Catalog { asset: String, reason: String },
}

impl RenderError {
    pub fn data_fetch(asset: impl Into<String>, reason: impl ToString) -> Self {
        Self::DataFetch {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    pub fn catalog(asset: impl Into<String>, reason: impl ToString) -> Self {
        Self::Catalog {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    /// Message shown to the user in the fatal error state.
    ///
    /// None of these are retried: without the capability or the data there is
    /// nothing a second attempt could do differently.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedPlatform(_) => {
                "This system has no usable GPU backend (Vulkan, Metal, DirectX 12 or OpenGL), \
                 so the night sky cannot be drawn."
                    .to_string()
            }
            Self::ContextUnavailable(_) => {
                "The window's drawing surface could not be prepared for rendering.".to_string()
            }
            Self::DataFetch { asset, .. } => {
                format!("The star data ({asset}) could not be loaded. Check the data directory.")
            }
            Self::Catalog { asset, .. } => {
                format!("The star data ({asset}) is damaged or in an unexpected format.")
            }
        }
    }
}
