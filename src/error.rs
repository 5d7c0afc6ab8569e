use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Geometry error: {0}")]
    GeometryError(String),

    #[error("PAGE XML error: {0}")]
    XmlError(String),
}

/// Generates factory methods for [`PrepError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PrepError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an input error.
    input => InputError,
    /// Create an output error.
    output => OutputError,
    /// Create a geometry error.
    geometry => GeometryError,
    /// Create a PAGE XML error.
    xml => XmlError,
}

impl PrepError {
    /// Configuration errors abort the whole run; everything else is scoped to
    /// the sample or document that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

impl From<quick_xml::Error> for PrepError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlError(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for PrepError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlError(e.to_string())
    }
}

impl From<serde_yml::Error> for PrepError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<glob::PatternError> for PrepError {
    fn from(e: glob::PatternError) -> Self {
        Self::ConfigError(format!("invalid glob pattern: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
