use std::error;
use std::fmt;

/// Convenient result type for relay operations using [`RelayError`] as the error type.
pub type RelayResult<T> = Result<T, RelayError>;

/// Main error type of the relay.
///
/// A [`RelayError`] is either a single classified error, optionally carrying a dynamic
/// detail, or an aggregate of many errors. It is [`Clone`] so that it can travel inside
/// per-document results through every stage of the pipeline.
#[derive(Debug, Clone)]
pub struct RelayError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<RelayError>),
}

/// Classification of relay errors.
///
/// The kind tells the pipeline which recovery path applies: decode errors are tracked and
/// dropped, enrichment and primary publish errors demote a document to the fallback tier,
/// and fallback publish errors are fatal for the invocation.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Decoding
    DecodeFailed,

    // Enrichment
    EnrichmentFailed,
    CacheReadFailed,
    CacheWriteFailed,
    TokenizerRequestFailed,
    TokenizerResponseRejected,
    TokenizerResponseMalformed,
    ContentNotFound,
    ContentFetchFailed,

    // Publishing
    FormatFailed,
    PrimaryPublishFailed,
    PrimaryPublishZeroAck,
    PrimaryRecordRejected,
    FallbackPublishFailed,

    // Bulk import
    SourceReadFailed,

    // IO & Serialization
    IoError,
    SerializationError,
    DeserializationError,

    // Configuration
    ConfigError,

    // Unknown / Uncategorized
    Unknown,

    // Used by tests that inject failures through failpoints.
    #[cfg(feature = "failpoints")]
    InjectedFailure,
}

impl RelayError {
    /// Creates a [`RelayError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<RelayError>) -> RelayError {
        RelayError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detail of this error, or of the first aggregated error having one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }

    /// Returns the number of leaf errors contained in this error.
    pub fn len(&self) -> usize {
        match self.repr {
            ErrorRepr::Many(ref errors) => errors.iter().map(|err| err.len()).sum(),
            _ => 1,
        }
    }

    /// Returns `true` if this is an aggregate without any error in it.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for RelayError {
    fn eq(&self, other: &RelayError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => errors_a == errors_b,
            _ => false,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => write!(f, "{kind:?}: {desc}"),
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                write!(f, "{kind:?}: {desc} -> {detail}")
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")
                } else if errors.len() == 1 {
                    errors[0].fmt(f)
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }

                    Ok(())
                }
            }
        }
    }
}

impl error::Error for RelayError {}

impl From<(ErrorKind, &'static str)> for RelayError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> RelayError {
        RelayError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for RelayError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> RelayError {
        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl<E> From<Vec<E>> for RelayError
where
    E: Into<RelayError>,
{
    fn from(errors: Vec<E>) -> RelayError {
        RelayError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> RelayError {
        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Maps syntax, data and eof failures to [`ErrorKind::DeserializationError`] and io failures
/// to [`ErrorKind::IoError`].
impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> RelayError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Transport level failures of the tokenizer client. Status codes are handled by the
/// client itself since they carry a response body.
impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> RelayError {
        let (kind, description) = if err.is_decode() {
            (
                ErrorKind::TokenizerResponseMalformed,
                "Tokenizer response could not be decoded",
            )
        } else if err.is_timeout() {
            (ErrorKind::TokenizerRequestFailed, "Tokenizer request timed out")
        } else {
            (ErrorKind::TokenizerRequestFailed, "Tokenizer request failed")
        };

        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Database failures only happen on the durable fallback path.
impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> RelayError {
        let description = match &err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                "Fallback queue connection unavailable"
            }
            _ => "Fallback queue operation failed",
        };

        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::FallbackPublishFailed,
                description,
                err.to_string(),
            ),
        }
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for RelayError {
    fn from(err: rdkafka::error::KafkaError) -> RelayError {
        RelayError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::PrimaryPublishFailed,
                "Kafka operation failed",
                err.to_string(),
            ),
        }
    }
}
