use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Capture,
    Detector,
    Notify,
    Store,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Capture => write!(f, "capture"),
            ErrorKind::Detector => write!(f, "detector"),
            ErrorKind::Notify => write!(f, "notify"),
            ErrorKind::Store => write!(f, "store"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}

pub struct ErrorInner {
    pub kind: ErrorKind,
    pub source: Option<BoxError>,
    pub message: Option<String>,
}

pub struct Error {
    pub inner: Box<ErrorInner>,
}

impl Error {
    pub fn new<E>(kind: ErrorKind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                source: source.map(Into::into),
                message: None,
            }),
        }
    }

    pub fn with_message<E>(kind: ErrorKind, message: String, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                source: source.map(Into::into),
                message: Some(message),
            }),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Capture)
    }

    pub fn is_store(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Store)
    }

    pub fn is_timeout(&self) -> bool {
        if let Some(source) = &self.inner.source {
            source.to_string().to_lowercase().contains("timeout")
        } else {
            false
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("lens_vigil::Error");
        f.field("kind", &self.inner.kind);
        if let Some(ref message) = self.inner.message {
            f.field("message", message);
        }
        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref message) = self.inner.message {
            write!(f, "{} error: {}", self.inner.kind, message)?;
        } else {
            write!(f, "{} error", self.inner.kind)?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|e| &**e as &(dyn StdError + 'static))
    }
}

impl From<CaptureError> for Error {
    fn from(err: CaptureError) -> Self {
        Error::new(ErrorKind::Capture, Some(err))
    }
}

impl From<DetectorError> for Error {
    fn from(err: DetectorError) -> Self {
        Error::new(ErrorKind::Detector, Some(err))
    }
}

impl From<NotifyError> for Error {
    fn from(err: NotifyError) -> Self {
        Error::new(ErrorKind::Notify, Some(err))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::new(ErrorKind::Store, Some(err))
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("device unavailable")]
    DeviceUnavailable,
    #[error("read failed")]
    ReadFailed(#[source] BoxError),
    #[error("device closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("empty frame ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("channel not configured")]
    NotConfigured,
    #[error("send timeout after {0:?}")]
    Timeout(Duration),
    #[error("delivery failed")]
    DeliveryFailed(#[source] BoxError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("encode failed")]
    Encode(#[source] BoxError),
    #[error("append failed")]
    AppendFailed(#[source] BoxError),
    #[error("fetch failed")]
    FetchFailed(#[source] BoxError),
}
