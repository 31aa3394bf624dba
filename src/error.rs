use std::fmt;

#[derive(Debug)]
pub enum DiecutError {
    InvalidGeometry(String),
    ContentTooNarrow,
    LabelTooShort,
    LabelTooNarrow,
    FontNotFound(String),
    QrEncode(String),
    Io(std::io::Error),
}

impl fmt::Display for DiecutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiecutError::InvalidGeometry(message) => {
                write!(f, "invalid sheet geometry: {}", message)
            }
            DiecutError::ContentTooNarrow => {
                write!(f, "content width is <= 0 (dead zones / scale)")
            }
            DiecutError::LabelTooShort => {
                write!(f, "label height too small for the QR vertical padding")
            }
            DiecutError::LabelTooNarrow => {
                write!(
                    f,
                    "label too narrow for QR + text (reduce columns, dead zones or gaps)"
                )
            }
            DiecutError::FontNotFound(name) => write!(f, "font not registered: {}", name),
            DiecutError::QrEncode(message) => write!(f, "qr encoding failed: {}", message),
            DiecutError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for DiecutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiecutError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiecutError {
    fn from(value: std::io::Error) -> Self {
        DiecutError::Io(value)
    }
}
