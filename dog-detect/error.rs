#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    InvalidImageSize { level: usize, width: usize, height: usize },
    InvalidImageData { level: usize, expected_len: usize, actual_len: usize },
    TooFewLevels { levels: usize, min: usize },
    InvalidScalesPerOctave(usize),
    PyramidMismatch { gaussian_levels: usize, required: usize },
    LevelSizeMismatch { level: usize, expected: (usize, usize), actual: (usize, usize) },
    InvalidConfig(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidImageSize { level, width, height } => {
                write!(f, "Invalid image dimensions at level {}: {}x{} (must be > 0)", level, width, height)
            }
            DetectError::InvalidImageData { level, expected_len, actual_len } => {
                write!(f, "Image data length mismatch at level {}: expected {}, got {}", level, expected_len, actual_len)
            }
            DetectError::TooFewLevels { levels, min } => {
                write!(f, "DoG pyramid has {} levels (minimum {})", levels, min)
            }
            DetectError::InvalidScalesPerOctave(n) => {
                write!(f, "Invalid scales per octave: {}", n)
            }
            DetectError::PyramidMismatch { gaussian_levels, required } => {
                write!(f, "Gaussian pyramid has {} levels, DoG pyramid requires {}", gaussian_levels, required)
            }
            DetectError::LevelSizeMismatch { level, expected, actual } => {
                write!(
                    f,
                    "Level {} cannot be aligned: expected {}x{}, got {}x{}",
                    level, expected.0, expected.1, actual.0, actual.1
                )
            }
            DetectError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for DetectError {}

pub type DetectResult<T> = Result<T, DetectError>;
