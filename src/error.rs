use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, FitErr>;

/// Configuration failures detected while building a parameter record or a model.
///
/// Every variant is fatal: no partially constructed value escapes the
/// constructor that produced the error.
#[derive(Debug)]
pub enum FitErr {
    /// The weight and center matrices do not share a shape.
    ShapeMismatch {
        a: &'static str,
        b: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    /// There is not exactly one bandwidth per basis center.
    WidthCountMismatch { got: usize, expected: usize },
    /// The decay vector is neither a scalar nor one entry per state dimension.
    DecayLengthMismatch { got: usize, dims: usize },
    /// A parameter that must be strictly positive is zero, negative or NaN.
    NonPositive { what: &'static str },
    /// The training window cannot hold a single transition.
    WindowTooSmall { got: usize },
}

impl Display for FitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitErr::ShapeMismatch {
                a,
                b,
                got,
                expected,
            } => format!(
                "There's a shape mismatch between {a} and {b}, got {got:?} and expected {expected:?}"
            ),
            FitErr::WidthCountMismatch { got, expected } => format!(
                "The bandwidth vector has {got} entries but there are {expected} basis centers"
            ),
            FitErr::DecayLengthMismatch { got, dims } => format!(
                "The decay vector has {got} entries, expected 1 or one per state dimension ({dims})"
            ),
            FitErr::NonPositive { what } => {
                format!("All entries of {what} must be strictly positive")
            }
            FitErr::WindowTooSmall { got } => {
                format!("The training window must hold at least one transition, got size {got}")
            }
        };

        write!(f, "{s}")
    }
}

impl Error for FitErr {}
