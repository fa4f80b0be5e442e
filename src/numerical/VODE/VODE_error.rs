use crate::numerical::burn::eos_type::EosError;
use crate::somelinalg::jacobian_storage::LinearSolveError;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Fatal outcomes of an integration. Recoverable events (a corrector that does not
/// converge, a single failed error test, a singular Newton matrix) never surface here,
/// the step controller retries them.
#[derive(Debug, Clone, PartialEq)]
pub enum VodeError {
    IllegalInput(&'static str),
    /// `max_steps` taken before reaching `tout`
    TooMuchWork { t: f64, steps: usize },
    /// the requested tolerances are below machine precision for the current solution
    TooMuchAccuracy { t: f64, tolsf: f64 },
    /// a component of the error weight vector became non-positive
    ZeroErrorWeight { t: f64, component: usize },
    RepeatedErrorTestFailures { t: f64, h: f64 },
    RepeatedConvergenceFailures { t: f64, h: f64 },
    /// corrector failures in which the last Newton matrix could not be factored
    SingularMatrix { t: f64, h: f64, cause: LinearSolveError },
    Eos(EosError),
}

impl fmt::Display for VodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VodeError::IllegalInput(msg) => write!(f, "illegal input: {}", msg),
            VodeError::TooMuchWork { t, steps } => {
                write!(f, "at t = {:e} maximum number of steps ({}) taken before tout", t, steps)
            }
            VodeError::TooMuchAccuracy { t, tolsf } => write!(
                f,
                "at t = {:e} too much accuracy requested, tolerances should be scaled up by {:e}",
                t, tolsf
            ),
            VodeError::ZeroErrorWeight { t, component } => write!(
                f,
                "at t = {:e} error weight of component {} became non-positive",
                t, component
            ),
            VodeError::RepeatedErrorTestFailures { t, h } => write!(
                f,
                "at t = {:e}, h = {:e} error test failed repeatedly or with |h| = hmin",
                t, h
            ),
            VodeError::RepeatedConvergenceFailures { t, h } => write!(
                f,
                "at t = {:e}, h = {:e} corrector convergence failed repeatedly or with |h| = hmin",
                t, h
            ),
            VodeError::SingularMatrix { t, h, cause } => write!(
                f,
                "at t = {:e}, h = {:e} Newton matrix could not be factored: {}",
                t, h, cause
            ),
            VodeError::Eos(e) => write!(f, "equation of state failed: {}", e),
        }
    }
}

impl std::error::Error for VodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VodeError::Eos(e) => Some(e),
            VodeError::SingularMatrix { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<EosError> for VodeError {
    fn from(e: EosError) -> Self {
        VodeError::Eos(e)
    }
}

/// Integer-like status of a finished integration, the way burner callers record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum VodeStatus {
    Success,
    IllegalInput,
    TooMuchWork,
    TooMuchAccuracy,
    ZeroErrorWeight,
    ErrorTestFailures,
    ConvergenceFailures,
    SingularMatrix,
    EosFailure,
}

impl VodeStatus {
    pub fn from_result<T>(result: &Result<T, VodeError>) -> Self {
        match result {
            Ok(_) => VodeStatus::Success,
            Err(VodeError::IllegalInput(_)) => VodeStatus::IllegalInput,
            Err(VodeError::TooMuchWork { .. }) => VodeStatus::TooMuchWork,
            Err(VodeError::TooMuchAccuracy { .. }) => VodeStatus::TooMuchAccuracy,
            Err(VodeError::ZeroErrorWeight { .. }) => VodeStatus::ZeroErrorWeight,
            Err(VodeError::RepeatedErrorTestFailures { .. }) => VodeStatus::ErrorTestFailures,
            Err(VodeError::RepeatedConvergenceFailures { .. }) => VodeStatus::ConvergenceFailures,
            Err(VodeError::SingularMatrix { .. }) => VodeStatus::SingularMatrix,
            Err(VodeError::Eos(_)) => VodeStatus::EosFailure,
        }
    }

    /// DVODE-style ISTATE code
    pub fn istate(&self) -> i32 {
        match self {
            VodeStatus::Success => 2,
            VodeStatus::TooMuchWork => -1,
            VodeStatus::TooMuchAccuracy => -2,
            VodeStatus::IllegalInput => -3,
            VodeStatus::ErrorTestFailures => -4,
            VodeStatus::ConvergenceFailures | VodeStatus::SingularMatrix => -5,
            VodeStatus::ZeroErrorWeight => -6,
            VodeStatus::EosFailure => -8,
        }
    }
}
