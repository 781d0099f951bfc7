//! Regression refinement of nest weights from ancillary covariates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use genstar_core::{GenstarError, Result};

/// Pivots below this magnitude mark a covariate as redundant.
const PIVOT_EPSILON: f64 = 1e-12;

/// Shared flag requesting that a running refinement stops.
///
/// # Example
///
/// ```
/// use genstar_generator::spatial::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Cooperative interruption: a cancellation token, a deadline, or both.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Interrupt {
    /// Never triggers.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Triggers once `limit` has elapsed from now.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn is_triggered(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Result of the refinement step.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RefinementOutcome {
    /// No ancillary file was declared.
    #[default]
    NotRequested,
    /// Fitted coefficients, intercept first.
    Fitted { coefficients: Vec<f64> },
    /// Fitting was interrupted; placement ran without refinement.
    Interrupted,
}

/// Fits a linear model of targets against covariates.
pub trait RegressionMapper {
    /// `covariates` holds one row per observation; an intercept is added.
    ///
    /// Returns [`RefinementOutcome::Interrupted`] when `interrupt` triggers
    /// during the fit.
    fn fit(
        &self,
        covariates: &[Vec<f64>],
        targets: &[f64],
        interrupt: &Interrupt,
    ) -> Result<RefinementOutcome>;
}

/// Ordinary least squares through the normal equations.
///
/// Covariates that are linear combinations of others get a zero coefficient.
#[derive(Debug, Clone, Copy, Default)]
pub struct OlsRegression;

impl OlsRegression {
    pub fn new() -> Self {
        Self
    }
}

impl RegressionMapper for OlsRegression {
    fn fit(
        &self,
        covariates: &[Vec<f64>],
        targets: &[f64],
        interrupt: &Interrupt,
    ) -> Result<RefinementOutcome> {
        if covariates.is_empty() {
            return Err(GenstarError::Regression("no observation to fit".to_string()));
        }
        if covariates.len() != targets.len() {
            return Err(GenstarError::Regression(format!(
                "{} covariate rows for {} targets",
                covariates.len(),
                targets.len()
            )));
        }
        let width = covariates[0].len();
        if covariates.iter().any(|row| row.len() != width) {
            return Err(GenstarError::Regression(
                "covariate rows differ in length".to_string(),
            ));
        }

        // Augmented normal equations [X'X | X'y] with an intercept column.
        let p = width + 1;
        let mut system = vec![vec![0.0; p + 1]; p];
        for (row, &y) in covariates.iter().zip(targets) {
            if interrupt.is_triggered() {
                return Ok(RefinementOutcome::Interrupted);
            }
            let x: Vec<f64> = std::iter::once(1.0).chain(row.iter().copied()).collect();
            for i in 0..p {
                for j in 0..p {
                    system[i][j] += x[i] * x[j];
                }
                system[i][p] += x[i] * y;
            }
        }

        match solve(&mut system, interrupt) {
            Some(coefficients) => Ok(RefinementOutcome::Fitted { coefficients }),
            None => Ok(RefinementOutcome::Interrupted),
        }
    }
}

/// Gauss-Jordan elimination with partial pivoting on an augmented system.
/// Free columns get a zero coefficient. `None` when interrupted.
fn solve(system: &mut [Vec<f64>], interrupt: &Interrupt) -> Option<Vec<f64>> {
    let p = system.len();
    let mut pivots = Vec::with_capacity(p);
    let mut row = 0;
    for col in 0..p {
        if interrupt.is_triggered() {
            return None;
        }
        let Some(best) =
            (row..p).max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
        else {
            break;
        };
        if system[best][col].abs() < PIVOT_EPSILON {
            continue;
        }
        system.swap(row, best);
        let pivot = system[row][col];
        for v in system[row].iter_mut() {
            *v /= pivot;
        }
        for other in 0..p {
            if other != row {
                let factor = system[other][col];
                if factor != 0.0 {
                    for k in 0..=p {
                        let value = system[row][k];
                        system[other][k] -= factor * value;
                    }
                }
            }
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut coefficients = vec![0.0; p];
    for (row, col) in pivots {
        coefficients[col] = system[row][p];
    }
    Some(coefficients)
}

/// Evaluates fitted coefficients (intercept first) on a covariate row.
pub fn predict(coefficients: &[f64], covariates: &[f64]) -> f64 {
    coefficients.first().copied().unwrap_or(0.0)
        + coefficients
            .iter()
            .skip(1)
            .zip(covariates)
            .map(|(b, x)| b * x)
            .sum::<f64>()
}
