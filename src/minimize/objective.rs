use crate::minimize::{Bracket, Brent, MinimizerError};
use dyn_clone::DynClone;
use ndarray::prelude::*;

/// Outcome of one line search along a fixed direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchResult {
    /// Step length `t` that (approximately) minimises `f(x + t·d)`.
    pub alpha: f64,
    /// Function value at `x + alpha·d`.
    pub f_new: f64,
    pub evaluations: usize,
}

// Define a trait for the objective function
pub trait ObjFn: DynClone {
    /// Number of variables the function expects.
    fn dimension(&self) -> usize;

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError>;

    fn check_dimension(&self, x: &Array1<f64>) -> Result<(), MinimizerError> {
        check_dimension(self.dimension(), x.len())
    }
}
dyn_clone::clone_trait_object!(ObjFn);

// Define a trait for the gradient function
pub trait ObjGradFn: ObjFn + DynClone {
    fn grad(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError>;

    /// Approximately minimises `t -> f(x + t·d)` for `t >= 0`.
    ///
    /// `f_x` is the already known value `f(x)`. The default brackets the
    /// minimum starting with a step of `start_distance` and refines it with
    /// Brent's method down to `tol`.
    fn minimize_along_direction(
        &self,
        x: &Array1<f64>,
        direction: &Array1<f64>,
        f_x: f64,
        tol: f64,
        start_distance: f64,
    ) -> Result<LineSearchResult, MinimizerError> {
        self.check_dimension(x)?;
        self.check_dimension(direction)?;

        let mut line = F1dim::new(self, x, direction);
        let bracket = Bracket::new(&mut line).find_bracket(0.0, f_x, start_distance)?;
        let brent = Brent::new(&mut line).minimize_bracket(&bracket, tol)?;

        Ok(LineSearchResult {
            alpha: brent.xmin,
            f_new: brent.fmin,
            evaluations: bracket.fn_evals + brent.fn_evals,
        })
    }
}
dyn_clone::clone_trait_object!(ObjGradFn);

// Define a trait for functions of a single variable
pub trait ScalarFn {
    fn call_scalar(&mut self, t: f64) -> Result<f64, MinimizerError>;
}

impl<S> ScalarFn for &mut S
where
    S: ScalarFn + ?Sized,
{
    fn call_scalar(&mut self, t: f64) -> Result<f64, MinimizerError> {
        (**self).call_scalar(t)
    }
}

pub(crate) fn check_dimension(expected: usize, found: usize) -> Result<(), MinimizerError> {
    if expected != found {
        return Err(MinimizerError::DimensionMismatch { expected, found });
    }
    Ok(())
}

// Wrapper for single-dimensional functions
#[derive(Clone)]
pub struct SingleDimFn<F>(pub F)
where
    F: FnMut(f64) -> f64;

// Convenience constructors
impl<F> SingleDimFn<F>
where
    F: FnMut(f64) -> f64,
{
    pub fn new(f: F) -> Self {
        SingleDimFn(f)
    }
}

impl<F> ScalarFn for SingleDimFn<F>
where
    F: FnMut(f64) -> f64,
{
    fn call_scalar(&mut self, t: f64) -> Result<f64, MinimizerError> {
        Ok((self.0)(t))
    }
}

// Wrapper for multi-dimensional functions
#[derive(Clone)]
pub struct MultiDimFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    f: F,
    n: usize,
}

// Convenience constructors
impl<F> MultiDimFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    pub fn new(f: F, n: usize) -> Self {
        MultiDimFn { f, n }
    }
}

impl<F> ObjFn for MultiDimFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    fn dimension(&self) -> usize {
        self.n
    }

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError> {
        self.check_dimension(x)?;
        Ok((self.f)(x))
    }
}

// Wrapper for multi-dimensional function w/gradient
#[derive(Clone)]
pub struct MultiDimGradFn<F, GF>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
    GF: Fn(&Array1<f64>) -> Array1<f64> + Clone,
{
    f: F,
    gf: GF,
    n: usize,
}

// Convenience constructors
impl<F, GF> MultiDimGradFn<F, GF>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
    GF: Fn(&Array1<f64>) -> Array1<f64> + Clone,
{
    pub fn new(f: F, gf: GF, n: usize) -> Self {
        MultiDimGradFn { f, gf, n }
    }
}

impl<F, GF> ObjFn for MultiDimGradFn<F, GF>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
    GF: Fn(&Array1<f64>) -> Array1<f64> + Clone,
{
    fn dimension(&self) -> usize {
        self.n
    }

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError> {
        self.check_dimension(x)?;
        Ok((self.f)(x))
    }
}

impl<F, GF> ObjGradFn for MultiDimGradFn<F, GF>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
    GF: Fn(&Array1<f64>) -> Array1<f64> + Clone,
{
    fn grad(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError> {
        self.check_dimension(x)?;
        let g = (self.gf)(x);
        if g.len() != self.n {
            return Err(MinimizerError::evaluation(format!(
                "gradient has length {}, expected {}",
                g.len(),
                self.n
            )));
        }
        Ok(g)
    }
}

// Wrapper for multi-dimensional function w/numerical gradient
#[derive(Clone)]
pub struct MultiDimNumGradFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    f: F,
    step: f64,
    n: usize,
}

impl<F> MultiDimNumGradFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    /// Wraps `f` with a forward-difference gradient using the fixed `step`.
    pub fn new(f: F, n: usize, step: f64) -> Result<Self, MinimizerError> {
        if step == 0.0 || !step.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "finite difference step must be non-zero and finite, got {}",
                step
            )));
        }
        Ok(Self { f, step, n })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn numerical_gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError> {
        self.check_dimension(x)?;
        let f_x = (self.f)(x);
        let mut x_plus_h = x.clone();
        let mut grad: Array1<f64> = Array1::zeros(self.n);

        for i in 0..self.n {
            x_plus_h[i] += self.step;
            grad[i] = ((self.f)(&x_plus_h) - f_x) / self.step;
            x_plus_h[i] = x[i];
            if !grad[i].is_finite() {
                return Err(MinimizerError::evaluation(format!(
                    "forward difference in coordinate {} is {}",
                    i, grad[i]
                )));
            }
        }

        Ok(grad)
    }
}

impl<F> ObjFn for MultiDimNumGradFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    fn dimension(&self) -> usize {
        self.n
    }

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError> {
        self.check_dimension(x)?;
        Ok((self.f)(x))
    }
}

impl<F> ObjGradFn for MultiDimNumGradFn<F>
where
    F: Fn(&Array1<f64>) -> f64 + Clone,
{
    fn grad(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError> {
        self.numerical_gradient(x)
    }
}

/// Negates a function so that minimising it maximises the wrapped one.
#[derive(Clone)]
pub struct Negated<F>(pub F);

impl<F> Negated<F> {
    pub fn new(f: F) -> Self {
        Negated(f)
    }

    pub fn inner(&self) -> &F {
        &self.0
    }
}

impl<F> ObjFn for Negated<F>
where
    F: ObjFn + Clone,
{
    fn dimension(&self) -> usize {
        self.0.dimension()
    }

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError> {
        Ok(-self.0.call(x)?)
    }
}

impl<F> ObjGradFn for Negated<F>
where
    F: ObjGradFn + Clone,
{
    fn grad(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError> {
        Ok(-self.0.grad(x)?)
    }
}

/// Restriction of a multivariate function to the line `x + t·d`.
///
/// The evaluation point is kept in a scratch buffer that is allocated on
/// first use and overwritten in place afterwards.
pub struct F1dim<'a, F>
where
    F: ObjFn + ?Sized,
{
    f: &'a F,
    point: &'a Array1<f64>,
    direction: &'a Array1<f64>,
    scratch: Option<Array1<f64>>,
}

impl<'a, F> F1dim<'a, F>
where
    F: ObjFn + ?Sized,
{
    pub fn new(f: &'a F, point: &'a Array1<f64>, direction: &'a Array1<f64>) -> Self {
        F1dim {
            f,
            point,
            direction,
            scratch: None,
        }
    }

    pub fn point(&self) -> &Array1<f64> {
        self.point
    }

    pub fn direction(&self) -> &Array1<f64> {
        self.direction
    }
}

impl<F> ScalarFn for F1dim<'_, F>
where
    F: ObjFn + ?Sized,
{
    fn call_scalar(&mut self, t: f64) -> Result<f64, MinimizerError> {
        if self.point.len() != self.direction.len() {
            return Err(MinimizerError::DimensionMismatch {
                expected: self.point.len(),
                found: self.direction.len(),
            }
            .into_evaluation());
        }
        let point = self.point;
        let scratch = self.scratch.get_or_insert_with(|| point.clone());
        scratch.assign(point);
        scratch.scaled_add(t, self.direction);
        self.f.call(scratch).map_err(MinimizerError::into_evaluation)
    }
}
