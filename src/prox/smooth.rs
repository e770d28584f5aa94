/// Separable smooth convex function \\(f(y) = \sum_i \phi(y_i)\\) for Newton-based operators.
pub trait SmoothFunction
{
    /// Function value; `f64::INFINITY` outside of the domain.
    fn eval(&self, y: &[f64]) -> f64;

    /// Gradient.
    fn gradf(&self, y: &[f64]) -> Vec<f64>;

    /// Diagonal of the Hessian.
    fn hessf(&self, y: &[f64]) -> Vec<f64>;

    /// Moves `y` into the interior of the domain.
    fn proj_feasible(&self, _y: &mut [f64])
    {
    }

    /// Whether the domain is the whole space.
    fn full_domain(&self) -> bool
    {
        true
    }
}

const FEASIBLE_FLOOR: f64 = 1e-6;

fn sum_by<M>(y: &[f64], map: M) -> f64
where M: Fn(f64) -> f64
{
    y.iter().map(|v| map(*v)).sum()
}

fn floor(y: &mut [f64])
{
    for v in y.iter_mut() {
        *v = v.max(FEASIBLE_FLOOR);
    }
}

//

/// \\(\sum_i 1/y_i\\) on \\(y > 0\\)
pub struct InvPos;

impl SmoothFunction for InvPos
{
    fn eval(&self, y: &[f64]) -> f64
    {
        sum_by(y, |v| if v > 0. {1. / v} else {f64::INFINITY})
    }

    fn gradf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| -1. / (v * v)).collect()
    }

    fn hessf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| 2. / (v * v * v)).collect()
    }

    fn proj_feasible(&self, y: &mut [f64])
    {
        floor(y);
    }

    fn full_domain(&self) -> bool
    {
        false
    }
}

/// \\(-\sum_i \log y_i\\) on \\(y > 0\\)
pub struct NegLog;

impl SmoothFunction for NegLog
{
    fn eval(&self, y: &[f64]) -> f64
    {
        sum_by(y, |v| if v > 0. {-v.ln()} else {f64::INFINITY})
    }

    fn gradf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| -1. / v).collect()
    }

    fn hessf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| 1. / (v * v)).collect()
    }

    fn proj_feasible(&self, y: &mut [f64])
    {
        floor(y);
    }

    fn full_domain(&self) -> bool
    {
        false
    }
}

/// \\(\sum_i e^{y_i}\\)
pub struct Exp;

impl SmoothFunction for Exp
{
    fn eval(&self, y: &[f64]) -> f64
    {
        sum_by(y, f64::exp)
    }

    fn gradf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| v.exp()).collect()
    }

    fn hessf(&self, y: &[f64]) -> Vec<f64>
    {
        self.gradf(y)
    }
}

/// \\(\sum_i \log(1 + e^{y_i})\\)
pub struct Logistic;

impl SmoothFunction for Logistic
{
    fn eval(&self, y: &[f64]) -> f64
    {
        // log(1 + e^v) without overflow
        sum_by(y, |v| v.max(0.) + (-v.abs()).exp().ln_1p())
    }

    fn gradf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| sigmoid(*v)).collect()
    }

    fn hessf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| {
            let s = sigmoid(*v);
            s * (1. - s)
        }).collect()
    }
}

fn sigmoid(v: f64) -> f64
{
    if v >= 0. {
        1. / (1. + (-v).exp())
    }
    else {
        let e = v.exp();
        e / (1. + e)
    }
}

/// \\(\sum_i y_i^2\\)
pub struct SumSquare;

impl SmoothFunction for SumSquare
{
    fn eval(&self, y: &[f64]) -> f64
    {
        sum_by(y, |v| v * v)
    }

    fn gradf(&self, y: &[f64]) -> Vec<f64>
    {
        y.iter().map(|v| 2. * v).collect()
    }

    fn hessf(&self, y: &[f64]) -> Vec<f64>
    {
        vec![2.; y.len()]
    }
}

//

#[test]
fn test_smooth_derivatives()
{
    let fs: Vec<Box<dyn SmoothFunction>> = vec![
        Box::new(InvPos), Box::new(NegLog), Box::new(Exp), Box::new(Logistic), Box::new(SumSquare),
    ];
    let y = [0.7, 1.3];
    let h = 1e-6;

    for f in fs.iter() {
        let g = f.gradf(&y);
        let hs = f.hessf(&y);
        for i in 0.. y.len() {
            let mut yp = y;
            let mut ym = y;
            yp[i] += h;
            ym[i] -= h;
            let gd = (f.eval(&yp) - f.eval(&ym)) / (2. * h);
            assert!((gd - g[i]).abs() < 1e-5, "{} vs {}", gd, g[i]);
            let hd = (f.gradf(&yp)[i] - f.gradf(&ym)[i]) / (2. * h);
            assert!((hd - hs[i]).abs() < 1e-5, "{} vs {}", hd, hs[i]);
        }
    }

    let mut z = [-1., 2.];
    InvPos.proj_feasible(&mut z);
    assert_eq!(z, [FEASIBLE_FLOOR, 2.]);
}
