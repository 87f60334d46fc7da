//! Closed-form impedances of the equivalent-circuit elements.
//!
//! Every function takes the angular frequency `w` in rad/s and returns the
//! complex impedance in Ohms. The caller is responsible for keeping `w`
//! inside the element's domain (see [`crate::element::ElementKind::check_omega`]);
//! here a zero frequency simply produces an infinite or NaN value.

pub type Cplx = num::complex::Complex<f64>;

const I: Cplx = Cplx{ re: 0.0, im: 1.0 };

/// Above this real part `tanh` is 1 to machine precision, while the
/// textbook sinh/cosh quotient overflows to NaN.
const TANH_SATURATION: f64 = 20.0;

/// The uniform shape every element formula is stored under:
/// the parameter slice in [`crate::element::ElementKind::paramlist`] order, and `w`.
pub type Formula = fn(&[f64], f64) -> Cplx;


/// Z = R
pub fn resistance(r: f64, _w: f64) -> Cplx {
    Cplx::new(r, 0.0)
}

/// Z = 1/(jCw)
pub fn capacitance(c: f64, w: f64) -> Cplx {
    Cplx::new(0.0, -1.0 / (c * w))
}

/// Z = jLw
pub fn inductance(l: f64, w: f64) -> Cplx {
    Cplx::new(0.0, l * w)
}

/// Semi-infinite Warburg, Z = sigma/sqrt(w) * (1-j).
/// `sigma` is the pseudo-resistance in Ohm.s^(-1/2).
pub fn warburg(sigma: f64, w: f64) -> Cplx {
    let k = sigma / w.sqrt();
    Cplx::new(k, -k)
}

/// Finite length (transmissive) Warburg, Z = R tanh(sqrt(j tau w)) / sqrt(j tau w)
pub fn finite_length_warburg(r: f64, tau: f64, w: f64) -> Cplx {
    let s = (I * tau * w).sqrt();
    r * tanh(s) / s
}

/// Finite space (reflective) Warburg, Z = R coth(sqrt(j tau w)) / sqrt(j tau w)
pub fn finite_space_warburg(r: f64, tau: f64, w: f64) -> Cplx {
    let s = (I * tau * w).sqrt();
    r / (tanh(s) * s)
}

/// Principal complex tanh, saturated for large real parts.
fn tanh(z: Cplx) -> Cplx {
    if z.re.abs() > TANH_SATURATION {
        return Cplx::new(z.re.signum(), 0.0);
    }
    z.tanh()
}


// Slice adapters bound into `Element`s. The arity is checked by the element
// before the call, so indexing here cannot go out of bounds.

pub(crate) fn z_resistor(p: &[f64], w: f64) -> Cplx {resistance(p[0], w)}
pub(crate) fn z_capacitor(p: &[f64], w: f64) -> Cplx {capacitance(p[0], w)}
pub(crate) fn z_inductor(p: &[f64], w: f64) -> Cplx {inductance(p[0], w)}
pub(crate) fn z_warburg(p: &[f64], w: f64) -> Cplx {warburg(p[0], w)}
pub(crate) fn z_finite_length(p: &[f64], w: f64) -> Cplx {finite_length_warburg(p[0], p[1], w)}
pub(crate) fn z_finite_space(p: &[f64], w: f64) -> Cplx {finite_space_warburg(p[0], p[1], w)}


/// Batch form of a formula: `Z[i]` is the impedance at `omegas[i]`.
pub fn sweep(formula: Formula, params: &[f64], omegas: &[f64]) -> Vec<Cplx> {
    omegas.iter().map(|&w| formula(params, w)).collect()
}
