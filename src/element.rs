use std::fmt::Display;

use float_pretty_print::PrettyPrintFloat;

use crate::error::{DomainError, Error, Result};
use crate::formula::{self, Cplx, Formula};

/// Impedance at one sweep point, or the reason it is undefined there
pub type Point = std::result::Result<Cplx, DomainError>;

/// A helper structure describing one parameter of a circuit element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterBase {
    pub letter: &'static str,
    pub unit: &'static str,
    /// Default lower and upper bounds handed to a fitting driver
    pub limits: (f64, f64),
}

pub const RESISTANCE:   ParameterBase = ParameterBase {letter: "R", unit: "Ω", limits: (0.0, f64::INFINITY)};
pub const CAPACITY:     ParameterBase = ParameterBase {letter: "C", unit: "F", limits: (0.0, f64::INFINITY)};
pub const INDUCTANCE:   ParameterBase = ParameterBase {letter: "L", unit: "H", limits: (0.0, f64::INFINITY)};
pub const WARBURG_SIGMA: ParameterBase = ParameterBase {letter: "σ", unit: "Ω·s^-½", limits: (0.0, f64::INFINITY)};
pub const DIFFUSION_TAU: ParameterBase = ParameterBase {letter: "τ", unit: "s", limits: (0.0, f64::INFINITY)};


#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Resistor,
    Capacitor,
    Inductor,
    SemiInfiniteWarburg,
    FiniteLengthWarburg,
    FiniteSpaceWarburg,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::Resistor,
        ElementKind::Capacitor,
        ElementKind::Inductor,
        ElementKind::SemiInfiniteWarburg,
        ElementKind::FiniteLengthWarburg,
        ElementKind::FiniteSpaceWarburg,
    ];

    /// The parameters of this kind, in the order its formula reads them
    pub fn paramlist(self) -> &'static [ParameterBase] {
        use ElementKind::*;
        match self {
            Resistor => &[RESISTANCE],
            Capacitor => &[CAPACITY],
            Inductor => &[INDUCTANCE],
            SemiInfiniteWarburg => &[WARBURG_SIGMA],
            FiniteLengthWarburg | FiniteSpaceWarburg => &[RESISTANCE, DIFFUSION_TAU],
        }
    }

    pub fn arity(self) -> usize {
        self.paramlist().len()
    }

    pub fn formula(self) -> Formula {
        use ElementKind::*;
        match self {
            Resistor => formula::z_resistor,
            Capacitor => formula::z_capacitor,
            Inductor => formula::z_inductor,
            SemiInfiniteWarburg => formula::z_warburg,
            FiniteLengthWarburg => formula::z_finite_length,
            FiniteSpaceWarburg => formula::z_finite_space,
        }
    }

    /// Name prefix used in circuit representations (`R1`, `Ws2`, ...)
    pub fn symbol(self) -> &'static str {
        use ElementKind::*;
        match self {
            Resistor => "R",
            Capacitor => "C",
            Inductor => "L",
            SemiInfiniteWarburg => "W",
            FiniteLengthWarburg => "Ws",
            FiniteSpaceWarburg => "Wo",
        }
    }

    /// Infer the kind from an element name by its longest matching symbol
    pub fn from_name(name: &str) -> Option<ElementKind> {
        Self::ALL.iter()
            .copied()
            .filter(|k| name.starts_with(k.symbol()))
            .max_by_key(|k| k.symbol().len())
    }

    /// Check that the formula of this kind is defined at `omega`
    pub fn check_omega(self, omega: f64) -> std::result::Result<(), &'static str> {
        use ElementKind::*;
        if !omega.is_finite() {return Err("non-finite frequency");}
        if omega < 0.0 {return Err("negative frequency");}
        match self {
            Resistor | Inductor => Ok(()),
            Capacitor | SemiInfiniteWarburg | FiniteLengthWarburg | FiniteSpaceWarburg => {
                if omega == 0.0 {Err("singular at zero frequency")} else {Ok(())}
            }
        }
    }
}


/// A named circuit element: a kind, its bound formula and its current parameters.
///
/// The parameter vector always has exactly `kind.arity()` entries.
#[derive(Clone)]
pub struct Element {
    name: String,
    kind: ElementKind,
    parameters: Vec<f64>,
    formula: Formula,
}

impl Element {
    /// A new element with all parameters set to zero
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Element {
            name: name.into(),
            kind,
            parameters: vec![0.0; kind.arity()],
            formula: kind.formula(),
        }
    }

    pub fn with_parameters(name: impl Into<String>, kind: ElementKind, parameters: &[f64]) -> Result<Self> {
        let mut out = Self::new(name, kind);
        out.set_parameters(parameters)?;
        Ok(out)
    }

    pub fn name(&self) -> &str {&self.name}
    pub fn kind(&self) -> ElementKind {self.kind}
    pub fn parameters(&self) -> &[f64] {&self.parameters}
    pub fn paramlist(&self) -> &'static [ParameterBase] {self.kind.paramlist()}

    pub fn set_parameters(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.kind.arity() {
            return Err(self.arity_error(values.len()));
        }
        self.parameters.copy_from_slice(values);
        Ok(())
    }

    /// Impedance at a single angular frequency
    pub fn impedance(&self, omega: f64) -> Result<Cplx> {
        self.check_arity()?;
        Ok(self.point(omega)?)
    }

    /// Impedance over a sweep, `out[i]` corresponding to `omegas[i]`.
    ///
    /// Frequencies outside the element's domain are reported per point;
    /// only a malformed parameter vector fails the whole call.
    pub fn evaluate(&self, omegas: &[f64]) -> Result<Vec<Point>> {
        self.check_arity()?;
        Ok(omegas.iter().map(|&w| self.point(w)).collect())
    }

    pub(crate) fn point(&self, omega: f64) -> Point {
        self.kind.check_omega(omega).map_err(|reason| DomainError {
            element: self.name.clone(),
            omega,
            reason,
        })?;
        Ok((self.formula)(&self.parameters, omega))
    }

    fn check_arity(&self) -> Result<()> {
        if self.parameters.len() != self.kind.arity() {
            return Err(self.arity_error(self.parameters.len()));
        }
        Ok(())
    }

    fn arity_error(&self, got: usize) -> Error {
        Error::InvalidParameterCount {
            target: format!("{:?} {}", self.kind, self.name),
            expected: self.kind.arity(),
            got,
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.name)?;
        for (i, (p, v)) in self.paramlist().iter().zip(&self.parameters).enumerate() {
            let sep = if i == 0 {" "} else {", "};
            write!(f, "{}{}={} {}", sep, p.letter, PrettyPrintFloat(*v), p.unit)?;
        }
        Ok(())
    }
}
