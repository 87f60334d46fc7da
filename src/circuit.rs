use std::fmt::Display;

use rayon::prelude::*;

use crate::element::{Element, ElementKind, ParameterBase, Point};
use crate::error::{Error, Result};
use crate::formula::Cplx;
use crate::repr::{self, Leaf, Topology};
use crate::sweep::SweepConfig;

const ZERO: Cplx = Cplx{ re: 0.0, im: 0.0 };


/// A named network of elements wired together by a representation string.
///
/// Every name in the representation resolves to exactly one element of the
/// registry. The registry may also hold spare elements that are not wired
/// in (yet); they are kept for `set_representation` but never evaluated.
///
/// ## Example:
/// ```
/// use electrox::Circuit;
///
/// let mut randles = Circuit::new("randles", "R0 + (R1 + W1) | C1").unwrap();
/// randles.set_parameters(&[20.0, 100.0, 50.0, 1e-6]).unwrap();
///
/// let z = randles.impedance(1000.0).unwrap();
/// assert!(z.re > 20.0 && z.im < 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    representation: String,
    elements: Vec<Element>,
    /// Leaves are indices into `elements`
    topology: Topology<usize>,
}

impl Circuit {
    /// Build a circuit from its representation alone, one element per name.
    /// The element kind is inferred from the name prefix (see [`ElementKind::from_name`]),
    /// all parameters start at zero.
    pub fn new(name: impl Into<String>, representation: impl Into<String>) -> Result<Self> {
        let representation = representation.into();
        let tree = repr::parse(&representation)?;

        let elements = tree.leaves().into_iter().map(|leaf| {
            ElementKind::from_name(&leaf.name)
                .map(|kind| Element::new(leaf.name.clone(), kind))
                .ok_or_else(|| Error::repr(leaf.position, format!("cannot infer the element kind of '{}'", leaf.name)))
        }).collect::<Result<Vec<_>>>()?;

        Self::assemble(name.into(), representation, elements, &tree)
    }

    /// Build a circuit from explicitly declared elements.
    /// Every name in `representation` must be declared.
    pub fn with_elements(name: impl Into<String>, representation: impl Into<String>, elements: Vec<Element>) -> Result<Self> {
        for (i, e) in elements.iter().enumerate() {
            if !repr::is_name(e.name()) {
                return Err(Error::InvalidName(e.name().to_string()));
            }
            if elements[..i].iter().any(|x| x.name() == e.name()) {
                return Err(Error::DuplicateName(e.name().to_string()));
            }
        }
        let representation = representation.into();
        let tree = repr::parse(&representation)?;
        Self::assemble(name.into(), representation, elements, &tree)
    }

    fn assemble(name: String, representation: String, elements: Vec<Element>, tree: &Topology<Leaf>) -> Result<Self> {
        let topology = bind(tree, &elements)?;
        log::debug!("circuit {}: {} element(s), topology {}", name, elements.len(), tree);
        Ok(Circuit { name, representation, elements, topology })
    }

    pub fn name(&self) -> &str {&self.name}
    pub fn representation(&self) -> &str {&self.representation}
    pub fn elements(&self) -> &[Element] {&self.elements}
    pub fn topology(&self) -> &Topology<usize> {&self.topology}

    pub fn element(&self, name: &str) -> Result<&Element> {
        let idx = self.index_of(name)?;
        Ok(&self.elements[idx])
    }

    pub fn element_mut(&mut self, name: &str) -> Result<&mut Element> {
        let idx = self.index_of(name)?;
        Ok(&mut self.elements[idx])
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.elements.iter()
            .position(|e| e.name() == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Append a spare element; wire it in with [`Circuit::set_representation`]
    pub fn add_element(&mut self, name: impl Into<String>, kind: ElementKind, parameters: &[f64]) -> Result<&mut Element> {
        let name = name.into();
        if !repr::is_name(&name) {
            return Err(Error::InvalidName(name));
        }
        if self.elements.iter().any(|e| e.name() == name) {
            return Err(Error::DuplicateName(name));
        }
        let element = Element::with_parameters(name, kind, parameters)?;
        self.elements.push(element);
        let last = self.elements.len() - 1;
        Ok(&mut self.elements[last])
    }

    /// Remove an element that is not referenced by the representation
    pub fn remove_element(&mut self, name: &str) -> Result<Element> {
        let idx = self.index_of(name)?;

        if self.topology.leaves().contains(&&idx) {
            return Err(Error::InUse(name.to_string()));
        }

        self.topology = self.topology.try_map(&mut |&i| Ok::<_, Error>(if i > idx {i - 1} else {i}))?;
        Ok(self.elements.remove(idx))
    }

    /// Rewire the circuit. On failure the circuit is left unchanged.
    pub fn set_representation(&mut self, representation: impl Into<String>) -> Result<()> {
        let representation = representation.into();
        let tree = repr::parse(&representation)?;
        self.topology = bind(&tree, &self.elements)?;
        self.representation = representation;
        log::debug!("circuit {}: rewired as {}", self.name, tree);
        Ok(())
    }


    /// Total number of parameters over all elements
    pub fn param_count(&self) -> usize {
        self.elements.iter().map(|e| e.kind().arity()).sum()
    }

    /// All parameter values, element after element in registry order
    pub fn parameters(&self) -> Vec<f64> {
        self.elements.iter().flat_map(|e| e.parameters().iter().copied()).collect()
    }

    /// Parameter descriptors matching [`Circuit::parameters`], with their element names
    pub fn paramlist(&self) -> Vec<(&str, ParameterBase)> {
        self.elements.iter()
            .flat_map(|e| e.paramlist().iter().map(move |p| (e.name(), *p)))
            .collect()
    }

    /// Default fitting bounds matching [`Circuit::parameters`]
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.paramlist().into_iter().map(|(_, p)| p.limits).collect()
    }

    /// Replace every parameter at once, in the order of [`Circuit::parameters`]
    pub fn set_parameters(&mut self, values: &[f64]) -> Result<()> {
        let expected = self.param_count();
        if values.len() != expected {
            return Err(Error::InvalidParameterCount {
                target: format!("circuit {}", self.name),
                expected,
                got: values.len(),
            });
        }

        let mut rest = values;
        for e in &mut self.elements {
            let (mine, next) = rest.split_at(e.kind().arity());
            e.set_parameters(mine)?;
            rest = next;
        }
        Ok(())
    }


    /// Impedance of the network at a single angular frequency
    pub fn impedance(&self, omega: f64) -> Result<Cplx> {
        let mut points = self.evaluate_chunk(&[omega])?;
        Ok(points.pop().unwrap_or(Ok(ZERO))?)
    }

    /// Impedance of the network over a sweep, sequentially.
    /// `out[i]` corresponds to `omegas[i]`; a point outside the domain of one of
    /// the wired elements is reported in place without failing the sweep.
    pub fn evaluate(&self, omegas: &[f64]) -> Result<Vec<Point>> {
        self.evaluate_with(omegas, &SweepConfig::sequential())
    }

    pub fn evaluate_with(&self, omegas: &[f64], config: &SweepConfig) -> Result<Vec<Point>> {
        let out = match config.chunk_for(omegas.len()) {
            None => {
                log::trace!("circuit {}: {} point(s)", self.name, omegas.len());
                self.evaluate_chunk(omegas)?
            }
            Some(chunk) => {
                log::trace!("circuit {}: {} point(s) in chunks of {} on {} threads",
                    self.name, omegas.len(), chunk, rayon::current_num_threads());
                let parts = omegas.par_chunks(chunk)
                    .map(|c| self.evaluate_chunk(c))
                    .collect::<Result<Vec<_>>>()?;
                parts.into_iter().flatten().collect()
            }
        };

        let failed = out.iter().filter(|p| p.is_err()).count();
        if failed > 0 {
            log::warn!("circuit {}: {} of {} point(s) outside the element domains", self.name, failed, out.len());
        }
        Ok(out)
    }

    /// Each wired element is evaluated once over the chunk, then the topology
    /// combines the per-point values.
    fn evaluate_chunk(&self, omegas: &[f64]) -> Result<Vec<Point>> {
        let mut columns: Vec<Vec<Point>> = vec![vec![]; self.elements.len()];
        for &idx in self.topology.leaves() {
            columns[idx] = self.elements[idx].evaluate(omegas)?;
        }

        Ok((0..omegas.len())
            .map(|i| combine(&self.topology, &|idx| columns[idx][i].clone()))
            .collect())
    }
}

fn bind(tree: &Topology<Leaf>, elements: &[Element]) -> Result<Topology<usize>> {
    tree.try_map(&mut |leaf: &Leaf| {
        elements.iter()
            .position(|e| e.name() == leaf.name)
            .ok_or_else(|| Error::repr(leaf.position, format!("undeclared element '{}'", leaf.name)))
    })
}

/// Series: sum of impedances. Parallel: reciprocal of the summed admittances,
/// where a zero-impedance branch shorts the group and an infinite one is open.
/// The first failing leaf in left-to-right order decides the error.
fn combine(node: &Topology<usize>, z: &impl Fn(usize) -> Point) -> Point {
    match node {
        Topology::Leaf(idx) => z(*idx),
        Topology::Series(cs) => {
            let mut imped = ZERO;
            for c in cs {
                imped += combine(c, z)?;
            }
            Ok(imped)
        }
        Topology::Parallel(cs) => {
            let mut admit = ZERO;
            let mut shorted = false;
            for c in cs {
                let ipd = combine(c, z)?;
                if ipd.norm_sqr() == 0.0 {
                    shorted = true;
                } else if !ipd.is_infinite() {
                    admit += 1.0 / ipd;
                }
            }
            if shorted {return Ok(ZERO);}
            if admit.norm_sqr() == 0.0 {return Ok(Cplx::new(f64::INFINITY, 0.0));}
            Ok(1.0 / admit)
        }
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} = {}", self.name, self.representation)?;
        for e in &self.elements {
            writeln!(f, "  {e}")?;
        }
        Ok(())
    }
}


// ---------- Unit tests ----------

#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn approx_cplx(x: Cplx, y: Cplx, dev: f64) -> bool {
        (y - x).norm() < dev
    }
    const APPROX_VAL : f64 = 1e-9;

    fn el(name: &str, kind: ElementKind, p: &[f64]) -> Element {
        Element::with_parameters(name, kind, p).unwrap()
    }

    #[test]
    fn test_rc_series() {
        let circ = Circuit::with_elements("rc", "R1+C1", vec![
            el("R1", ElementKind::Resistor, &[100.0]),
            el("C1", ElementKind::Capacitor, &[1e-6]),
        ]).unwrap();

        let z = circ.impedance(1000.0).unwrap();
        assert!(approx_cplx(z, Cplx::new(100.0, -1000.0), 1e-3));
    }

    #[test]
    fn test_resistance() {
        let mut series = Circuit::new("s", "R1+R2").unwrap();
        let mut parallel = Circuit::new("p", "R1|R2").unwrap();
        series.set_parameters(&[40.0, 40.0]).unwrap();
        parallel.set_parameters(&[40.0, 40.0]).unwrap();

        for w in [1.0, 10.0] {
            assert!(approx_cplx(series.impedance(w).unwrap(), Cplx::new(80.0, 0.0), APPROX_VAL));
            assert!(approx_cplx(parallel.impedance(w).unwrap(), Cplx::new(20.0, 0.0), APPROX_VAL));
        }
    }

    #[test]
    fn test_rc_parallel() {
        let mut circ = Circuit::new("p", "R1|C1").unwrap();
        circ.set_parameters(&[40.0, 1.0]).unwrap();

        assert!(approx_cplx(circ.impedance(1.0).unwrap(), 1.0/Cplx::new(1.0/40.0, 1.0), APPROX_VAL));
        assert!(approx_cplx(circ.impedance(10.0).unwrap(), 1.0/Cplx::new(1.0/40.0, 10.0), APPROX_VAL));
    }

    #[test]
    fn test_randles() {
        let mut circ = Circuit::new("randles", "R0 + (R1 + W1) | C1").unwrap();
        let kinds: Vec<_> = circ.elements().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![
            ElementKind::Resistor, ElementKind::Resistor,
            ElementKind::SemiInfiniteWarburg, ElementKind::Capacitor,
        ]);
        circ.set_parameters(&[20.0, 100.0, 50.0, 1e-6]).unwrap();

        let w = 500.0;
        let faradaic = Cplx::new(100.0, 0.0) + crate::formula::warburg(50.0, w);
        let dl = crate::formula::capacitance(1e-6, w);
        let expected = Cplx::new(20.0, 0.0) + 1.0 / (1.0 / faradaic + 1.0 / dl);
        assert!(approx_cplx(circ.impedance(w).unwrap(), expected, APPROX_VAL));
    }

    #[test]
    fn test_undeclared_reference() {
        let err = Circuit::with_elements("c", "(E1+E9)", vec![el("E1", ElementKind::Resistor, &[1.0])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRepresentation { position: 5, .. }), "{err}");
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(Circuit::new("c", "R1+E1"), Err(Error::InvalidRepresentation { position: 4, .. })));
        assert!(matches!(Circuit::new("c", "R1+(C1"), Err(Error::InvalidRepresentation { .. })));
        assert!(matches!(Circuit::new("c", "R1+R1"), Err(Error::InvalidRepresentation { .. })));

        let dup = Circuit::with_elements("c", "R1", vec![
            el("R1", ElementKind::Resistor, &[1.0]),
            el("R1", ElementKind::Resistor, &[2.0]),
        ]);
        assert!(matches!(dup, Err(Error::DuplicateName(n)) if n == "R1"));

        let deep = format!("{}R1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(Circuit::new("c", deep), Err(Error::InvalidRepresentation { .. })));
    }

    #[test]
    fn test_element_names_must_be_referenceable() {
        for bad in ["", "not a name", "1R", "R-1"] {
            let err = Circuit::with_elements("c", "R1", vec![
                el("R1", ElementKind::Resistor, &[1.0]),
                el(bad, ElementKind::Resistor, &[1.0]),
            ]).unwrap_err();
            assert!(matches!(&err, Error::InvalidName(n) if n == bad), "{err}");
        }

        let mut circ = Circuit::new("c", "R1").unwrap();
        for bad in ["", "not a name", "1R"] {
            assert!(matches!(circ.add_element(bad, ElementKind::Resistor, &[1.0]), Err(Error::InvalidName(_))));
        }
        assert_eq!(circ.elements().len(), 1);
        circ.add_element("_spare", ElementKind::Resistor, &[1.0]).unwrap();
        circ.set_representation("R1+_spare").unwrap();
    }

    #[test]
    fn test_inductor_sweep() {
        let mut circ = Circuit::new("l", "L1").unwrap();
        circ.set_parameters(&[0.01]).unwrap();
        let z = circ.evaluate(&[1.0, 10.0, 100.0, 1000.0]).unwrap();
        for (zi, im) in z.into_iter().zip([0.01, 0.1, 1.0, 10.0]) {
            let zi = zi.unwrap();
            assert_eq!(zi.re, 0.0);
            assert_relative_eq!(zi.im, im, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_per_point_domain_errors() {
        let mut circ = Circuit::new("c", "R1+C1+W1").unwrap();
        circ.set_parameters(&[10.0, 1e-3, 5.0]).unwrap();
        let z = circ.evaluate(&[1.0, 0.0, 100.0]).unwrap();

        assert!(z[0].is_ok());
        assert_eq!(z[1].as_ref().unwrap_err().element, "C1");
        assert!(z[2].is_ok());
        assert!(matches!(circ.impedance(0.0), Err(Error::Domain(_))));
    }

    #[test]
    fn test_spare_elements_are_not_evaluated() {
        let mut circ = Circuit::new("c", "R1").unwrap();
        circ.add_element("C9", ElementKind::Capacitor, &[1e-6]).unwrap();
        let z = circ.evaluate(&[0.0]).unwrap();
        assert_eq!(z[0], Ok(ZERO));
    }

    #[test]
    fn test_registry() {
        let mut circ = Circuit::new("c", "R1+C1").unwrap();
        circ.add_element("L1", ElementKind::Inductor, &[1e-3]).unwrap();
        assert!(matches!(circ.add_element("R1", ElementKind::Resistor, &[1.0]), Err(Error::DuplicateName(_))));
        assert!(matches!(circ.add_element("L2", ElementKind::Inductor, &[1.0, 2.0]), Err(Error::InvalidParameterCount { .. })));
        assert_eq!(circ.elements().len(), 3);

        assert!(matches!(circ.remove_element("X"), Err(Error::NotFound(_))));
        assert!(matches!(circ.remove_element("R1"), Err(Error::InUse(n)) if n == "R1"));
        assert_eq!(circ.elements().len(), 3);

        circ.set_representation("R1+L1").unwrap();
        let removed = circ.remove_element("C1").unwrap();
        assert_eq!(removed.kind(), ElementKind::Capacitor);
        assert_eq!(circ.topology(), &Topology::Series(vec![Topology::Leaf(0), Topology::Leaf(1)]));

        circ.element_mut("R1").unwrap().set_parameters(&[5.0]).unwrap();
        let z = circ.impedance(1000.0).unwrap();
        assert!(approx_cplx(z, Cplx::new(5.0, 1.0), APPROX_VAL));
    }

    #[test]
    fn test_failed_rewire_leaves_circuit_unchanged() {
        let mut circ = Circuit::new("c", "R1+C1").unwrap();
        assert!(circ.set_representation("R1|X1").is_err());
        assert_eq!(circ.representation(), "R1+C1");
        assert!(matches!(circ.topology(), Topology::Series(_)));
    }

    #[test]
    fn test_flat_parameters() {
        let mut circ = Circuit::new("c", "R0+Ws1|Wo1").unwrap();
        assert_eq!(circ.param_count(), 5);
        assert!(matches!(circ.set_parameters(&[1.0; 4]), Err(Error::InvalidParameterCount { expected: 5, got: 4, .. })));

        circ.set_parameters(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(circ.parameters(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(circ.element("Wo1").unwrap().parameters(), &[4.0, 5.0]);

        let names: Vec<_> = circ.paramlist().into_iter().map(|(n, p)| format!("{}{}", p.letter, n)).collect();
        assert_eq!(names, vec!["RR0", "RWs1", "τWs1", "RWo1", "τWo1"]);
        assert_eq!(circ.bounds().len(), 5);
    }

    #[test]
    fn test_parallel_short_and_open() {
        let mut circ = Circuit::new("c", "R1|L1").unwrap();
        circ.set_parameters(&[10.0, 1.0]).unwrap();
        assert_eq!(circ.impedance(0.0).unwrap(), ZERO);

        // A zero capacitance is an open branch
        let mut circ = Circuit::new("c", "R1|C1").unwrap();
        circ.set_parameters(&[10.0, 0.0]).unwrap();
        assert!(approx_cplx(circ.impedance(1.0).unwrap(), Cplx::new(10.0, 0.0), APPROX_VAL));
    }

    #[test]
    fn test_parallel_sweep_is_identical() {
        let mut circ = Circuit::new("c", "R0+(R1+Ws1)|C1+L1").unwrap();
        circ.set_parameters(&[10.0, 100.0, 30.0, 0.2, 2e-5, 1e-6]).unwrap();

        let mut omegas: Vec<f64> = crate::sweep::geomspace(1e-2, 1e6, 2000).collect();
        omegas[777] = 0.0;

        let seq = circ.evaluate(&omegas).unwrap();
        let cfg = SweepConfig::default().with_min_parallel(2).with_chunk_size(37);
        let par = circ.evaluate_with(&omegas, &cfg).unwrap();

        assert_eq!(seq.len(), omegas.len());
        assert_eq!(seq, par);
        assert!(par[777].is_err());
        assert_abs_diff_eq!(par[0].as_ref().unwrap().im, seq[0].as_ref().unwrap().im);
    }

    #[test]
    fn test_display() {
        let mut circ = Circuit::new("rc", "R1|C1").unwrap();
        circ.set_parameters(&[100.0, 1e-6]).unwrap();
        let s = circ.to_string();
        assert!(s.starts_with("rc = R1|C1\n"));
        assert_eq!(s.lines().count(), 3);
    }
}
