use crate::circuit::Circuit;
use crate::element::Point;
use crate::error::{Error, Result};
use crate::formula::Cplx;

// A single point (angular frequency, impedance) of a spectrum.
// Spectra are represented as Vec<DataPoint>

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DataPoint {
    pub omega: f64,
    pub imp: Cplx,
}

/// Pair a sweep with its evaluated impedances, dropping the points that
/// fell outside the element domains
pub fn spectrum(omegas: &[f64], z: &[Point]) -> Vec<DataPoint> {
    omegas.iter().zip(z)
        .filter_map(|(&omega, p)| p.as_ref().ok().map(|&imp| DataPoint{omega, imp}))
        .collect()
}

/// Sum of squared relative residuals of `circuit` against measured `data`,
/// Σ |Z_model - Z_data|² / |Z_data|².
///
/// This is the objective an external fitting driver minimizes over
/// [`Circuit::parameters`].
pub fn loss(circuit: &Circuit, data: &[DataPoint]) -> Result<f64> {
    let omegas: Vec<f64> = data.iter().map(|dp| dp.omega).collect();
    let predicted = circuit.evaluate(&omegas)?;

    let mut loss = 0.0;
    for (dp, p) in data.iter().zip(predicted) {
        let diff = p.map_err(Error::Domain)? - dp.imp;
        loss += diff.norm_sqr() / dp.imp.norm_sqr();
    }
    Ok(loss)
}

/// Write a spectrum as `omega,re,im` CSV rows with a header line
pub fn write_csv<W: std::io::Write>(writer: W, points: &[DataPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["omega", "re", "im"])?;
    for dp in points {
        wtr.write_record(&[dp.omega.to_string(), dp.imp.re.to_string(), dp.imp.im.to_string()])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
