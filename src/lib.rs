//! Complex impedance of electrochemical equivalent circuits.
//!
//! Elements (resistor, capacitor, inductor and three Warburg diffusion
//! variants) are wired together by a representation string such as
//! `R0 + (R1 + W1) | Cdl` and evaluated over an angular frequency sweep.

pub mod circuit;
pub mod data;
pub mod element;
pub mod error;
pub mod formula;
pub mod repr;
pub mod sweep;

pub use circuit::Circuit;
pub use data::DataPoint;
pub use element::{Element, ElementKind, ParameterBase, Point};
pub use error::{DomainError, Error, Result};
pub use formula::Cplx;
pub use sweep::SweepConfig;
