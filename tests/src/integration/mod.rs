//! Integration flows across device bus, pipeline and runtime.

mod properties;
mod scenarios;
