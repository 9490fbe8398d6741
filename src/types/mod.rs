//! Common types shared by the signing pipeline and the transport.

mod params;

pub use params::{params_from_json, Number, ParamValue, Params};
