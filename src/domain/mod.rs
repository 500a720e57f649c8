//! Domain layer: the payload, its envelopes, the correlation rule and the
//! ports the application talks to.

pub mod correlation;
pub mod envelope;
pub mod ports;
pub mod record;
pub mod syncpoint;
