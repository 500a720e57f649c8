//! Application layer containing the consume-process-reply orchestration.
//!
//! `ReceiveLoop` polls the source queue under syncpoint and decides when an
//! idle queue ends the run. `Responder` drives it, turning each request into a
//! reply and committing or rolling back the pair as one unit of work.

pub mod receiver;
pub mod responder;
pub mod transform;
