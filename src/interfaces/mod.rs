//! Adapters between the outside world and the domain: the wire codec for
//! payloads, and the JSON-lines files the command line reads and writes.

pub mod json;
