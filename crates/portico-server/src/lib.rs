//! # portico-server
//!
//! The HTTP embedding of the portico gateway: a single POST endpoint
//! accepting an opaque serialized request, content-type negotiation
//! between the textual and binary serializers, and the error envelope for
//! anything that goes wrong in between.

pub mod config;
pub mod logging;
pub mod routes;
