//! Helpers shared by unit tests.

#![allow(clippy::unwrap_used)]

pub(crate) mod loopback;
pub(crate) mod trickle;
