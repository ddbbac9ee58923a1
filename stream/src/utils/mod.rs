//! Utility functions for exchanging fixed-size fields over a transport.

pub mod codec;
