//! Public library API for decoding packfile and tagfile object containers.

/// Container sniffing, relocation, reflection-driven decoding, and the value model.
pub mod hkx;
