//! Extension catalog registry
//!
//! Assembles the extension catalog from a code-hosting API. The core never
//! calls into this module; it only consumes the catalog it produces.

pub mod client;
