//! Rendering and delivering the finished digest.
//!
//! # Submodules
//!
//! - [`html`]: Plain HTML documents built without the language model
//! - [`email`]: Sends the digest (or a configuration test message) via Resend

pub mod email;
pub mod html;
