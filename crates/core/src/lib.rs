//! Domain types and pure validation logic shared by the ComfyUI client and
//! the HTTP API.

pub mod error;
pub mod naming;
pub mod workflow;
