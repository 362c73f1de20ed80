//! ComfyUI WebSocket and REST client library.
//!
//! Submits workflows to a ComfyUI server, waits on its WebSocket for the
//! completion of each prompt, and downloads the resulting images.
//!
//! - [`job::JobClient`]: per-prompt state machine (submit, await, collect).
//! - [`session`]: the transport seam; [`client`] and [`api`] implement it
//!   over `tokio-tungstenite` and `reqwest`.
//! - [`service::ComfyUIService`]: entry points used by the HTTP layer.

pub mod api;
pub mod client;
pub mod config;
pub mod fetcher;
pub mod history;
pub mod job;
pub mod messages;
pub mod service;
pub mod session;

pub use config::ComfyUIConfig;
pub use job::{JobClient, JobError, ResultSet};
pub use service::ComfyUIService;
