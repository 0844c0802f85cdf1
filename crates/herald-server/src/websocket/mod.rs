//! WebSocket connection management, heartbeat and event fan-out.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | One attached connection: id, timestamps, bounded send queue |
//! | `registry` | Authoritative set of open connections (attach/detach/snapshot) |
//! | `broadcast` | Fan-out of one event over a registry snapshot |
//! | `heartbeat` | Missed-activity accounting for liveness |
//! | `endpoint` | `/ws` upgrade and per-connection session loop |

pub mod broadcast;
pub mod connection;
pub mod endpoint;
pub mod heartbeat;
pub mod registry;
