//! Service layer: endpoint selection, health probing, and the per-port
//! forwarder/listener.

pub mod http;
pub mod prober;
pub mod selection;
