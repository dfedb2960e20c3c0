//! Outbound flow registry seam (RFC 5626)
//!
//! The transport layer owns the actual connections; the registrar only asks
//! whether an active flow exists to a peer so it can mint the Path entry
//! binding the registration to that flow.

use std::net::IpAddr;

use bytes::Bytes;
use dashmap::DashMap;

use ferrosip_sip_core::TransportKind;

/// Lookup of active client flows by peer coordinates
pub trait FlowRegistry: Send + Sync {
    /// The opaque token of an active flow to `(proto, ip, port)`, if any.
    fn find_flow(&self, proto: TransportKind, ip: IpAddr, port: u16) -> Option<Bytes>;
}

/// Registry that knows no flows.
pub struct NoFlows;

impl FlowRegistry for NoFlows {
    fn find_flow(&self, _proto: TransportKind, _ip: IpAddr, _port: u16) -> Option<Bytes> {
        None
    }
}

/// In-process flow registry, mainly for tests and single-node setups.
pub struct MemoryFlowRegistry {
    flows: DashMap<(TransportKind, IpAddr, u16), Bytes>,
}

impl MemoryFlowRegistry {
    pub fn new() -> Self {
        MemoryFlowRegistry { flows: DashMap::new() }
    }

    /// Record an active flow under its peer coordinates.
    pub fn register_flow(
        &self,
        proto: TransportKind,
        ip: IpAddr,
        port: u16,
        token: impl Into<Bytes>,
    ) {
        self.flows.insert((proto, ip, port), token.into());
    }

    pub fn remove_flow(&self, proto: TransportKind, ip: IpAddr, port: u16) {
        self.flows.remove(&(proto, ip, port));
    }
}

impl Default for MemoryFlowRegistry {
    fn default() -> Self {
        MemoryFlowRegistry::new()
    }
}

impl FlowRegistry for MemoryFlowRegistry {
    fn find_flow(&self, proto: TransportKind, ip: IpAddr, port: u16) -> Option<Bytes> {
        self.flows.get(&(proto, ip, port)).map(|t| t.clone())
    }
}
