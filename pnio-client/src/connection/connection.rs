//! Session engine for one IO device
//!
//! A `Connection` owns the identifiers of one application relationship
//! (AR) and issues the connection-oriented services over a datagram
//! endpoint:
//!
//! - `connect` / `release` set up and tear down the AR
//! - `read` / `write` access records inside the AR
//! - `read_implicit` reads records without an AR
//!
//! Every service is one request datagram followed by one reply datagram.
//! Operations take `&mut self`, so at most one request is outstanding.
//!
//! # Keep-alive
//!
//! Before a `read` or `write`, the session compares the time since its
//! last exchange with `ConnectionConfig::keepalive`. When the session has
//! been idle at least that long it connects once more before sending the
//! request.

use super::clock::{Clock, SystemClock};
use super::config::ConnectionConfig;
use super::state::SessionState;
use crate::error::{PnioError, PnioResult};
use pnio_core::{ArUuid, DeviceDescription, MacAddress, ObjectUuid};
use pnio_rpc::ar::{ArBlockRequest, ArBlockResponse};
use pnio_rpc::block::BlockType;
use pnio_rpc::identification::{IDENTIFICATION_RECORD_INDEX, IdentificationTable, decode_identification};
use pnio_rpc::iod::{IMPLICIT_READ_LENGTH, IodHeader};
use pnio_rpc::nrd::NrdData;
use pnio_rpc::release::IodReleaseBlock;
use pnio_rpc::rpc::{Operation, build_request, parse_response};
use pnio_transport::{DatagramEndpoint, MAX_UDP_PAYLOAD_SIZE, UdpSettings, UdpTransport};
use rand::RngCore;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// RPC, NRD and IOD header bytes a read reply carries besides the record
pub const READ_REPLY_OVERHEAD: usize = 164;

/// Receive buffer for replies that carry no record data
const CONTROL_REPLY_CAPACITY: usize = 4096;

/// Receive buffer for a read reply of at most `max_length` record bytes
///
/// Never larger than a UDP datagram can be.
fn read_reply_capacity(max_length: u32) -> usize {
    (max_length as usize)
        .saturating_add(READ_REPLY_OVERHEAD)
        .min(MAX_UDP_PAYLOAD_SIZE)
}

/// Controller-side session with one IO device
pub struct Connection<E, K = SystemClock> {
    info: DeviceDescription,
    peer: SocketAddr,
    endpoint: E,
    config: ConnectionConfig,
    clock: K,
    ar_uuid: ArUuid,
    /// Same value as the AR UUID for the lifetime of the session
    activity_uuid: ArUuid,
    local_object_uuid: ObjectUuid,
    remote_object_uuid: ObjectUuid,
    state: SessionState,
    source_mac: Option<MacAddress>,
    last_activity: Option<Instant>,
}

impl<E: DatagramEndpoint> Connection<E, SystemClock> {
    /// Create a session for `info` over `endpoint`
    ///
    /// The AR UUID is drawn from `rng`. Nothing is sent until `connect`.
    pub fn new<R: RngCore + ?Sized>(
        info: DeviceDescription,
        endpoint: E,
        config: ConnectionConfig,
        rng: &mut R,
    ) -> Self {
        Self::with_clock(info, endpoint, config, rng, SystemClock)
    }
}

impl Connection<UdpTransport, SystemClock> {
    /// Create a session over a freshly bound UDP socket
    pub async fn bind<R: RngCore + ?Sized>(
        info: DeviceDescription,
        config: ConnectionConfig,
        rng: &mut R,
    ) -> PnioResult<Self> {
        let ar_uuid = ArUuid::generate(rng);
        let transport = UdpTransport::bind(UdpSettings::default()).await?;
        Ok(Self::from_parts(info, transport, config, ar_uuid, SystemClock))
    }
}

impl<E: DatagramEndpoint, K: Clock> Connection<E, K> {
    /// Create a session that reads time from `clock`
    pub fn with_clock<R: RngCore + ?Sized>(
        info: DeviceDescription,
        endpoint: E,
        config: ConnectionConfig,
        rng: &mut R,
        clock: K,
    ) -> Self {
        let ar_uuid = ArUuid::generate(rng);
        Self::from_parts(info, endpoint, config, ar_uuid, clock)
    }

    fn from_parts(info: DeviceDescription, endpoint: E, config: ConnectionConfig, ar_uuid: ArUuid, clock: K) -> Self {
        let peer = SocketAddr::new(IpAddr::V4(info.ip), config.rpc_port);
        let remote_object_uuid = ObjectUuid::remote(info.dev_high, info.dev_low, info.vendor_high, info.vendor_low);
        Self {
            info,
            peer,
            endpoint,
            config,
            clock,
            ar_uuid,
            activity_uuid: ar_uuid,
            local_object_uuid: ObjectUuid::local(),
            remote_object_uuid,
            state: SessionState::Unestablished,
            source_mac: None,
            last_activity: None,
        }
    }

    pub fn info(&self) -> &DeviceDescription {
        &self.info
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn ar_uuid(&self) -> ArUuid {
        self.ar_uuid
    }

    pub fn activity_uuid(&self) -> ArUuid {
        self.activity_uuid
    }

    pub fn local_object_uuid(&self) -> ObjectUuid {
        self.local_object_uuid
    }

    pub fn remote_object_uuid(&self) -> ObjectUuid {
        self.remote_object_uuid
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Time of the last completed exchange that counts as activity
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Establish the AR
    ///
    /// `source_mac` becomes the CM initiator MAC unless the session is
    /// already live, in which case the MAC of the first connect is kept.
    ///
    /// # Errors
    /// `DeviceError` when the device rejects the AR, `Protocol` when the
    /// reply is not an AR block response for this AR.
    pub async fn connect(&mut self, source_mac: MacAddress) -> PnioResult<ArBlockResponse> {
        if !self.state.is_live() {
            self.source_mac = Some(source_mac);
        }
        self.establish().await
    }

    /// Release the AR
    ///
    /// The session stays live afterwards.
    pub async fn release(&mut self, source_mac: MacAddress) -> PnioResult<IodReleaseBlock> {
        if !self.state.is_live() {
            self.source_mac = Some(source_mac);
        }

        let block = IodReleaseBlock::request(self.ar_uuid, self.config.session_key).encode();
        let nrd = self.exchange(Operation::Release, &block, CONTROL_REPLY_CAPACITY).await?;
        let reply = IodReleaseBlock::decode(&nrd.payload)?;
        self.touch();

        log::info!("Released AR {} with {}", self.ar_uuid, self.peer);
        Ok(reply)
    }

    /// Read a record with the configured maximum length
    pub async fn read(&mut self, api: u32, slot: u16, subslot: u16, index: u16) -> PnioResult<IodHeader> {
        let max_length = self.config.max_read_length;
        self.read_with_length(api, slot, subslot, index, max_length).await
    }

    /// Read at most `max_length` bytes of a record
    ///
    /// The record data is in the `payload` of the returned header.
    pub async fn read_with_length(
        &mut self,
        api: u32,
        slot: u16,
        subslot: u16,
        index: u16,
        max_length: u32,
    ) -> PnioResult<IodHeader> {
        self.reconnect_if_stale().await?;

        let request = IodHeader::read_request(self.ar_uuid, api, slot, subslot, index, max_length).encode();
        let nrd = self
            .exchange(Operation::Read, &request, read_reply_capacity(max_length))
            .await?;
        let reply = IodHeader::decode(&nrd.payload)?;
        self.touch();
        Ok(reply)
    }

    /// Write `data` to a record
    ///
    /// # Errors
    /// `DeviceError` carrying the status from either the NRD wrapper or
    /// the write response header.
    pub async fn write(
        &mut self,
        api: u32,
        slot: u16,
        subslot: u16,
        index: u16,
        data: &[u8],
    ) -> PnioResult<IodHeader> {
        self.reconnect_if_stale().await?;

        let request = IodHeader::write_request(self.ar_uuid, api, slot, subslot, index, data.to_vec())?.encode();
        let nrd = self.exchange(Operation::Write, &request, CONTROL_REPLY_CAPACITY).await?;
        let reply = IodHeader::decode(&nrd.payload)?;
        self.touch();

        let status = reply.response_status();
        if !status.is_ok() {
            log::warn!(
                "Write of record 0x{:04X} (slot {}, subslot 0x{:04X}) rejected: {}",
                index,
                slot,
                subslot,
                status
            );
            return Err(PnioError::DeviceError(status));
        }
        Ok(reply)
    }

    /// Read a record outside of any AR
    ///
    /// Neither checks nor refreshes the keep-alive timer.
    pub async fn read_implicit(&mut self, api: u32, slot: u16, subslot: u16, index: u16) -> PnioResult<IodHeader> {
        let request = IodHeader::implicit_read_request(api, slot, subslot, index).encode();
        let nrd = self
            .exchange(Operation::ReadImplicit, &request, read_reply_capacity(IMPLICIT_READ_LENGTH))
            .await?;
        IodHeader::decode(&nrd.payload)
    }

    /// Read the real identification of all plugged modules and submodules
    pub async fn read_identification(&mut self) -> PnioResult<IdentificationTable> {
        let reply = self.read(0, 0, 0, IDENTIFICATION_RECORD_INDEX).await?;
        decode_identification(&reply.payload)
    }

    async fn establish(&mut self) -> PnioResult<ArBlockResponse> {
        let initiator_mac = self.source_mac.or(self.config.source_mac).ok_or_else(|| {
            PnioError::Protocol("No source MAC address known for the CM initiator".to_string())
        })?;

        let block = ArBlockRequest::new(
            self.ar_uuid,
            self.config.session_key,
            initiator_mac,
            self.local_object_uuid,
        )
        .encode()?;
        let nrd = self.exchange(Operation::Connect, &block, CONTROL_REPLY_CAPACITY).await?;

        let reply = ArBlockResponse::decode(&nrd.payload)?;
        if reply.block_header.block_type != BlockType::ArBlockRes {
            return Err(PnioError::Protocol(format!(
                "Expected an AR block response, got block type 0x{:04X}",
                reply.block_header.block_type.as_u16()
            )));
        }
        if reply.ar_uuid != self.ar_uuid {
            return Err(PnioError::Protocol(format!(
                "Device answered for AR {}, expected {}",
                reply.ar_uuid, self.ar_uuid
            )));
        }

        self.state = SessionState::Live;
        self.touch();
        log::info!(
            "AR {} established with {} (session key 0x{:04X})",
            self.ar_uuid,
            self.peer,
            reply.session_key
        );
        Ok(reply)
    }

    async fn reconnect_if_stale(&mut self) -> PnioResult<()> {
        let Some(last_activity) = self.last_activity else {
            return Ok(());
        };
        let idle = self.clock.now().saturating_duration_since(last_activity);
        if idle >= self.config.keepalive {
            log::warn!("Session with {} idle for {:?}, reconnecting", self.peer, idle);
            self.establish().await?;
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.last_activity = Some(self.clock.now());
    }

    /// Send one request and wait for its reply
    ///
    /// Datagrams from other hosts and replies to other activities are
    /// skipped. The device may answer from any port. The configured
    /// timeout bounds the whole wait, skipped datagrams included. A
    /// non-zero NRD status fails the exchange.
    async fn exchange(&mut self, operation: Operation, block: &[u8], capacity: usize) -> PnioResult<NrdData> {
        let request = build_request(operation, self.remote_object_uuid, self.activity_uuid, block)?;
        log::debug!(
            "Sending {:?} request to {} ({} bytes)",
            operation,
            self.peer,
            request.len()
        );
        self.endpoint.send_to(&request, self.peer).await?;

        let deadline = self
            .config
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let mut buf = vec![0u8; capacity];
        loop {
            let (len, from) = self.endpoint.recv_from_until(&mut buf, deadline).await?;
            if from.ip() != self.peer.ip() {
                log::debug!("Ignoring {} bytes from {}", len, from);
                continue;
            }

            let (header, nrd) = parse_response(&buf[..len])?;
            if header.activity_uuid != self.activity_uuid {
                log::debug!("Ignoring reply for activity {}", header.activity_uuid);
                continue;
            }
            log::debug!("Received {:?} reply ({} bytes)", header.operation, len);

            let status = nrd.status();
            if !status.is_ok() {
                log::warn!("{:?} rejected by {}: {}", operation, self.peer, status);
                return Err(PnioError::DeviceError(status));
            }
            return Ok(nrd);
        }
    }
}
