//! Identify request/response exchange

use crate::channel::DcpChannel;
use crate::error::{PnioError, PnioResult};
use crate::frame::DcpFrame;
use pnio_core::{DeviceDescription, MacAddress};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Transaction id placed in identify requests
pub const DEFAULT_XID: u32 = 0x0701_0052;

/// Largest Ethernet frame accepted, VLAN tag included
const MAX_FRAME_LENGTH: usize = 1522;

/// Send an identify request
pub async fn send_identify<C: DcpChannel + ?Sized>(channel: &mut C, request: &DcpFrame) -> PnioResult<()> {
    let frame = request.encode()?;
    log::debug!(
        "Sending DCP identify request xid=0x{:08X} ({} bytes)",
        request.xid,
        frame.len()
    );
    channel.send_frame(&frame).await
}

/// Send an identify request every device answers
pub async fn send_discover<C: DcpChannel + ?Sized>(channel: &mut C, source_mac: MacAddress) -> PnioResult<()> {
    send_identify(channel, &DcpFrame::identify_all(source_mac, DEFAULT_XID)).await
}

/// Look up one device by its station name
///
/// The first identify response addressed to `source_mac` is decoded.
/// Unrelated frames on the channel are skipped.
///
/// # Errors
/// `Timeout` when no matching response arrives within `timeout`.
pub async fn get_station_info<C: DcpChannel + ?Sized>(
    channel: &mut C,
    source_mac: MacAddress,
    station_name: &str,
    timeout: Duration,
) -> PnioResult<DeviceDescription> {
    let request = DcpFrame::identify_by_name(source_mac, DEFAULT_XID, station_name);
    send_identify(channel, &request).await?;

    let response = tokio::time::timeout(timeout, next_response(channel, source_mac, DEFAULT_XID))
        .await
        .map_err(|_| PnioError::Timeout)??;
    let device = response.to_device_description()?;
    log::info!(
        "Station '{}' found at {} ({})",
        station_name,
        device.ip,
        device.mac
    );
    Ok(device)
}

/// Identify every device on the segment
///
/// Collects identify responses until `window` has elapsed. A device that
/// answers more than once is reported once.
pub async fn discover<C: DcpChannel + ?Sized>(
    channel: &mut C,
    source_mac: MacAddress,
    window: Duration,
) -> PnioResult<Vec<DeviceDescription>> {
    send_discover(channel, source_mac).await?;

    let deadline = Instant::now() + window;
    let mut devices = Vec::new();
    let mut seen = HashSet::new();
    loop {
        let response = match tokio::time::timeout_at(deadline, next_response(channel, source_mac, DEFAULT_XID)).await {
            Ok(response) => response?,
            Err(_) => break,
        };
        let device = response.to_device_description()?;
        if !seen.insert(device.mac) {
            continue;
        }
        log::debug!("Discovered '{}' at {} ({})", device.name_of_station, device.ip, device.mac);
        devices.push(device);
    }

    log::info!("DCP discovery found {} device(s)", devices.len());
    Ok(devices)
}

/// Wait for the next identify response belonging to this exchange
async fn next_response<C: DcpChannel + ?Sized>(
    channel: &mut C,
    source_mac: MacAddress,
    xid: u32,
) -> PnioResult<DcpFrame> {
    let mut buf = vec![0u8; MAX_FRAME_LENGTH];
    loop {
        let len = channel.recv_frame(&mut buf).await?;
        let frame = match DcpFrame::decode(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Ignoring frame: {}", e);
                continue;
            }
        };
        if frame.is_identify_response() && frame.xid == xid && frame.destination == source_mac {
            return Ok(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::{CONTROLLER, DEVICE, identify_response};
    use crate::frame::{DcpOption, FRAME_ID_IDENTIFY_REQUEST};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays queued frames, then never delivers anything again
    struct ScriptedChannel {
        sent: Vec<Vec<u8>>,
        inbound: VecDeque<Vec<u8>>,
    }

    impl ScriptedChannel {
        fn new(inbound: Vec<Vec<u8>>) -> Self {
            Self {
                sent: Vec::new(),
                inbound: inbound.into(),
            }
        }
    }

    #[async_trait]
    impl DcpChannel for ScriptedChannel {
        async fn send_frame(&mut self, frame: &[u8]) -> PnioResult<()> {
            self.sent.push(frame.to_vec());
            Ok(())
        }

        async fn recv_frame(&mut self, buf: &mut [u8]) -> PnioResult<usize> {
            match self.inbound.pop_front() {
                Some(frame) => {
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                None => std::future::pending().await,
            }
        }
    }

    fn response_from(source: MacAddress, xid: u32, name: &str) -> Vec<u8> {
        let mut frame = identify_response(xid, name);
        frame[6..12].copy_from_slice(source.as_bytes());
        frame
    }

    #[tokio::test]
    async fn test_get_station_info() {
        let mut channel = ScriptedChannel::new(vec![
            // noise: not a PROFINET frame
            vec![0xFF; 60],
            // answer to somebody else's transaction
            identify_response(DEFAULT_XID + 1, "other"),
            identify_response(DEFAULT_XID, "plc-a"),
        ]);

        let device = get_station_info(&mut channel, CONTROLLER, "plc-a", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(device.name_of_station, "plc-a");
        assert_eq!(device.mac, DEVICE);
        assert_eq!(device.ip, std::net::Ipv4Addr::new(192, 0, 2, 1));

        assert_eq!(channel.sent.len(), 1);
        let request = DcpFrame::decode(&channel.sent[0]).unwrap();
        assert_eq!(request.frame_id, FRAME_ID_IDENTIFY_REQUEST);
        assert_eq!(request.block(DcpOption::NameOfStation).unwrap().data, b"plc-a");
    }

    #[tokio::test]
    async fn test_get_station_info_timeout() {
        let mut channel = ScriptedChannel::new(Vec::new());
        let result = get_station_info(&mut channel, CONTROLLER, "absent", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(PnioError::Timeout)));
    }

    #[tokio::test]
    async fn test_discover_collects_distinct_devices() {
        let second = MacAddress::new([0x00, 0x0E, 0xCF, 0x77, 0x88, 0x99]);
        let mut channel = ScriptedChannel::new(vec![
            identify_response(DEFAULT_XID, "plc-a"),
            response_from(second, DEFAULT_XID, "plc-b"),
            identify_response(DEFAULT_XID, "plc-a"),
        ]);

        let devices = discover(&mut channel, CONTROLLER, Duration::from_millis(50)).await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name_of_station, "plc-a");
        assert_eq!(devices[1].name_of_station, "plc-b");
        assert_eq!(devices[1].mac, second);

        let request = DcpFrame::decode(&channel.sent[0]).unwrap();
        assert!(request.block(DcpOption::All).is_some());
    }

    #[tokio::test]
    async fn test_discover_empty_segment() {
        let mut channel = ScriptedChannel::new(Vec::new());
        let devices = discover(&mut channel, CONTROLLER, Duration::from_millis(10)).await.unwrap();
        assert!(devices.is_empty());
    }
}
