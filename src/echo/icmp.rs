//! Single ICMPv4 echo exchange over a raw transport channel

use crate::error::ProbeError;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use pnet::transport::{icmp_packet_iter, transport_channel, TransportChannelType, TransportProtocol};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

const ECHO_PAYLOAD: &[u8; 16] = b"plp-echo-probe..";
const ECHO_HEADER_LEN: usize = 8;
pub const ECHO_PACKET_LEN: usize = ECHO_HEADER_LEN + ECHO_PAYLOAD.len();

/// Offset of the quoted datagram inside an ICMP error message
const ERROR_QUOTE_OFFSET: usize = 8;

const CHANNEL_BUFFER: usize = 4096;

/// How a received ICMP message relates to our outstanding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyClass {
    /// The echo reply we are waiting for
    Echo,
    /// An error message quoting our request
    Unreachable(String),
    /// Someone else's traffic
    Unrelated,
}

/// Write an echo request into `buffer`, checksum included
pub fn build_echo_request(
    buffer: &mut [u8],
    identifier: u16,
    sequence: u16,
) -> Option<MutableEchoRequestPacket<'_>> {
    let mut packet = MutableEchoRequestPacket::new(buffer)?;
    packet.set_icmp_type(IcmpTypes::EchoRequest);
    packet.set_icmp_code(IcmpCode::new(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);
    packet.set_payload(ECHO_PAYLOAD);
    packet.set_checksum(0);
    let checksum = pnet::packet::util::checksum(packet.packet(), 1);
    packet.set_checksum(checksum);
    Some(packet)
}

/// Match an incoming ICMP message against the request `(identifier, sequence)` sent to `dest`
pub fn classify_reply(
    icmp: &IcmpPacket<'_>,
    source: IpAddr,
    dest: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> ReplyClass {
    let icmp_type = icmp.get_icmp_type();

    if icmp_type == IcmpTypes::EchoReply {
        if source != IpAddr::V4(dest) {
            return ReplyClass::Unrelated;
        }
        return match EchoReplyPacket::new(icmp.packet()) {
            Some(reply)
                if reply.get_identifier() == identifier
                    && reply.get_sequence_number() == sequence =>
            {
                ReplyClass::Echo
            }
            _ => ReplyClass::Unrelated,
        };
    }

    let reason = if icmp_type == IcmpTypes::DestinationUnreachable {
        "destination unreachable"
    } else if icmp_type == IcmpTypes::TimeExceeded {
        "time exceeded"
    } else {
        return ReplyClass::Unrelated;
    };

    if quotes_our_request(icmp.packet(), dest, identifier, sequence) {
        ReplyClass::Unreachable(format!(
            "{} (code {}) from {}",
            reason,
            icmp.get_icmp_code().0,
            source
        ))
    } else {
        ReplyClass::Unrelated
    }
}

/// True when an ICMP error message quotes the echo request we sent
fn quotes_our_request(icmp_bytes: &[u8], dest: Ipv4Addr, identifier: u16, sequence: u16) -> bool {
    let Some(quoted) = icmp_bytes.get(ERROR_QUOTE_OFFSET..) else {
        return false;
    };
    let Some(inner_ip) = Ipv4Packet::new(quoted) else {
        return false;
    };
    if inner_ip.get_destination() != dest
        || inner_ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp
    {
        return false;
    }

    let header_len = usize::from(inner_ip.get_header_length()) * 4;
    let Some(inner_icmp) = quoted.get(header_len..) else {
        return false;
    };
    match EchoRequestPacket::new(inner_icmp) {
        Some(request) => {
            request.get_icmp_type() == IcmpTypes::EchoRequest
                && request.get_identifier() == identifier
                && request.get_sequence_number() == sequence
        }
        None => false,
    }
}

fn channel_error(error: io::Error) -> ProbeError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied(format!(
            "raw ICMP socket not permitted ({}); run as root or grant CAP_NET_RAW",
            error
        )),
        _ => ProbeError::from(error),
    }
}

/// Send one echo request to `dest` and block until the matching reply, an
/// error quoting it, or `timeout`
pub fn echo_once(
    dest: Ipv4Addr,
    identifier: u16,
    sequence: u16,
    timeout: Duration,
) -> Result<Duration, ProbeError> {
    let protocol = TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
    let (mut tx, mut rx) = transport_channel(CHANNEL_BUFFER, protocol).map_err(channel_error)?;

    let mut buffer = [0u8; ECHO_PACKET_LEN];
    let request = build_echo_request(&mut buffer, identifier, sequence)
        .ok_or_else(|| ProbeError::Io("echo request buffer too small".to_string()))?;

    let sent_at = Instant::now();
    let deadline = sent_at + timeout;
    tx.send_to(request, IpAddr::V4(dest)).map_err(ProbeError::from)?;

    let mut replies = icmp_packet_iter(&mut rx);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProbeError::Timeout(timeout));
        }

        match replies.next_with_timeout(remaining) {
            Ok(Some((packet, source))) => {
                match classify_reply(&packet, source, dest, identifier, sequence) {
                    ReplyClass::Echo => return Ok(sent_at.elapsed()),
                    ReplyClass::Unreachable(reason) => return Err(ProbeError::Unreachable(reason)),
                    ReplyClass::Unrelated => continue,
                }
            }
            Ok(None) => return Err(ProbeError::Timeout(timeout)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProbeError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::icmp::echo_reply::MutableEchoReplyPacket;
    use pnet::packet::icmp::IcmpType;
    use pnet::packet::ipv4::MutableIpv4Packet;

    const DEST: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 33);
    const ROUTER: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 1);

    fn echo_reply(identifier: u16, sequence: u16) -> Vec<u8> {
        let mut buffer = vec![0u8; ECHO_PACKET_LEN];
        {
            let mut reply = MutableEchoReplyPacket::new(&mut buffer).unwrap();
            reply.set_icmp_type(IcmpTypes::EchoReply);
            reply.set_identifier(identifier);
            reply.set_sequence_number(sequence);
            reply.set_payload(ECHO_PAYLOAD);
        }
        buffer
    }

    fn error_quoting(icmp_type: IcmpType, quoted_dest: Ipv4Addr, identifier: u16, sequence: u16) -> Vec<u8> {
        let mut request = [0u8; ECHO_PACKET_LEN];
        build_echo_request(&mut request, identifier, sequence).unwrap();

        let mut ip = vec![0u8; 20];
        {
            let mut header = MutableIpv4Packet::new(&mut ip).unwrap();
            header.set_version(4);
            header.set_header_length(5);
            header.set_total_length((20 + ECHO_PACKET_LEN) as u16);
            header.set_ttl(1);
            header.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
            header.set_source(Ipv4Addr::new(10, 0, 0, 2));
            header.set_destination(quoted_dest);
        }

        let mut message = vec![icmp_type.0, 1, 0, 0, 0, 0, 0, 0];
        message.extend_from_slice(&ip);
        message.extend_from_slice(&request[..8]);
        message
    }

    fn classify(bytes: &[u8], source: Ipv4Addr, identifier: u16, sequence: u16) -> ReplyClass {
        let packet = IcmpPacket::new(bytes).unwrap();
        classify_reply(&packet, IpAddr::V4(source), DEST, identifier, sequence)
    }

    #[test]
    fn test_build_echo_request_checksum_verifies() {
        let mut buffer = [0u8; ECHO_PACKET_LEN];
        let packet = build_echo_request(&mut buffer, 0xBEEF, 7).unwrap();
        assert_eq!(packet.get_identifier(), 0xBEEF);
        assert_eq!(packet.get_sequence_number(), 7);
        assert_eq!(packet.get_icmp_type(), IcmpTypes::EchoRequest);

        let icmp = IcmpPacket::new(&buffer).unwrap();
        assert_eq!(pnet::packet::icmp::checksum(&icmp), icmp.get_checksum());
    }

    #[test]
    fn test_build_echo_request_rejects_short_buffer() {
        let mut buffer = [0u8; 4];
        assert!(build_echo_request(&mut buffer, 1, 1).is_none());
    }

    #[test]
    fn test_matching_echo_reply() {
        assert_eq!(classify(&echo_reply(42, 3), DEST, 42, 3), ReplyClass::Echo);
    }

    #[test]
    fn test_echo_reply_for_other_probe_is_ignored() {
        assert_eq!(classify(&echo_reply(42, 2), DEST, 42, 3), ReplyClass::Unrelated);
        assert_eq!(classify(&echo_reply(41, 3), DEST, 42, 3), ReplyClass::Unrelated);
        assert_eq!(classify(&echo_reply(42, 3), ROUTER, 42, 3), ReplyClass::Unrelated);
    }

    #[test]
    fn test_own_request_is_ignored() {
        let mut buffer = [0u8; ECHO_PACKET_LEN];
        build_echo_request(&mut buffer, 42, 3).unwrap();
        assert_eq!(classify(&buffer, DEST, 42, 3), ReplyClass::Unrelated);
    }

    #[test]
    fn test_unreachable_quoting_our_request() {
        let message = error_quoting(IcmpTypes::DestinationUnreachable, DEST, 42, 3);
        match classify(&message, ROUTER, 42, 3) {
            ReplyClass::Unreachable(reason) => {
                assert!(reason.contains("destination unreachable"));
                assert!(reason.contains("198.51.100.1"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_time_exceeded_quoting_our_request() {
        let message = error_quoting(IcmpTypes::TimeExceeded, DEST, 42, 3);
        assert!(matches!(classify(&message, ROUTER, 42, 3), ReplyClass::Unreachable(_)));
    }

    #[test]
    fn test_unreachable_for_other_traffic_is_ignored() {
        let other_dest = error_quoting(IcmpTypes::DestinationUnreachable, Ipv4Addr::new(203, 0, 113, 9), 42, 3);
        assert_eq!(classify(&other_dest, ROUTER, 42, 3), ReplyClass::Unrelated);

        let other_sequence = error_quoting(IcmpTypes::DestinationUnreachable, DEST, 42, 4);
        assert_eq!(classify(&other_sequence, ROUTER, 42, 3), ReplyClass::Unrelated);
    }

    #[test]
    fn test_truncated_error_is_ignored() {
        let mut message = error_quoting(IcmpTypes::DestinationUnreachable, DEST, 42, 3);
        message.truncate(12);
        assert_eq!(classify(&message, ROUTER, 42, 3), ReplyClass::Unrelated);
    }

    #[test]
    fn test_channel_permission_error_is_typed() {
        let error = channel_error(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(error.kind(), "permission");
    }
}
