//! IP/TCP/UDP header inspection and checksum maintenance.
//!
//! All parsing is bounds-checked: a truncated or malformed packet yields
//! `None` rather than a panic, because captured traffic is untrusted input.

use std::net::Ipv4Addr;

pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

pub const TCP_FLAG_FIN: u8 = 0x01;
pub const TCP_FLAG_SYN: u8 = 0x02;
pub const TCP_FLAG_RST: u8 = 0x04;
pub const TCP_FLAG_PSH: u8 = 0x08;
pub const TCP_FLAG_ACK: u8 = 0x10;

const IPV4_MIN_HEADER: usize = 20;
const IPV6_HEADER: usize = 40;
const TCP_MIN_HEADER: usize = 20;
const UDP_HEADER: usize = 8;
const TCP_FLAGS_OFFSET: usize = 13;
const TCP_CHECKSUM_OFFSET: usize = 16;
const UDP_CHECKSUM_OFFSET: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

/// Offsets of the layers inside a raw IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLayout {
    pub version: IpVersion,
    /// Transport protocol number (next header for IPv6)
    pub protocol: u8,
    /// Start of the transport header
    pub transport_offset: usize,
    /// Start of the transport payload; equals `transport_offset` for unknown protocols
    pub payload_offset: usize,
    /// End of the IP datagram, never beyond the buffer
    pub end: usize,
}

impl PacketLayout {
    pub fn is_tcp(&self) -> bool {
        self.protocol == PROTO_TCP && self.payload_offset > self.transport_offset
    }

    pub fn is_udp(&self) -> bool {
        self.protocol == PROTO_UDP && self.payload_offset > self.transport_offset
    }

    pub fn payload_len(&self) -> usize {
        self.end.saturating_sub(self.payload_offset)
    }
}

/// Locates the IP header, transport header and payload of `data`.
pub fn parse_layout(data: &[u8]) -> Option<PacketLayout> {
    let first = *data.first()?;
    let (version, ip_header_len, protocol, end) = match first >> 4 {
        4 => {
            if data.len() < IPV4_MIN_HEADER {
                return None;
            }
            let header_len = usize::from(first & 0x0F) * 4;
            if header_len < IPV4_MIN_HEADER || header_len > data.len() {
                return None;
            }
            let total_len = usize::from(u16::from_be_bytes([data[2], data[3]]));
            let end = total_len.clamp(header_len, data.len());
            (IpVersion::V4, header_len, data[9], end)
        }
        6 => {
            if data.len() < IPV6_HEADER {
                return None;
            }
            let payload_len = usize::from(u16::from_be_bytes([data[4], data[5]]));
            let end = (IPV6_HEADER + payload_len).min(data.len());
            (IpVersion::V6, IPV6_HEADER, data[6], end)
        }
        _ => return None,
    };

    let transport_offset = ip_header_len;
    let payload_offset = match protocol {
        PROTO_TCP if transport_offset + TCP_MIN_HEADER <= end => {
            let data_offset = usize::from(data[transport_offset + 12] >> 4) * 4;
            if data_offset >= TCP_MIN_HEADER && transport_offset + data_offset <= end {
                transport_offset + data_offset
            } else {
                transport_offset
            }
        }
        PROTO_UDP if transport_offset + UDP_HEADER <= end => transport_offset + UDP_HEADER,
        _ => transport_offset,
    };

    Some(PacketLayout {
        version,
        protocol,
        transport_offset,
        payload_offset,
        end,
    })
}

/// Reads the TCP flags byte of a TCP segment.
pub fn tcp_flags(data: &[u8], layout: &PacketLayout) -> Option<u8> {
    if !layout.is_tcp() {
        return None;
    }
    data.get(layout.transport_offset + TCP_FLAGS_OFFSET).copied()
}

/// ORs `flags` into the TCP flags byte. Returns false for non-TCP packets.
pub fn set_tcp_flags(data: &mut [u8], layout: &PacketLayout, flags: u8) -> bool {
    if !layout.is_tcp() {
        return false;
    }
    match data.get_mut(layout.transport_offset + TCP_FLAGS_OFFSET) {
        Some(byte) => {
            *byte |= flags;
            true
        }
        None => false,
    }
}

/// Recomputes the IPv4 header checksum and the TCP/UDP checksum.
///
/// Returns false when the packet could not be parsed.
pub fn recompute_checksums(data: &mut [u8]) -> bool {
    let Some(layout) = parse_layout(data) else {
        return false;
    };

    if layout.version == IpVersion::V4 {
        recompute_ipv4_header_checksum(data, layout.transport_offset);
    }
    recompute_transport_checksum(data, &layout);
    true
}

/// True if every checksum present in the packet is valid.
pub fn checksums_valid(data: &[u8]) -> bool {
    let Some(layout) = parse_layout(data) else {
        return false;
    };

    if layout.version == IpVersion::V4
        && fold(ones_complement_sum(&data[..layout.transport_offset], 0)) != 0xFFFF
    {
        return false;
    }

    match checksum_field(&layout) {
        Some(field) => {
            if layout.is_udp() && data[field] == 0 && data[field + 1] == 0 {
                // Zero means "no checksum" for UDP over IPv4
                return layout.version == IpVersion::V4;
            }
            let sum = ones_complement_sum(
                &data[layout.transport_offset..layout.end],
                pseudo_header_sum(data, &layout),
            );
            fold(sum) == 0xFFFF
        }
        None => true,
    }
}

fn recompute_ipv4_header_checksum(data: &mut [u8], header_len: usize) {
    data[10] = 0;
    data[11] = 0;
    let checksum = !fold(ones_complement_sum(&data[..header_len], 0));
    data[10..12].copy_from_slice(&checksum.to_be_bytes());
}

fn recompute_transport_checksum(data: &mut [u8], layout: &PacketLayout) {
    let Some(field) = checksum_field(layout) else {
        return;
    };

    data[field] = 0;
    data[field + 1] = 0;
    let sum = ones_complement_sum(
        &data[layout.transport_offset..layout.end],
        pseudo_header_sum(data, layout),
    );
    let mut checksum = !fold(sum);
    if layout.is_udp() && checksum == 0 {
        checksum = 0xFFFF;
    }
    data[field..field + 2].copy_from_slice(&checksum.to_be_bytes());
}

fn checksum_field(layout: &PacketLayout) -> Option<usize> {
    if layout.is_tcp() {
        Some(layout.transport_offset + TCP_CHECKSUM_OFFSET)
    } else if layout.is_udp() {
        Some(layout.transport_offset + UDP_CHECKSUM_OFFSET)
    } else {
        None
    }
}

fn pseudo_header_sum(data: &[u8], layout: &PacketLayout) -> u32 {
    let segment_len = (layout.end - layout.transport_offset) as u32;
    let addresses = match layout.version {
        IpVersion::V4 => &data[12..20],
        IpVersion::V6 => &data[8..40],
    };
    ones_complement_sum(addresses, 0) + u32::from(layout.protocol) + (segment_len >> 16)
        + (segment_len & 0xFFFF)
}

fn ones_complement_sum(bytes: &[u8], initial: u32) -> u32 {
    let mut sum = initial;
    let mut chunks = bytes.chunks_exact(2);
    for pair in &mut chunks {
        sum += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// Builds an IPv4/UDP datagram with valid checksums.
pub fn build_ipv4_udp(
    source: Ipv4Addr,
    destination: Ipv4Addr,
    source_port: u16,
    destination_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut segment = Vec::with_capacity(UDP_HEADER + payload.len());
    segment.extend_from_slice(&source_port.to_be_bytes());
    segment.extend_from_slice(&destination_port.to_be_bytes());
    segment.extend_from_slice(&((UDP_HEADER + payload.len()) as u16).to_be_bytes());
    segment.extend_from_slice(&[0, 0]);
    segment.extend_from_slice(payload);
    build_ipv4(source, destination, PROTO_UDP, segment)
}

/// Builds an IPv4/TCP segment with the given flags and valid checksums.
pub fn build_ipv4_tcp(
    source: Ipv4Addr,
    destination: Ipv4Addr,
    source_port: u16,
    destination_port: u16,
    sequence: u32,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let mut segment = Vec::with_capacity(TCP_MIN_HEADER + payload.len());
    segment.extend_from_slice(&source_port.to_be_bytes());
    segment.extend_from_slice(&destination_port.to_be_bytes());
    segment.extend_from_slice(&sequence.to_be_bytes());
    segment.extend_from_slice(&0u32.to_be_bytes());
    segment.push((TCP_MIN_HEADER as u8 / 4) << 4);
    segment.push(flags);
    segment.extend_from_slice(&65_535u16.to_be_bytes());
    segment.extend_from_slice(&[0, 0, 0, 0]);
    segment.extend_from_slice(payload);
    build_ipv4(source, destination, PROTO_TCP, segment)
}

fn build_ipv4(source: Ipv4Addr, destination: Ipv4Addr, protocol: u8, segment: Vec<u8>) -> Vec<u8> {
    let total_len = (IPV4_MIN_HEADER + segment.len()) as u16;
    let mut packet = Vec::with_capacity(usize::from(total_len));
    packet.push(0x45);
    packet.push(0);
    packet.extend_from_slice(&total_len.to_be_bytes());
    packet.extend_from_slice(&[0, 0, 0x40, 0]);
    packet.push(64);
    packet.push(protocol);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&source.octets());
    packet.extend_from_slice(&destination.octets());
    packet.extend(segment);
    recompute_checksums(&mut packet);
    packet
}
