//! JDWP transport layer: handshake and packet framing.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::JdwpError;

/// The 14 bytes both sides exchange before any packet.
pub const HANDSHAKE: &[u8; 14] = b"JDWP-Handshake";

/// Size of every packet header.
pub const HEADER_LEN: usize = 11;

/// Flag bit marking a reply packet.
pub const REPLY_FLAG: u8 = 0x80;

/// Upper bound on a single packet, to reject garbage lengths early.
const MAX_PACKET_LEN: usize = 64 * 1024 * 1024;

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A command, sent by either side. The VM only sends event composites.
    Command {
        id: u32,
        command_set: u8,
        command: u8,
        data: Vec<u8>,
    },
    /// A reply to a command we sent.
    Reply {
        id: u32,
        error_code: u16,
        data: Vec<u8>,
    },
}

impl Packet {
    pub fn id(&self) -> u32 {
        match self {
            Packet::Command { id, .. } | Packet::Reply { id, .. } => *id,
        }
    }
}

/// Encode a command packet.
pub fn encode_command(id: u32, command_set: u8, command: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
    buf.extend_from_slice(&((HEADER_LEN + data.len()) as u32).to_be_bytes());
    buf.extend_from_slice(&id.to_be_bytes());
    buf.push(0);
    buf.push(command_set);
    buf.push(command);
    buf.extend_from_slice(data);
    buf
}

/// Encode a reply packet.
pub fn encode_reply(id: u32, error_code: u16, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
    buf.extend_from_slice(&((HEADER_LEN + data.len()) as u32).to_be_bytes());
    buf.extend_from_slice(&id.to_be_bytes());
    buf.push(REPLY_FLAG);
    buf.extend_from_slice(&error_code.to_be_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Decode one packet from the front of `data`.
///
/// Returns the packet and the number of bytes consumed, or a `Decode`
/// error if the buffer does not yet hold a complete packet.
pub fn decode_packet(data: &[u8]) -> Result<(Packet, usize), JdwpError> {
    if data.len() < HEADER_LEN {
        return Err(JdwpError::Decode(format!(
            "incomplete header: have {} bytes",
            data.len()
        )));
    }
    let header: [u8; HEADER_LEN] = data[..HEADER_LEN]
        .try_into()
        .map_err(|_| JdwpError::Decode("header slice".into()))?;
    let length = packet_length(&header)?;
    if data.len() < length {
        return Err(JdwpError::Decode(format!(
            "incomplete packet: expected {length} bytes, have {}",
            data.len()
        )));
    }
    let packet = assemble(&header, data[HEADER_LEN..length].to_vec());
    Ok((packet, length))
}

fn packet_length(header: &[u8; HEADER_LEN]) -> Result<usize, JdwpError> {
    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&length) {
        return Err(JdwpError::Decode(format!("invalid packet length {length}")));
    }
    Ok(length)
}

fn assemble(header: &[u8; HEADER_LEN], data: Vec<u8>) -> Packet {
    let id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if header[8] & REPLY_FLAG != 0 {
        Packet::Reply {
            id,
            error_code: u16::from_be_bytes([header[9], header[10]]),
            data,
        }
    } else {
        Packet::Command {
            id,
            command_set: header[9],
            command: header[10],
            data,
        }
    }
}

/// Read exactly one packet from a stream.
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Packet, JdwpError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let length = packet_length(&header)?;
    let mut data = vec![0u8; length - HEADER_LEN];
    reader.read_exact(&mut data).await?;
    Ok(assemble(&header, data))
}

/// Perform the client side of the handshake.
pub async fn handshake<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> Result<(), JdwpError> {
    stream.write_all(HANDSHAKE).await?;
    stream.flush().await?;
    let mut answer = [0u8; 14];
    stream.read_exact(&mut answer).await?;
    if &answer != HANDSHAKE {
        return Err(JdwpError::Handshake(
            String::from_utf8_lossy(&answer).into_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_encode_command_header() {
        let bytes = encode_command(7, 1, 7, &[]);
        assert_eq!(bytes, vec![0, 0, 0, 11, 0, 0, 0, 7, 0, 1, 7]);
    }

    #[test]
    fn transport_decode_reply() {
        let bytes = encode_reply(3, 0, &[9, 9]);
        let (packet, consumed) = decode_packet(&bytes).unwrap();
        assert_eq!(consumed, 13);
        assert_eq!(
            packet,
            Packet::Reply {
                id: 3,
                error_code: 0,
                data: vec![9, 9]
            }
        );
    }

    #[test]
    fn transport_decode_command() {
        let bytes = encode_command(42, 64, 100, &[2, 0, 0, 0, 0]);
        let (packet, _) = decode_packet(&bytes).unwrap();
        match packet {
            Packet::Command {
                id,
                command_set,
                command,
                data,
            } => {
                assert_eq!(id, 42);
                assert_eq!(command_set, 64);
                assert_eq!(command, 100);
                assert_eq!(data.len(), 5);
            }
            Packet::Reply { .. } => panic!("expected command"),
        }
    }

    #[test]
    fn transport_incomplete_header() {
        assert!(decode_packet(&[0, 0, 0]).is_err());
    }

    #[test]
    fn transport_incomplete_body() {
        let bytes = encode_reply(1, 0, &[1, 2, 3, 4]);
        assert!(decode_packet(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn transport_rejects_short_length() {
        let mut bytes = encode_reply(1, 0, &[]);
        bytes[3] = 4;
        assert!(matches!(decode_packet(&bytes), Err(JdwpError::Decode(_))));
    }

    #[test]
    fn transport_multiple_packets_in_buffer() {
        let mut buf = encode_reply(1, 0, &[1]);
        buf.extend(encode_reply(2, 101, &[]));
        let (first, used) = decode_packet(&buf).unwrap();
        let (second, _) = decode_packet(&buf[used..]).unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert!(matches!(second, Packet::Reply { error_code: 101, .. }));
    }

    #[tokio::test]
    async fn transport_read_packet_from_stream() {
        let bytes = encode_reply(5, 0, &[1, 2, 3]);
        let mut reader = &bytes[..];
        let packet = read_packet(&mut reader).await.unwrap();
        assert_eq!(packet.id(), 5);
    }

    #[tokio::test]
    async fn transport_handshake_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let vm = tokio::spawn(async move {
            let mut buf = [0u8; 14];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, HANDSHAKE);
            server.write_all(HANDSHAKE).await.unwrap();
        });
        handshake(&mut client).await.unwrap();
        vm.await.unwrap();
    }

    #[tokio::test]
    async fn transport_handshake_rejects_wrong_answer() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut buf = [0u8; 14];
            server.read_exact(&mut buf).await.unwrap();
            server.write_all(b"HTTP/1.1 400 B").await.unwrap();
        });
        let err = handshake(&mut client).await.unwrap_err();
        assert!(matches!(err, JdwpError::Handshake(_)));
    }
}
