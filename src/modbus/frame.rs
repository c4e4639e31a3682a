use log::warn;

use super::crc::crc16_modbus;
use crate::utils::error::ModbusError;

/// The only function code this stack issues.
pub const FUNC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// High bit of the function code marks an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Smallest frame worth inspecting: address, function, one payload byte, CRC.
pub const MIN_RESPONSE_LEN: usize = 5;

/// What to do with the CRC trailer of received frames.
///
/// The legacy collector never verified response CRCs, so lenient handling is
/// the default; strict mode is an opt-in via `verify_response_crc` in the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcMode {
    /// Compute and compare, log a warning on mismatch, accept the frame.
    #[default]
    Lenient,
    /// Reject mismatching frames with `CrcMismatch`.
    Strict,
}

/// Build a serial-style read request frame: 6 big-endian header bytes plus
/// the CRC16 trailer in little-endian order. Always 8 bytes.
pub fn build_read_request(slave_id: u8, function: u8, start_register: u16, count: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8);
    frame.push(slave_id);
    frame.push(function);
    frame.extend_from_slice(&start_register.to_be_bytes());
    frame.extend_from_slice(&count.to_be_bytes());

    let crc = crc16_modbus(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Human-readable meaning of a Modbus exception code.
pub fn exception_message(code: u8) -> &'static str {
    match code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "slave device failure",
        0x05 => "acknowledge",
        0x06 => "slave device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target device failed to respond",
        _ => "unknown error",
    }
}

/// Parse a raw response buffer into register values.
///
/// The slave address byte is informational only and never validated; field
/// gateways rewrite it in transit. Returns at least `expected_registers`
/// values on success, so callers may index up to that count directly.
pub fn decode_response(
    raw: &[u8],
    expected_registers: u16,
    crc_mode: CrcMode,
) -> Result<Vec<u16>, ModbusError> {
    if raw.len() < MIN_RESPONSE_LEN {
        warn!("Response too short ({} bytes): {}", raw.len(), hex::encode(raw));
        return Err(ModbusError::ShortResponse(raw.len()));
    }

    let function = raw[1];
    if function & EXCEPTION_FLAG != 0 {
        let code = raw[2];
        return Err(ModbusError::DeviceError {
            code,
            message: exception_message(code),
        });
    }

    let byte_count = raw[2] as usize;
    let payload_end = 3 + byte_count;
    if raw.len() < payload_end + 2 {
        warn!(
            "Truncated response (byte count {}, got {} bytes): {}",
            byte_count,
            raw.len(),
            hex::encode(raw)
        );
        return Err(ModbusError::ShortResponse(raw.len()));
    }

    let received_crc = u16::from_le_bytes([raw[payload_end], raw[payload_end + 1]]);
    let computed_crc = crc16_modbus(&raw[..payload_end]);
    if received_crc != computed_crc {
        match crc_mode {
            CrcMode::Strict => {
                return Err(ModbusError::CrcMismatch {
                    expected: computed_crc,
                    actual: received_crc,
                })
            }
            CrcMode::Lenient => warn!(
                "Response CRC mismatch (computed {:#06x}, received {:#06x}), accepting frame",
                computed_crc, received_crc
            ),
        }
    }

    let mut registers = Vec::with_capacity(byte_count / 2);
    for pair in raw[3..payload_end].chunks_exact(2) {
        registers.push(u16::from_be_bytes([pair[0], pair[1]]));
    }

    if registers.len() < expected_registers as usize {
        return Err(ModbusError::InvalidData(format!(
            "expected {} registers, device returned {}",
            expected_registers,
            registers.len()
        )));
    }

    Ok(registers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_frame(header_and_payload: &[u8]) -> Vec<u8> {
        let mut frame = header_and_payload.to_vec();
        let crc = crc16_modbus(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    #[test]
    fn test_build_read_request() {
        // Environment temperature request from the PK9019 manual.
        let frame = build_read_request(0x01, FUNC_READ_HOLDING_REGISTERS, 0x0001, 0x0001);
        assert_eq!(frame, [0x01, 0x03, 0x00, 0x01, 0x00, 0x01, 0xD5, 0xCA]);

        let frame = build_read_request(0x01, FUNC_READ_HOLDING_REGISTERS, 0x0002, 0x0008);
        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[..6], &[0x01, 0x03, 0x00, 0x02, 0x00, 0x08]);
    }

    #[test]
    fn test_decode_normal_response() {
        let raw = response_frame(&[0x01, 0x03, 0x04, 0x00, 0xEB, 0x01, 0xC3]);
        let registers = decode_response(&raw, 2, CrcMode::Strict).unwrap();
        assert_eq!(registers, vec![235, 451]);
    }

    #[test]
    fn test_round_trip() {
        let values: [u16; 8] = [123, 0x5555, 300, 250, 0, 1000, 0x5555, 5];
        let mut body = vec![0x01, 0x03, 16];
        for v in values {
            body.extend_from_slice(&v.to_be_bytes());
        }
        let raw = response_frame(&body);
        let registers = decode_response(&raw, 8, CrcMode::Strict).unwrap();
        assert_eq!(registers, values);
    }

    #[test]
    fn test_decode_exception_response() {
        let err = decode_response(&[0x01, 0x83, 0x02, 0xC0, 0xF1], 1, CrcMode::Lenient).unwrap_err();
        match err {
            ModbusError::DeviceError { code, message } => {
                assert_eq!(code, 0x02);
                assert_eq!(message, "illegal data address");
            }
            other => panic!("expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_exception_code() {
        let raw = response_frame(&[0x01, 0x83, 0x7F]);
        let err = decode_response(&raw, 1, CrcMode::Lenient).unwrap_err();
        match err {
            ModbusError::DeviceError { code, message } => {
                assert_eq!(code, 0x7F);
                assert_eq!(message, "unknown error");
            }
            other => panic!("expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_short_response() {
        let err = decode_response(&[0x01, 0x03, 0x02], 1, CrcMode::Lenient).unwrap_err();
        assert!(matches!(err, ModbusError::ShortResponse(3)));
    }

    #[test]
    fn test_truncated_payload() {
        // Claims 16 payload bytes but carries only 2 plus trailer.
        let raw = [0x01, 0x03, 0x10, 0x00, 0xFA, 0x00, 0x00];
        let err = decode_response(&raw, 8, CrcMode::Lenient).unwrap_err();
        assert!(matches!(err, ModbusError::ShortResponse(7)));
    }

    #[test]
    fn test_crc_mismatch_strict_vs_lenient() {
        let mut raw = response_frame(&[0x01, 0x03, 0x02, 0x00, 0xFA]);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;

        let err = decode_response(&raw, 1, CrcMode::Strict).unwrap_err();
        assert!(matches!(err, ModbusError::CrcMismatch { .. }));

        // Lenient mode matches the legacy collector: accept and decode.
        let registers = decode_response(&raw, 1, CrcMode::Lenient).unwrap();
        assert_eq!(registers, vec![250]);
    }

    #[test]
    fn test_fewer_registers_than_expected() {
        let raw = response_frame(&[0x01, 0x03, 0x02, 0x00, 0xFA]);
        let err = decode_response(&raw, 8, CrcMode::Strict).unwrap_err();
        assert!(matches!(err, ModbusError::InvalidData(_)));
    }
}
