//! LoRaWAN 1.0 data frames for an ABP session
//!
//! # Frame format
//!
//! ```text
//! [MHDR: u8][DevAddr: u32 LE][FCtrl: u8][FCnt: u16 LE][FOpts: 0-15][FPort: u8][FRMPayload][MIC: 4]
//! ```
//!
//! Encryption and the MIC come from the `lorawan` crate. This module adds the
//! session handling around it: device address filtering, 32-bit downlink
//! counter recovery and replay rejection.

use crate::config::protocol::{MAX_APP_PAYLOAD, MAX_LORA_PAYLOAD};
use crate::session::Session;
use heapless::Vec;
use lorawan::creator::DataPayloadCreator;
use lorawan::default_crypto::DefaultFactory;
use lorawan::keys::{AppSKey, NewSKey};
use lorawan::maccommands::SerializableMacCommand;
use lorawan::parser::{parse, DataPayload, PhyPayload};

/// Encoded PHY payload
pub type FrameBuf = Vec<u8, MAX_LORA_PAYLOAD>;

/// MHDR message types (upper three bits)
mod mtype {
    pub const UNCONFIRMED_DOWN: u8 = 0x60;
    pub const CONFIRMED_DOWN: u8 = 0xA0;
    pub const MASK: u8 = 0xE0;
}

/// FCtrl bits
mod fctrl {
    pub const ACK: u8 = 0x20;
    pub const FPENDING: u8 = 0x10;
    pub const FOPTS_LEN: u8 = 0x0F;
}

/// MHDR + DevAddr + FCtrl + FCnt
const HEADER_LEN: usize = 8;
const MIC_LEN: usize = 4;

/// Errors from building or parsing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame shorter than header + MIC
    TooShort,
    /// Payload or FOpts do not fit
    TooLong,
    /// Not a data-down frame
    UnsupportedType(u8),
    /// Addressed to another device
    WrongDevice(u32),
    /// Message integrity code mismatch
    BadMic,
    /// Counter not above the last accepted downlink
    Replayed(u32),
}

/// LinkCheckReq, a MAC command without payload
struct LinkCheckReq;

impl SerializableMacCommand for LinkCheckReq {
    fn payload_bytes(&self) -> &[u8] {
        &[]
    }

    fn cid(&self) -> u8 {
        0x02
    }

    fn payload_len(&self) -> usize {
        0
    }
}

/// Data-up frame contents
#[derive(Debug, Clone, Copy)]
pub struct Uplink<'a> {
    pub fcnt: u32,
    pub port: u8,
    pub payload: &'a [u8],
    pub confirmed: bool,
    /// Piggyback a LinkCheckReq in FOpts
    pub link_check: bool,
}

/// Parsed data-down frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downlink {
    pub confirmed: bool,
    /// Network acknowledged our last confirmed uplink
    pub ack: bool,
    pub frame_pending: bool,
    /// Reconstructed 32-bit downlink counter
    pub fcnt: u32,
    pub fopts: Vec<u8, 15>,
    pub port: Option<u8>,
    /// Decrypted application payload
    pub payload: Vec<u8, MAX_APP_PAYLOAD>,
}

/// Build an encrypted, MIC-protected data-up frame.
pub fn encode_uplink(session: &Session, uplink: &Uplink) -> Result<FrameBuf, FrameError> {
    if uplink.payload.len() > MAX_APP_PAYLOAD {
        return Err(FrameError::TooLong);
    }

    let mut buf = [0u8; MAX_LORA_PAYLOAD];
    let mut creator = DataPayloadCreator::with_options(&mut buf[..], DefaultFactory).map_err(|_| FrameError::TooLong)?;
    let dev_addr = session.dev_addr.to_le_bytes();
    creator
        .set_uplink(true)
        .set_confirmed(uplink.confirmed)
        .set_dev_addr(&dev_addr)
        .set_fcnt(uplink.fcnt)
        .set_f_port(uplink.port);

    let link_check = LinkCheckReq;
    let commands: &[&dyn SerializableMacCommand] = if uplink.link_check {
        &[&link_check]
    } else {
        &[]
    };

    let frame = creator
        .build(
            uplink.payload,
            commands,
            &NewSKey::from(session.nwk_skey),
            &AppSKey::from(session.app_skey),
        )
        .map_err(|_| FrameError::TooLong)?;
    FrameBuf::from_slice(frame).map_err(|_| FrameError::TooLong)
}

/// Verify and decrypt a data-down frame.
///
/// `last_fcnt` is the counter of the last accepted downlink, `None` before
/// the first one. It recovers the upper 16 bits of the frame counter, and a
/// frame not above it is rejected as a replay.
pub fn decode_downlink(
    session: &Session,
    frame: &[u8],
    last_fcnt: Option<u32>,
) -> Result<Downlink, FrameError> {
    if frame.len() < HEADER_LEN + MIC_LEN {
        return Err(FrameError::TooShort);
    }

    let confirmed = match frame[0] & mtype::MASK {
        mtype::UNCONFIRMED_DOWN => false,
        mtype::CONFIRMED_DOWN => true,
        other => return Err(FrameError::UnsupportedType(other)),
    };

    let dev_addr = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
    if dev_addr != session.dev_addr {
        return Err(FrameError::WrongDevice(dev_addr));
    }

    let ctrl = frame[5];
    let low = u16::from_le_bytes([frame[6], frame[7]]);
    let fcnt = match last_fcnt {
        Some(last) => {
            let fcnt = extend_fcnt(low, last);
            if fcnt <= last {
                return Err(FrameError::Replayed(fcnt));
            }
            fcnt
        }
        None => low as u32,
    };

    let fopts_end = HEADER_LEN + (ctrl & fctrl::FOPTS_LEN) as usize;
    let payload_end = frame.len() - MIC_LEN;
    if fopts_end > payload_end {
        return Err(FrameError::TooShort);
    }

    // Decrypted in place, FRMPayload is read back from the buffer
    let mut buf = FrameBuf::from_slice(frame).map_err(|_| FrameError::TooLong)?;
    match parse(&mut buf[..]) {
        Ok(PhyPayload::Data(DataPayload::Encrypted(encrypted))) => {
            encrypted
                .decrypt_if_mic_ok(
                    NewSKey::from(session.nwk_skey).inner(),
                    AppSKey::from(session.app_skey).inner(),
                    fcnt,
                )
                .map_err(|_| FrameError::BadMic)?;
        }
        _ => return Err(FrameError::TooShort),
    }

    let fopts = Vec::from_slice(&frame[HEADER_LEN..fopts_end]).map_err(|_| FrameError::TooLong)?;
    let (port, payload) = match buf.get(fopts_end) {
        Some(&port) if fopts_end < payload_end => (
            Some(port),
            Vec::from_slice(&buf[fopts_end + 1..payload_end]).map_err(|_| FrameError::TooLong)?,
        ),
        _ => (None, Vec::new()),
    };

    Ok(Downlink {
        confirmed,
        ack: ctrl & fctrl::ACK != 0,
        frame_pending: ctrl & fctrl::FPENDING != 0,
        fcnt,
        fopts,
        port,
        payload,
    })
}

/// Forge an unconfirmed data-down frame, as a network server would send it
#[cfg(test)]
pub fn encode_downlink(session: &Session, ack: bool, fcnt: u32, port: u8, payload: &[u8]) -> FrameBuf {
    use lorawan::parser::FCtrl;

    let mut buf = [0u8; MAX_LORA_PAYLOAD];
    let mut creator = DataPayloadCreator::with_options(&mut buf[..], DefaultFactory).unwrap();
    let dev_addr = session.dev_addr.to_le_bytes();
    let ctrl = if ack { fctrl::ACK } else { 0 };
    creator
        .set_uplink(false)
        .set_confirmed(false)
        .set_dev_addr(&dev_addr)
        .set_fctrl(&FCtrl::new(ctrl, false))
        .set_fcnt(fcnt)
        .set_f_port(port);
    let frame = creator
        .build(
            payload,
            &[],
            &NewSKey::from(session.nwk_skey),
            &AppSKey::from(session.app_skey),
        )
        .unwrap();
    FrameBuf::from_slice(frame).unwrap()
}

/// Recover a 32-bit counter from its transmitted low 16 bits
fn extend_fcnt(low: u16, last: u32) -> u32 {
    let candidate = (last & 0xFFFF_0000) | low as u32;
    if candidate < last {
        candidate.wrapping_add(0x1_0000)
    } else {
        candidate
    }
}
