//! SysEx command/response protocol
//!
//! A host editor reads and writes the preset library through numbered
//! request frames; the device answers with numbered response frames.
//! Frame layout on the wire:
//!
//! request:  `[0xF0, device_id, request_code, payload.., 0xF7]`
//! response: `[0xF0, device_id, response_code, payload.., 0xF7]`
//!
//! This module owns the codes and the framing; the side effects live in
//! [`crate::app`].

/// Device ID carried in every frame. Frames addressed to any other ID are
/// silently discarded.
pub const DEVICE_ID: u8 = 23;

/// Header bytes preceding the payload (start marker, device ID, code).
const HEADER_LEN: usize = 3;

/// Host-to-device request codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    RequestControllerPresetState,
    SendControllerPresetState,
    RequestRackPresetState,
    SendRackPresetState,
    RequestRackLoopNames,
    SendRackLoopNames,
    RequestControllerPresetIds,
    RequestRackPresetIds,
    Ping,
    Reset,
}

impl Request {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Request::RequestControllerPresetState),
            1 => Some(Request::SendControllerPresetState),
            2 => Some(Request::RequestRackPresetState),
            3 => Some(Request::SendRackPresetState),
            4 => Some(Request::RequestRackLoopNames),
            5 => Some(Request::SendRackLoopNames),
            6 => Some(Request::RequestControllerPresetIds),
            7 => Some(Request::RequestRackPresetIds),
            8 => Some(Request::Ping),
            9 => Some(Request::Reset),
            _ => None,
        }
    }
}

/// Device-to-host response codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    ReceiveControllerPresetState,
    ReceiveRackPresetState,
    ReceiveControllerPresetIds,
    ReceiveRackPresetIds,
    ReceiveRackLoopNames,
    Pong,
}

impl Response {
    pub fn byte(self) -> u8 {
        match self {
            Response::ReceiveControllerPresetState => 0,
            Response::ReceiveRackPresetState => 1,
            Response::ReceiveControllerPresetIds => 2,
            Response::ReceiveRackPresetIds => 3,
            Response::ReceiveRackLoopNames => 4,
            Response::Pong => 5,
        }
    }
}

/// A decoded request frame: the code plus its payload slice.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestFrame<'a> {
    pub request: Request,
    pub payload: &'a [u8],
}

/// Decode a complete inbound SysEx frame.
///
/// Returns `None` for frames addressed to another device, truncated frames,
/// and unrecognized request codes; all of those are silent no-ops.
pub fn decode_request(frame: &[u8]) -> Option<RequestFrame<'_>> {
    if frame.len() < HEADER_LEN + 1 {
        return None;
    }
    if frame[1] != DEVICE_ID {
        return None;
    }
    let request = Request::from_byte(frame[2])?;
    // Strip the three header bytes and the trailing end marker.
    Some(RequestFrame {
        request,
        payload: &frame[HEADER_LEN..frame.len() - 1],
    })
}

/// Build a response body: 2-byte header followed by the payload. The
/// transport wraps it in the SysEx envelope.
pub fn encode_response(response: Response, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + payload.len());
    body.push(DEVICE_ID);
    body.push(response.byte());
    body.extend_from_slice(payload);
    body
}
