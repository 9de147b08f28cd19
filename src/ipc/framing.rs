// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Length-prefixed framing
//!
//! ```text
//! +----------------------------+------------------+
//! | Length (4 bytes, BE)       | Payload (JSON)   |
//! +----------------------------+------------------+
//! ```
//!
//! A frame whose declared length exceeds the limit is not buffered: the
//! codec yields [`Frame::Oversized`] and then discards exactly that many
//! bytes, so the next frame boundary is still known.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

pub const LENGTH_PREFIX_LEN: usize = 4;

pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(Bytes),
    /// Announced payload was larger than the limit and is being skipped
    Oversized { declared: usize },
}

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
    discarding: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            discarding: 0,
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn skip(&mut self, src: &mut BytesMut) {
        let n = self.discarding.min(src.len());
        src.advance(n);
        self.discarding -= n;
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if self.discarding > 0 {
            self.skip(src);
            if self.discarding > 0 {
                return Ok(None);
            }
        }

        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let declared = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if declared > self.max_frame_len {
            src.advance(LENGTH_PREFIX_LEN);
            self.discarding = declared;
            self.skip(src);
            return Ok(Some(Frame::Oversized { declared }));
        }

        let total = LENGTH_PREFIX_LEN + declared;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        Ok(Some(Frame::Message(src.split_to(declared).freeze())))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), io::Error> {
        let len = u32::try_from(item.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds u32 length prefix", item.len()),
            )
        })?;

        dst.reserve(LENGTH_PREFIX_LEN + item.len());
        dst.put_u32(len);
        dst.extend_from_slice(&item);
        Ok(())
    }
}
