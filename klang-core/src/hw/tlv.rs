//! TLV transmission buffer marshalling.
//!
//! The variable-size exchange ships one contiguous block: a two-word header
//! (target numid, payload length in bytes) followed by the payload words.
//! On read the device declares how much it returned; that size is validated
//! against the caller's capacity before a single byte is copied back.

use crate::error::{CtlError, Result};
use crate::hw::ioctl::{CtlTransport, Op};
use crate::ops::TlvMode;

const WORD: usize = std::mem::size_of::<u32>();

/// Words occupied by the transmission header (numid, length).
const HEADER_WORDS: usize = 2;

/// Word index of the declared data length within the returned payload.
const PAYLOAD_LEN_WORD: usize = 1;

const fn op_for(mode: TlvMode) -> Op {
    match mode {
        TlvMode::Command => Op::TlvCommand,
        TlvMode::Read => Op::TlvRead,
        TlvMode::Write => Op::TlvWrite,
    }
}

/// Run one TLV exchange. The version gate has already been checked by the
/// caller; this only marshals, exchanges, and validates sizes.
pub(crate) fn exchange<T: CtlTransport>(
    transport: &mut T,
    mode: TlvMode,
    numid: u32,
    buf: &mut [u32],
) -> Result<()> {
    let op = op_for(mode);
    let capacity = buf.len() * WORD;

    // Transmission block: header plus payload, one allocation, released on
    // every exit path when it drops.
    let mut block: Vec<u32> = Vec::new();
    block
        .try_reserve_exact(HEADER_WORDS + buf.len())
        .map_err(|_| CtlError::OutOfMemory)?;
    block.push(numid);
    block.push(capacity as u32);
    block.extend_from_slice(buf);

    transport
        .ioctl(op, words_as_bytes_mut(&mut block))
        .map_err(|e| CtlError::sys(op.name(), e))?;

    if mode == TlvMode::Read {
        // Returned size: the declared data length plus the two-word
        // type/length prefix of the payload itself.
        let header = 2 * WORD;
        if buf.len() < HEADER_WORDS {
            return Err(CtlError::TlvTooLarge { needed: header, capacity });
        }
        let declared = block[HEADER_WORDS + PAYLOAD_LEN_WORD] as usize;
        let size = declared + header;
        if size > capacity {
            return Err(CtlError::TlvTooLarge { needed: size, capacity });
        }
        let src = words_as_bytes(&block[HEADER_WORDS..]);
        words_as_bytes_mut(buf)[..size].copy_from_slice(&src[..size]);
    }
    Ok(())
}

fn words_as_bytes(words: &[u32]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(words.as_ptr().cast(), words.len() * WORD) }
}

fn words_as_bytes_mut(words: &mut [u32]) -> &mut [u8] {
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr().cast(), words.len() * WORD) }
}
