//! Record key encoding.
//!
//! Every row lives under `t{id}_r{handle}` where `id` is the identifier of the physical
//! table owning it. For a partitioned table that is the partition id, never the id of the
//! logical table. Integers are encoded big-endian with the sign bit flipped so that the
//! byte order of keys matches the numeric order of handles.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::datum::Handle;

pub const TABLE_PREFIX: u8 = b't';
pub const RECORD_PREFIX_SEP: &[u8] = b"_r";

/// Length of `t{id}_r`.
pub const RECORD_PREFIX_LENGTH: usize = 1 + 8 + 2;

/// Length of `t{id}_r{handle}`.
pub const RECORD_KEY_LENGTH: usize = RECORD_PREFIX_LENGTH + 8;

const SIGN_MASK: u64 = 0x8000_0000_0000_0000;

pub fn encode_int(buf: &mut BytesMut, value: i64) {
    buf.put_u64(value as u64 ^ SIGN_MASK);
}

pub fn decode_int<B: Buf>(buf: &mut B) -> i64 {
    (buf.get_u64() ^ SIGN_MASK) as i64
}

pub fn record_prefix(id: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(RECORD_PREFIX_LENGTH);
    put_record_prefix(&mut buf, id);
    buf.freeze()
}

pub fn record_key(id: i64, handle: Handle) -> Bytes {
    let mut buf = BytesMut::with_capacity(RECORD_KEY_LENGTH);
    put_record_prefix(&mut buf, id);
    encode_int(&mut buf, handle);
    buf.freeze()
}

/// Split a record key into `(physical table id, handle)`.
pub fn decode_record_key(key: &[u8]) -> Option<(i64, Handle)> {
    if key.len() != RECORD_KEY_LENGTH || key[0] != TABLE_PREFIX {
        return None;
    }
    if &key[9..RECORD_PREFIX_LENGTH] != RECORD_PREFIX_SEP {
        return None;
    }
    let mut id = &key[1..9];
    let mut handle = &key[RECORD_PREFIX_LENGTH..];
    Some((decode_int(&mut id), decode_int(&mut handle)))
}

fn put_record_prefix(buf: &mut BytesMut, id: i64) {
    buf.put_u8(TABLE_PREFIX);
    encode_int(buf, id);
    buf.put_slice(RECORD_PREFIX_SEP);
}
