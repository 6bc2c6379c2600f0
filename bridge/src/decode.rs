//! Decoding of remote write request bodies.

use prost::Message;

use crate::error::{Error, Result};
use crate::proto::WriteRequest;

/// Decode a snappy-compressed protobuf `WriteRequest`.
///
/// The body uses the snappy block format, not the framed stream format.
pub fn decode_write_request(body: &[u8]) -> Result<WriteRequest> {
    let decompressed = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    WriteRequest::decode(decompressed.as_slice())
        .map_err(|e| Error::Deserialization(e.to_string()))
}
