//! Wire framing for the device-bridge host protocol.
//!
//! Two framing conventions share one socket:
//! - Host requests and small responses: 4 hex digits of payload length,
//!   then the UTF-8 payload. The daemon answers with a status token
//!   (`OKAY`, or `FAIL` followed by a length-prefixed message).
//! - The sync sub-protocol: a 4-byte ASCII tag, a 4-byte little-endian
//!   length, then that many payload bytes.
//!
//! Shell output is an unframed byte stream, turned into text lines by
//! [`LineDecoder`].

pub mod codec;
pub mod error;
pub mod line;
pub mod reader;
pub mod status;
pub mod sync;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_length_prefixed, encode_length_prefixed, encode_request, encode_request_into,
    parse_hex_length, FrameConfig, DEFAULT_MAX_SYNC_MESSAGE, LENGTH_PREFIX_SIZE,
    MAX_REQUEST_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use line::LineDecoder;
pub use reader::FrameReader;
pub use status::{decode_status, encode_status, Status};
pub use sync::{
    decode_list_item, decode_stat, decode_sync_packet, decode_sync_reply, encode_sync_header,
    encode_sync_request, DirEntry, FileStat, ListItem, SyncPacket, SyncReply, SyncTag,
    SYNC_HEADER_SIZE, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK,
};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::{LineCodec, SyncPacketCodec};
