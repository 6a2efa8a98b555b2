//! EDNS(0) query padding (RFC 7830, RFC 8467).
//!
//! DoH queries travel inside TLS, but their lengths are still visible to
//! on-path observers. Padding every outgoing query to a fixed block
//! boundary removes that signal.

use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::EdnsOption;

/// Queries are padded to a multiple of this size (RFC 8467 §4.1).
pub const PADDING_BLOCK: usize = 128;

/// EDNS option code for Padding (RFC 7830).
const PADDING_CODE: u16 = 12;

/// OPTION-CODE plus OPTION-LENGTH, preceding the padding bytes on the wire.
const OPTION_HEADER_LEN: usize = 4;

/// Pads `query` so its serialized length lands on the next
/// [`PADDING_BLOCK`] boundary, adding an OPT pseudo-record when the query
/// carries none. A query that cannot be serialized is left untouched; the
/// client's own pack step reports that failure.
pub fn pad_query(query: &mut Message) {
    if query.extensions().is_none() {
        let mut edns = Edns::new();
        edns.set_max_payload(4096);
        edns.set_version(0);
        query.set_edns(edns);
    }

    let Ok(wire) = query.to_vec() else { return };

    let unpadded = wire.len() + OPTION_HEADER_LEN;
    let fill = (PADDING_BLOCK - unpadded % PADDING_BLOCK) % PADDING_BLOCK;

    if let Some(edns) = query.extensions_mut() {
        edns.options_mut()
            .insert(EdnsOption::Unknown(PADDING_CODE, vec![0; fill]));
    }
}
