use weezl::decode::Decoder;
use weezl::BitOrder;

use crate::{Dictionary, Error, Result};

/// PDF's `/LZWDecode` uses MSB-first bit packing and, unless `/EarlyChange 0` says otherwise,
/// bumps the code width one symbol before the table is actually full (the "early change"
/// TIFF/GIF-LZW convention `weezl` models directly).
pub fn decode(data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    let early_change = match parms.and_then(|d| d.get(b"EarlyChange").ok()) {
        Some(obj) => obj.as_i64()? != 0,
        None => true,
    };
    let min_code_width = 8;
    let mut decoder = if early_change {
        Decoder::new(BitOrder::Msb, min_code_width)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, min_code_width)
    };
    decoder
        .decode(data)
        .map_err(|e| Error::Filter(format!("LZWDecode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_round_trip_from_weezl_encoder() {
        let mut encoder = weezl::encode::Encoder::new(BitOrder::Msb, 8);
        let input = b"PDF LZW test data test data test data".to_vec();
        let compressed = encoder.encode(&input).unwrap();
        let decoded = decode(&compressed, None).unwrap();
        assert_eq!(decoded, input);
    }
}
