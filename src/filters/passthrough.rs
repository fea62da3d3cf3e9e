use crate::Result;

/// Image/fax codecs (`/DCTDecode`, `/JBIG2Decode`, `/JPXDecode`, `/CCITTFaxDecode`) are left
/// encoded; this crate reads and writes object-level PDF structure, not image pixels, so the
/// bytes are returned exactly as stored. A caller that wants the decoded raster should hand
/// these bytes to a dedicated image codec crate.
pub fn identity(data: &[u8]) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}
