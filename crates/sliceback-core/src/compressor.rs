//! Per-file compression into a scratch buffer, streamed in fixed-size
//! blocks so cancellation can be observed between them.

use std::io::Read;
use std::io::Write;

use bzip2::Compression as BzCompression;
use bzip2::write::BzEncoder;
use flate2::Compression as GzCompression;
use flate2::write::GzEncoder;

use crate::Error;
use crate::Result;
use crate::cancellation::CancellationToken;
use crate::config::Codec;
use crate::io::CountingWriter;

/// Block size used for every compressor read, matching the original
/// implementation's buffer size.
const BLOCK_SIZE: usize = 8192;

/// Blocks copied between cancellation checks.
const CHECK_EVERY_N_BLOCKS: u32 = 50;

/// The filename suffix appended to a compressed entry's archive name.
#[must_use]
pub const fn extension_for(codec: Codec) -> &'static str {
    codec.extension()
}

enum CodecWriter<'a> {
    None(CountingWriter<&'a mut dyn Write>),
    Gzip(GzEncoder<CountingWriter<&'a mut dyn Write>>),
    Bzip2(BzEncoder<CountingWriter<&'a mut dyn Write>>),
}

impl Write for CodecWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::None(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Bzip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::None(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Bzip2(w) => w.flush(),
        }
    }
}

impl CodecWriter<'_> {
    fn finish(self) -> Result<u64> {
        let written = match self {
            Self::None(w) => w.total_bytes(),
            Self::Gzip(w) => w.finish()?.total_bytes(),
            Self::Bzip2(w) => w.finish()?.total_bytes(),
        };
        Ok(written)
    }
}

fn make_encoder<'a>(codec: Codec, dst: &'a mut dyn Write) -> CodecWriter<'a> {
    let counted = CountingWriter::new(dst);
    match codec {
        Codec::None => CodecWriter::None(counted),
        Codec::Gzip => CodecWriter::Gzip(GzEncoder::new(counted, GzCompression::default())),
        Codec::Bzip2 => CodecWriter::Bzip2(BzEncoder::new(counted, BzCompression::default())),
    }
}

/// Streams `src` through `codec` into `dst` in 8 KiB blocks, returning the
/// number of compressed bytes written.
///
/// Checks `cancel` every [`CHECK_EVERY_N_BLOCKS`] blocks; on cancellation,
/// stops immediately and returns [`Error::Cancelled`] without finalizing
/// the codec trailer, leaving `dst` holding a truncated, discardable
/// stream.
///
/// # Errors
///
/// Returns [`Error::Io`] if reading `src` or writing `dst` fails, or
/// [`Error::Cancelled`] if `cancel` is observed mid-stream.
pub fn compress(
    codec: Codec,
    src: &mut dyn Read,
    dst: &mut dyn Write,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut encoder = make_encoder(codec, dst);
    let mut buf = [0u8; BLOCK_SIZE];
    let mut blocks = 0u32;

    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        encoder.write_all(&buf[..n])?;

        blocks += 1;
        if blocks >= CHECK_EVERY_N_BLOCKS {
            blocks = 0;
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
    }

    encoder.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn none_codec_is_passthrough() {
        let cancel = CancellationToken::new();
        let data = b"hello sliceback".to_vec();
        let mut src = Cursor::new(data.clone());
        let mut dst = Vec::new();
        let written = compress(Codec::None, &mut src, &mut dst, &cancel).unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(dst, data);
    }

    #[test]
    fn gzip_round_trips() {
        use std::io::Read as _;

        let cancel = CancellationToken::new();
        let data = vec![b'a'; 4096];
        let mut src = Cursor::new(data.clone());
        let mut dst = Vec::new();
        compress(Codec::Gzip, &mut src, &mut dst, &cancel).unwrap();

        let mut decoder = flate2::read::GzDecoder::new(Cursor::new(dst));
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn bzip2_round_trips() {
        use std::io::Read as _;

        let cancel = CancellationToken::new();
        let data = vec![b'z'; 4096];
        let mut src = Cursor::new(data.clone());
        let mut dst = Vec::new();
        compress(Codec::Bzip2, &mut src, &mut dst, &cancel).unwrap();

        let mut decoder = bzip2::read::BzDecoder::new(Cursor::new(dst));
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn zero_byte_source_still_produces_a_valid_stream() {
        let cancel = CancellationToken::new();
        let mut src = Cursor::new(Vec::<u8>::new());
        let mut dst = Vec::new();
        let written = compress(Codec::Gzip, &mut src, &mut dst, &cancel).unwrap();
        assert!(written > 0);
    }

    #[test]
    fn cancellation_stops_before_finishing_the_trailer() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let data = vec![0u8; BLOCK_SIZE * (CHECK_EVERY_N_BLOCKS as usize + 1)];
        let mut src = Cursor::new(data);
        let mut dst = Vec::new();
        let result = compress(Codec::Gzip, &mut src, &mut dst, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn extension_matches_codec() {
        assert_eq!(extension_for(Codec::None), "");
        assert_eq!(extension_for(Codec::Gzip), ".gz");
        assert_eq!(extension_for(Codec::Bzip2), ".bz2");
    }
}
