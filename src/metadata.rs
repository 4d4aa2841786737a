// Copyright 2026 the flac-encoder developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling a FLAC stream's metadata prefix

use crate::Error;
use bitstream_io::{BigEndian, BitWrite, BitWriter, SignedBitCount, ToBitStream};
use std::num::NonZero;

/// A FLAC metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in stream |
/// | 7    | `block_type` | type of block |
/// | 24   | `size` | block size, in bytes |
#[derive(Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final metadata block
    pub last: bool,
    /// Our block type (0 is STREAMINFO)
    pub block_type: u8,
    /// Our block size, in bytes
    pub size: u32,
}

impl ToBitStream for BlockHeader {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bit(self.last)?;
        w.write::<7, _>(self.block_type)?;
        w.write::<24, _>(self.size)?;
        Ok(())
    }
}

/// The STREAMINFO metadata block
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 16   | `minimum_block_size` | minimum block size, in samples |
/// | 16   | `maximum_block_size` | maximum block size, in samples |
/// | 24   | `minimum_frame_size` | minimum frame size, in bytes (0 = unknown) |
/// | 24   | `maximum_frame_size` | maximum frame size, in bytes (0 = unknown) |
/// | 20   | `sample_rate` | sample rate, in Hz |
/// | 3    | `channels` | channel count, minus 1 |
/// | 5    | `bits_per_sample` | bits-per-sample, minus 1 |
/// | 36   | `total_samples` | total inter-channel samples (0 = unknown) |
/// | 128  | `md5` | MD5 hash of decoded audio (0 = not present) |
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Streaminfo {
    /// The minimum block size (in samples) used in the stream,
    /// excluding the last block.
    pub minimum_block_size: u16,
    /// The maximum block size (in samples) used in the stream,
    /// excluding the last block.
    pub maximum_block_size: u16,
    /// The minimum frame size (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub minimum_frame_size: Option<NonZero<u32>>,
    /// The maximum frame size (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub maximum_frame_size: Option<NonZero<u32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels, from 1 to 8
    pub channels: NonZero<u8>,
    /// Number of bits-per-sample, from 1 to 32
    pub bits_per_sample: SignedBitCount<32>,
    /// Total number of inter-channel samples in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub total_samples: Option<NonZero<u64>>,
    /// MD5 hash of unencoded audio data.
    ///
    /// `None` indicates the value is unknown.
    pub md5: Option<[u8; 16]>,
}

impl Streaminfo {
    /// The STREAMINFO block type (0)
    pub const TYPE: u8 = 0;

    /// The size of a STREAMINFO block's payload, in bytes (34)
    pub const SIZE: u32 = 34;

    /// The maximum number of channels (8)
    pub const MAX_CHANNELS: u8 = 8;

    /// The maximum sample rate, in Hz
    ///
    /// This is the largest rate a frame header can carry
    /// via its 16-bit tens-of-Hz escape value.
    pub const MAX_SAMPLE_RATE: u32 = 655350;
}

impl ToBitStream for Streaminfo {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.minimum_block_size)?;
        w.write_from(self.maximum_block_size)?;
        w.write::<24, _>(self.minimum_frame_size)?;
        w.write::<24, _>(self.maximum_frame_size)?;
        w.write::<20, _>(self.sample_rate)?;
        w.write::<3, _>(self.channels)?;
        w.write_count(
            self.bits_per_sample
                .checked_sub::<0b11111>(1)
                .unwrap()
                .count(),
        )?;
        w.write::<36, _>(self.total_samples)?;
        w.write_from(self.md5.unwrap_or([0; 16]))?;
        Ok(())
    }
}

/// Writes a whole FLAC stream prefix to the given writer
///
/// This is the `fLaC` tag followed by a STREAMINFO block
/// flagged as the final metadata block.  Audio frames may
/// be appended immediately afterward.
///
/// # Errors
///
/// Passes along any I/O errors from the underlying stream.
pub fn write_stream_header<W: std::io::Write>(
    mut writer: W,
    streaminfo: &Streaminfo,
) -> Result<(), Error> {
    writer.write_all(b"fLaC")?;

    let mut w = BitWriter::endian(writer, BigEndian);
    w.build(&BlockHeader {
        last: true,
        block_type: Streaminfo::TYPE,
        size: Streaminfo::SIZE,
    })?;
    w.build(streaminfo)?;
    Ok(())
}
