// Copyright 2026 the flac-encoder developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling common FLAC stream items

use crate::Error;
use crate::crc::{Crc8, CrcWriter};
use bitstream_io::{BigEndian, BitWrite, BitWriter, SignedBitCount, ToBitStream};
use std::num::NonZero;

/// A FLAC frame header
///
/// Channels are always assigned independently;
/// decorrelated stereo assignments are not produced.
#[derive(Debug)]
pub struct FrameHeader {
    /// The block size, in samples
    pub block_size: u16,
    /// The sample rate, in Hz
    pub sample_rate: u32,
    /// The number of independent channels
    pub channels: NonZero<u8>,
    /// The number of bits per sample
    pub bits_per_sample: SignedBitCount<32>,
    /// The frame's number in the stream
    pub frame_number: FrameNumber,
}

impl FrameHeader {
    // 14-bit sync code and the reserved bit which follows it
    const SYNC_CODE: u32 = 0b111111111111100;

    /// Builds header to the given writer, CRC-8 byte included
    ///
    /// The CRC-8 covers every header byte from the first sync
    /// byte up to (and not including) the CRC-8 byte itself.
    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> Result<(), Error> {
        use std::io::Write;

        let mut crc8: CrcWriter<_, Crc8> = CrcWriter::new(writer.by_ref());
        BitWriter::endian(crc8.by_ref(), BigEndian).build(self)?;
        let crc8 = crc8.into_checksum().into();
        writer.write_all(std::slice::from_ref(&crc8))?;
        Ok(())
    }
}

impl ToBitStream for FrameHeader {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_const::<15, { Self::SYNC_CODE }>()?;

        // blocking strategy: fixed block size
        w.write_bit(false)?;

        w.write::<4, u8>(match self.block_size {
            192 => 0b0001,
            576 => 0b0010,
            1152 => 0b0011,
            2304 => 0b0100,
            4608 => 0b0101,
            256 => 0b1000,
            512 => 0b1001,
            1024 => 0b1010,
            2048 => 0b1011,
            4096 => 0b1100,
            8192 => 0b1101,
            16384 => 0b1110,
            32768 => 0b1111,
            size if size <= 256 => 0b0110,
            _ => 0b0111,
        })?;

        w.write::<4, u8>(match self.sample_rate {
            88200 => 0b0001,
            176400 => 0b0010,
            192000 => 0b0011,
            8000 => 0b0100,
            16000 => 0b0101,
            22050 => 0b0110,
            24000 => 0b0111,
            32000 => 0b1000,
            44100 => 0b1001,
            48000 => 0b1010,
            96000 => 0b1011,
            rate if rate % 1000 == 0 && rate / 1000 < 256 => 0b1100,
            rate if rate < 65536 => 0b1101,
            _ => 0b1110,
        })?;

        // channel assignment: channels stored independently
        w.write::<4, u8>(self.channels.get() - 1)?;

        w.write::<3, u8>(match u32::from(self.bits_per_sample) {
            8 => 0b001,
            12 => 0b010,
            16 => 0b100,
            20 => 0b101,
            24 => 0b110,
            32 => 0b111,
            // get bits-per-sample from STREAMINFO
            _ => 0b000,
        })?;

        w.pad(1)?;

        w.build(&self.frame_number)?;

        // uncommon block size
        match self.block_size {
            192 | 576 | 1152 | 2304 | 4608 | 256 | 512 | 1024 | 2048 | 4096 | 8192 | 16384
            | 32768 => { /* do nothing */ }
            size => match u8::try_from(size - 1) {
                Ok(size) => w.write::<8, _>(size)?,
                Err(_) => w.write::<16, _>(size - 1)?,
            },
        }

        // uncommon sample rate
        match self.sample_rate {
            88200 | 176400 | 192000 | 8000 | 16000 | 22050 | 24000 | 32000 | 44100 | 48000
            | 96000 => { /* do nothing */ }
            rate if rate % 1000 == 0 && rate / 1000 < 256 => w.write::<8, _>(rate / 1000)?,
            rate if rate < 65536 => w.write::<16, _>(rate)?,
            rate => w.write::<16, _>(rate / 10)?,
        }

        Ok(())
    }
}

/// A frame number in the stream, as FLAC frames
///
/// Emitted in FLAC's "UTF-8-like" convention, which covers
/// values up to 36 bits wide in 1 to 7 whole bytes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameNumber(pub u64);

impl ToBitStream for FrameNumber {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        #[inline]
        fn byte(num: u64, byte: u32) -> u8 {
            0b10_000000 | ((num >> (6 * byte)) & 0b111111) as u8
        }

        match self.0 {
            v @ 0..=0x7F => {
                w.write_unary::<0>(0)?;
                w.write::<7, _>(v)?;
                Ok(())
            }
            v @ 0x80..=0x7FF => {
                w.write_unary::<0>(2)?;
                w.write::<5, _>(v >> 6)?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
            v @ 0x800..=0xFFFF => {
                w.write_unary::<0>(3)?;
                w.write::<4, _>(v >> (6 * 2))?;
                w.write::<8, _>(byte(v, 1))?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
            v @ 0x1_0000..=0x1F_FFFF => {
                w.write_unary::<0>(4)?;
                w.write::<3, _>(v >> (6 * 3))?;
                w.write::<8, _>(byte(v, 2))?;
                w.write::<8, _>(byte(v, 1))?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
            v @ 0x20_0000..=0x3FF_FFFF => {
                w.write_unary::<0>(5)?;
                w.write::<2, _>(v >> (6 * 4))?;
                w.write::<8, _>(byte(v, 3))?;
                w.write::<8, _>(byte(v, 2))?;
                w.write::<8, _>(byte(v, 1))?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
            v @ 0x400_0000..=0x7FFF_FFFF => {
                w.write_unary::<0>(6)?;
                w.write::<1, _>(v >> (6 * 5))?;
                w.write::<8, _>(byte(v, 4))?;
                w.write::<8, _>(byte(v, 3))?;
                w.write::<8, _>(byte(v, 2))?;
                w.write::<8, _>(byte(v, 1))?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
            // encode() cannot produce 2³⁶ frames from an in-memory
            // buffer, so the 36-bit ceiling needs no runtime check
            v => {
                w.write_unary::<0>(7)?;
                w.write::<8, _>(byte(v, 5))?;
                w.write::<8, _>(byte(v, 4))?;
                w.write::<8, _>(byte(v, 3))?;
                w.write::<8, _>(byte(v, 2))?;
                w.write::<8, _>(byte(v, 1))?;
                w.write::<8, _>(byte(v, 0))?;
                Ok(())
            }
        }
    }
}

/// A subframe header for a fixed-predictor subframe
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | | padding |
/// | 6    | `order` | `0b001ooo`, where `ooo` is the predictor order |
/// | 1    | | wasted bits-per-sample flag (always 0) |
#[derive(Debug)]
pub struct SubframeHeader {
    /// The fixed predictor's order, from 0 to 4
    pub order: u8,
}

impl ToBitStream for SubframeHeader {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_const::<1, 0>()?;
        w.write::<6, u8>(0b001000 | self.order)?;
        w.write_bit(false)?;
        Ok(())
    }
}
