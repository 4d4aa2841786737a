// Copyright 2026 the flac-encoder developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For encoding PCM samples to FLAC streams

use crate::Error;
use crate::crc::{Crc16, CrcWriter};
use crate::metadata::{Streaminfo, write_stream_header};
use crate::stream::{FrameHeader, FrameNumber, SubframeHeader};
use arrayvec::ArrayVec;
use bitstream_io::{BigEndian, BitCount, BitWrite, BitWriter, SignedBitCount};
use std::num::NonZero;

const MAX_CHANNELS: usize = 8;

/// The block size used for every frame but possibly the last
pub const BLOCK_SIZE: u16 = 4096;

// the fixed predictor order applied to every block
// with enough samples for its warm-up
const FIXED_ORDER: usize = 2;

// the largest Rice parameter expressible with
// the 4-bit parameter coding method
const MAX_RICE: u32 = 14;

/// A FLAC encoder which accepts samples as signed integers
///
/// The encoder is created with an output sink and the stream's
/// parameters, then consumed by a single [`Encoder::encode`] call
/// which writes the entire stream.  The sink is written in
/// append-only fashion and is never repositioned, so anything
/// implementing [`std::io::Write`] will do.
///
/// # Example
///
/// ```
/// use flac_encoder::encode::Encoder;
///
/// let mut flac = Vec::new();  // a FLAC stream in memory
///
/// // two channels of 16-bit silence
/// let samples = vec![vec![0; 5000], vec![0; 5000]];
///
/// Encoder::new(
///     &mut flac,  // our output sink
///     44100,      // sample rate
///     2,          // channel count
///     16,         // bits-per-sample
/// )
/// .unwrap()
/// .encode(&samples)
/// .unwrap();
///
/// // "fLaC" tag, STREAMINFO, then ceil(5000 / 4096) frames
/// assert!(flac.starts_with(b"fLaC"));
/// ```
pub struct Encoder<W: std::io::Write> {
    // the sink we're outputting to
    writer: W,
    // our STREAMINFO block information
    streaminfo: Streaminfo,
}

impl<W: std::io::Write> Encoder<W> {
    /// Creates new FLAC encoder with the given parameters
    ///
    /// `sample_rate` must be between 1 and 655,350 Hz
    /// (the largest rate a frame header can carry).
    ///
    /// `channels` must be between 1 and 8.
    ///
    /// `bits_per_sample` must be between 1 and 32.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any of the parameters
    /// is outside its valid range.  Nothing is written to the
    /// sink until [`Encoder::encode`] is called.
    pub fn new(
        writer: W,
        sample_rate: u32,
        channels: u8,
        bits_per_sample: impl TryInto<SignedBitCount<32>>,
    ) -> Result<Self, Error> {
        Ok(Self {
            writer,
            streaminfo: Streaminfo {
                minimum_block_size: BLOCK_SIZE,
                maximum_block_size: BLOCK_SIZE,
                minimum_frame_size: None,
                maximum_frame_size: None,
                sample_rate: (1..=Streaminfo::MAX_SAMPLE_RATE)
                    .contains(&sample_rate)
                    .then_some(sample_rate)
                    .ok_or(Error::InvalidConfig)?,
                channels: NonZero::new(channels)
                    .filter(|c| c.get() <= Streaminfo::MAX_CHANNELS)
                    .ok_or(Error::InvalidConfig)?,
                bits_per_sample: bits_per_sample
                    .try_into()
                    .map_err(|_| Error::InvalidConfig)?,
                total_samples: None,
                md5: None,
            },
        })
    }

    /// Encodes the given channels of samples as a complete FLAC stream
    ///
    /// `samples` holds one buffer of samples per channel, all of
    /// the same length, each sample sign-extended to `i32`.
    /// The stream header is written first, then one frame per
    /// [`BLOCK_SIZE`] samples, the final frame holding whatever
    /// remains.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the buffers differ in
    /// length or their count differs from the configured channels,
    /// in which case nothing has been written.  Passes along any
    /// I/O errors from the sink, after which the sink's contents
    /// are undefined.
    pub fn encode<S: AsRef<[i32]>>(mut self, samples: &[S]) -> Result<(), Error> {
        if samples.len() != usize::from(self.streaminfo.channels.get()) {
            return Err(Error::ShapeMismatch);
        }

        let channels: ArrayVec<&[i32], MAX_CHANNELS> =
            samples.iter().map(|s| s.as_ref()).collect();

        let total = channels[0].len();
        if channels.iter().any(|c| c.len() != total) {
            return Err(Error::ShapeMismatch);
        }

        write_stream_header(&mut self.writer, &self.streaminfo)?;

        for (frame_number, start) in (0..total).step_by(BLOCK_SIZE.into()).enumerate() {
            let end = (start + usize::from(BLOCK_SIZE)).min(total);

            encode_frame(
                &mut self.writer,
                &self.streaminfo,
                FrameNumber(frame_number as u64),
                channels.iter().map(|c| &c[start..end]).collect(),
            )?;
        }

        Ok(())
    }
}

fn encode_frame<W: std::io::Write>(
    writer: &mut W,
    streaminfo: &Streaminfo,
    frame_number: FrameNumber,
    frame: ArrayVec<&[i32], MAX_CHANNELS>,
) -> Result<(), Error> {
    use std::io::Write;

    debug_assert!(!frame.is_empty());

    // everything below passes through the frame's CRC-16,
    // the header's own CRC-8 byte included
    let w: CrcWriter<_, Crc16> = CrcWriter::new(writer.by_ref());
    let mut bw = BitWriter::endian(w, BigEndian);

    FrameHeader {
        block_size: frame[0].len() as u16,
        sample_rate: streaminfo.sample_rate,
        channels: streaminfo.channels,
        bits_per_sample: streaminfo.bits_per_sample,
        frame_number,
    }
    .write(bw.aligned_writer()?)?;

    for channel in &frame {
        encode_subframe(&mut bw, channel, streaminfo.bits_per_sample)?;
    }

    bw.byte_align()?;

    let crc16: u16 = bw.aligned_writer()?.checksum().into();
    bw.write_from(crc16)?;

    Ok(())
}

fn encode_subframe<W: BitWrite>(
    writer: &mut W,
    channel: &[i32],
    bits_per_sample: SignedBitCount<32>,
) -> Result<(), Error> {
    // the stream's final block may be too short for the full order
    let order = channel.len().min(FIXED_ORDER);

    writer.build(&SubframeHeader { order: order as u8 })?;

    // warm-up samples, stored verbatim
    channel[..order]
        .iter()
        .try_for_each(|sample| writer.write_signed_counted(bits_per_sample, *sample))?;

    write_residuals(writer, &fixed_residuals(channel, order)?)
}

// Computes the channel's residuals after fixed prediction
// of the given order.
//
// Predictions are carried out in 64 bits since an order-4
// predictor over 32-bit samples can overflow 40 bits; each
// residual must still narrow back to 32 bits to be codable.
fn fixed_residuals(channel: &[i32], order: usize) -> Result<Vec<i32>, Error> {
    (order..channel.len())
        .map(|i| {
            let s = |delay: usize| i64::from(channel[i - delay]);

            let predicted = match order {
                0 => 0,
                1 => s(1),
                2 => 2 * s(1) - s(2),
                3 => 3 * s(1) - 3 * s(2) + s(3),
                _ => 4 * s(1) - 6 * s(2) + 4 * s(3) - s(4),
            };

            i32::try_from(s(0) - predicted).map_err(|_| Error::ResidualOverflow)
        })
        .collect()
}

fn write_residuals<W: BitWrite>(writer: &mut W, residuals: &[i32]) -> Result<(), Error> {
    // coding method: partitioned Rice with 4-bit parameters
    writer.write::<2, u8>(0b00)?;
    // partition order 0: a single partition holding every residual
    writer.write::<4, u8>(0)?;

    let rice = rice_parameter(residuals);
    writer.write::<4, u32>(rice.into())?;

    residuals
        .iter()
        .try_for_each(|residual| write_rice(writer, rice, *residual))
}

// Estimates a Rice parameter from the mean residual magnitude.
//
// ⌊log₂⌋ of the integer mean equals ⌊log₂⌋ of the real mean,
// so the division loses nothing.
fn rice_parameter(residuals: &[i32]) -> BitCount<MAX_RICE> {
    let sum = residuals
        .iter()
        .map(|r| u64::from(r.unsigned_abs()))
        .sum::<u64>();

    match sum.checked_div(residuals.len() as u64) {
        None | Some(0) => BitCount::new::<0>(),
        Some(mean) => {
            BitCount::try_from(mean.ilog2().min(MAX_RICE)).expect("Rice parameter clamped")
        }
    }
}

fn write_rice<W: BitWrite>(
    writer: &mut W,
    rice: BitCount<MAX_RICE>,
    residual: i32,
) -> Result<(), Error> {
    // fold negative values in between the positive ones
    let unsigned = if residual.is_negative() {
        ((residual.unsigned_abs() - 1) << 1) + 1
    } else {
        residual.unsigned_abs() << 1
    };

    let rice_bits = u32::from(rice);
    writer.write_unary::<1>(unsigned >> rice_bits)?;
    writer.write_counted(rice, unsigned & ((1 << rice_bits) - 1))?;
    Ok(())
}
