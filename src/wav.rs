// Copyright 2026 the flac-encoder developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A minimal reader for RIFF WAVE files
//!
//! This exposes PCM streams in the channel-major `i32` form
//! [`crate::encode::Encoder::encode`] consumes, so uncompressed
//! WAVE files can be fed straight into the encoder.  Only
//! integer PCM (format tag 1) is supported.

use bitstream_io::{ByteRead, ByteReader, LittleEndian};

/// A reader for PCM WAVE files
pub struct WavReader<R: std::io::Read> {
    reader: ByteReader<R, LittleEndian>,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_size: u32,
}

impl<R: std::io::Read> WavReader<R> {
    /// Parses WAVE metadata chunks up to the start of the sample data
    ///
    /// The reader should be positioned at the start of the file.
    /// Chunks other than `fmt ` and `data` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not a RIFF WAVE file,
    /// its `fmt ` chunk is missing, malformed, or non-PCM,
    /// or an I/O error occurs.
    pub fn new(reader: R) -> Result<Self, Error> {
        let mut reader = ByteReader::endian(reader, LittleEndian);

        if reader.read::<[u8; 4]>()? != *b"RIFF" {
            return Err(Error::InvalidWave);
        }
        let _file_size = reader.read::<u32>()?;
        if reader.read::<[u8; 4]>()? != *b"WAVE" {
            return Err(Error::InvalidWave);
        }

        let mut fmt = None;

        loop {
            let chunk_id = reader.read::<[u8; 4]>()?;
            let chunk_size = reader.read::<u32>()?;

            match &chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || fmt.is_some() {
                        return Err(Error::InvalidWave);
                    }

                    // only uncompressed integer PCM is supported
                    if reader.read::<u16>()? != 1 {
                        return Err(Error::Unsupported);
                    }

                    let channels = reader.read::<u16>()?;
                    let sample_rate = reader.read::<u32>()?;
                    let _data_rate = reader.read::<u32>()?;
                    let _block_align = reader.read::<u16>()?;
                    let bits_per_sample = reader.read::<u16>()?;
                    reader.skip(chunk_size - 16)?;
                    reader.skip((chunk_size - 16) % 2)?;

                    if channels == 0 {
                        return Err(Error::InvalidWave);
                    }

                    fmt = Some((channels, sample_rate, bits_per_sample));
                }
                b"data" => {
                    let (channels, sample_rate, bits_per_sample) =
                        fmt.ok_or(Error::InvalidWave)?;

                    return Ok(Self {
                        reader,
                        channels,
                        sample_rate,
                        bits_per_sample,
                        data_size: chunk_size,
                    });
                }
                _ => {
                    // foreign chunks are padded to an even byte count
                    reader.skip(chunk_size)?;
                    reader.skip(chunk_size % 2)?;
                }
            }
        }
    }

    /// Returns the number of channels
    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the sample rate, in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of bits per sample
    #[inline]
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Reads all PCM samples, de-interleaved by channel
    ///
    /// 8-bit samples are unsigned with a 128 offset; 16, 24,
    /// and 32-bit samples are signed little-endian.  Trailing
    /// bytes short of a whole set of channel samples are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample size is not a supported
    /// PCM depth or an I/O error occurs.
    pub fn read_samples(mut self) -> Result<Vec<Vec<i32>>, Error> {
        let bytes_per_sample = match self.bits_per_sample {
            8 | 16 | 24 | 32 => usize::from(self.bits_per_sample / 8),
            _ => return Err(Error::Unsupported),
        };

        let mut data = vec![0; self.data_size as usize];
        self.reader.read_bytes(&mut data)?;

        let channels = usize::from(self.channels);
        let pcm_frames = data.len() / (bytes_per_sample * channels);

        let mut samples: Vec<Vec<i32>> = (0..channels)
            .map(|_| Vec::with_capacity(pcm_frames))
            .collect();

        for (i, sample) in data
            .chunks_exact(bytes_per_sample)
            .take(pcm_frames * channels)
            .enumerate()
        {
            samples[i % channels].push(match *sample {
                [b] => i32::from(b) - 128,
                [lo, hi] => i32::from(i16::from_le_bytes([lo, hi])),
                // shifting back down sign-extends
                [lo, mid, hi] => i32::from_le_bytes([0, lo, mid, hi]) >> 8,
                [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
                _ => return Err(Error::Unsupported),
            });
        }

        Ok(samples)
    }
}

/// A WAVE file reading error
#[derive(Debug)]
pub enum Error {
    /// A general I/O error from the underlying stream
    Io(std::io::Error),
    /// A stream which is not valid RIFF WAVE
    InvalidWave,
    /// A WAVE format outside the integer PCM subset
    Unsupported,
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::InvalidWave => "invalid RIFF WAVE file".fmt(f),
            Self::Unsupported => "unsupported WAVE format".fmt(f),
        }
    }
}
