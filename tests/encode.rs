use flac_encoder::{Error, encode::Encoder};

fn encode(samples: &[Vec<i32>], sample_rate: u32, bits_per_sample: u32) -> Vec<u8> {
    let mut flac = Vec::new();

    Encoder::new(&mut flac, sample_rate, samples.len() as u8, bits_per_sample)
        .unwrap()
        .encode(samples)
        .unwrap();

    flac
}

// reference checksums, computed bit-serially

fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            }
        })
    })
}

fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, byte| {
        (0..8).fold(crc ^ (u16::from(*byte) << 8), |crc, _| {
            if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x8005
            } else {
                crc << 1
            }
        })
    })
}

// Checks one frame of 16-bit silence against the layout a
// fixed-order-2 subframe must produce, and returns its length.
//
// |  bytes | field |
// |-------:|-------|
// | header | sync + codes + frame number + trailers + CRC-8 |
// |      1 | subframe header (fixed, order 2) |
// |      4 | two 16-bit warm-up samples |
// |      1 | residual coding method + partition order |
// |      1 | Rice parameter + first 6 unary residual bits |
// |    ... | remaining all-ones unary residuals |
// |      2 | CRC-16 |
fn check_silent_frame(frame: &[u8], header_len: usize, block_size: usize) -> usize {
    let body = &frame[header_len..];
    assert_eq!(frame[header_len - 1], crc8(&frame[..header_len - 1]));

    assert_eq!(body[0], 0b0_001010_0);
    assert_eq!(&body[1..5], [0x00; 4]);
    assert_eq!(body[5], 0x00);
    assert_eq!(body[6], 0b00_111111);

    let ones = (block_size - 2 - 6) / 8;
    assert!(body[7..7 + ones].iter().all(|b| *b == 0xFF));

    let frame_len = header_len + 7 + ones + 2;
    assert_eq!(
        u16::from_be_bytes([frame[frame_len - 2], frame[frame_len - 1]]),
        crc16(&frame[..frame_len - 2])
    );
    frame_len
}

#[test]
fn test_silence_mono() {
    let flac = encode(&[vec![0; 4096]], 44100, 16);

    assert_eq!(
        &flac[..42],
        [
            0x66, 0x4C, 0x61, 0x43, // "fLaC"
            0x80, 0x00, 0x00, 0x22, // last metadata block, STREAMINFO, 34 bytes
            0x10, 0x00, 0x10, 0x00, // min/max block size 4096
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // frame sizes unknown
            0x0A, 0xC4, 0x40, 0xF0, // 44100 Hz, 1 channel, 16 bits-per-sample
            0x00, 0x00, 0x00, 0x00, // total samples unknown
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // MD5 not present
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]
    );

    // exactly one frame follows
    assert_eq!(&flac[42..47], [0xFF, 0xF8, 0xC9, 0x08, 0x00]);
    assert_eq!(check_silent_frame(&flac[42..], 6, 4096), 526);
    assert_eq!(flac.len(), 42 + 526);
}

#[test]
fn test_silence_multiframe() {
    let flac = encode(&[vec![0; 3 * 4096]], 44100, 16);

    assert_eq!(flac.len(), 42 + 3 * 526);

    for frame_number in 0..3 {
        let frame = &flac[42 + frame_number * 526..];

        // sync code, fixed blocking strategy, common codes
        assert_eq!(&frame[..4], [0xFF, 0xF8, 0xC9, 0x08]);
        assert_eq!(frame[4], frame_number as u8);
        assert_eq!(check_silent_frame(frame, 6, 4096), 526);
    }
}

#[test]
fn test_short_final_block() {
    // 5000 samples: one full block, then 904 left over
    let flac = encode(&[vec![0; 5000]], 44100, 16);

    assert_eq!(check_silent_frame(&flac[42..], 6, 4096), 526);

    // the 904-sample block needs a 16-bit block size trailer
    let frame = &flac[42 + 526..];
    assert_eq!(&frame[..7], [0xFF, 0xF8, 0x79, 0x08, 0x01, 0x03, 0x87]);
    assert_eq!(check_silent_frame(frame, 8, 904), 129);

    assert_eq!(flac.len(), 42 + 526 + 129);
}

#[test]
fn test_small_single_block() {
    // a 200-sample block needs an 8-bit block size trailer
    let flac = encode(&[vec![0; 200]], 44100, 16);

    let frame = &flac[42..];
    assert_eq!(&frame[..6], [0xFF, 0xF8, 0x69, 0x08, 0x00, 199]);
    assert_eq!(check_silent_frame(frame, 7, 200), 40);

    assert_eq!(flac.len(), 42 + 40);
}

#[test]
fn test_final_block_shorter_than_order() {
    // a single leftover sample cannot seed an order-2 predictor;
    // the final subframe drops to order 1 with no residuals
    let flac = encode(&[vec![0; 4097]], 44100, 16);

    assert_eq!(check_silent_frame(&flac[42..], 6, 4096), 526);

    let frame = &flac[42 + 526..];
    assert_eq!(&frame[..6], [0xFF, 0xF8, 0x69, 0x08, 0x01, 0x00]);
    assert_eq!(frame[6], crc8(&frame[..6]));

    // order-1 subframe header, one warm-up sample, empty
    // residual section, alignment padding
    assert_eq!(&frame[7..12], [0b0_001001_0, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(
        u16::from_be_bytes([frame[12], frame[13]]),
        crc16(&frame[..12])
    );
    assert_eq!(flac.len(), 42 + 526 + 14);

    // two leftover samples hold the full order-2 warm-up
    // and likewise leave no residuals
    let flac = encode(&[vec![0; 4098]], 44100, 16);

    let frame = &flac[42 + 526..];
    assert_eq!(&frame[..6], [0xFF, 0xF8, 0x69, 0x08, 0x01, 0x01]);
    assert_eq!(frame[6], crc8(&frame[..6]));

    assert_eq!(
        &frame[7..14],
        [0b0_001010_0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        u16::from_be_bytes([frame[14], frame[15]]),
        crc16(&frame[..14])
    );
    assert_eq!(flac.len(), 42 + 526 + 16);
}

#[test]
fn test_empty_input() {
    // no samples produce a stream header and nothing else
    let flac = encode(&[vec![], vec![]], 44100, 16);

    assert_eq!(flac.len(), 42);
    assert!(flac.starts_with(b"fLaC"));
    assert_eq!(&flac[4..8], [0x80, 0x00, 0x00, 0x22]);
}

#[test]
fn test_frame_number_rollover() {
    // frame 128 is the first with a multi-byte frame number
    let flac = encode(&[vec![0; 129 * 4096]], 44100, 16);

    let frame = &flac[42 + 128 * 526..];
    assert_eq!(&frame[..6], [0xFF, 0xF8, 0xC9, 0x08, 0xC2, 0x80]);
    assert_eq!(check_silent_frame(frame, 7, 4096), 527);

    assert_eq!(flac.len(), 42 + 128 * 526 + 527);
}

#[test]
fn test_nonstandard_bits_per_sample() {
    // 13 bits-per-sample has no sample size code,
    // deferring to STREAMINFO
    let flac = encode(&[vec![0; 4096]], 44100, 13);

    // bits-per-sample minus 1 (0b01100) in STREAMINFO
    assert_eq!(&flac[20..22], [0x40, 0xC0]);
    assert_eq!(&flac[42..47], [0xFF, 0xF8, 0xC9, 0x00, 0x00]);
}

#[test]
fn test_sine_stereo() {
    use std::f64::consts::TAU;

    // one second of A440 at 16 bits
    let channel: Vec<i32> = (0..44100)
        .map(|i| (32000.0 * (TAU * 440.0 * f64::from(i) / 44100.0).sin()) as i32)
        .collect();
    let flac = encode(&[channel.clone(), channel], 44100, 16);

    assert!(flac.starts_with(b"fLaC"));
    assert_eq!(&flac[42..46], [0xFF, 0xF8, 0xC9, 0x18]);

    // ceil(44100 / 4096) frames of smooth input must undercut
    // the raw PCM size by a wide margin
    assert!(flac.len() < 2 * 2 * 44100 * 7 / 10);
}

#[test]
fn test_invalid_config() {
    for (sample_rate, channels, bits_per_sample) in [
        (44100u32, 0u8, 16u32),
        (44100, 9, 16),
        (44100, 2, 0),
        (44100, 2, 33),
        (0, 2, 16),
        (655351, 2, 16),
    ] {
        let mut flac = Vec::new();
        assert!(matches!(
            Encoder::new(&mut flac, sample_rate, channels, bits_per_sample),
            Err(Error::InvalidConfig)
        ));
        assert!(flac.is_empty());
    }
}

#[test]
fn test_shape_mismatch() {
    let mut flac = Vec::new();
    assert!(matches!(
        Encoder::new(&mut flac, 44100, 2, 16)
            .unwrap()
            .encode(&[vec![0; 100], vec![0; 99]]),
        Err(Error::ShapeMismatch)
    ));
    assert!(flac.is_empty());

    // channel count must match the configuration
    let mut flac = Vec::new();
    assert!(matches!(
        Encoder::new(&mut flac, 44100, 2, 16)
            .unwrap()
            .encode(&[vec![0; 100]]),
        Err(Error::ShapeMismatch)
    ));
    assert!(flac.is_empty());
}

#[test]
fn test_residual_overflow() {
    // order-2 prediction of full-scale alternating 32-bit samples
    // produces residuals beyond 32 bits
    let channel: Vec<i32> = [i32::MAX, i32::MIN]
        .into_iter()
        .cycle()
        .take(16)
        .collect();

    assert!(matches!(
        Encoder::new(Vec::new(), 44100, 1, 32)
            .unwrap()
            .encode(&[channel]),
        Err(Error::ResidualOverflow)
    ));
}

#[test]
fn test_negative_warm_up_samples() {
    // three samples of -1 at 4 bits-per-sample: the warm-up pair
    // packs to 0xFF in two's complement and the one residual is 0
    let flac = encode(&[vec![-1; 3]], 44100, 4);

    // 4 bits-per-sample has no sample size code either
    assert_eq!(&flac[42..48], [0xFF, 0xF8, 0x69, 0x00, 0x00, 0x02]);
    assert_eq!(flac[48], crc8(&flac[42..48]));

    // subframe header, warm-ups, residual header, one unary bit
    assert_eq!(&flac[49..53], [0b0_001010_0, 0xFF, 0x00, 0b00_1_00000]);

    assert_eq!(
        u16::from_be_bytes([flac[53], flac[54]]),
        crc16(&flac[42..53])
    );
    assert_eq!(flac.len(), 55);
}

#[test]
fn test_ramp_structure() {
    // a linear ramp has constant order-1 differences, so its
    // order-2 residuals are all zero and Rice-code to single bits
    let channel: Vec<i32> = (0..4096).collect();
    let flac = encode(&[channel], 44100, 16);

    let frame = &flac[42..];
    assert_eq!(&frame[..5], [0xFF, 0xF8, 0xC9, 0x08, 0x00]);
    assert_eq!(frame[5], crc8(&frame[..5]));

    // subframe header, then warm-up samples 0 and 1
    assert_eq!(&frame[6..11], [0b0_001010_0, 0x00, 0x00, 0x00, 0x01]);

    // zero Rice parameter, then 4094 unary one-bits
    assert_eq!(&frame[11..13], [0x00, 0b00_111111]);
    assert!(frame[13..524].iter().all(|b| *b == 0xFF));

    assert_eq!(
        u16::from_be_bytes([frame[524], frame[525]]),
        crc16(&frame[..524])
    );
    assert_eq!(flac.len(), 42 + 526);
}
