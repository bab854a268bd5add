use crate::error::{ParityError, Result};
use crate::types::AudioData;
use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;

/// Decode a WAV file to mono `f32` samples in `[-1, 1)`.
///
/// Integer PCM is scaled by `2^(bits - 1)`; stereo is averaged. Files with
/// more than two channels are rejected.
pub fn read_wav_mono(path: &Path) -> Result<AudioData> {
    let reader = WavReader::open(path)?;
    let audio = decode(reader)?;
    log::info!(
        "loaded {}: {} Hz, {} ch, {:.2}s",
        path.display(),
        audio.sample_rate,
        audio.channels,
        audio.duration_secs
    );
    Ok(audio)
}

/// Same as [`read_wav_mono`] for an in-memory or streamed WAV.
pub fn decode_wav_mono<R: Read>(source: R) -> Result<AudioData> {
    decode(WavReader::new(source)?)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<AudioData> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 || channels > 2 {
        return Err(ParityError::Params(format!(
            "unsupported channel count {channels}: only mono and stereo are supported"
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        SampleFormat::Int => {
            let scale = 2f64.powi(spec.bits_per_sample as i32 - 1);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f64 / scale) as f32))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?
        }
    };

    let samples = if channels == 2 {
        interleaved
            .chunks_exact(2)
            .map(|pair| ((pair[0] as f64 + pair[1] as f64) / 2.0) as f32)
            .collect()
    } else {
        interleaved
    };

    Ok(AudioData::new(samples, spec.sample_rate, spec.channels as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::io::Cursor;

    fn wav_bytes(
        spec: WavSpec,
        write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>),
    ) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn spec(channels: u16, bits: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 16000,
            bits_per_sample: bits,
            sample_format: format,
        }
    }

    #[test]
    fn test_int16_scaled_by_half_range() {
        let bytes = wav_bytes(spec(1, 16, SampleFormat::Int), |w| {
            for s in [0i16, 16384, -32768] {
                w.write_sample(s).unwrap();
            }
        });
        let audio = decode_wav_mono(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.samples, vec![0.0, 0.5, -1.0]);
        assert_eq!(audio.sample_rate, 16000);
    }

    #[test]
    fn test_stereo_is_averaged() {
        let bytes = wav_bytes(spec(2, 16, SampleFormat::Int), |w| {
            for s in [16384i16, 0, -16384, -16384] {
                w.write_sample(s).unwrap();
            }
        });
        let audio = decode_wav_mono(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_float_passthrough() {
        let bytes = wav_bytes(spec(1, 32, SampleFormat::Float), |w| {
            for s in [0.125f32, -0.75] {
                w.write_sample(s).unwrap();
            }
        });
        let audio = decode_wav_mono(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.samples, vec![0.125, -0.75]);
    }

    #[test]
    fn test_more_than_two_channels_rejected() {
        let bytes = wav_bytes(spec(3, 16, SampleFormat::Int), |w| {
            for _ in 0..6 {
                w.write_sample(0i16).unwrap();
            }
        });
        assert!(matches!(
            decode_wav_mono(Cursor::new(bytes)),
            Err(ParityError::Params(_))
        ));
    }
}
