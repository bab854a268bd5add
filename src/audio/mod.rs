pub mod wav;

pub use wav::{decode_wav_mono, read_wav_mono};
