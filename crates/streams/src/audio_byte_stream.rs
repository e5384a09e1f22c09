//! `AudioByteStream`: frames a byte sequence of little-endian signed 16-bit
//! PCM samples into fixed-size `AudioFrame`s at a given sample-rate ×
//! channel count. Default frame duration is 20ms.

use std::time::Duration;

const DEFAULT_FRAME_DURATION_MS: u128 = 20;
const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub num_channels: u16,
}

pub struct AudioByteStream {
    sample_rate: u32,
    num_channels: u16,
    bytes_per_frame: usize,
    buffer: Vec<u8>,
}

impl AudioByteStream {
    pub fn new(sample_rate: u32, num_channels: u16) -> Self {
        Self::with_frame_duration(
            sample_rate,
            num_channels,
            Duration::from_millis(DEFAULT_FRAME_DURATION_MS as u64),
        )
    }

    pub fn with_frame_duration(sample_rate: u32, num_channels: u16, frame_duration: Duration) -> Self {
        let samples_per_frame =
            (sample_rate as u128 * frame_duration.as_millis() / 1000) as usize;
        let bytes_per_frame = samples_per_frame * num_channels as usize * BYTES_PER_SAMPLE;
        Self {
            sample_rate,
            num_channels,
            bytes_per_frame,
            buffer: Vec::new(),
        }
    }

    /// Appends `bytes` to the internal buffer and drains every whole frame
    /// now available.
    pub fn write(&mut self, bytes: &[u8]) -> Vec<AudioFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while self.buffer.len() >= self.bytes_per_frame {
            let data = self.buffer.drain(..self.bytes_per_frame).collect();
            frames.push(AudioFrame {
                data,
                sample_rate: self.sample_rate,
                num_channels: self.num_channels,
            });
        }
        frames
    }

    /// Returns whatever is left in the buffer as a final, undersized frame,
    /// dropping any trailing bytes that don't form a whole sample.
    pub fn flush(&mut self) -> Option<AudioFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let sample_width = self.num_channels as usize * BYTES_PER_SAMPLE;
        let whole_len = self.buffer.len() - (self.buffer.len() % sample_width);
        if whole_len < self.buffer.len() {
            tracing::warn!(
                dropped_bytes = self.buffer.len() - whole_len,
                "dropping partial trailing PCM sample on flush"
            );
        }
        let data: Vec<u8> = self.buffer.drain(..whole_len).collect();
        self.buffer.clear();
        if data.is_empty() {
            None
        } else {
            Some(AudioFrame {
                data,
                sample_rate: self.sample_rate,
                num_channels: self.num_channels,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_duration_frames_20ms_at_given_rate() {
        let mut s = AudioByteStream::new(16000, 1);
        let frames = s.write(&vec![0u8; 640]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), 640);
    }

    #[test]
    fn round_trips_modulo_final_partial_frame() {
        let mut s = AudioByteStream::new(8000, 1);
        let input: Vec<u8> = (0..800u32).map(|i| (i % 256) as u8).collect();
        let mut out = Vec::new();
        for f in s.write(&input) {
            out.extend(f.data);
        }
        if let Some(f) = s.flush() {
            out.extend(f.data);
        }
        assert_eq!(out, input);
    }

    #[test]
    fn drops_partial_trailing_sample_on_flush() {
        let mut s = AudioByteStream::new(8000, 1);
        let input = vec![0u8; 321];
        let frames = s.write(&input);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), 320);
        assert!(s.flush().is_none());
    }

    #[test]
    fn flush_on_empty_buffer_is_none() {
        let mut s = AudioByteStream::new(8000, 1);
        assert!(s.flush().is_none());
    }

    #[test]
    fn stereo_doubles_bytes_per_frame() {
        let mut s = AudioByteStream::new(8000, 2);
        let frames = s.write(&vec![0u8; 640]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), 640);
        assert!(s.write(&[]).is_empty());
    }
}
