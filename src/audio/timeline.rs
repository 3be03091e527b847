/*!
 * Append-only mono sample buffer with a millisecond cursor.
 *
 * The number of samples held for a timeline of `L` ms is always
 * `floor(L * sample_rate / 1000)`; every append adds the difference between
 * the sample counts at the new and the old cursor, so rounding never
 * accumulates.
 */

#[derive(Debug, Clone)]
pub struct Timeline {
    sample_rate: u32,
    samples: Vec<f32>,
    cursor_ms: u64,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Timeline {
            sample_rate,
            samples: Vec::new(),
            cursor_ms: 0,
        }
    }

    /// Pre-allocate room for `ms` milliseconds of audio
    pub fn with_capacity_ms(sample_rate: u32, ms: u64) -> Self {
        let mut timeline = Self::new(sample_rate);
        timeline.samples.reserve(timeline.samples_at(ms));
        timeline
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current length in milliseconds
    pub fn len_ms(&self) -> u64 {
        self.cursor_ms
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample index corresponding to `ms`
    pub fn samples_at(&self, ms: u64) -> usize {
        (ms as u128 * self.sample_rate as u128 / 1000) as usize
    }

    /// Samples covering `[from_ms, to_ms)` of this timeline
    pub fn slice_ms(&self, from_ms: u64, to_ms: u64) -> &[f32] {
        let end = self.samples_at(to_ms).min(self.samples.len());
        let start = self.samples_at(from_ms).min(end);
        &self.samples[start..end]
    }

    fn advance(&mut self, ms: u64) -> usize {
        let before = self.samples_at(self.cursor_ms);
        self.cursor_ms += ms;
        self.samples_at(self.cursor_ms) - before
    }

    pub fn append_silence(&mut self, ms: u64) {
        let count = self.advance(ms);
        self.samples.resize(self.samples.len() + count, 0.0);
    }

    /// Append exactly `slot_ms` of audio: the head of `clip`, right-padded
    /// with silence when the clip is shorter than the slot.
    pub fn append_clip(&mut self, clip: &[f32], slot_ms: u64) {
        let count = self.advance(slot_ms);
        let taken = count.min(clip.len());
        self.samples.extend_from_slice(&clip[..taken]);
        self.samples.resize(self.samples.len() + (count - taken), 0.0);
    }

    /// Pad with silence up to `ms`; never shortens
    pub fn pad_to(&mut self, ms: u64) {
        if ms > self.cursor_ms {
            self.append_silence(ms - self.cursor_ms);
        }
    }
}
