//! `SpeakingRateData` (§4.9): tracks cumulative characters-spoken against
//! wall-clock time so a caller can emit exactly `ceil(accumulate_to(t))`
//! characters of transcript once TTS audio has played `t` seconds.
//!
//! Internally this is a sequence of breakpoints `(time, integral, rate)`;
//! between breakpoints the integral is extrapolated linearly at that
//! segment's rate, capped at the next breakpoint's integral so a later,
//! more-authoritative sample never gets overshot.

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_s: f64,
    integral: f64,
    rate: f64,
}

#[derive(Debug, Clone)]
struct PendingAnnotation {
    text: String,
    start_time_s: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeakingRateData {
    samples: Vec<Sample>,
    pending: Option<PendingAnnotation>,
}

impl SpeakingRateData {
    pub fn new() -> Self {
        Self::default()
    }

    fn projected_integral_at(&self, t: f64) -> f64 {
        match self.samples.last() {
            Some(last) => last.integral + last.rate * (t - last.time_s).max(0.0),
            None => 0.0,
        }
    }

    /// Pushes a piecewise-constant rate effective from `t`. The integral at
    /// `t` is carried forward from whatever was already accumulated.
    pub fn add_by_rate(&mut self, t: f64, rate: f64) {
        let integral = self.projected_integral_at(t);
        self.samples.push(Sample {
            time_s: t,
            integral,
            rate,
        });
    }

    /// Buffers `text` until both a start and end timestamp are known, then
    /// emits one rate segment covering the buffered span. Calls may arrive
    /// with only one bound known (e.g. a TTS alignment event that reports
    /// `start_time` immediately but `end_time` only once synthesis of that
    /// segment completes); text keeps accumulating across such calls.
    pub fn add_by_annotation(&mut self, text: &str, start_time_s: Option<f64>, end_time_s: Option<f64>) {
        let pending = self.pending.get_or_insert_with(|| PendingAnnotation {
            text: String::new(),
            start_time_s: None,
        });
        pending.text.push_str(text);
        if pending.start_time_s.is_none() {
            pending.start_time_s = start_time_s;
        }

        let Some(end) = end_time_s else { return };
        let pending = self.pending.take().expect("just inserted above");
        let start = pending
            .start_time_s
            .unwrap_or_else(|| self.samples.last().map(|s| s.time_s).unwrap_or(0.0));
        let duration = (end - start).max(f64::EPSILON);
        let char_count = pending.text.chars().count() as f64;
        let rate = char_count / duration;
        let integral = self.projected_integral_at(start);
        self.samples.push(Sample {
            time_s: start,
            integral,
            rate,
        });
    }

    /// Characters that should have been emitted by time `t`.
    pub fn accumulate_to(&self, t: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        if t < self.samples[0].time_s {
            return 0.0;
        }
        let idx = self.samples.partition_point(|s| s.time_s <= t) - 1;
        let sample = self.samples[idx];
        let mut value = sample.integral + sample.rate * (t - sample.time_s).max(0.0);
        if let Some(next) = self.samples.get(idx + 1) {
            value = value.min(next.integral);
        }
        value.max(0.0)
    }

    /// Characters of transcript to emit at time `t`, per §4.9's playback
    /// synchronization rule.
    pub fn chars_due_at(&self, t: f64) -> usize {
        self.accumulate_to(t).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_based_accumulates_linearly() {
        let mut d = SpeakingRateData::new();
        d.add_by_rate(0.0, 10.0);
        assert_eq!(d.accumulate_to(0.0), 0.0);
        assert_eq!(d.accumulate_to(1.0), 10.0);
        assert_eq!(d.accumulate_to(2.5), 25.0);
    }

    #[test]
    fn later_rate_segment_carries_forward_integral() {
        let mut d = SpeakingRateData::new();
        d.add_by_rate(0.0, 10.0);
        d.add_by_rate(1.0, 20.0);
        assert_eq!(d.accumulate_to(1.0), 10.0);
        assert_eq!(d.accumulate_to(1.5), 20.0);
    }

    #[test]
    fn is_monotonic_and_bounded_by_last_segment_formula() {
        let mut d = SpeakingRateData::new();
        d.add_by_rate(0.0, 5.0);
        d.add_by_rate(2.0, 15.0);
        let mut prev = d.accumulate_to(0.0);
        let mut t = 0.1;
        while t <= 5.0 {
            let v = d.accumulate_to(t);
            assert!(v >= prev, "accumulate_to must be non-decreasing");
            prev = v;
            t += 0.1;
        }
        let last = *d.samples.last().unwrap();
        let bound = last.integral + last.rate * (5.0 - last.time_s);
        assert!(d.accumulate_to(5.0) <= bound + 1e-9);
    }

    #[test]
    fn annotation_mode_buffers_until_end_time_known() {
        let mut d = SpeakingRateData::new();
        d.add_by_annotation("hello ", Some(0.0), None);
        assert_eq!(d.accumulate_to(10.0), 0.0);
        d.add_by_annotation("world", None, Some(2.0));
        // 11 chars over 2s => rate 5.5 chars/s
        assert_eq!(d.accumulate_to(0.0), 0.0);
        assert_eq!(d.accumulate_to(2.0), 11.0);
    }

    #[test]
    fn accumulate_before_first_sample_is_zero() {
        let mut d = SpeakingRateData::new();
        d.add_by_rate(5.0, 10.0);
        assert_eq!(d.accumulate_to(0.0), 0.0);
    }
}
