//! Send-effect buses shared by every track: a feedback delay and a Schroeder
//! reverb. Buffers are sized once at construction; processing never allocates.

/// Simple delay line
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
    feedback: f32,
}

impl DelayLine {
    fn new(max_delay_samples: usize) -> Self {
        let len = max_delay_samples.max(2);
        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
            delay_samples: len / 2,
            feedback: 0.35,
        }
    }

    fn set_delay(&mut self, delay_secs: f32, sample_rate: f32) {
        self.delay_samples = ((delay_secs.max(0.0) * sample_rate) as usize)
            .clamp(1, self.buffer.len() - 1);
    }

    fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    fn process(&mut self, input: f32) -> f32 {
        let read_pos = if self.write_pos >= self.delay_samples {
            self.write_pos - self.delay_samples
        } else {
            self.buffer.len() - (self.delay_samples - self.write_pos)
        };

        let delayed = self.buffer[read_pos];
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        delayed
    }
}

struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl CombFilter {
    fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input + output * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -input + delayed;
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }
}

/// Schroeder reverb: parallel combs into series allpasses. Fully wet.
struct SchroederReverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
    damping_lp: f32,
}

impl SchroederReverb {
    // `spread` offsets the delay lengths so left and right decorrelate.
    fn new(sample_rate: f32, spread: usize) -> Self {
        let sr = sample_rate as usize;
        let combs = [29, 31, 37, 41, 43, 47, 53, 59]
            .iter()
            .map(|ms| CombFilter::new(sr * ms / 1000 + spread, 0.84))
            .collect();
        let allpasses = [5, 2, 1]
            .iter()
            .map(|ms| AllpassFilter::new(sr * ms / 1000 + spread / 2, 0.7))
            .collect();
        Self {
            combs,
            allpasses,
            damping_lp: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut comb_sum = 0.0f32;
        for comb in self.combs.iter_mut() {
            comb_sum += comb.process(input);
        }
        comb_sum /= self.combs.len() as f32;

        // Damp the tail
        let damp = 0.3;
        self.damping_lp = self.damping_lp * damp + comb_sum * (1.0 - damp);

        let mut output = self.damping_lp;
        for allpass in self.allpasses.iter_mut() {
            output = allpass.process(output);
        }
        output
    }
}

/// The two master send buses and their return levels.
pub struct SendBuses {
    reverb_l: SchroederReverb,
    reverb_r: SchroederReverb,
    delay_l: DelayLine,
    delay_r: DelayLine,
    reverb_mix: f32,
    delay_mix: f32,
    sample_rate: f32,
}

impl SendBuses {
    pub fn new(sample_rate: f32) -> Self {
        let max_delay = (sample_rate * 2.0) as usize; // 2 second max delay
        let mut buses = Self {
            reverb_l: SchroederReverb::new(sample_rate, 0),
            reverb_r: SchroederReverb::new(sample_rate, 23),
            delay_l: DelayLine::new(max_delay),
            delay_r: DelayLine::new(max_delay),
            reverb_mix: 0.3,
            delay_mix: 0.25,
            sample_rate,
        };
        buses.set_delay_time(0.375);
        buses
    }

    pub fn set_reverb_mix(&mut self, mix: f32) {
        self.reverb_mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_delay_mix(&mut self, mix: f32) {
        self.delay_mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_delay_time(&mut self, secs: f32) {
        self.delay_l.set_delay(secs, self.sample_rate);
        self.delay_r.set_delay(secs * 1.01, self.sample_rate);
    }

    pub fn set_delay_feedback(&mut self, feedback: f32) {
        self.delay_l.set_feedback(feedback);
        self.delay_r.set_feedback(feedback);
    }

    /// Process one frame of send input and return the wet stereo return.
    pub fn process(&mut self, reverb_in: (f32, f32), delay_in: (f32, f32)) -> (f32, f32) {
        let mut l = 0.0;
        let mut r = 0.0;

        if self.delay_mix > 0.0001 {
            l += self.delay_l.process(delay_in.0) * self.delay_mix;
            r += self.delay_r.process(delay_in.1) * self.delay_mix;
        }
        if self.reverb_mix > 0.0001 {
            l += self.reverb_l.process(reverb_in.0) * self.reverb_mix;
            r += self.reverb_r.process(reverb_in.1) * self.reverb_mix;
        }
        (l, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_line_echo() {
        let mut d = DelayLine::new(100);
        d.set_delay(10.0 / 1000.0, 1000.0);
        d.set_feedback(0.0);
        let out: Vec<f32> = (0..20).map(|i| d.process(if i == 0 { 1.0 } else { 0.0 })).collect();
        assert_eq!(out[10], 1.0);
        assert_eq!(out.iter().filter(|s| **s != 0.0).count(), 1);
    }

    #[test]
    fn test_silent_buses_without_mix() {
        let mut b = SendBuses::new(8000.0);
        b.set_reverb_mix(0.0);
        b.set_delay_mix(0.0);
        for _ in 0..1000 {
            assert_eq!(b.process((1.0, 1.0), (1.0, 1.0)), (0.0, 0.0));
        }
    }

    #[test]
    fn test_reverb_tail_follows_impulse() {
        let mut b = SendBuses::new(8000.0);
        b.set_delay_mix(0.0);
        b.set_reverb_mix(1.0);
        let mut energy = 0.0;
        for i in 0..4000 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (l, r) = b.process((x, x), (0.0, 0.0));
            energy += l * l + r * r;
        }
        assert!(energy > 0.0);
    }
}
