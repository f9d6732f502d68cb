use serde::{Deserialize, Serialize};

/// Named interval sets a session can be quantized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    #[default]
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    Chromatic,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 13] = [
        ScaleKind::Major,
        ScaleKind::Minor,
        ScaleKind::Dorian,
        ScaleKind::Phrygian,
        ScaleKind::Lydian,
        ScaleKind::Mixolydian,
        ScaleKind::Locrian,
        ScaleKind::HarmonicMinor,
        ScaleKind::MajorPentatonic,
        ScaleKind::MinorPentatonic,
        ScaleKind::Blues,
        ScaleKind::WholeTone,
        ScaleKind::Chromatic,
    ];

    /// Semitone offsets from the root, ascending.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleKind::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleKind::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleKind::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn scale(self) -> Scale {
        Scale::new(self.intervals())
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::Minor => "minor",
            ScaleKind::Dorian => "dorian",
            ScaleKind::Phrygian => "phrygian",
            ScaleKind::Lydian => "lydian",
            ScaleKind::Mixolydian => "mixolydian",
            ScaleKind::Locrian => "locrian",
            ScaleKind::HarmonicMinor => "harmonic_minor",
            ScaleKind::MajorPentatonic => "major_pentatonic",
            ScaleKind::MinorPentatonic => "minor_pentatonic",
            ScaleKind::Blues => "blues",
            ScaleKind::WholeTone => "whole_tone",
            ScaleKind::Chromatic => "chromatic",
        }
    }

    /// Lookup by name, accepting a few common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches(':').to_lowercase();
        let kind = match name.as_str() {
            "major" | "ionian" => ScaleKind::Major,
            "minor" | "aeolian" | "natural_minor" => ScaleKind::Minor,
            "dorian" => ScaleKind::Dorian,
            "phrygian" => ScaleKind::Phrygian,
            "lydian" => ScaleKind::Lydian,
            "mixolydian" => ScaleKind::Mixolydian,
            "locrian" => ScaleKind::Locrian,
            "harmonic_minor" => ScaleKind::HarmonicMinor,
            "major_pentatonic" | "major_penta" | "pentatonic" => ScaleKind::MajorPentatonic,
            "minor_pentatonic" | "minor_penta" => ScaleKind::MinorPentatonic,
            "blues" => ScaleKind::Blues,
            "whole_tone" | "whole" => ScaleKind::WholeTone,
            "chromatic" => ScaleKind::Chromatic,
            _ => return None,
        };
        Some(kind)
    }
}

/// An immutable, borrowed table of semitone offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    intervals: &'static [i32],
}

impl Scale {
    pub const fn new(intervals: &'static [i32]) -> Self {
        Self { intervals }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &'static [i32] {
        self.intervals
    }

    /// Map a scale degree onto a MIDI note relative to `root_midi`.
    ///
    /// Degrees past the table length wrap into higher octaves. Negative
    /// degrees wrap downwards, so `degree + len` is always one octave above
    /// `degree`.
    pub fn degree_to_midi(&self, degree: i32, root_midi: i32) -> i32 {
        let len = self.intervals.len() as i32;
        if len == 0 {
            return root_midi;
        }
        let octave = degree.div_euclid(len);
        let index = ((degree % len) + len) % len;
        root_midi + octave * 12 + self.intervals[index as usize]
    }
}

impl Default for Scale {
    fn default() -> Self {
        ScaleKind::default().scale()
    }
}

/// Convert MIDI note number to frequency
pub fn midi_to_freq(note: i32) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_to_midi_basic() {
        let major = ScaleKind::Major.scale();
        assert_eq!(major.degree_to_midi(0, 60), 60);
        assert_eq!(major.degree_to_midi(2, 60), 64);
        assert_eq!(major.degree_to_midi(6, 60), 71);
        assert_eq!(major.degree_to_midi(7, 60), 72);
        assert_eq!(major.degree_to_midi(9, 60), 76);
    }

    #[test]
    fn test_degree_to_midi_octave_periodic() {
        for kind in ScaleKind::ALL {
            let scale = kind.scale();
            let len = scale.len() as i32;
            for degree in 0..40 {
                for root in [24, 48, 60, 72] {
                    assert_eq!(
                        scale.degree_to_midi(degree + len, root),
                        scale.degree_to_midi(degree, root) + 12,
                        "{} degree {}",
                        kind.name(),
                        degree
                    );
                }
            }
        }
    }

    #[test]
    fn test_negative_degree_wraps_down() {
        let minor = ScaleKind::Minor.scale();
        // one step below the root is the flat seventh an octave down
        assert_eq!(minor.degree_to_midi(-1, 60), 58);
    }

    #[test]
    fn test_scale_lengths_in_range() {
        for kind in ScaleKind::ALL {
            let len = kind.intervals().len();
            assert!((5..=12).contains(&len), "{}", kind.name());
        }
    }

    #[test]
    fn test_from_name_roundtrip() {
        for kind in ScaleKind::ALL {
            assert_eq!(ScaleKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScaleKind::from_name(":aeolian"), Some(ScaleKind::Minor));
        assert_eq!(ScaleKind::from_name("nope"), None);
    }

    #[test]
    fn test_midi_to_freq() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_to_freq(57) - 220.0).abs() < 1e-3);
    }
}
