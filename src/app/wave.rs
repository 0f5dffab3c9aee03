//! Wave-merge: the state machine deciding whether a mutating call coalesces
//! into the live top World or forces `advance` (spec section 4.6).

use smartstring::alias::String as SmartString;

/// A resolved tag descriptor for one mutating call - the `id`/`rate` tokens
/// of a class-declared tag template (e.g. `"typing:id"`) already substituted
/// with this call's actual values.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub tag: Vec<SmartString>,
    pub rate: f64,
}

impl Wave {
    pub fn new(tag: Vec<SmartString>, rate: f64) -> Self {
        Wave { tag, rate }
    }
}

/// Split a tag template on `:`, substituting the `id`/`rate` placeholder
/// tokens with this call's values; any other token (including the literal
/// wildcard `*`) passes through unchanged.
pub fn resolve_tag(template: &str, id: &str, rate: f64) -> Vec<SmartString> {
    template
        .split(':')
        .map(|tok| match tok {
            "id" => SmartString::from(id),
            "rate" => SmartString::from(rate.to_string()),
            other => SmartString::from(other),
        })
        .collect()
}

/// `(lastTag, lastRate)` - the only state wave-merge carries between calls.
#[derive(Debug, Clone, Default)]
pub struct WaveState {
    last_tag: Vec<SmartString>,
    last_rate: f64,
}

impl WaveState {
    pub fn new() -> Self {
        Self::default()
    }

    fn tags_match(&self, tag: &[SmartString]) -> bool {
        self.last_tag.len() == tag.len()
            && self.last_tag.iter().zip(tag).all(|(a, b)| a == "*" || b == "*" || a == b)
    }

    /// Decide whether `wave` merges into the live top world. Returns `true`
    /// to merge (extend, don't advance), `false` to advance. A call with no
    /// wave descriptor always advances and resets the state, same as a tag
    /// mismatch.
    pub fn decide(&mut self, wave: Option<&Wave>) -> bool {
        let Some(wave) = wave else {
            self.last_tag.clear();
            self.last_rate = 1.0;
            return false;
        };
        let merges = self.tags_match(&wave.tag) && wave.rate > self.last_rate;
        if merges {
            self.last_rate = wave.rate;
        } else {
            self.last_tag = wave.tag.clone();
            self.last_rate = 1.0;
        }
        merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Vec<SmartString> {
        s.split(':').map(SmartString::from).collect()
    }

    #[test]
    fn increasing_rate_same_tag_merges() {
        let mut st = WaveState::new();
        assert!(!st.decide(Some(&Wave::new(tag("typing:k1"), 1.0))));
        assert!(st.decide(Some(&Wave::new(tag("typing:k1"), 2.0))));
        assert!(st.decide(Some(&Wave::new(tag("typing:k1"), 3.0))));
    }

    #[test]
    fn tag_change_breaks_the_wave() {
        let mut st = WaveState::new();
        assert!(!st.decide(Some(&Wave::new(tag("typing:k1"), 1.0))));
        assert!(st.decide(Some(&Wave::new(tag("typing:k1"), 2.0))));
        assert!(!st.decide(Some(&Wave::new(tag("typing:k2"), 3.0))));
    }

    #[test]
    fn rate_drop_breaks_the_wave() {
        let mut st = WaveState::new();
        assert!(!st.decide(Some(&Wave::new(tag("typing:k1"), 5.0))));
        assert!(!st.decide(Some(&Wave::new(tag("typing:k1"), 1.0))));
    }

    #[test]
    fn wildcard_token_matches_anything() {
        let mut st = WaveState::new();
        assert!(!st.decide(Some(&Wave::new(tag("typing:*"), 1.0))));
        assert!(st.decide(Some(&Wave::new(tag("typing:k7"), 2.0))));
    }

    #[test]
    fn no_descriptor_always_advances() {
        let mut st = WaveState::new();
        assert!(!st.decide(None));
        assert!(!st.decide(None));
    }
}
