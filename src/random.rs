use rand::Rng as _;

/// Random source that pulls a batch of raw words up front and hands out
/// bounded indices from the batch.
///
/// The buffer must be sized for the exact number of draws the caller will
/// make; drawing past the end is a caller bug and panics.
pub struct BufferedRandom {
    words: Vec<u32>,
    next: usize,
}

impl BufferedRandom {
    pub fn new(draws: usize) -> Self {
        let mut words = vec![0u32; draws];
        rand::thread_rng().fill(&mut words[..]);
        Self { words, next: 0 }
    }

    /// Fixed word sequence, for deterministic generation.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words, next: 0 }
    }

    pub fn index(&mut self, bound: i32) -> i32 {
        assert!(bound > 0, "index bound must be positive");
        assert!(
            self.next < self.words.len(),
            "buffered random source exhausted after {} draws",
            self.words.len()
        );
        let word = self.words[self.next];
        self.next += 1;
        (word % bound as u32) as i32
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.next
    }
}
