use rand::seq::SliceRandom;

/// Reference sentences a test picks from.
pub const SAMPLE_TEXTS: &[&str] = &[
    "The quick brown fox jumps over the lazy dog.",
    "Never underestimate the power of a good book.",
    "The journey of a thousand miles begins with a single step.",
    "Programming is the art of telling another human what one wants the computer to do.",
    "Practice makes perfect when it comes to typing speed and accuracy.",
    "The best time to plant a tree was twenty years ago. The second best time is now.",
    "Life is what happens to you while you are busy making other plans.",
    "Technology is best when it brings people together and makes life easier.",
    "Success is not final, failure is not fatal, it is the courage to continue that counts.",
    "The only way to do great work is to love what you do and stay passionate.",
    "She has a very cheerful and optimistic personality.",
];

/// Picks the reference text for a new test.
///
/// A custom prompt always wins; otherwise a random sample is chosen.
pub fn choose_reference(custom_prompt: Option<&str>) -> String {
    if let Some(prompt) = custom_prompt.filter(|p| !p.is_empty()) {
        return prompt.to_string();
    }
    let rng = &mut rand::thread_rng();
    SAMPLE_TEXTS
        .choose(rng)
        .copied()
        .unwrap_or(SAMPLE_TEXTS[0])
        .to_string()
}
