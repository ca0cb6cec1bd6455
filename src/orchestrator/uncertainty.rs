/// Ordered lowercase phrases whose presence in a model response indicates low
/// confidence. Hedging phrases first, location-seeking phrases at the end.
/// The list is data: extend it here, not in control flow.
pub const UNCERTAINTY_PHRASES: [&str; 19] = [
    "i'm not sure",
    "i don't know",
    "i cannot provide",
    "i'm unable to",
    "i don't have enough information",
    "i cannot say for certain",
    "it's unclear",
    "i'm not qualified",
    "i cannot make a diagnosis",
    "you should consult a veterinarian",
    "i recommend searching",
    "i don't have real-time access",
    "recommend contacting",
    "searching online",
    "find a qualified",
    "contact a local",
    "directories provided by",
    "find a vet",
    "veterinary clinics",
];

pub fn matches_any(response: &str, phrases: &[&str]) -> bool {
    let lower = response.to_lowercase();
    phrases.iter().any(|phrase| lower.contains(phrase))
}

pub fn is_uncertain(response: &str) -> bool {
    matches_any(response, &UNCERTAINTY_PHRASES)
}
