use tracing::{error, info};

use crate::llm::AssistantGateway;
use crate::orchestrator::PetSnapshot;
use crate::search::SearchProvider;

/// What kind of help the user is actually asking for. Location-seeking
/// queries get clinic directories instead of medical references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Medical,
    Location,
}

const LOCATION_KEYWORDS: [&str; 3] = ["vet", "veterinarian", "animal hospital"];

const MEDICAL_DOMAINS: [&str; 7] = [
    "petmd.com",
    "vcahospitals.com",
    "merckvetmanual.com",
    "aaha.org",
    "avma.org",
    "vet.cornell.edu",
    "vetmed.ucdavis.edu",
];

const CLINIC_DOMAINS: [&str; 5] = [
    "yelp.com",
    "vcahospitals.com",
    "banfield.com",
    "aaha.org",
    "vetstreet.com",
];

const BLOCKED_DOMAINS: [&str; 6] = [
    "quora.com",
    "facebook.com",
    "twitter.com",
    "reddit.com",
    "instagram.com",
    "tiktok.com",
];

pub fn classify_query(message: &str) -> QueryClass {
    let lower = message.to_lowercase();
    if LOCATION_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        QueryClass::Location
    } else {
        QueryClass::Medical
    }
}

fn summary_prompt(class: QueryClass, pet: &PetSnapshot) -> String {
    let pet_type = pet.pet_type.as_deref().unwrap_or("pet");
    match class {
        QueryClass::Medical => format!(
            "Given the following search results about {} health, specifically regarding {} \
             with symptoms: {}, please extract and summarize the most relevant medical \
             information. Focus on treatment options, care instructions, and important \
             medical facts. Exclude any general or non-medical content. Format any \
             citations as markdown links.",
            pet_type,
            pet.disease.as_deref().unwrap_or("an unknown condition"),
            pet.symptoms.as_deref().unwrap_or("none reported"),
        ),
        QueryClass::Location => format!(
            "Given the following search results about veterinary clinics and services, \
             provide practical guidance for finding qualified veterinary care for a {}. \
             Focus on how to evaluate a clinic, which services matter for the pet's \
             condition, and any concrete options named in the results. Format any \
             citations as markdown links.",
            pet_type,
        ),
    }
}

/// Best-effort enrichment of an uncertain assistant answer. Returns the
/// synthesized replacement text, or `None` on any failure so the caller keeps
/// the original model response. This path must never fail a turn.
pub async fn enrich(
    gateway: &dyn AssistantGateway,
    search: &dyn SearchProvider,
    message: &str,
    pet: &PetSnapshot,
) -> Option<String> {
    let class = classify_query(message);
    let include: &[&str] = match class {
        QueryClass::Medical => &MEDICAL_DOMAINS,
        QueryClass::Location => &CLINIC_DOMAINS,
    };

    let results = match search.search(message, include, &BLOCKED_DOMAINS).await {
        Ok(results) if !results.is_empty() => results,
        Ok(_) => {
            info!("Search fallback returned no results");
            return None;
        }
        Err(e) => {
            error!("Search fallback failed: {}", e);
            return None;
        }
    };

    let search_content = results
        .iter()
        .map(|r| format!("Source: {}\n{}", r.title, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let summary = match gateway
        .complete(&summary_prompt(class, pet), &search_content, 0.3)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!("Search summarization failed: {}", e);
            return None;
        }
    };

    let sources = results
        .iter()
        .map(|r| format!("\u{2022} {}\n  {}", r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n");

    let lead_in = match class {
        QueryClass::Medical => "Based on veterinary sources, here's what I found:",
        QueryClass::Location => "Here's what I found about veterinary care options:",
    };

    Some(format!(
        "{}\n\n{}\n\nSources consulted:\n{}",
        lead_in, summary, sources
    ))
}
