//! Prompt builder
//!
//! Pure functions turning user inputs and persona records into model
//! instructions. Inputs are embedded verbatim, and every instruction
//! spells out the exact JSON shape expected back along with a worked
//! example, since the model is not trusted to infer structure.

use serde_json::json;

use crate::error::{Error, Result};
use crate::persona::PersonaRecord;

/// Raw inputs for a persona batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaInputs {
    pub survey: String,
    pub reviews: String,
    pub positioning: String,
}

// ─────────────────────────────────────────────────────────────────
// Worked examples
// ─────────────────────────────────────────────────────────────────

fn example_persona() -> serde_json::Value {
    json!({
        "heading": "The Pragmatic Professional",
        "name": "Priya Sharma",
        "age": 34,
        "gender": "Female",
        "occupation": "Project Manager",
        "location": "Mumbai, India",
        "background": "Leads a delivery team at a fast-growing startup.",
        "quote": "I need tools that just work.",
        "goal": "Improve team productivity without adding process.",
        "channel": "LinkedIn, industry newsletters",
        "behaviour_traits": ["Reads reviews before buying", "Values time savings"],
        "pain_points": ["Information overload", "Tools that need long onboarding"],
        "recommended_messaging": "Lead with measurable time saved per week."
    })
}

fn to_pretty(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("failed to render prompt data: {}", e)))
}

// ─────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────

/// Instruction for creating `count` personas from survey, reviews and
/// positioning text.
pub fn persona_batch_prompt(inputs: &PersonaInputs, count: usize) -> Result<String> {
    let example = to_pretty(&json!({ "personas": [example_persona()] }))?;

    Ok(format!(
        r#"Analyze the following customer data to create {count} distinct, detailed marketing personas.
Your output MUST be a valid JSON object with a single key "personas" which contains a list of {count} persona objects.

Product Positioning Statement:
"{positioning}"

Customer Survey Data:
"{survey}"

Customer Reviews:
"{reviews}"

Instructions:
1. If the input data contains specific demographic information (a single age, location or occupation), ALL personas must share it and differ only within that constraint.
2. Every persona must be distinct: vary names, headings, quotes and trait combinations.

Each persona object has exactly these fields:
- "heading": a creative archetype-style title (string)
- "name", "gender", "occupation", "location": strings
- "age": a positive integer
- "background", "quote", "goal", "channel", "recommended_messaging": strings
- "behaviour_traits", "pain_points": lists of short strings

Do NOT include "id" or "photo_url" in your JSON response.

Example of the expected shape:
{example}"#,
        count = count,
        positioning = inputs.positioning,
        survey = inputs.survey,
        reviews = inputs.reviews,
        example = example,
    ))
}

/// Instruction for applying a free-text edit to an existing persona.
pub fn refinement_prompt(record: &PersonaRecord, instruction: &str) -> Result<String> {
    let original = to_pretty(record)?;

    Ok(format!(
        r#"You are helping to refine a marketing persona.

Original Persona Data:
{original}

User's Instruction:
"{instruction}"

Update the persona according to the instruction. Your output MUST be a valid JSON object containing ONLY the fields that changed, using the same field names and types as the original. Never include "id".

Example: if the instruction is "change age to 42", respond with:
{{"age": 42}}"#,
        original = original,
        instruction = instruction,
    ))
}

/// Instruction for `count` campaign ideas targeting one persona.
pub fn campaign_prompt(record: &PersonaRecord, count: usize) -> Result<String> {
    let persona = to_pretty(record)?;
    let example = to_pretty(&json!({
        "campaigns": [{
            "angle": "Highlight ease of use for busy professionals",
            "format": "Series of 30-second TikTok tutorials"
        }]
    }))?;

    Ok(format!(
        r#"Based on the following marketing persona, generate {count} creative and relevant campaign ideas.
Your output MUST be a valid JSON object with a single key "campaigns" which contains a list of {count} campaign objects.

Persona Details:
{persona}

For each campaign idea, provide:
- "angle": a short strategic approach (string)
- "format": a specific content type (string)

Example of the expected shape:
{example}"#,
        count = count,
        persona = persona,
        example = example,
    ))
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::tests::sample_record;

    fn inputs() -> PersonaInputs {
        PersonaInputs {
            survey: "Respondents aged 30-40 want faster onboarding.".to_string(),
            reviews: "\"Setup took a whole afternoon\" - 2 stars".to_string(),
            positioning: "The fastest project tracker for small teams".to_string(),
        }
    }

    #[test]
    fn test_batch_prompt_embeds_inputs_verbatim() {
        let prompt = persona_batch_prompt(&inputs(), 3).unwrap();
        assert!(prompt.contains("Respondents aged 30-40 want faster onboarding."));
        assert!(prompt.contains("\"Setup took a whole afternoon\" - 2 stars"));
        assert!(prompt.contains("The fastest project tracker for small teams"));
    }

    #[test]
    fn test_batch_prompt_names_schema() {
        let prompt = persona_batch_prompt(&inputs(), 3).unwrap();
        assert!(prompt.contains(r#"single key "personas""#));
        assert!(prompt.contains("list of 3 persona objects"));
        assert!(prompt.contains(r#"Do NOT include "id" or "photo_url""#));
        for field in ["heading", "behaviour_traits", "pain_points", "recommended_messaging"] {
            assert!(prompt.contains(field), "missing field {}", field);
        }
    }

    #[test]
    fn test_batch_prompt_does_not_truncate() {
        let long = PersonaInputs {
            survey: "x".repeat(50_000),
            ..inputs()
        };
        let prompt = persona_batch_prompt(&long, 2).unwrap();
        assert!(prompt.contains(&long.survey));
    }

    #[test]
    fn test_refinement_prompt() {
        let record = sample_record("p1");
        let prompt = refinement_prompt(&record, "make her a night owl").unwrap();
        assert!(prompt.contains("make her a night owl"));
        assert!(prompt.contains("Priya Sharma"));
        assert!(prompt.contains("ONLY the fields that changed"));
        assert!(prompt.contains(r#"{"age": 42}"#));
    }

    #[test]
    fn test_campaign_prompt() {
        let record = sample_record("p1");
        let prompt = campaign_prompt(&record, 3).unwrap();
        assert!(prompt.contains(r#"single key "campaigns""#));
        assert!(prompt.contains("list of 3 campaign objects"));
        assert!(prompt.contains("Information overload"));
        assert!(prompt.contains("\"angle\""));
        assert!(prompt.contains("\"format\""));
    }
}
