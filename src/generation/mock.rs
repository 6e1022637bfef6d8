//! Mock backend for testing and offline demos
//!
//! Produces random but schema-valid replies for every operation. Tests
//! can queue scripted replies or transport failures, which are consumed
//! in order before the random generator is used again.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};

use super::backend::{GenerationBackend, GenerationKind, GenerationRequest};

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock backend behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Simulated latency per call (ms)
    pub latency_ms: u64,

    /// Fixed RNG seed for reproducible output
    pub seed: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────
// Sample data
// ─────────────────────────────────────────────────────────────────

const FIRST_NAMES: &[(&str, &str)] = &[
    ("Priya", "Female"),
    ("Tony", "Male"),
    ("Amara", "Female"),
    ("Kenji", "Male"),
    ("Sofia", "Female"),
    ("Liam", "Male"),
    ("Noor", "Female"),
    ("Mateo", "Male"),
];

const LAST_NAMES: &[&str] = &["Sharma", "Alvarez", "Okafor", "Tanaka", "Rossi", "Murphy", "Haddad"];

const HEADINGS: &[&str] = &[
    "The Pragmatic Professional",
    "The Curious Explorer",
    "The Budget Optimizer",
    "The Early Adopter",
    "The Cautious Researcher",
    "The Busy Parent",
];

const OCCUPATIONS: &[&str] = &[
    "Project Manager",
    "Graphic Designer",
    "Software Engineer",
    "Small Business Owner",
    "Accountant",
    "Nurse",
];

const LOCATIONS: &[&str] = &[
    "Mumbai, India",
    "Austin, USA",
    "Lagos, Nigeria",
    "Osaka, Japan",
    "Milan, Italy",
    "Dublin, Ireland",
];

const QUOTES: &[&str] = &[
    "I need tools that just work.",
    "Show me the numbers first.",
    "If it saves me an hour, I'm in.",
    "I trust what my friends recommend.",
];

const GOALS: &[&str] = &[
    "Save time on repetitive work",
    "Grow a loyal customer base",
    "Stay within a tight budget",
    "Learn new skills quickly",
];

const CHANNELS: &[&str] = &[
    "LinkedIn, industry newsletters",
    "Instagram, TikTok",
    "YouTube tutorials",
    "Podcasts, Reddit",
];

const TRAITS: &[&str] = &[
    "Reads reviews before buying",
    "Values time savings",
    "Shops on mobile",
    "Compares prices across sites",
    "Follows niche creators",
];

const PAIN_POINTS: &[&str] = &[
    "Information overload",
    "Long onboarding",
    "Hidden fees",
    "Poor customer support",
    "Too many notifications",
];

const FORMATS: &[&str] = &[
    "Series of 30-second TikTok tutorials",
    "Customer case study blog post",
    "Email nurture sequence",
    "Live webinar with Q&A",
    "Carousel post on LinkedIn",
];

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn pick_many(rng: &mut StdRng, items: &[&str], amount: usize) -> Vec<String> {
    items
        .choose_multiple(rng, amount)
        .map(|item| item.to_string())
        .collect()
}

/// First positive integer mentioned in `text`, if any.
fn first_number(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter_map(|token| token.parse::<u32>().ok())
        .find(|n| *n > 0)
}

fn context_count(context: &Value) -> usize {
    context
        .get("count")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(3)
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

enum Scripted {
    Reply(String),
    Failure(String),
}

/// Track calls per operation for verification
#[derive(Debug, Default)]
struct CallCounts {
    create_personas: u32,
    refine_persona: u32,
    generate_campaigns: u32,
}

/// Offline implementation of GenerationBackend
pub struct MockBackend {
    config: MockConfig,
    rng: Mutex<StdRng>,
    script: Mutex<VecDeque<Scripted>>,
    call_counts: RwLock<CallCounts>,
}

impl MockBackend {
    /// Create a new mock backend with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock backend with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
            script: Mutex::new(VecDeque::new()),
            call_counts: RwLock::new(CallCounts::default()),
        }
    }

    /// Queue a reply text for the next call
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().push_back(Scripted::Reply(reply.into()));
    }

    /// Queue a transport failure for the next call
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().push_back(Scripted::Failure(message.into()));
    }

    /// Get the number of calls made for an operation
    pub fn call_count(&self, kind: GenerationKind) -> u32 {
        let counts = self.call_counts.read();
        match kind {
            GenerationKind::CreatePersonas => counts.create_personas,
            GenerationKind::RefinePersona => counts.refine_persona,
            GenerationKind::GenerateCampaigns => counts.generate_campaigns,
        }
    }

    /// Total calls across all operations
    pub fn total_calls(&self) -> u32 {
        let counts = self.call_counts.read();
        counts.create_personas + counts.refine_persona + counts.generate_campaigns
    }

    fn record_call(&self, kind: GenerationKind) {
        let mut counts = self.call_counts.write();
        match kind {
            GenerationKind::CreatePersonas => counts.create_personas += 1,
            GenerationKind::RefinePersona => counts.refine_persona += 1,
            GenerationKind::GenerateCampaigns => counts.generate_campaigns += 1,
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn random_persona(rng: &mut StdRng) -> Value {
        let (first, gender) = FIRST_NAMES.choose(rng).copied().unwrap_or(("Alex", "Non-binary"));
        let name = format!("{} {}", first, pick(rng, LAST_NAMES));
        let occupation = pick(rng, OCCUPATIONS);

        json!({
            "heading": pick(rng, HEADINGS),
            "name": name,
            "age": rng.gen_range(22..=60),
            "gender": gender,
            "occupation": occupation,
            "location": pick(rng, LOCATIONS),
            "background": format!("{} who discovered the product through a friend.", occupation),
            "quote": pick(rng, QUOTES),
            "goal": pick(rng, GOALS),
            "channel": pick(rng, CHANNELS),
            "behaviour_traits": pick_many(rng, TRAITS, 2),
            "pain_points": pick_many(rng, PAIN_POINTS, 2),
            "recommended_messaging": format!("Speak to {} about outcomes, not features.", first),
        })
    }

    fn personas_reply(&self, context: &Value) -> Value {
        let mut rng = self.rng.lock();
        let personas: Vec<Value> = (0..context_count(context).max(1))
            .map(|_| Self::random_persona(&mut rng))
            .collect();
        json!({ "personas": personas })
    }

    fn refinement_reply(&self, context: &Value) -> Value {
        let instruction = context
            .get("instruction")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let lowered = instruction.to_lowercase();
        let mut rng = self.rng.lock();

        if lowered.contains("age") {
            if let Some(age) = first_number(&lowered) {
                return json!({ "age": age });
            }
        }
        if lowered.contains("location") || lowered.contains("move") {
            return json!({ "location": pick(&mut rng, LOCATIONS) });
        }
        if lowered.contains("job") || lowered.contains("occupation") {
            return json!({ "occupation": pick(&mut rng, OCCUPATIONS) });
        }
        if lowered.contains("heading") || lowered.contains("title") {
            return json!({ "heading": pick(&mut rng, HEADINGS) });
        }

        let background = context
            .pointer("/persona/background")
            .and_then(Value::as_str)
            .unwrap_or_default();
        json!({ "background": format!("{} {}", background, instruction).trim() })
    }

    fn campaigns_reply(&self, context: &Value) -> Value {
        let pain_point = context
            .pointer("/persona/pain_points/0")
            .and_then(Value::as_str)
            .unwrap_or("everyday friction");
        let goal = context
            .pointer("/persona/goal")
            .and_then(Value::as_str)
            .unwrap_or("their goals");

        let angles = [
            format!("Show how the product removes {}", pain_point.to_lowercase()),
            format!("Connect the product to the goal: {}", goal),
            "Let existing customers tell the story".to_string(),
        ];

        let mut rng = self.rng.lock();
        let campaigns: Vec<Value> = (0..context_count(context).max(1))
            .map(|i| {
                json!({
                    "angle": angles[i % angles.len()],
                    "format": pick(&mut rng, FORMATS),
                })
            })
            .collect();
        json!({ "campaigns": campaigns })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.record_call(request.kind);
        self.simulate_latency().await;

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(Scripted::Reply(reply)) => {
                debug!(operation = request.kind.as_str(), "Mock returning scripted reply");
                return Ok(reply);
            }
            Some(Scripted::Failure(message)) => {
                debug!(operation = request.kind.as_str(), "Mock returning scripted failure");
                return Err(Error::generation_unavailable("mock", message));
            }
            None => {}
        }

        let reply = match request.kind {
            GenerationKind::CreatePersonas => self.personas_reply(&request.context),
            GenerationKind::RefinePersona => self.refinement_reply(&request.context),
            GenerationKind::GenerateCampaigns => self.campaigns_reply(&request.context),
        };
        Ok(reply.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{PersonaDraft, PersonaRecord};
    use crate::persona::types::tests::sample_record;

    fn request(kind: GenerationKind, context: Value) -> GenerationRequest {
        GenerationRequest::new(kind, String::new(), context)
    }

    #[tokio::test]
    async fn test_random_personas_are_schema_valid() {
        let mock = MockBackend::new();
        let reply = mock
            .generate(request(GenerationKind::CreatePersonas, json!({ "count": 4 })))
            .await
            .unwrap();

        let value: Value = serde_json::from_str(&reply).unwrap();
        let personas = value["personas"].as_array().unwrap();
        assert_eq!(personas.len(), 4);
        for persona in personas {
            let draft: PersonaDraft = serde_json::from_value(persona.clone()).unwrap();
            assert!(draft.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_seeded_output_is_reproducible() {
        let config = MockConfig {
            seed: Some(7),
            ..Default::default()
        };
        let a = MockBackend::with_config(config.clone());
        let b = MockBackend::with_config(config);
        let ctx = json!({ "count": 2 });

        let reply_a = a.generate(request(GenerationKind::CreatePersonas, ctx.clone())).await.unwrap();
        let reply_b = b.generate(request(GenerationKind::CreatePersonas, ctx)).await.unwrap();
        assert_eq!(reply_a, reply_b);
    }

    #[tokio::test]
    async fn test_refinement_understands_age() {
        let mock = MockBackend::new();
        let ctx = json!({ "persona": sample_record("p1"), "instruction": "Change age to 42" });
        let reply = mock.generate(request(GenerationKind::RefinePersona, ctx)).await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&reply).unwrap(), json!({ "age": 42 }));
    }

    #[tokio::test]
    async fn test_refinement_falls_back_to_background() {
        let mock = MockBackend::new();
        let record: PersonaRecord = sample_record("p1");
        let ctx = json!({ "persona": record, "instruction": "She loves hiking." });
        let reply = mock.generate(request(GenerationKind::RefinePersona, ctx)).await.unwrap();
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert!(value["background"].as_str().unwrap().ends_with("She loves hiking."));
    }

    #[tokio::test]
    async fn test_campaigns_use_pain_point_and_goal() {
        let mock = MockBackend::new();
        let ctx = json!({ "persona": sample_record("p1"), "count": 3 });
        let reply = mock
            .generate(request(GenerationKind::GenerateCampaigns, ctx))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&reply).unwrap();
        let campaigns = value["campaigns"].as_array().unwrap();
        assert_eq!(campaigns.len(), 3);
        assert!(campaigns[0]["angle"].as_str().unwrap().contains("information overload"));
        assert!(campaigns[1]["angle"].as_str().unwrap().contains("Improve team productivity."));
    }

    #[tokio::test]
    async fn test_scripted_replies_and_failures_in_order() {
        let mock = MockBackend::new();
        mock.push_reply("first");
        mock.push_failure("boom");

        let ctx = json!({});
        assert_eq!(
            mock.generate(request(GenerationKind::RefinePersona, ctx.clone())).await.unwrap(),
            "first"
        );
        let err = mock
            .generate(request(GenerationKind::RefinePersona, ctx))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationUnavailable { ref backend, .. } if backend == "mock"));
    }

    #[tokio::test]
    async fn test_call_counts() {
        let mock = MockBackend::new();
        mock.generate(request(GenerationKind::CreatePersonas, json!({}))).await.unwrap();
        mock.generate(request(GenerationKind::GenerateCampaigns, json!({}))).await.unwrap();
        mock.generate(request(GenerationKind::GenerateCampaigns, json!({}))).await.unwrap();

        assert_eq!(mock.call_count(GenerationKind::CreatePersonas), 1);
        assert_eq!(mock.call_count(GenerationKind::RefinePersona), 0);
        assert_eq!(mock.call_count(GenerationKind::GenerateCampaigns), 2);
        assert_eq!(mock.total_calls(), 3);
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("change age to 42 please"), Some(42));
        assert_eq!(first_number("make her 0 or 35"), Some(35));
        assert_eq!(first_number("older"), None);
    }
}
