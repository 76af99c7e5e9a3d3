//! Keyword topic tagging

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use storyline_core::Item;

/// Fallback tag for items no topic matched
pub const GENERAL_TOPIC: &str = "general";

/// A topic tag and the keywords that trigger it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
}

impl Topic {
    pub fn new(id: &str, label: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Default topic catalog for the tech news dataset
pub fn default_topics() -> Vec<Topic> {
    vec![
        Topic::new(
            GENERAL_TOPIC,
            "General",
            &["technology", "tech", "software", "hardware", "internet"],
        ),
        Topic::new(
            "ai",
            "AI",
            &[
                "ai",
                "artificial intelligence",
                "llm",
                "chatgpt",
                "openai",
                "anthropic",
                "gemini",
                "machine learning",
            ],
        ),
        Topic::new(
            "startups_vc",
            "Startups & VC",
            &[
                "startup", "seed", "series a", "series b", "funding", "venture", "vc",
                "valuation", "acquired",
            ],
        ),
        Topic::new(
            "frontend",
            "Frontend",
            &[
                "react", "next.js", "nextjs", "frontend", "ui", "css", "tailwind",
                "typescript", "javascript",
            ],
        ),
        Topic::new(
            "backend",
            "Backend & Infra",
            &[
                "kubernetes", "k8s", "postgres", "database", "backend", "infra", "devops",
                "docker", "microservices",
            ],
        ),
        Topic::new(
            "devtools",
            "Developer Tools",
            &[
                "devtools", "developer tools", "sdk", "cli", "open source", "github",
                "release", "launch",
            ],
        ),
        Topic::new(
            "security",
            "Security",
            &[
                "security", "breach", "vulnerability", "cve", "ransomware", "phishing",
                "zero-day", "exploit",
            ],
        ),
        Topic::new(
            "hardware_gpu",
            "Hardware & GPUs",
            &[
                "gpu", "nvidia", "amd", "intel", "semiconductor", "chip", "foundry", "euv",
                "supply chain",
            ],
        ),
        Topic::new(
            "robotics",
            "Robotics",
            &[
                "robot", "robotics", "humanoid", "automation", "warehouse robot", "drone",
                "autonomous",
            ],
        ),
        Topic::new(
            "policy",
            "Policy",
            &[
                "regulation", "policy", "law", "antitrust", "congress", "eu", "gdpr", "ai act",
            ],
        ),
        Topic::new(
            "data",
            "Data",
            &[
                "data", "privacy", "dataset", "analytics", "telemetry", "tracking",
                "observability", "logging",
            ],
        ),
    ]
}

/// Replace each item's tags with the topics whose keywords occur in its
/// title or summary, returning how many items carry each tag
///
/// Matching is a case-insensitive substring test. Items matching nothing
/// are tagged [`GENERAL_TOPIC`].
pub fn tag_items(items: &mut [Item], topics: &[Topic]) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    let matchers: Vec<&Topic> = topics.iter().filter(|t| t.id != GENERAL_TOPIC).collect();

    for item in items.iter_mut() {
        let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
        let mut tags: IndexSet<String> = matchers
            .iter()
            .filter(|t| t.keywords.iter().any(|kw| !kw.is_empty() && haystack.contains(kw.as_str())))
            .map(|t| t.id.clone())
            .collect();

        if tags.is_empty() {
            tags.insert(GENERAL_TOPIC.to_string());
        }
        item.tags = tags.into_iter().collect();

        for tag in &item.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    counts
}

/// Tag counts sorted by frequency, most common first
pub fn top_tag_counts(counts: &IndexMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut sorted: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.truncate(n);
    sorted
}
