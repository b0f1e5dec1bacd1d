//! Heuristic answers for queries the upstream API has nothing to say about.
//!
//! Classification is plain case-insensitive substring and prefix matching over
//! English keywords. The order of [`classify`] is significant: the first
//! matching category wins.

use chrono::{Local, NaiveDateTime};

use crate::arithmetic;

pub const MATH_HELP: &str =
    "I can help with basic math calculations. Please provide a clear mathematical expression.";

const WEATHER: &str = "I don't have access to real-time weather data in this demo. For current weather information, I'd recommend checking a weather service like Weather.com or your local weather app.";

const PROGRAMMING: &str = "JavaScript and React are powerful tools for web development. JavaScript is a versatile programming language that runs in browsers and on servers, while React is a popular library for building user interfaces. They work together to create dynamic, interactive web applications.";

const SCIENCE: &str = "Science encompasses the systematic study of the natural world through observation and experimentation. It includes fields like physics (the study of matter and energy), chemistry (the study of atoms and molecules), and biology (the study of living organisms).";

const HEALTH: &str = "Maintaining good health involves a balanced approach including regular exercise, proper nutrition, adequate sleep, and stress management. For specific medical advice, always consult with healthcare professionals.";

const HISTORY: &str = "History helps us understand how past events have shaped our present world. Studying historical patterns, conflicts, and civilizations provides valuable insights into human behavior and societal development.";

const AI: &str = "Artificial Intelligence (AI) is a field of computer science focused on creating systems that can perform tasks that typically require human intelligence. This includes machine learning, natural language processing, and computer vision. AI is increasingly integrated into everyday applications.";

const OPERATORS: [char; 4] = ['+', '-', '*', '/'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Arithmetic,
    Weather,
    Time,
    Programming,
    Science,
    Health,
    History,
    Ai,
    WhatIs,
    HowTo,
    Why,
    Default,
}

/// Topic categories in priority order, each with the keywords that select it.
const TOPICS: [(Category, &[&str]); 5] = [
    (Category::Programming, &["javascript", "react", "programming"]),
    (Category::Science, &["science", "physics", "chemistry"]),
    (Category::Health, &["health", "exercise", "nutrition"]),
    (Category::History, &["history", "war", "ancient"]),
    (Category::Ai, &["ai", "artificial intelligence", "machine learning"]),
];

pub fn classify(query: &str) -> Category {
    let lower = query.to_lowercase();

    if lower.contains("what is") && lower.contains(OPERATORS) {
        return Category::Arithmetic;
    }
    if contains_any(&lower, &["weather", "temperature"]) {
        return Category::Weather;
    }
    if contains_any(&lower, &["time", "date"]) {
        return Category::Time;
    }
    if let Some((category, _)) = TOPICS.iter().find(|(_, words)| contains_any(&lower, words)) {
        return *category;
    }
    if strip_prefix_ci(query, "what is").is_some() || strip_prefix_ci(query, "what are").is_some() {
        return Category::WhatIs;
    }
    if strip_prefix_ci(query, "how to").is_some() || strip_prefix_ci(query, "how do").is_some() {
        return Category::HowTo;
    }
    if strip_prefix_ci(query, "why").is_some() {
        return Category::Why;
    }
    Category::Default
}

/// Produce an answer for `query` using the local clock.
pub fn synthesize(query: &str) -> String {
    synthesize_at(query, Local::now().naive_local())
}

pub fn synthesize_at(query: &str, now: NaiveDateTime) -> String {
    match classify(query) {
        Category::Arithmetic => match evaluate_after_what_is(query) {
            Some(result) => result,
            None => MATH_HELP.to_string(),
        },
        Category::Weather => WEATHER.to_string(),
        Category::Time => time_answer(now),
        Category::Programming => PROGRAMMING.to_string(),
        Category::Science => SCIENCE.to_string(),
        Category::Health => HEALTH.to_string(),
        Category::History => HISTORY.to_string(),
        Category::Ai => AI.to_string(),
        Category::WhatIs => {
            let topic = strip_prefix_ci(query, "what is")
                .or_else(|| strip_prefix_ci(query, "what are"))
                .unwrap_or(query)
                .trim();
            format!(
                "{topic} is a topic that encompasses various aspects and considerations. While I can provide general information, the specific details would depend on the context you're interested in. For more comprehensive information, you might want to explore academic sources or specialized resources."
            )
        }
        Category::HowTo => {
            let task = strip_prefix_ci(query, "how to")
                .or_else(|| strip_prefix_ci(query, "how do"))
                .unwrap_or(query)
                .trim();
            format!(
                "To {task}, you'll typically need to break it down into manageable steps. The specific approach depends on your current situation and goals. I'd recommend starting with research, planning your approach, and taking it one step at a time."
            )
        }
        Category::Why => {
            let topic = strip_prefix_ci(query, "why").unwrap_or(query).trim();
            format!(
                "The reasons for {topic} can be complex and multifaceted. Various factors including historical context, scientific principles, and human behavior often contribute to such phenomena. Understanding these underlying causes requires examining multiple perspectives."
            )
        }
        Category::Default => format!(
            "Based on your question about \"{query}\", this is a topic that involves several important considerations. While I can provide general insights, the specific details would depend on various factors and context. For the most accurate and up-to-date information, I'd recommend consulting authoritative sources in the relevant field."
        ),
    }
}

/// Reduced responder for when the search service itself is unreachable:
/// arithmetic, then the clock, then an apology.
pub fn offline_answer(query: &str) -> String {
    offline_answer_at(query, Local::now().naive_local())
}

pub fn offline_answer_at(query: &str, now: NaiveDateTime) -> String {
    let lower = query.to_lowercase();

    if lower.contains(OPERATORS) {
        if let Some(result) = evaluate_after_what_is(query) {
            return result;
        }
    }
    if contains_any(&lower, &["time", "date"]) {
        return time_answer(now);
    }
    format!(
        "I'm sorry, I couldn't reach the search service to look up \"{query}\". Please check your connection and try again."
    )
}

pub fn time_answer(now: NaiveDateTime) -> String {
    format!(
        "The current time is {} and today's date is {}.",
        now.format("%-I:%M:%S %p"),
        now.format("%-m/%-d/%Y")
    )
}

fn evaluate_after_what_is(query: &str) -> Option<String> {
    let expr = remove_first_ci(query, "what is");
    match arithmetic::evaluate(expr.trim()) {
        Ok(value) => Some(format!("The answer is {}.", arithmetic::format_number(value))),
        Err(e) => {
            tracing::debug!("not evaluating {:?}: {}", expr.trim(), e);
            None
        }
    }
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Case-insensitive ASCII prefix strip.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Remove the first case-insensitive occurrence of an ASCII `needle`.
fn remove_first_ci(s: &str, needle: &str) -> String {
    let found = s
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| strip_prefix_ci(&s[i..], needle).is_some());
    match found {
        Some(i) => format!("{}{}", &s[..i], &s[i + needle.len()..]),
        None => s.to_string(),
    }
}
