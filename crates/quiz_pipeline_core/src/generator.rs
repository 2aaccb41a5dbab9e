//! crates/quiz_pipeline_core/src/generator.rs
//!
//! Synthesizes the topics and questions a freshly uploaded document "produces".
//! The document itself is never read: the shape of the output is fixed and only
//! page-range lengths and difficulties are random.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::domain::{Difficulty, Domain, Question, QuestionOption, TopicRange, DEFAULT_QUESTION_KIND};

pub const TOPIC_NAMES: [&str; 10] = [
    "Introduction and Fundamentals",
    "Core Concepts",
    "Historical Background",
    "Key Principles",
    "Methods and Techniques",
    "Practical Applications",
    "Case Studies",
    "Common Pitfalls",
    "Advanced Topics",
    "Summary and Review",
];

pub const DEFAULT_QUESTIONS_PER_TOPIC: usize = 10;

/// Share of the generated questions, in percent, that forms the preview subset.
pub const SAMPLE_PERCENT: usize = 25;

const MIN_TOPIC_PAGES: u32 = 3;
const MAX_TOPIC_PAGES: u32 = 7;

struct QuestionTemplate {
    body: &'static str,
    options: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

// `{topic}` is replaced with the topic name.
const QUESTION_BANK: [QuestionTemplate; 5] = [
    QuestionTemplate {
        body: "Which statement best describes the main idea of {topic}?",
        options: [
            "It summarizes the central argument of the section",
            "It lists unrelated historical dates",
            "It only covers formatting conventions",
            "It is an appendix with no content",
        ],
        correct: 0,
        explanation: "The section on {topic} opens by stating its central argument.",
    },
    QuestionTemplate {
        body: "What is the most common mistake when applying {topic}?",
        options: [
            "Reading the material twice",
            "Ignoring the underlying assumptions",
            "Taking notes while studying",
            "Checking the references",
        ],
        correct: 1,
        explanation: "The text warns that {topic} breaks down when its assumptions are ignored.",
    },
    QuestionTemplate {
        body: "Which example from the document illustrates {topic}?",
        options: [
            "The table of contents",
            "The author's biography",
            "The worked example in the chapter",
            "The copyright notice",
        ],
        correct: 2,
        explanation: "The worked example is presented as the canonical illustration of {topic}.",
    },
    QuestionTemplate {
        body: "How does {topic} relate to the rest of the document?",
        options: [
            "It contradicts every other chapter",
            "It is not referenced anywhere else",
            "It replaces the introduction",
            "Later sections build on it",
        ],
        correct: 3,
        explanation: "Subsequent chapters refer back to {topic} as a foundation.",
    },
    QuestionTemplate {
        body: "Which term is most closely associated with {topic}?",
        options: [
            "The key definition introduced in the section",
            "An unrelated technical acronym",
            "The publisher's name",
            "The page numbering scheme",
        ],
        correct: 0,
        explanation: "The section on {topic} is organized around its key definition.",
    },
];

/// Everything generated for one upload.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub topics: Vec<TopicRange>,
    pub domains: Vec<Domain>,
    pub questions: Vec<Question>,
}

impl GeneratedContent {
    /// The last page covered by any topic.
    pub fn page_count(&self) -> u32 {
        self.topics.last().map_or(0, |t| t.end)
    }
}

/// Produces mock domains and questions for a session.
#[derive(Debug, Clone, Copy)]
pub struct MockContentGenerator {
    questions_per_topic: usize,
}

impl Default for MockContentGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS_PER_TOPIC)
    }
}

impl MockContentGenerator {
    pub fn new(questions_per_topic: usize) -> Self {
        Self { questions_per_topic }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        session_id: &str,
        repository_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> GeneratedContent {
        let topics = generate_topic_ranges(rng);

        let domains: Vec<Domain> = topics
            .iter()
            .map(|topic| Domain {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.to_string(),
                repository_id: repository_id.map(str::to_string),
                name: topic.name.clone(),
                page_range_start: topic.start,
                page_range_end: topic.end,
                created_at: now,
            })
            .collect();

        let mut questions = Vec::with_capacity(domains.len() * self.questions_per_topic);
        for domain in &domains {
            for n in 0..self.questions_per_topic {
                let template = &QUESTION_BANK[n % QUESTION_BANK.len()];
                let difficulty = Difficulty::ALL[rng.random_range(0..Difficulty::ALL.len())];
                questions.push(Question {
                    id: Uuid::new_v4().to_string(),
                    session_id: session_id.to_string(),
                    domain_id: Some(domain.id.clone()),
                    repository_id: repository_id.map(str::to_string),
                    kind: DEFAULT_QUESTION_KIND.to_string(),
                    body: template.body.replace("{topic}", &domain.name),
                    options: template
                        .options
                        .iter()
                        .enumerate()
                        .map(|(i, label)| QuestionOption::new(*label, i == template.correct))
                        .collect(),
                    explanation: Some(template.explanation.replace("{topic}", &domain.name)),
                    difficulty,
                    is_sample: true,
                    created_at: now,
                    updated_at: now,
                });
            }
        }

        for index in sample_indices(questions.len()) {
            questions[index].is_sample = false;
        }

        GeneratedContent {
            topics,
            domains,
            questions,
        }
    }
}

/// Assigns each topic a contiguous page range of 3 to 7 pages, starting at page 1.
pub fn generate_topic_ranges<R: Rng + ?Sized>(rng: &mut R) -> Vec<TopicRange> {
    let mut next_start = 1;
    TOPIC_NAMES
        .iter()
        .map(|name| {
            let pages = rng.random_range(MIN_TOPIC_PAGES..=MAX_TOPIC_PAGES);
            let start = next_start;
            let end = start + pages - 1;
            next_start = end + 1;
            TopicRange {
                name: (*name).to_string(),
                start,
                end,
            }
        })
        .collect()
}

/// Size of the preview subset for `total` questions: `floor(total * 0.25)`.
pub fn sample_count(total: usize) -> usize {
    total * SAMPLE_PERCENT / 100
}

/// Evenly spaced indices forming the preview subset, at stride `total / count`.
pub fn sample_indices(total: usize) -> Vec<usize> {
    let count = sample_count(total);
    if count == 0 {
        return Vec::new();
    }
    let stride = total / count;
    (0..count).map(|i| i * stride).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generate(seed: u64) -> GeneratedContent {
        let mut rng = StdRng::seed_from_u64(seed);
        MockContentGenerator::default().generate(&mut rng, "job-1", Some("repo-1"), Utc::now())
    }

    #[test]
    fn page_ranges_are_contiguous() {
        for seed in 0..20 {
            let topics = generate_topic_ranges(&mut StdRng::seed_from_u64(seed));
            assert_eq!(topics.len(), TOPIC_NAMES.len());
            assert_eq!(topics[0].start, 1);
            for pair in topics.windows(2) {
                assert_eq!(pair[1].start, pair[0].end + 1);
            }
            for topic in &topics {
                let pages = topic.end - topic.start + 1;
                assert!((MIN_TOPIC_PAGES..=MAX_TOPIC_PAGES).contains(&pages));
            }
        }
    }

    #[test]
    fn ten_questions_per_topic_with_one_correct_option() {
        let content = generate(7);
        assert_eq!(content.domains.len(), 10);
        assert_eq!(content.questions.len(), 100);
        for question in &content.questions {
            assert_eq!(question.options.iter().filter(|o| o.is_correct).count(), 1);
            assert!(question.domain_id.is_some());
            assert_eq!(question.repository_id.as_deref(), Some("repo-1"));
        }
        let first_domain = &content.domains[0];
        assert!(content.questions[0].body.contains(&first_domain.name));
    }

    #[test]
    fn a_quarter_of_questions_form_the_preview_subset() {
        let content = generate(3);
        let preview: Vec<usize> = content
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_sample)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(preview.len(), 25);
        assert_eq!(preview, (0..25).map(|i| i * 4).collect::<Vec<_>>());
    }

    #[test]
    fn sample_selection_handles_small_totals() {
        assert!(sample_indices(0).is_empty());
        assert!(sample_indices(3).is_empty());
        assert_eq!(sample_indices(10), vec![0, 5]);
        assert_eq!(sample_count(7), 1);
    }

    #[test]
    fn page_count_is_last_topic_end() {
        let content = generate(11);
        assert_eq!(content.page_count(), content.domains.last().unwrap().page_range_end);
    }
}
