//! The two-agent research crew run for each trip request.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use super::CompletionBackend;
use super::search::{SearchHit, WebSearch, format_hits};
use crate::jobs::{JobFunction, JobLog, TripRequest};

/// Persona given to one agent in the crew.
#[derive(Debug, Clone)]
pub struct AgentRole {
    pub name: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl AgentRole {
    /// System prompt for this role.
    pub fn preamble(&self) -> String {
        format!(
            "You are the {}.\n\nGoal: {}\n\nBackground: {}\n\n\
             Only state facts you found or are confident about. Do not invent prices.",
            self.name, self.goal, self.backstory
        )
    }
}

/// Researches the destination in depth.
pub const CITY_EXPERT: AgentRole = AgentRole {
    name: "Local City Expert",
    goal: "Provide detailed insights about cities in India, including events, activities, \
           food, transport, and accommodation.",
    backstory: "A knowledgeable local guide who knows every city in India, its attractions \
                and customs, and keeps up with current events.",
};

/// Turns the research into the final recommendation.
pub const TRIP_MAKER: AgentRole = AgentRole {
    name: "Trip Maker Expert",
    goal: "Recommend a place in India for a trip, considering the category, budget per head, \
           number of travellers, type of trip and month, with reasoning and a cost breakdown.",
    backstory: "Understands what travellers are asking for and recommends the best places in \
                India with detailed, practical insights.",
};

/// Job function that runs the research crew.
pub struct TripCrew {
    llm: Arc<dyn CompletionBackend>,
    search: Vec<Arc<dyn WebSearch>>,
}

impl TripCrew {
    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self {
            llm,
            search: Vec::new(),
        }
    }

    /// Add a search provider. Every provider is queried; hits are merged.
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search.push(search);
        self
    }

    async fn gather_sources(&self, request: &TripRequest, log: &JobLog) -> Vec<SearchHit> {
        if self.search.is_empty() {
            return Vec::new();
        }

        let query = search_query(request);
        log.write(format!("Searching the web: {query}"));
        let results = join_all(self.search.iter().map(|s| s.search(&query))).await;

        let mut merged: Vec<SearchHit> = Vec::new();
        for (provider, result) in self.search.iter().zip(results) {
            match result {
                Ok(hits) => {
                    log.write(format!("Found {} web results from {}", hits.len(), provider.name()));
                    for hit in hits {
                        if !merged.iter().any(|h| h.link == hit.link) {
                            merged.push(hit);
                        }
                    }
                }
                Err(e) => {
                    warn!(job_id = %log.job_id(), provider = provider.name(), error = %e, "Web search failed");
                    log.write(format!("{} search failed, continuing without it: {e}", provider.name()));
                }
            }
        }
        merged
    }
}

#[async_trait]
impl JobFunction for TripCrew {
    fn name(&self) -> &str {
        "trip_crew"
    }

    async fn run(&self, request: &TripRequest, log: &JobLog) -> anyhow::Result<serde_json::Value> {
        log.write(format!(
            "Crew started: {} trip ({}) in {}, budget {} for {} people [model: {}]",
            request.category,
            request.trip_type,
            request.month,
            request.budget,
            request.num_people,
            self.llm.model_name()
        ));

        let sources = self.gather_sources(request, log).await;

        log.write(format!("[{}] Working on: destination research", CITY_EXPERT.name));
        let insights = self
            .llm
            .ask(&CITY_EXPERT, &research_prompt(request, &sources))
            .await?;
        log.write(format!("[{}] Finished destination research", CITY_EXPERT.name));
        log.write(&insights);

        log.write(format!("[{}] Working on: recommendation report", TRIP_MAKER.name));
        let report = self
            .llm
            .ask(&TRIP_MAKER, &report_prompt(request, &insights))
            .await?;
        log.write(format!("[{}] Finished recommendation report", TRIP_MAKER.name));

        Ok(serde_json::json!({
            "report": report,
            "insights": insights,
            "sources": sources.iter().map(|h| h.link.as_str()).collect::<Vec<_>>(),
        }))
    }
}

fn search_query(request: &TripRequest) -> String {
    format!(
        "Trip to {} as {} in India under {}",
        request.category, request.trip_type, request.budget
    )
}

fn research_prompt(request: &TripRequest, sources: &[SearchHit]) -> String {
    let mut prompt = format!(
        "Find the best place in India for a {} trip ({}) in {} with a budget of {} per head \
         for {} people. Then research that place: food, costs, accommodation, tourist \
         attractions, transport, local events, and dos and don'ts.",
        request.category, request.trip_type, request.month, request.budget, request.num_people
    );
    if !sources.is_empty() {
        prompt.push_str("\n\nWeb results to work from:\n");
        prompt.push_str(&format_hits(sources));
    }
    prompt
}

fn report_prompt(request: &TripRequest, insights: &str) -> String {
    format!(
        "Category: {}\nBudget: {}\nNumber of people: {}\nType: {}\nMonth: {}\n\n\
         Using the research below, write a well-formatted recommendation report. Explain why \
         the place fits, cover culture, attractions, activities and food, and give a proper \
         breakdown of expenses.\n\nResearch:\n{}",
        request.category, request.budget, request.num_people, request.trip_type, request.month, insights
    )
}
