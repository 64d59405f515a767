use crate::{ContextGraphError, GraphQuery, Result, RetrievalRequest};

pub const MAX_QUERY_LEN: usize = 10_000;
pub const TOP_K_MIN: usize = 1;
pub const TOP_K_MAX: usize = 1_000;
pub const MAX_GRAPH_NODES_MIN: usize = 1;
pub const MAX_GRAPH_NODES_MAX: usize = 10_000;
pub const MAX_TOKEN_BUDGET_MAX: usize = 200_000;
pub const MAX_SEMANTIC_KEYWORDS: usize = 50;
pub const MAX_SEMANTIC_KEYWORD_LEN: usize = 200;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(msg: impl Into<String>) -> ContextGraphError {
    ContextGraphError::InvalidRequest(msg.into())
}

impl Validate for RetrievalRequest {
    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(invalid("query must not be blank"));
        }
        if self.query.len() > MAX_QUERY_LEN {
            return Err(invalid(format!(
                "query exceeds {} characters",
                MAX_QUERY_LEN
            )));
        }
        if !(TOP_K_MIN..=TOP_K_MAX).contains(&self.top_k) {
            return Err(invalid(format!(
                "topK must be in [{}, {}], got {}",
                TOP_K_MIN, TOP_K_MAX, self.top_k
            )));
        }
        if !(MAX_GRAPH_NODES_MIN..=MAX_GRAPH_NODES_MAX).contains(&self.max_graph_nodes) {
            return Err(invalid(format!(
                "maxGraphNodes must be in [{}, {}], got {}",
                MAX_GRAPH_NODES_MIN, MAX_GRAPH_NODES_MAX, self.max_graph_nodes
            )));
        }
        if self.max_token_budget > MAX_TOKEN_BUDGET_MAX {
            return Err(invalid(format!(
                "maxTokenBudget must be at most {}, got {}",
                MAX_TOKEN_BUDGET_MAX, self.max_token_budget
            )));
        }
        if self.semantic_keywords.len() > MAX_SEMANTIC_KEYWORDS {
            return Err(invalid(format!(
                "at most {} semanticKeywords allowed",
                MAX_SEMANTIC_KEYWORDS
            )));
        }
        if let Some(kw) = self
            .semantic_keywords
            .iter()
            .find(|k| k.len() > MAX_SEMANTIC_KEYWORD_LEN)
        {
            return Err(invalid(format!(
                "semantic keyword exceeds {} characters: {:.32}...",
                MAX_SEMANTIC_KEYWORD_LEN, kw
            )));
        }
        if let Some(gq) = &self.graph_query {
            gq.validate()?;
        }
        Ok(())
    }
}

impl Validate for GraphQuery {
    fn validate(&self) -> Result<()> {
        let patterns = self
            .patterns
            .iter()
            .flatten()
            .chain(self.combinator.iter().flat_map(|c| c.patterns.iter()));
        for pattern in patterns {
            if pattern.steps.is_empty() {
                return Err(invalid(format!(
                    "pattern '{}' has no steps",
                    pattern.pattern_id
                )));
            }
            for constraint in &pattern.constraints {
                if constraint.at_step >= pattern.steps.len() {
                    return Err(invalid(format!(
                        "pattern '{}' pins a constraint to step {} but has {} steps",
                        pattern.pattern_id,
                        constraint.at_step,
                        pattern.steps.len()
                    )));
                }
            }
        }
        if let Some(combinator) = &self.combinator {
            if combinator.patterns.is_empty() {
                return Err(invalid("combinator carries no patterns"));
            }
        }
        Ok(())
    }
}
