//! Logical processing-graph description
//!
//! A graph is a linear chain: one source stage that originates synthetic
//! messages, followed by `levels` relay stages that each consume from the
//! preceding stage with shuffle distribution. Stages are plain data; the
//! cluster decides how to schedule them.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Name of the source stage in every graph this harness builds
///
/// The metrics sampler queries task reports for this stage by name.
pub const SOURCE_STAGE: &str = "source";

/// How a stage consumes from its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Uniform-at-random distribution, no ordering or affinity guarantee
    Shuffle,
}

/// A single stage definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stage name, unique within the graph
    pub name: String,

    /// Number of parallel tasks for this stage
    pub parallelism: u32,

    /// Upstream stage this one consumes from; `None` only for the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    /// Distribution of upstream output across this stage's tasks
    pub grouping: Grouping,
}

/// An immutable graph description, built once per submitted instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    stages: Vec<StageSpec>,
}

impl GraphSpec {
    /// Build a layered graph: one source stage plus `levels` relay stages
    ///
    /// Stage 0 is the sole source stage with parallelism
    /// `source_parallelism`; stages 1..=levels each run `relay_parallelism`
    /// tasks and shuffle-consume from the preceding stage.
    pub fn build(
        levels: u32,
        source_parallelism: u32,
        relay_parallelism: u32,
    ) -> Result<Self, ConfigError> {
        if levels < 1 {
            return Err(ConfigError::InvalidGraphShape(
                "need at least one relay level".into(),
            ));
        }
        if source_parallelism == 0 || relay_parallelism == 0 {
            return Err(ConfigError::InvalidGraphShape(
                "stage parallelism must be positive".into(),
            ));
        }

        let mut stages = Vec::with_capacity(levels as usize + 1);
        stages.push(StageSpec {
            name: SOURCE_STAGE.to_string(),
            parallelism: source_parallelism,
            upstream: None,
            grouping: Grouping::Shuffle,
        });

        let mut upstream = SOURCE_STAGE.to_string();
        for level in 1..=levels {
            let name = format!("relay{level}");
            stages.push(StageSpec {
                name: name.clone(),
                parallelism: relay_parallelism,
                upstream: Some(upstream),
                grouping: Grouping::Shuffle,
            });
            upstream = name;
        }

        Ok(Self { stages })
    }

    /// All stages in topological order, source first
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// The source stage
    pub fn source(&self) -> &StageSpec {
        // build() guarantees at least the source stage exists
        &self.stages[0]
    }
}
