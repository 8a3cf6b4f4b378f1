pub mod fold_constants;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::errors::Result;
use crate::plan::PlanNode;
use fold_constants::FoldConstants;

pub trait PlanRule: Debug {
    fn name(&self) -> &'static str;

    /// Apply the rule to a logical plan.
    fn apply(&mut self, plan: PlanNode) -> Result<PlanNode>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enable_constant_folding: bool,
    /// Upper bound on folding passes over a single plan.
    pub max_fold_passes: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            enable_constant_folding: true,
            max_fold_passes: 16,
        }
    }
}

#[derive(Debug, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Optimizer { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run a logical plan through the optimizer.
    pub fn optimize(&self, mut plan: PlanNode) -> Result<PlanNode> {
        let mut rules: Vec<Box<dyn PlanRule>> = Vec::new();
        if self.config.enable_constant_folding {
            rules.push(Box::new(FoldConstants::new(self.config.max_fold_passes)));
        }

        for rule in &mut rules {
            trace!(rule = rule.name(), "applying plan rule");
            plan = rule.apply(plan)?;
        }
        debug!(rules = rules.len(), "optimized plan");

        Ok(plan)
    }
}
