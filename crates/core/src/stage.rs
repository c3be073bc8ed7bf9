//! Pipeline stages and per-workspace stage ordering.
//!
//! Workspaces may reorder stages (e.g. run GTM planning before engineering),
//! so ordinal comparisons always go through a [`StageOrder`] built from the
//! workspace settings rather than the enum's declaration order.

use serde::{Deserialize, Serialize};

/// A stage of the product-artifact pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Requirements,
    Design,
    Engineering,
    GoToMarket,
    Evaluation,
    Tickets,
    Prototype,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Requirements => "requirements",
            Stage::Design => "design",
            Stage::Engineering => "engineering",
            Stage::GoToMarket => "go_to_market",
            Stage::Evaluation => "evaluation",
            Stage::Tickets => "tickets",
            Stage::Prototype => "prototype",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "research" => Some(Stage::Research),
            "requirements" => Some(Stage::Requirements),
            "design" => Some(Stage::Design),
            "engineering" => Some(Stage::Engineering),
            "go_to_market" => Some(Stage::GoToMarket),
            "evaluation" => Some(Stage::Evaluation),
            "tickets" => Some(Stage::Tickets),
            "prototype" => Some(Stage::Prototype),
            _ => None,
        }
    }

    /// The default pipeline ordering, used when a workspace has not
    /// customized its stage order.
    pub fn default_order() -> Vec<Stage> {
        vec![
            Stage::Research,
            Stage::Requirements,
            Stage::Design,
            Stage::Engineering,
            Stage::GoToMarket,
            Stage::Evaluation,
            Stage::Tickets,
            Stage::Prototype,
        ]
    }
}

/// Ordinal ranking of stages for one workspace.
#[derive(Debug, Clone)]
pub struct StageOrder {
    order: Vec<Stage>,
}

impl StageOrder {
    /// Build from a workspace's configured order. Stages missing from the
    /// configuration are appended in default order so every stage ranks.
    pub fn new(configured: &[Stage]) -> Self {
        let mut order: Vec<Stage> = configured.to_vec();
        for stage in Stage::default_order() {
            if !order.contains(&stage) {
                order.push(stage);
            }
        }
        Self { order }
    }

    /// Zero-based rank of a stage. Lower ranks run earlier.
    pub fn rank(&self, stage: Stage) -> usize {
        // `new` guarantees every stage is present.
        self.order.iter().position(|s| *s == stage).unwrap_or(usize::MAX)
    }

    /// Whether a completion notification should fire for a job whose project
    /// currently sits at `current`, given the workspace's configured minimum
    /// notify stage. `None` means notify for everything.
    pub fn should_notify(&self, notify_from: Option<Stage>, current: Stage) -> bool {
        match notify_from {
            None => true,
            Some(min) => self.rank(current) >= self.rank(min),
        }
    }
}

impl Default for StageOrder {
    fn default() -> Self {
        Self {
            order: Stage::default_order(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_strings() {
        for stage in Stage::default_order() {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn default_order_ranks_research_first() {
        let order = StageOrder::default();
        assert_eq!(order.rank(Stage::Research), 0);
        assert!(order.rank(Stage::Tickets) > order.rank(Stage::Evaluation));
    }

    #[test]
    fn custom_order_overrides_default() {
        let order = StageOrder::new(&[Stage::GoToMarket, Stage::Research]);
        assert_eq!(order.rank(Stage::GoToMarket), 0);
        assert_eq!(order.rank(Stage::Research), 1);
        // Unlisted stages are appended, keeping every stage rankable.
        assert!(order.rank(Stage::Prototype) > order.rank(Stage::Research));
    }

    #[test]
    fn notify_with_no_minimum_always_fires() {
        let order = StageOrder::default();
        assert!(order.should_notify(None, Stage::Research));
    }

    #[test]
    fn notify_suppressed_below_minimum_stage() {
        let order = StageOrder::default();
        assert!(!order.should_notify(Some(Stage::Tickets), Stage::Research));
        assert!(order.should_notify(Some(Stage::Tickets), Stage::Tickets));
        assert!(order.should_notify(Some(Stage::Tickets), Stage::Prototype));
    }
}
