//! The closed set of job kinds the worker knows how to execute.
//!
//! Every component matches exhaustively on [`JobType`] so that adding a new
//! kind fails to compile until its prerequisite rule, output check, and
//! execution path exist.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A kind of pipeline artifact stored against a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    ResearchSummary,
    CompetitorAnalysis,
    Personas,
    Prd,
    DesignBrief,
    EngineeringSpec,
    GtmBrief,
    JuryReport,
    AlignmentReport,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::ResearchSummary => "research_summary",
            ArtifactType::CompetitorAnalysis => "competitor_analysis",
            ArtifactType::Personas => "personas",
            ArtifactType::Prd => "prd",
            ArtifactType::DesignBrief => "design_brief",
            ArtifactType::EngineeringSpec => "engineering_spec",
            ArtifactType::GtmBrief => "gtm_brief",
            ArtifactType::JuryReport => "jury_report",
            ArtifactType::AlignmentReport => "alignment_report",
        }
    }

    /// Human-readable name used in soft-wait reasons and notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactType::ResearchSummary => "research summary",
            ArtifactType::CompetitorAnalysis => "competitor analysis",
            ArtifactType::Personas => "personas",
            ArtifactType::Prd => "PRD",
            ArtifactType::DesignBrief => "design brief",
            ArtifactType::EngineeringSpec => "engineering spec",
            ArtifactType::GtmBrief => "GTM brief",
            ArtifactType::JuryReport => "jury report",
            ArtifactType::AlignmentReport => "alignment report",
        }
    }
}

/// A kind of unit of work the scheduler can dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ResearchSynthesis,
    CompetitorAnalysis,
    GeneratePersonas,
    ExpandPersonas,
    GeneratePrd,
    GenerateDesignBrief,
    GenerateEngineeringSpec,
    GenerateGtmBrief,
    JuryEvaluation,
    ScoreAlignment,
    GenerateTickets,
    ValidateTickets,
    ScaffoldPrototype,
    DeployPrototype,
    CreateBranch,
    RunAgent,
}

/// All job types, in pipeline order. Useful for exhaustive tests.
pub const ALL_JOB_TYPES: [JobType; 16] = [
    JobType::ResearchSynthesis,
    JobType::CompetitorAnalysis,
    JobType::GeneratePersonas,
    JobType::ExpandPersonas,
    JobType::GeneratePrd,
    JobType::GenerateDesignBrief,
    JobType::GenerateEngineeringSpec,
    JobType::GenerateGtmBrief,
    JobType::JuryEvaluation,
    JobType::ScoreAlignment,
    JobType::GenerateTickets,
    JobType::ValidateTickets,
    JobType::ScaffoldPrototype,
    JobType::DeployPrototype,
    JobType::CreateBranch,
    JobType::RunAgent,
];

impl JobType {
    /// Wire/persistence representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ResearchSynthesis => "research_synthesis",
            JobType::CompetitorAnalysis => "competitor_analysis",
            JobType::GeneratePersonas => "generate_personas",
            JobType::ExpandPersonas => "expand_personas",
            JobType::GeneratePrd => "generate_prd",
            JobType::GenerateDesignBrief => "generate_design_brief",
            JobType::GenerateEngineeringSpec => "generate_engineering_spec",
            JobType::GenerateGtmBrief => "generate_gtm_brief",
            JobType::JuryEvaluation => "jury_evaluation",
            JobType::ScoreAlignment => "score_alignment",
            JobType::GenerateTickets => "generate_tickets",
            JobType::ValidateTickets => "validate_tickets",
            JobType::ScaffoldPrototype => "scaffold_prototype",
            JobType::DeployPrototype => "deploy_prototype",
            JobType::CreateBranch => "create_branch",
            JobType::RunAgent => "run_agent",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        ALL_JOB_TYPES.iter().copied().find(|t| t.as_str() == s)
    }

    /// The pipeline stage this job belongs to. `RunAgent` is stage-less:
    /// its behavior is entirely input-driven.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobType::ResearchSynthesis
            | JobType::CompetitorAnalysis
            | JobType::GeneratePersonas
            | JobType::ExpandPersonas => Some(Stage::Research),
            JobType::GeneratePrd => Some(Stage::Requirements),
            JobType::GenerateDesignBrief => Some(Stage::Design),
            JobType::GenerateEngineeringSpec => Some(Stage::Engineering),
            JobType::GenerateGtmBrief => Some(Stage::GoToMarket),
            JobType::JuryEvaluation | JobType::ScoreAlignment => Some(Stage::Evaluation),
            JobType::GenerateTickets | JobType::ValidateTickets => Some(Stage::Tickets),
            JobType::ScaffoldPrototype
            | JobType::DeployPrototype
            | JobType::CreateBranch => Some(Stage::Prototype),
            JobType::RunAgent => None,
        }
    }

    /// The backend tool invoked for this job. `RunAgent` reads the tool name
    /// from its input instead.
    pub fn tool(&self) -> Option<&'static str> {
        match self {
            JobType::ResearchSynthesis => Some("research_synthesis"),
            JobType::CompetitorAnalysis => Some("competitor_analysis"),
            JobType::GeneratePersonas => Some("persona_generation"),
            JobType::ExpandPersonas => Some("persona_expansion"),
            JobType::GeneratePrd => Some("prd_writer"),
            JobType::GenerateDesignBrief => Some("design_brief_writer"),
            JobType::GenerateEngineeringSpec => Some("engineering_spec_writer"),
            JobType::GenerateGtmBrief => Some("gtm_brief_writer"),
            JobType::JuryEvaluation => Some("jury_evaluation"),
            JobType::ScoreAlignment => Some("stage_alignment"),
            JobType::GenerateTickets => Some("ticket_writer"),
            JobType::ValidateTickets => Some("ticket_validator"),
            JobType::ScaffoldPrototype => Some("prototype_scaffold"),
            JobType::DeployPrototype => Some("prototype_deploy"),
            JobType::CreateBranch => Some("branch_create"),
            JobType::RunAgent => None,
        }
    }

    /// The artifact a successful run of this job produces, if any.
    pub fn produced_artifact(&self) -> Option<ArtifactType> {
        match self {
            JobType::ResearchSynthesis => Some(ArtifactType::ResearchSummary),
            JobType::CompetitorAnalysis => Some(ArtifactType::CompetitorAnalysis),
            JobType::GeneratePersonas | JobType::ExpandPersonas => Some(ArtifactType::Personas),
            JobType::GeneratePrd => Some(ArtifactType::Prd),
            JobType::GenerateDesignBrief => Some(ArtifactType::DesignBrief),
            JobType::GenerateEngineeringSpec => Some(ArtifactType::EngineeringSpec),
            JobType::GenerateGtmBrief => Some(ArtifactType::GtmBrief),
            JobType::JuryEvaluation => Some(ArtifactType::JuryReport),
            JobType::ScoreAlignment => Some(ArtifactType::AlignmentReport),
            JobType::GenerateTickets
            | JobType::ValidateTickets
            | JobType::ScaffoldPrototype
            | JobType::DeployPrototype
            | JobType::CreateBranch
            | JobType::RunAgent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_through_strings() {
        for job_type in ALL_JOB_TYPES {
            assert_eq!(JobType::parse(job_type.as_str()), Some(job_type));
        }
    }

    #[test]
    fn unknown_job_type_rejected() {
        assert_eq!(JobType::parse("generate_everything"), None);
    }

    #[test]
    fn every_type_but_run_agent_has_a_tool_and_stage() {
        for job_type in ALL_JOB_TYPES {
            if job_type == JobType::RunAgent {
                assert_eq!(job_type.tool(), None);
                assert_eq!(job_type.stage(), None);
            } else {
                assert!(job_type.tool().is_some(), "{job_type:?} has no tool");
                assert!(job_type.stage().is_some(), "{job_type:?} has no stage");
            }
        }
    }

    #[test]
    fn design_brief_sits_in_design_stage() {
        assert_eq!(JobType::GenerateDesignBrief.stage(), Some(Stage::Design));
    }

    #[test]
    fn persona_jobs_share_an_artifact_type() {
        assert_eq!(
            JobType::GeneratePersonas.produced_artifact(),
            JobType::ExpandPersonas.produced_artifact(),
        );
    }
}
