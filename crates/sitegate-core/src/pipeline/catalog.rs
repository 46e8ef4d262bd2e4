//! Collaborator endpoint for each catalog step.

use reqwest::Method;

use crate::config::PipelineConfig;
use crate::model::StepName;

/// Path (and query) of the step endpoint, relative to the collaborator base URL.
pub fn step_path(step: StepName, project_id: &str, config: &PipelineConfig) -> String {
    match step {
        StepName::Seed => format!("/api/projects/{}/seed-spec", project_id),
        StepName::Seo => format!(
            "/api/projects/{}/agents/seo-v2?targetCount={}&chunkSize={}",
            project_id, config.target_count, config.chunk_size
        ),
        StepName::ContentFinish => format!("/api/projects/{}/agents/finish-for-me", project_id),
        StepName::Sitemap => format!("/api/projects/{}/agents/sitemap", project_id),
        StepName::Publish => format!("/api/projects/{}/publish", project_id),
    }
}

pub fn step_url(step: StepName, project_id: &str, config: &PipelineConfig) -> String {
    format!("{}{}", config.base(), step_path(step, project_id, config))
}

/// Every collaborator step mutates state on the other side.
pub fn step_method(_step: StepName) -> Method {
    Method::POST
}
