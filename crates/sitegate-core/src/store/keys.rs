//! Key layout shared with the collaborator services.

pub fn run_key(project_id: &str) -> String {
    format!("run:project:{}:latest", project_id)
}

pub fn job_key(job_id: &str) -> String {
    format!("job:{}", job_id)
}

pub fn last_job_key(project_id: &str) -> String {
    format!("project:{}:pipeline:lastJobId", project_id)
}

pub fn job_list_key(project_id: &str) -> String {
    format!("project:{}:pipeline:jobIds", project_id)
}

pub fn history_key(project_id: &str) -> String {
    format!("qa:project:{}:history", project_id)
}

pub fn generated_key(project_id: &str) -> String {
    format!("generated:project:{}:latest", project_id)
}

pub fn published_key(project_id: &str) -> String {
    format!("published:project:{}:latest", project_id)
}

pub fn seo_plan_key(project_id: &str) -> String {
    format!("project:{}:seoPlan", project_id)
}

pub fn sitemap_xml_key(project_id: &str) -> String {
    format!("project:{}:sitemapXml", project_id)
}

pub fn published_spec_key(project_id: &str) -> String {
    format!("project:{}:publishedSpec", project_id)
}

/// Pending cancel request for the project's latest run. Holds the run id.
pub fn run_cancel_key(project_id: &str) -> String {
    format!("run:project:{}:cancel", project_id)
}

/// Pending cancel request for one job. Holds the job id.
pub fn job_cancel_key(job_id: &str) -> String {
    format!("job:{}:cancel", job_id)
}
