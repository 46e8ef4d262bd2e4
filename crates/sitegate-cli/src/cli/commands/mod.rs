pub mod audit;
pub mod diff;
pub mod dispatch;
pub mod history;
pub mod run;
pub mod status;

pub use dispatch::dispatch;

use std::path::PathBuf;
use std::sync::Arc;

use sitegate_core::{PipelineConfig, PipelineError, SqliteKv};

/// Global flags shared by every command.
pub struct Context {
    pub db: PathBuf,
    pub base_url: Option<String>,
    pub site_url: Option<String>,
}

impl Context {
    /// Environment defaults, then explicit flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(url) = &self.site_url {
            config = config.with_site_url(url.clone());
        }
        config
    }

    pub fn open_kv(&self) -> Result<Arc<SqliteKv>, PipelineError> {
        Ok(Arc::new(SqliteKv::open(&self.db)?))
    }
}

/// Report a core error on stderr and turn it into an exit code.
pub(crate) fn fail(err: &PipelineError) -> i32 {
    eprintln!("error: {err}");
    crate::exit_codes::for_error(err)
}
