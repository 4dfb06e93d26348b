//! Startup warm-up tasks.

use std::sync::Arc;

use tracing::debug;

use super::{BackgroundTaskSet, TaskError};
use crate::context::ProcessContext;
use crate::subsystems::{LazyDatabase, TextSegmenter};

/// Text segmentation engine initialisation.
pub const TEXT_SEGMENTER_TASK: &str = "text-segmenter";

/// First database access, forcing the handle to be built.
pub const DATABASE_WARMUP_TASK: &str = "database-warmup";

/// Dispatch both warm-up tasks onto `tasks` and return immediately.
///
/// The database open runs on the blocking pool since store construction does
/// synchronous I/O. Completion order between the two tasks is unspecified.
pub fn dispatch_warmup(
    tasks: &BackgroundTaskSet,
    context: &ProcessContext,
    segmenter: Arc<dyn TextSegmenter>,
    database: Arc<LazyDatabase>,
) {
    let segmenter_context = context.clone();
    tasks.spawn(TEXT_SEGMENTER_TASK, async move {
        segmenter.initialize(&segmenter_context).await?;
        debug!("Text segmenter initialized");
        Ok::<(), TaskError>(())
    });

    tasks.spawn(DATABASE_WARMUP_TASK, async move {
        let problems = tokio::task::spawn_blocking(move || database.get()?.problem_count())
            .await
            .map_err(|e| {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic())
                } else {
                    TaskError::Join(e.to_string())
                }
            })??;
        debug!(problem_count = problems, "Database warmed up");
        Ok::<(), TaskError>(())
    });
}
