use std::{future::Future, time::Duration};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::logging;

/// Creates and starts the scheduler the widgets register their poll jobs on.
pub async fn start() -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;
    sched.start().await?;
    Ok(sched)
}

/// Runs `task` every `period` until the returned job id is passed to [`cancel`].
///
/// The first run happens one `period` after registration.
pub async fn every<F, Fut>(sched: &JobScheduler, period: Duration, task: F) -> Result<Uuid>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let job = create_job(period, task)?;
    Ok(sched.add(job).await?)
}

/// Removes a job registered with [`every`]. Unknown ids are ignored.
pub async fn cancel(sched: &JobScheduler, id: &Uuid) -> Result<()> {
    sched.remove(id).await?;
    Ok(())
}

fn create_job<F, Fut>(period: Duration, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    Ok(Job::new_repeated_async(period, move |_uuid, _l| {
        let task = task.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task(every {:?}) because {:?}",
                    period, why
                ));
            }
        })
    })?)
}
