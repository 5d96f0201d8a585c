//! # Migration Task Scheduler
//!
//! Bounded-concurrency dispatcher for provider relocation tasks. One instance
//! drives a whole run: it admits work items in input order while in-flight
//! capacity allows, polls outstanding tasks on a fixed interval, and
//! reconciles completions into work item state.
//!
//! All scheduling decisions happen on a single logical thread of control. The
//! provider executes relocations asynchronously on its side; within one poll
//! tick the status reads fan out concurrently, but results are applied to
//! work items sequentially, so neither `in_flight` nor the item list is ever
//! mutated from two paths at once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::models::{MigrationRequest, WorkItem};
use crate::orchestration::notification::{Notification, NotificationSink};
use crate::orchestration::validation::{ValidationOutcome, ValidationPipeline};
use crate::provider::{
    EndpointRef, InfrastructureProvider, ProviderError, ProviderTaskState, RelocationSpec,
    TaskHandle,
};

/// Consecutive failed polls of one handle before the item is failed rather
/// than re-polled. Guards run termination against a provider that errors on
/// every poll without ever reporting the task terminal.
const MAX_POLL_FAILURES: u32 = 5;

/// Tracking record for one submitted task.
struct InFlightTask {
    /// Index into the run's work item vec
    index: usize,
    /// Consecutive poll errors observed; reset on any successful poll
    poll_failures: u32,
}

impl InFlightTask {
    fn new(index: usize) -> Self {
        Self {
            index,
            poll_failures: 0,
        }
    }
}

pub struct MigrationScheduler {
    provider: Arc<dyn InfrastructureProvider>,
    sink: Arc<dyn NotificationSink>,
    validation: ValidationPipeline,
    config: SchedulerConfig,
}

impl MigrationScheduler {
    pub fn new(
        provider: Arc<dyn InfrastructureProvider>,
        sink: Arc<dyn NotificationSink>,
        config: SchedulerConfig,
    ) -> Self {
        let validation = ValidationPipeline::new(provider.clone(), config.free_buffer_percent);
        Self {
            provider,
            sink,
            validation,
            config,
        }
    }

    /// Drive every request to a terminal state and return the work items in
    /// input order.
    ///
    /// Only connection-level provider failures propagate out of here; every
    /// per-item error becomes `Rejected` or `Failed` state on the item.
    pub async fn run(&self, requests: Vec<MigrationRequest>) -> Result<Vec<WorkItem>> {
        let mut items: Vec<WorkItem> = requests.into_iter().map(WorkItem::new).collect();
        let mut in_flight: HashMap<TaskHandle, InFlightTask> = HashMap::new();
        let mut next_index = 0usize;

        info!(
            total_items = items.len(),
            max_concurrent = self.config.max_concurrent,
            "Starting migration run"
        );

        loop {
            if in_flight.len() < self.config.max_concurrent {
                if next_index < items.len() {
                    let index = next_index;
                    next_index += 1;
                    self.admit(&mut items, index, &mut in_flight).await?;
                    // A slot may still be free; admit again without waiting
                    continue;
                }
                // No unscheduled items remain; all that is left is draining
                break;
            }
            self.poll_tick(&mut items, &mut in_flight).await?;
        }

        while !in_flight.is_empty() {
            self.poll_tick(&mut items, &mut in_flight).await?;
        }

        info!(
            succeeded = items.iter().filter(|i| !i.status.is_error()).count(),
            errored = items.iter().filter(|i| i.status.is_error()).count(),
            "Migration run complete"
        );

        Ok(items)
    }

    /// Validate one item and, if it passes, submit it to the provider.
    async fn admit(
        &self,
        items: &mut [WorkItem],
        index: usize,
        in_flight: &mut HashMap<TaskHandle, InFlightTask>,
    ) -> Result<()> {
        let item = &mut items[index];
        item.begin_validation()?;

        let outcome = match self.validation.validate(&item.request).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(vm = item.vm_name(), error = %e, "Validation query failed");
                item.reject(e.to_string(), Utc::now())?;
                self.notify(item).await;
                return Ok(());
            }
        };

        let placement = match outcome {
            ValidationOutcome::Rejected(failure) => {
                info!(vm = item.vm_name(), reason = %failure, "Work item rejected");
                item.reject(failure.to_string(), Utc::now())?;
                self.notify(item).await;
                return Ok(());
            }
            ValidationOutcome::Passed(placement) => placement,
        };

        item.schedule(placement.vm.used_space_gb, placement.vm.powered_on)?;

        let spec = RelocationSpec {
            vm_name: item.request.vm_name.clone(),
            source: EndpointRef::new(&item.request.source_vc),
            destination: EndpointRef::new(&item.request.target_vc),
            datastore: placement.datastore,
            host: placement.host,
            cluster: placement.cluster,
            network: placement.network,
        };

        match self.provider.submit_relocation(&spec).await {
            Ok(handle) => {
                item.start(handle, Utc::now())?;
                in_flight.insert(handle, InFlightTask::new(index));
                info!(
                    vm = item.vm_name(),
                    task_id = %handle,
                    datastore = %spec.datastore.name,
                    host = %spec.host.name,
                    in_flight = in_flight.len(),
                    "Relocation submitted"
                );
                self.notify(item).await;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                error!(vm = item.vm_name(), error = %e, "Relocation submission failed");
                item.fail(e.to_string(), Utc::now())?;
                self.notify(item).await;
                Ok(())
            }
        }
    }

    /// Wait the poll interval, then query every in-flight task and reconcile
    /// the ones the provider reports terminal.
    async fn poll_tick(
        &self,
        items: &mut [WorkItem],
        in_flight: &mut HashMap<TaskHandle, InFlightTask>,
    ) -> Result<()> {
        tokio::time::sleep(self.config.poll_interval()).await;

        let handles: Vec<TaskHandle> = in_flight.keys().copied().collect();
        debug!(in_flight = handles.len(), "Polling in-flight tasks");

        // Fan-out read; result application below stays sequential
        let polls = join_all(
            handles
                .iter()
                .map(|handle| self.provider.poll_task(handle)),
        )
        .await;

        for (handle, polled) in handles.into_iter().zip(polls) {
            let state = match polled {
                Ok(state) => {
                    if let Some(task) = in_flight.get_mut(&handle) {
                        task.poll_failures = 0;
                    }
                    state
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    let Some(task) = in_flight.get_mut(&handle) else {
                        continue;
                    };
                    task.poll_failures += 1;
                    if !e.is_permanent() && task.poll_failures < MAX_POLL_FAILURES {
                        // Transient poll failure; the task stays in flight
                        // and is re-polled next tick
                        warn!(
                            task_id = %handle,
                            error = %e,
                            poll_failures = task.poll_failures,
                            "Task poll failed"
                        );
                        continue;
                    }
                    // The provider cannot or will never again report on this
                    // task; visibility is lost and the item fails
                    let Some(task) = in_flight.remove(&handle) else {
                        continue;
                    };
                    let item = &mut items[task.index];
                    error!(vm = item.vm_name(), task_id = %handle, error = %e, "Task tracking lost");
                    item.fail(e.to_string(), Utc::now())?;
                    self.notify(&items[task.index]).await;
                    continue;
                }
            };

            if matches!(state, ProviderTaskState::Running) {
                continue;
            }
            // Terminal observation: release the handle exactly once
            let Some(task) = in_flight.remove(&handle) else {
                continue;
            };
            let index = task.index;
            let item = &mut items[index];
            match state {
                ProviderTaskState::Running => {}
                ProviderTaskState::Success => {
                    item.succeed(Utc::now())?;
                    info!(
                        vm = item.vm_name(),
                        duration_minutes = item.duration_minutes,
                        "Relocation succeeded"
                    );
                    self.run_post_actions(item).await;
                }
                ProviderTaskState::Error(message) => {
                    error!(vm = item.vm_name(), error = %message, "Relocation failed");
                    item.fail(message, Utc::now())?;
                }
            }
            let item = &items[index];
            self.notify(item).await;
        }

        Ok(())
    }

    /// Best-effort post actions after a successful relocation: folder move if
    /// requested, power-on if the source was powered off. Failures are
    /// logged, never escalated.
    async fn run_post_actions(&self, item: &WorkItem) {
        let destination = EndpointRef::new(&item.request.target_vc);

        if let Some(folder) = &item.request.target_folder {
            if let Err(e) = self
                .provider
                .move_to_folder(item.vm_name(), folder, &destination)
                .await
            {
                warn!(vm = item.vm_name(), folder = %folder, error = %e, "Folder move failed");
            }
        }

        if item.source_powered_on == Some(false) {
            if let Err(e) = self.provider.power_on(item.vm_name(), &destination).await {
                warn!(vm = item.vm_name(), error = %e, "Power-on failed");
            }
        }
    }

    async fn notify(&self, item: &WorkItem) {
        self.sink.notify(Notification::for_item(item)).await;
    }
}

/// Convenience for the startup connectivity probe: check every distinct
/// endpoint named by the requests once; any failure is fatal to the run.
pub async fn probe_endpoints(
    provider: &dyn InfrastructureProvider,
    requests: &[MigrationRequest],
) -> std::result::Result<(), ProviderError> {
    let mut seen = std::collections::HashSet::new();
    for request in requests {
        for endpoint in [&request.source_vc, &request.target_vc] {
            if seen.insert(endpoint.clone()) {
                provider.connect(&EndpointRef::new(endpoint)).await?;
            }
        }
    }
    Ok(())
}
