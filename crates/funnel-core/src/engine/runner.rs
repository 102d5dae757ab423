//! Funnel interpreter.
//!
//! The `ExecutionEngine` walks a funnel depth-first from its entry node,
//! dispatching each node to its executor, merging results into the
//! execution's variables, and following either the executor's explicit
//! next node or the node's guarded connections.
//!
//! # Execution flow
//!
//! 1. Wait for a concurrency slot, create a `Pending` context, move to `Running`.
//! 2. Register the run with the `ExecutionManager` (cancellation token).
//! 3. Find the entry node; traverse under the execution time budget.
//!    Waits of timeout-exempt executors (delay nodes) are not charged.
//! 4. Each node: cancellation checkpoint -> execute (bounded retry) -> persist.
//! 5. Finalize status, persist, deregister, report metrics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use funnel_types::config::EngineConfig;
use funnel_types::execution::{ExecutionContext, ExecutionStatus, LogLevel, execution_cache_key};
use funnel_types::funnel::{Funnel, FunnelNode};
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::condition::evaluate_condition;
use crate::executor::NodeExecutorFactory;
use crate::metrics::MetricsSink;
use crate::repository::cache::{CacheError, ExecutionCache};

use super::error::EngineError;
use super::manager::ExecutionManager;
use super::retry::RetryPolicy;

/// What traversal does after a node finishes.
enum Step<'f> {
    /// Visit these nodes next, in order.
    Continue(Vec<&'f FunnelNode>),
    /// The node ended the run as completed.
    Finish,
    /// The run left `Running` (cancelled) while the node was retrying.
    Halt,
}

/// Time a run may still spend in executors and retry backoff.
struct Budget {
    limit_ms: u64,
    remaining: Option<Duration>,
}

impl Budget {
    fn limited(limit: Duration) -> Self {
        Self {
            limit_ms: limit.as_millis() as u64,
            remaining: Some(limit),
        }
    }

    fn unlimited() -> Self {
        Self {
            limit_ms: 0,
            remaining: None,
        }
    }

    /// Await `work` against what is left of the budget, then deduct the time
    /// it took.
    async fn charge<F: std::future::Future>(&mut self, work: F) -> Result<F::Output, EngineError> {
        let Some(remaining) = self.remaining else {
            return Ok(work.await);
        };
        let started = Instant::now();
        let output = tokio::time::timeout(remaining, work)
            .await
            .map_err(|_| EngineError::Timeout(self.limit_ms))?;
        self.remaining = Some(remaining.saturating_sub(started.elapsed()));
        Ok(output)
    }
}

/// Interprets funnels. Generic over the snapshot cache backend.
pub struct ExecutionEngine<C: ExecutionCache> {
    factory: Arc<NodeExecutorFactory>,
    manager: Arc<ExecutionManager>,
    cache: Arc<C>,
    metrics: Arc<dyn MetricsSink>,
    config: EngineConfig,
    retry: RetryPolicy,
}

impl<C: ExecutionCache> ExecutionEngine<C> {
    pub fn new(
        factory: Arc<NodeExecutorFactory>,
        manager: Arc<ExecutionManager>,
        cache: Arc<C>,
        metrics: Arc<dyn MetricsSink>,
        config: EngineConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            factory,
            manager,
            cache,
            metrics,
            config,
            retry,
        }
    }

    pub fn factory(&self) -> &Arc<NodeExecutorFactory> {
        &self.factory
    }

    pub fn manager(&self) -> &Arc<ExecutionManager> {
        &self.manager
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `funnel` to completion and return the final context.
    ///
    /// Never fails: every outcome, including failure, is reported through
    /// the returned context's status, errors and logs.
    pub async fn execute_funnel(
        &self,
        funnel: &Funnel,
        trigger_id: Option<String>,
        initial_variables: HashMap<String, Value>,
    ) -> ExecutionContext {
        let _slot = self.manager.acquire_slot().await;

        let mut context = ExecutionContext::new(funnel.id.clone(), trigger_id, initial_variables);
        context.metadata.insert("funnelName".into(), json!(funnel.name));
        context.metadata.insert("funnelVersion".into(), json!(funnel.version));
        set_status(&mut context, ExecutionStatus::Running);
        context.log(
            LogLevel::Info,
            None,
            format!("execution of funnel '{}' started", funnel.id),
            Some(json!({ "triggerId": context.trigger_id, "nodes": funnel.nodes.len() })),
        );

        tracing::info!(
            execution_id = %context.id,
            funnel_id = funnel.id.as_str(),
            nodes = funnel.nodes.len(),
            "starting funnel execution"
        );

        let outcome = match self.manager.register(context.id, &funnel.id) {
            Ok(token) => {
                self.persist(&context).await;
                self.run_from_entry(funnel, &mut context, &token).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                if context.is_running() {
                    set_status(&mut context, ExecutionStatus::Completed);
                    context.log(LogLevel::Info, None, "execution completed", None);
                }
            }
            Err(e) => self.fail(&mut context, &e),
        }

        self.manager.deregister(&context.id);
        self.persist(&context).await;
        self.report(&context);

        tracing::info!(
            execution_id = %context.id,
            funnel_id = funnel.id.as_str(),
            status = %context.status,
            duration_ms = context.duration_ms(),
            "funnel execution finished"
        );
        context
    }

    /// Traverse from `node` on an already-running context.
    ///
    /// This is the engine's traversal without its outer protection: no
    /// time budget, no finalization, no metrics. Errors come back to the caller.
    /// If the run is registered with the manager, its cancellation token is
    /// honoured.
    pub async fn execute_from_node(
        &self,
        funnel: &Funnel,
        node: &FunnelNode,
        context: &mut ExecutionContext,
    ) -> Result<(), EngineError> {
        let token = self.manager.token(&context.id).unwrap_or_default();
        self.traverse(funnel, node, context, &token, &mut Budget::unlimited()).await
    }

    /// Request cancellation of a running execution.
    pub fn cancel_execution(&self, id: &Uuid) -> bool {
        self.manager.cancel(id)
    }

    /// Latest persisted snapshot of an execution.
    pub async fn get_execution(&self, id: &Uuid) -> Result<Option<ExecutionContext>, CacheError> {
        self.cache.get(&execution_cache_key(id)).await
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    async fn run_from_entry(
        &self,
        funnel: &Funnel,
        context: &mut ExecutionContext,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let Some(entry) = funnel.entry_node() else {
            return Err(EngineError::NoEntryNode { funnel_id: funnel.id.clone() });
        };

        let mut budget = Budget::limited(self.config.execution_timeout());
        self.traverse(funnel, entry, context, token, &mut budget).await
    }

    /// Depth-first walk over an explicit work stack. Children are pushed in
    /// reverse so branches run in declaration order, each to completion
    /// before the next starts.
    async fn traverse<'f>(
        &self,
        funnel: &'f Funnel,
        start: &'f FunnelNode,
        context: &mut ExecutionContext,
        token: &CancellationToken,
        budget: &mut Budget,
    ) -> Result<(), EngineError> {
        let mut stack: Vec<&'f FunnelNode> = vec![start];

        while let Some(node) = stack.pop() {
            observe_cancellation(context, token);
            if !context.is_running() {
                return Ok(());
            }

            let step = self.run_node(funnel, node, context, token, budget).await?;
            observe_cancellation(context, token);
            self.persist(context).await;

            match step {
                Step::Continue(next) => stack.extend(next.into_iter().rev()),
                Step::Finish => {
                    if set_status(context, ExecutionStatus::Completed) {
                        context.log(
                            LogLevel::Info,
                            Some(&node.id),
                            "execution completed: node stopped the flow",
                            None,
                        );
                    }
                    return Ok(());
                }
                Step::Halt => return Ok(()),
            }
        }
        Ok(())
    }

    /// Execute one node, retrying retryable failures. Each failure is
    /// recorded on the context before the retry decision is made.
    async fn run_node<'f>(
        &self,
        funnel: &'f Funnel,
        node: &'f FunnelNode,
        context: &mut ExecutionContext,
        token: &CancellationToken,
        budget: &mut Budget,
    ) -> Result<Step<'f>, EngineError> {
        loop {
            let err = match self.attempt_node(funnel, node, context, budget).await {
                Ok(step) => return Ok(step),
                Err(err) => err,
            };

            context.record_error(Some(&node.id), err.to_string(), None, err.is_retryable());
            let recorded = context.errors_for_node(&node.id);

            if !self.retry.should_retry(&err, recorded) {
                context.log(
                    LogLevel::Error,
                    Some(&node.id),
                    format!("node failed: {err}"),
                    Some(json!({ "attempts": recorded, "retryable": err.is_retryable() })),
                );
                return Err(err);
            }

            tracing::warn!(
                execution_id = %context.id,
                node_id = node.id.as_str(),
                attempt = recorded,
                max_retries = self.retry.max_retry_attempts,
                error = %err,
                "node failed, retrying"
            );
            context.log(
                LogLevel::Warn,
                Some(&node.id),
                format!(
                    "retrying node (retry {recorded} of {}): {err}",
                    self.retry.max_retry_attempts
                ),
                Some(json!({ "delayMs": self.retry.delay.as_millis() as u64 })),
            );

            budget.charge(tokio::time::sleep(self.retry.delay)).await?;

            observe_cancellation(context, token);
            if !context.is_running() {
                return Ok(Step::Halt);
            }
        }
    }

    async fn attempt_node<'f>(
        &self,
        funnel: &'f Funnel,
        node: &'f FunnelNode,
        context: &mut ExecutionContext,
        budget: &mut Budget,
    ) -> Result<Step<'f>, EngineError> {
        context.current_node_id = Some(node.id.clone());
        context.log(
            LogLevel::Info,
            Some(&node.id),
            format!("executing node '{}'", node.label()),
            Some(json!({ "type": node.node_type })),
        );

        let executor = self.factory.get(&node.node_type).ok_or_else(|| EngineError::NoExecutor {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
        })?;

        let work = executor.execute(node, context);
        let result = if executor.exempt_from_timeout() {
            work.await
        } else {
            budget.charge(work).await?
        };

        if let Some(vars) = result.variables {
            context.merge_variables(vars);
        }
        context.log(
            LogLevel::Info,
            Some(&node.id),
            format!("node '{}' finished", node.label()),
            Some(json!({
                "success": result.success,
                "shouldContinue": result.should_continue,
                "data": result.data,
            })),
        );

        if !result.success {
            return Err(EngineError::NodeFailed {
                node_id: node.id.clone(),
                message: result
                    .error
                    .unwrap_or_else(|| "node execution failed".to_string()),
            });
        }
        if !result.should_continue {
            return Ok(Step::Finish);
        }

        Ok(Step::Continue(next_nodes(
            funnel,
            node,
            result.next_node_id.as_deref(),
            context,
        )))
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    fn fail(&self, context: &mut ExecutionContext, err: &EngineError) {
        set_status(context, ExecutionStatus::Failed);
        context.record_error(None, err.to_string(), None, err.is_retryable());
        context.log(LogLevel::Error, None, format!("execution failed: {err}"), None);
        tracing::error!(
            execution_id = %context.id,
            funnel_id = context.funnel_id.as_str(),
            error = %err,
            "funnel execution failed"
        );
    }

    fn report(&self, context: &ExecutionContext) {
        if context.status == ExecutionStatus::Failed {
            let message = context
                .errors
                .last()
                .map(|e| e.message.as_str())
                .unwrap_or("execution failed");
            self.metrics.record_execution_error(context, message);
        } else {
            self.metrics.record_execution(context);
        }
    }

    /// Write the latest snapshot. Failures are logged and never affect the run.
    async fn persist(&self, context: &ExecutionContext) {
        let key = context.cache_key();
        if let Err(e) = self.cache.set(&key, context, self.config.flow_cache_ttl).await {
            tracing::warn!(
                execution_id = %context.id,
                key = key.as_str(),
                error = %e,
                "failed to persist execution snapshot"
            );
        }
    }
}

/// Resolve the nodes to visit after `node`.
///
/// An explicit `next_node_id` wins over the declared connections. Otherwise
/// every connection whose condition holds (or that has none) contributes its
/// target, in declaration order. Unknown targets are skipped with a warning.
fn next_nodes<'f>(
    funnel: &'f Funnel,
    node: &'f FunnelNode,
    next_node_id: Option<&str>,
    context: &mut ExecutionContext,
) -> Vec<&'f FunnelNode> {
    if let Some(id) = next_node_id {
        return match funnel.node(id) {
            Some(target) => vec![target],
            None => {
                warn_missing_target(context, &node.id, id);
                Vec::new()
            }
        };
    }

    let mut next = Vec::new();
    for connection in &node.connections {
        if let Some(condition) = &connection.condition {
            if !evaluate_condition(condition, context, Some(&node.id)) {
                context.log(
                    LogLevel::Debug,
                    Some(&node.id),
                    format!("connection '{}' skipped: condition not met", connection.id),
                    None,
                );
                continue;
            }
        }
        match funnel.node(&connection.target_node_id) {
            Some(target) => next.push(target),
            None => warn_missing_target(context, &node.id, &connection.target_node_id),
        }
    }
    next
}

fn warn_missing_target(context: &mut ExecutionContext, from: &str, target: &str) {
    tracing::warn!(
        execution_id = %context.id,
        node_id = from,
        target,
        "next node not found in funnel"
    );
    context.log(
        LogLevel::Warn,
        Some(from),
        format!("next node '{target}' not found; skipping"),
        None,
    );
}

/// Fold a tripped cancellation token into the context status.
fn observe_cancellation(context: &mut ExecutionContext, token: &CancellationToken) {
    if token.is_cancelled() && context.is_running() {
        set_status(context, ExecutionStatus::Cancelled);
        context.log(LogLevel::Warn, None, "execution cancelled", None);
        tracing::info!(execution_id = %context.id, "funnel execution cancelled");
    }
}

/// Apply a status change, logging (not propagating) refused transitions.
/// Returns whether the change took effect.
fn set_status(context: &mut ExecutionContext, status: ExecutionStatus) -> bool {
    match context.transition(status) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(execution_id = %context.id, error = %e, "status change refused");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
