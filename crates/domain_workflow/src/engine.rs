//! Sanction engine service
//!
//! The `SanctionEngine` orchestrates every operation callers can invoke:
//! submission, reviewer actions, allocation, queues and the request detail
//! view. It owns no state besides the shared step registry and per-request
//! locks; everything else lives behind the store and claim ports.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use core_kernel::{ClaimRef, OperationMetadata, PortError, SanctionRequestId};

use crate::actor::{ReviewerRef, RoleName};
use crate::allocation::{Allocation, TaskAllocator};
use crate::bill::{BillItem, ClaimDocument, ClaimStatus, FieldWarning, ItemUpdate};
use crate::error::WorkflowError;
use crate::ledger::{ApprovalAction, ApprovalLedger, ApprovalLogEntry};
use crate::locks::RequestLocks;
use crate::ports::{ActionCommit, ClaimPort, RequestQuery, SanctionStore};
use crate::queue::QueueFilter;
use crate::reconciler::ClaimAmountReconciler;
use crate::request::{SanctionRequest, Transition};
use crate::step::{WorkflowStep, WorkflowStepRegistry};

/// A reviewer's action on a request
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub request_id: SanctionRequestId,
    pub actor: ReviewerRef,
    pub action: ApprovalAction,
    pub comments: String,
    /// The reviewer's decided amount for this stage
    pub stated_amount: Option<Decimal>,
    pub item_updates: Vec<ItemUpdate>,
}

impl ProcessCommand {
    pub fn new(request_id: SanctionRequestId, actor: ReviewerRef, action: ApprovalAction) -> Self {
        Self {
            request_id,
            actor,
            action,
            comments: String::new(),
            stated_amount: None,
            item_updates: Vec::new(),
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.stated_amount = Some(amount);
        self
    }

    pub fn with_item_update(mut self, update: ItemUpdate) -> Self {
        self.item_updates.push(update);
        self
    }
}

/// Result of a successful reviewer action
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub request: SanctionRequest,
    pub entry: ApprovalLogEntry,
    pub transition: Transition,
    /// Item fields skipped because their input was malformed
    pub warnings: Vec<FieldWarning>,
}

/// A bill item with its reviewer-facing rate
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: BillItem,
    pub display_rate: Decimal,
}

impl From<BillItem> for ItemView {
    fn from(item: BillItem) -> Self {
        let display_rate = item.display_rate();
        Self { item, display_rate }
    }
}

/// Everything a reviewer needs to decide on a request
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    pub request: SanctionRequest,
    pub items: Vec<ItemView>,
    pub total_claimed_amount: Decimal,
    /// The amount the reviewer should start from
    pub suggested_amount: Decimal,
    pub ledger: Vec<ApprovalLogEntry>,
    pub documents: Vec<ClaimDocument>,
    /// The full sequence, for progress display
    pub steps: Vec<WorkflowStep>,
    pub current_step: Option<WorkflowStep>,
}

/// The approval workflow engine
#[derive(Clone)]
pub struct SanctionEngine {
    registry: Arc<WorkflowStepRegistry>,
    store: Arc<dyn SanctionStore>,
    claims: Arc<dyn ClaimPort>,
    locks: Arc<RequestLocks>,
    allocator: TaskAllocator,
}

impl SanctionEngine {
    pub fn new(
        registry: Arc<WorkflowStepRegistry>,
        store: Arc<dyn SanctionStore>,
        claims: Arc<dyn ClaimPort>,
        allocator_role: RoleName,
    ) -> Self {
        let locks = Arc::new(RequestLocks::new());
        let allocator = TaskAllocator::new(registry.clone(), store.clone(), locks.clone(), allocator_role);
        Self {
            registry,
            store,
            claims,
            locks,
            allocator,
        }
    }

    pub fn registry(&self) -> &WorkflowStepRegistry {
        &self.registry
    }

    /// Role allowed to allocate requests and see the allocation dashboard
    pub fn allocator_role(&self) -> &RoleName {
        self.allocator.allocator_role()
    }

    pub fn store(&self) -> &Arc<dyn SanctionStore> {
        &self.store
    }

    /// Creates the request for a newly submitted claim
    ///
    /// The request starts `PENDING` and unassigned at the first step, with
    /// the collaborator's claim amount.
    ///
    /// # Errors
    ///
    /// - `DuplicateRequest` if the claim already has a request
    /// - `NotFound` if the collaborator does not know the claim
    pub async fn submit_claim(&self, claim_ref: ClaimRef) -> Result<SanctionRequest, WorkflowError> {
        if let Some(existing) = self.store.find_by_claim(claim_ref).await? {
            return Err(WorkflowError::DuplicateRequest {
                claim_ref,
                existing: existing.id,
            });
        }

        let claimed_amount = self
            .claims
            .get_claim_amount(claim_ref, None)
            .await
            .map_err(|e| WorkflowError::from_port("Claim", claim_ref, e))?;

        let request = SanctionRequest::submit(claim_ref, claimed_amount, self.registry.first_step());

        if let Err(err) = self.store.insert_request(&request).await {
            if err.is_conflict() {
                if let Some(existing) = self.store.find_by_claim(claim_ref).await? {
                    return Err(WorkflowError::DuplicateRequest {
                        claim_ref,
                        existing: existing.id,
                    });
                }
            }
            return Err(err.into());
        }

        info!(
            request_id = %request.id,
            claim_ref = %claim_ref,
            claimed_amount = %claimed_amount,
            step = request.current_step,
            "Sanction request submitted"
        );
        Ok(request)
    }

    /// Applies one reviewer action to a request
    ///
    /// Item revisions are applied in memory, then the ledger entry and the new
    /// request state commit together. Revised items are saved only once that
    /// commit has landed, so a failed commit leaves the bill untouched. A
    /// step-permission failure still commits the entry (with the request
    /// unchanged) and saves the revisions before the error is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the request does not exist
    /// - `AlreadyTerminal` if the request is finally decided
    /// - `Unauthorized` if the actor is ineligible or the step forbids the action
    /// - `NoNextStep` when forwarding from the last step
    /// - `ConcurrentModification` if the request changed underneath
    /// - `NotificationFailed` if the decision committed but the claim status
    ///   could not be updated
    /// - `ItemSaveFailed` if the decision committed but a revised item could
    ///   not be saved
    pub async fn process_request(&self, command: ProcessCommand) -> Result<ProcessOutcome, WorkflowError> {
        let ProcessCommand {
            request_id,
            actor,
            action,
            comments,
            stated_amount,
            item_updates,
        } = command;

        let _guard = self.locks.acquire(request_id).await;

        let mut request = self.load_request(request_id).await?;
        request.ensure_open()?;

        let step = self.registry.require_step(request.current_step)?.clone();
        ensure_eligible(&request, &step, &actor)?;

        let metadata = OperationMetadata::with_correlation_id(request_id.to_string())
            .initiated_by(actor.id.to_string())
            .with_context("action", action.as_str());

        let mut items = self.load_items(request.claim_ref, &metadata).await?;
        if let Some(correction) = ClaimAmountReconciler::heal(&mut request, &items) {
            info!(
                request_id = %request_id,
                previous = %correction.previous,
                corrected = %correction.corrected,
                "Corrected stale claimed amount"
            );
        }
        let (revised, warnings) = revise_items(&mut items, &item_updates);

        let expected_version = request.version;
        let mut next = request.clone();
        let result = next.apply(action, stated_amount, &self.registry);
        let mut committed = if result.is_ok() { next } else { request };
        committed.bump_version();

        let entry = ApprovalLogEntry::record(&committed, step.order, actor.id, action, comments, stated_amount);

        self.store
            .commit(ActionCommit {
                request: committed.clone(),
                expected_version,
                entry: entry.clone(),
            })
            .await
            .map_err(|e| commit_error(request_id, e))?;

        let saved = self.save_revised_items(request_id, &revised, &metadata).await;

        let transition = match result {
            Ok(transition) => transition,
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    step = step.order,
                    action = %action,
                    actor = %actor,
                    error = %err,
                    "Action recorded but not permitted"
                );
                return Err(err);
            }
        };

        info!(
            request_id = %request_id,
            step = step.order,
            action = %action,
            actor = %actor.id,
            status = %committed.status,
            current_step = committed.current_step,
            "Sanction request processed"
        );

        self.notify_claim(&committed, &transition, metadata).await?;
        saved?;

        Ok(ProcessOutcome {
            request: committed,
            entry,
            transition,
            warnings,
        })
    }

    /// Assigns a request to a reviewer; see [`TaskAllocator::allocate`]
    pub async fn allocate(
        &self,
        request_id: SanctionRequestId,
        assignee: &ReviewerRef,
        admin: &ReviewerRef,
    ) -> Result<Allocation, WorkflowError> {
        self.allocator.allocate(request_id, assignee, admin).await
    }

    /// Requests the reviewer may pick up, oldest first
    pub async fn pending_for_actor(&self, actor: &ReviewerRef) -> Result<Vec<SanctionRequest>, WorkflowError> {
        let Some(filter) = QueueFilter::for_actor(&self.registry, actor) else {
            warn!(actor = %actor, "No workflow step is bound to role; queue is empty");
            return Ok(Vec::new());
        };

        let candidates = self.store.find_requests(filter.query()).await?;
        Ok(filter.apply(candidates))
    }

    /// Every request not yet finally decided, oldest first
    pub async fn open_requests(&self) -> Result<Vec<SanctionRequest>, WorkflowError> {
        Ok(self.store.find_requests(RequestQuery::open()).await?)
    }

    /// Assembles the reviewer view of a request
    ///
    /// Repairs a stale stored claimed amount as a side effect.
    pub async fn get_request_detail(&self, request_id: SanctionRequestId) -> Result<RequestDetail, WorkflowError> {
        let mut request = self.load_request(request_id).await?;
        let metadata = OperationMetadata::with_correlation_id(request_id.to_string());

        let items = self.load_items(request.claim_ref, &metadata).await?;
        let total_claimed_amount = ClaimAmountReconciler::reconcile_claimed_total(&items);

        if let Some(correction) = ClaimAmountReconciler::heal(&mut request, &items) {
            self.store
                .repair_claimed_amount(request_id, correction.corrected)
                .await
                .map_err(|e| WorkflowError::from_port("SanctionRequest", request_id, e))?;
            info!(
                request_id = %request_id,
                previous = %correction.previous,
                corrected = %correction.corrected,
                "Corrected stale claimed amount"
            );
        }

        let ledger = ApprovalLedger::from_entries(
            self.store
                .ledger_entries(request_id)
                .await
                .map_err(|e| WorkflowError::from_port("SanctionRequest", request_id, e))?,
        );
        let suggested_amount = ClaimAmountReconciler::suggested_amount(&ledger, total_claimed_amount);

        let documents = match self
            .claims
            .get_claim_documents(request.claim_ref, Some(metadata))
            .await
        {
            Ok(documents) => documents,
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "Claim documents unavailable");
                Vec::new()
            }
        };

        Ok(RequestDetail {
            current_step: self.registry.step(request.current_step).cloned(),
            steps: self.registry.steps().to_vec(),
            items: items.into_iter().map(ItemView::from).collect(),
            total_claimed_amount,
            suggested_amount,
            ledger: ledger.into_entries(),
            documents,
            request,
        })
    }

    async fn load_request(&self, request_id: SanctionRequestId) -> Result<SanctionRequest, WorkflowError> {
        self.store
            .get_request(request_id)
            .await
            .map_err(|e| WorkflowError::from_port("SanctionRequest", request_id, e))
    }

    async fn load_items(
        &self,
        claim_ref: ClaimRef,
        metadata: &OperationMetadata,
    ) -> Result<Vec<BillItem>, WorkflowError> {
        self.claims
            .get_claim_items(claim_ref, Some(metadata.clone()))
            .await
            .map_err(|e| WorkflowError::from_port("Claim", claim_ref, e))
    }

    /// Saves the items revised by an action that has already committed
    async fn save_revised_items(
        &self,
        request_id: SanctionRequestId,
        items: &[BillItem],
        metadata: &OperationMetadata,
    ) -> Result<(), WorkflowError> {
        for item in items {
            if let Err(source) = self.claims.save_claim_item(item, Some(metadata.clone())).await {
                error!(
                    request_id = %request_id,
                    item_id = %item.id,
                    error = %source,
                    "Decision committed but item revision could not be saved"
                );
                return Err(WorkflowError::ItemSaveFailed {
                    request_id,
                    item_id: item.id,
                    source,
                });
            }
        }
        Ok(())
    }

    /// Pushes the committed decision to the claim collaborator
    async fn notify_claim(
        &self,
        request: &SanctionRequest,
        transition: &Transition,
        metadata: OperationMetadata,
    ) -> Result<(), WorkflowError> {
        let status = transition.claim_status();

        let result = match transition {
            Transition::Forwarded { .. } => {
                self.set_status_if_changed(request.claim_ref, status, metadata).await
            }
            _ => {
                self.claims
                    .set_claim_status(request.claim_ref, status, Some(metadata))
                    .await
            }
        };

        result.map_err(|source| {
            error!(
                request_id = %request.id,
                claim_ref = %request.claim_ref,
                status = %status,
                error = %source,
                "Decision committed but claim status update failed"
            );
            WorkflowError::NotificationFailed {
                request_id: request.id,
                status,
                source,
            }
        })
    }

    async fn set_status_if_changed(
        &self,
        claim_ref: ClaimRef,
        status: ClaimStatus,
        metadata: OperationMetadata,
    ) -> Result<(), PortError> {
        let current = self
            .claims
            .get_claim_status(claim_ref, Some(metadata.clone()))
            .await?;
        if current == status {
            return Ok(());
        }
        self.claims.set_claim_status(claim_ref, status, Some(metadata)).await
    }
}

/// Whether `actor` may act on the request at its current step
fn ensure_eligible(
    request: &SanctionRequest,
    step: &WorkflowStep,
    actor: &ReviewerRef,
) -> Result<(), WorkflowError> {
    if !actor.has_role(&step.role_name) {
        warn!(request_id = %request.id, step = step.order, actor = %actor, "Actor role does not match step");
        return Err(WorkflowError::unauthorized(format!(
            "role {} cannot act at step '{}', which requires role {}",
            actor.role, step.name, step.role_name
        )));
    }
    if !request.is_available_to(actor.id) {
        warn!(request_id = %request.id, actor = %actor, "Request is assigned to another reviewer");
        return Err(WorkflowError::unauthorized(format!(
            "request {} is assigned to another reviewer",
            request.id
        )));
    }
    Ok(())
}

/// Applies each revision to its item in memory
///
/// Returns the changed items and the warnings for fields or items skipped.
fn revise_items(items: &mut [BillItem], updates: &[ItemUpdate]) -> (Vec<BillItem>, Vec<FieldWarning>) {
    let mut warnings = Vec::new();
    let mut revised: Vec<BillItem> = Vec::new();

    for update in updates {
        let Some(item) = items.iter_mut().find(|i| i.id == update.item_id) else {
            warn!(item_id = %update.item_id, "Skipping update for item outside this claim");
            warnings.push(FieldWarning::unknown_item(update.item_id));
            continue;
        };

        if item.apply_update(update, &mut warnings) {
            match revised.iter_mut().find(|r| r.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => revised.push(item.clone()),
            }
        }
    }

    (revised, warnings)
}

fn commit_error(request_id: SanctionRequestId, error: PortError) -> WorkflowError {
    if error.is_conflict() {
        WorkflowError::ConcurrentModification(request_id)
    } else {
        WorkflowError::from_port("SanctionRequest", request_id, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ReviewerId;
    use rust_decimal_macros::dec;

    use crate::ports::mock::{InMemorySanctionStore, MockClaimPort};
    use crate::request::RequestStatus;

    struct Harness {
        engine: SanctionEngine,
        store: Arc<InMemorySanctionStore>,
        claims: Arc<MockClaimPort>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(
            WorkflowStepRegistry::new(vec![
                WorkflowStep::new(1, "Scrutiny", "JPO"),
                WorkflowStep::new(2, "Review", "PO").with_reject(),
                WorkflowStep::new(3, "Sanction", "DIRECTOR").with_reject().with_final_approval(),
            ])
            .unwrap(),
        );
        let store = Arc::new(InMemorySanctionStore::new());
        let claims = Arc::new(MockClaimPort::new());
        let engine = SanctionEngine::new(registry, store.clone(), claims.clone(), RoleName::from("CUSTOMER_ADMIN"));
        Harness { engine, store, claims }
    }

    async fn submit(h: &Harness) -> (SanctionRequest, Vec<BillItem>) {
        let claim_ref = ClaimRef::new();
        let items = vec![
            BillItem::new(claim_ref, "Room rent", dec!(2000), 3, None),
            BillItem::new(claim_ref, "Surgery", dec!(0), 1, Some(dec!(4000))),
        ];
        h.claims.insert_claim(claim_ref, items.clone(), vec![]).await;
        (h.engine.submit_claim(claim_ref).await.unwrap(), items)
    }

    fn reviewer(role: &str) -> ReviewerRef {
        ReviewerRef::new(ReviewerId::new(), role)
    }

    #[tokio::test]
    async fn test_submit_binds_first_step() {
        let h = harness();
        let (request, _) = submit(&h).await;

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.current_step, 1);
        assert_eq!(request.claimed_amount, dec!(10000));
        assert_eq!(request.sanctioned_amount, None);

        let again = h.engine.submit_claim(request.claim_ref).await;
        assert!(matches!(again, Err(WorkflowError::DuplicateRequest { existing, .. }) if existing == request.id));
    }

    #[tokio::test]
    async fn test_submit_unknown_claim() {
        let h = harness();
        let result = h.engine.submit_claim(ClaimRef::new()).await;
        assert!(matches!(result, Err(WorkflowError::NotFound { entity: "Claim", .. })));
    }

    #[tokio::test]
    async fn test_forward_moves_and_notifies_once() {
        let h = harness();
        let (request, _) = submit(&h).await;

        let outcome = h
            .engine
            .process_request(
                ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward).with_amount(dec!(9000)),
            )
            .await
            .unwrap();

        assert_eq!(outcome.request.current_step, 2);
        assert_eq!(outcome.request.status, RequestStatus::InProgress);
        assert_eq!(outcome.entry.step_order, 1);
        assert_eq!(outcome.entry.sequence, 1);

        h.engine
            .process_request(ProcessCommand::new(request.id, reviewer("PO"), ApprovalAction::Forward))
            .await
            .unwrap();

        assert_eq!(h.claims.status_updates(request.claim_ref).await, vec![ClaimStatus::UnderReview]);
    }

    #[tokio::test]
    async fn test_unauthorized_approve_is_still_recorded() {
        let h = harness();
        let (request, _) = submit(&h).await;

        let result = h
            .engine
            .process_request(
                ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Approve).with_amount(dec!(9000)),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));
        let stored = h.store.get_request(request.id).await.unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert_eq!(stored.current_step, 1);

        let ledger = h.store.ledger_entries(request.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].action, ApprovalAction::Approve);
        assert!(h.claims.status_updates(request.claim_ref).await.is_empty());
    }

    #[tokio::test]
    async fn test_ineligible_actor_leaves_no_trace() {
        let h = harness();
        let (request, _) = submit(&h).await;

        let result = h
            .engine
            .process_request(ProcessCommand::new(request.id, reviewer("PO"), ApprovalAction::Forward))
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));
        assert!(h.store.ledger_entries(request.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assigned_request_only_for_assignee() {
        let h = harness();
        let (request, _) = submit(&h).await;
        let assignee = reviewer("JPO");
        let admin = reviewer("CUSTOMER_ADMIN");
        h.engine.allocate(request.id, &assignee, &admin).await.unwrap();

        let other = h
            .engine
            .process_request(ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward))
            .await;
        assert!(matches!(other, Err(WorkflowError::Unauthorized(_))));

        let outcome = h
            .engine
            .process_request(ProcessCommand::new(request.id, assignee, ApprovalAction::Forward))
            .await
            .unwrap();
        assert_eq!(outcome.request.assigned_to, None);
        assert_eq!(outcome.entry.sequence, 2);
    }

    #[tokio::test]
    async fn test_item_updates_with_malformed_field() {
        let h = harness();
        let (request, items) = submit(&h).await;
        let stray = core_kernel::BillItemId::new();

        let outcome = h
            .engine
            .process_request(
                ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward)
                    .with_item_update(
                        ItemUpdate::for_item(items[0].id)
                            .approved_rate("1800")
                            .approved_quantity("three")
                            .comments("Ward rate applies"),
                    )
                    .with_item_update(ItemUpdate::for_item(stray).approved_amount("10")),
            )
            .await
            .unwrap();

        assert_eq!(outcome.warnings.len(), 2);
        let saved = h.claims.get_claim_items(request.claim_ref, None).await.unwrap();
        assert_eq!(saved[0].approved_rate, Some(dec!(1800)));
        assert_eq!(saved[0].approved_quantity, None);
        assert_eq!(saved[0].comments, "Ward rate applies");
        assert_eq!(outcome.request.current_step, 2);
    }

    #[tokio::test]
    async fn test_terminal_request_rejects_actions() {
        let h = harness();
        let (request, _) = submit(&h).await;
        h.engine
            .process_request(ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward))
            .await
            .unwrap();
        h.engine
            .process_request(ProcessCommand::new(request.id, reviewer("PO"), ApprovalAction::Reject))
            .await
            .unwrap();

        let before = h.store.ledger_size().await;
        let result = h
            .engine
            .process_request(ProcessCommand::new(request.id, reviewer("PO"), ApprovalAction::Forward))
            .await;

        assert!(matches!(result, Err(WorkflowError::AlreadyTerminal(_, RequestStatus::Rejected))));
        assert_eq!(h.store.ledger_size().await, before);
        assert_eq!(
            h.claims.status_updates(request.claim_ref).await,
            vec![ClaimStatus::UnderReview, ClaimStatus::Rejected]
        );
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_decision() {
        let h = harness();
        let (request, _) = submit(&h).await;
        h.claims.fail_status_updates(true);

        let result = h
            .engine
            .process_request(ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Clarify))
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::NotificationFailed { status: ClaimStatus::Clarification, .. })
        ));
        let stored = h.store.get_request(request.id).await.unwrap();
        assert_eq!(stored.status, RequestStatus::Clarification);
    }

    #[tokio::test]
    async fn test_item_save_failure_keeps_decision_and_notifies() {
        let h = harness();
        let (request, items) = submit(&h).await;
        h.claims.fail_item_saves(true);

        let result = h
            .engine
            .process_request(
                ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward)
                    .with_item_update(ItemUpdate::for_item(items[0].id).approved_amount("5000")),
            )
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::ItemSaveFailed { item_id, .. }) if item_id == items[0].id
        ));
        let stored = h.store.get_request(request.id).await.unwrap();
        assert_eq!(stored.current_step, 2);
        assert_eq!(h.store.ledger_size().await, 1);
        assert_eq!(h.claims.status_updates(request.claim_ref).await, vec![ClaimStatus::UnderReview]);
    }

    #[tokio::test]
    async fn test_detail_repairs_amount_and_suggests() {
        let h = harness();
        let (request, _) = submit(&h).await;
        h.store.repair_claimed_amount(request.id, dec!(0)).await.unwrap();

        let detail = h.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.request.claimed_amount, dec!(10000));
        assert_eq!(detail.suggested_amount, dec!(10000));
        assert_eq!(detail.items[1].display_rate, dec!(4000));
        assert_eq!(detail.steps.len(), 3);
        assert_eq!(h.store.get_request(request.id).await.unwrap().claimed_amount, dec!(10000));

        h.engine
            .process_request(
                ProcessCommand::new(request.id, reviewer("JPO"), ApprovalAction::Forward).with_amount(dec!(9100)),
            )
            .await
            .unwrap();
        let detail = h.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.suggested_amount, dec!(9100));
        assert_eq!(detail.current_step.map(|s| s.order), Some(2));
    }

    #[tokio::test]
    async fn test_queue_for_unbound_role_is_empty() {
        let h = harness();
        submit(&h).await;
        assert!(h.engine.pending_for_actor(&reviewer("AUDITOR")).await.unwrap().is_empty());
        assert_eq!(h.engine.pending_for_actor(&reviewer("JPO")).await.unwrap().len(), 1);
        assert_eq!(h.engine.open_requests().await.unwrap().len(), 1);
    }
}
