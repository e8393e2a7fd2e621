//! Workflow Domain Ports
//!
//! The engine talks to two collaborators through these traits:
//!
//! - **`SanctionStore`**: persistence for requests and their approval ledger
//! - **`ClaimPort`**: the bill/claim collaborator that owns line items,
//!   documents and the claim status
//!
//! Both are shared as `Arc<dyn ...>` and implemented by the PostgreSQL
//! adapters in `infra_db` and by the in-memory adapters in [`mock`].
//!
//! # Atomicity
//!
//! [`SanctionStore::commit`] is the only write path for request state. It
//! stores the new request state and appends the accompanying ledger entry as
//! one unit, and only if the stored version still equals
//! [`ActionCommit::expected_version`]. Otherwise it fails with
//! `PortError::Conflict` and writes nothing.

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{
    ClaimRef, DomainPort, HealthCheckable, OperationMetadata, PortError, SanctionRequestId,
};

use crate::bill::{BillItem, ClaimDocument, ClaimStatus};
use crate::ledger::ApprovalLogEntry;
use crate::request::{RequestStatus, SanctionRequest};

/// Query parameters for finding requests
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    /// Only requests sitting at one of these step orders
    pub step_orders: Option<Vec<u32>>,
    /// Only requests in one of these statuses
    pub statuses: Option<Vec<RequestStatus>>,
}

impl RequestQuery {
    /// Requests at any of the given steps
    pub fn at_steps(step_orders: Vec<u32>) -> Self {
        Self {
            step_orders: Some(step_orders),
            ..Default::default()
        }
    }

    /// Requests not yet finally decided
    pub fn open() -> Self {
        Self {
            statuses: Some(RequestStatus::open_statuses()),
            ..Default::default()
        }
    }

    /// Restricts the query to the given statuses
    pub fn with_statuses(mut self, statuses: Vec<RequestStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Whether `request` satisfies every filter
    pub fn matches(&self, request: &SanctionRequest) -> bool {
        if let Some(ref orders) = self.step_orders {
            if !orders.contains(&request.current_step) {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&request.status) {
                return false;
            }
        }
        true
    }
}

/// A request state change together with the ledger entry that records it
#[derive(Debug, Clone)]
pub struct ActionCommit {
    /// Full request state to store, already carrying the new version
    pub request: SanctionRequest,
    /// Version the stored request must still have
    pub expected_version: u64,
    /// Entry appended in the same unit of work
    pub entry: ApprovalLogEntry,
}

/// Persistence port for sanction requests and the approval ledger
#[async_trait]
pub trait SanctionStore: DomainPort + HealthCheckable {
    /// Stores a newly submitted request
    ///
    /// Fails with `PortError::Conflict` if the claim already has a request.
    async fn insert_request(&self, request: &SanctionRequest) -> Result<(), PortError>;

    /// Loads a request by id
    async fn get_request(&self, id: SanctionRequestId) -> Result<SanctionRequest, PortError>;

    /// The request tracking a claim, if one exists
    async fn find_by_claim(&self, claim_ref: ClaimRef) -> Result<Option<SanctionRequest>, PortError>;

    /// Requests matching the query, oldest first
    async fn find_requests(&self, query: RequestQuery) -> Result<Vec<SanctionRequest>, PortError>;

    /// Every ledger entry for a request, in append order
    async fn ledger_entries(&self, id: SanctionRequestId) -> Result<Vec<ApprovalLogEntry>, PortError>;

    /// Atomically stores the request state and appends the ledger entry
    ///
    /// # Errors
    ///
    /// - `PortError::NotFound` if the request does not exist
    /// - `PortError::Conflict` if the stored version differs from
    ///   `expected_version`
    async fn commit(&self, commit: ActionCommit) -> Result<(), PortError>;

    /// Overwrites the stored claimed amount without touching the version
    ///
    /// Used by the self-healing read path; it never races a transition
    /// because transitions write the full request state.
    async fn repair_claimed_amount(
        &self,
        id: SanctionRequestId,
        claimed_amount: Decimal,
    ) -> Result<(), PortError>;
}

/// Port to the bill/claim collaborator
#[async_trait]
pub trait ClaimPort: DomainPort {
    /// Sum of the claim's item claimed amounts
    async fn get_claim_amount(
        &self,
        claim_ref: ClaimRef,
        metadata: Option<OperationMetadata>,
    ) -> Result<Decimal, PortError>;

    /// The claim's line items, in entry order
    async fn get_claim_items(
        &self,
        claim_ref: ClaimRef,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<BillItem>, PortError>;

    /// Persists one revised item
    async fn save_claim_item(
        &self,
        item: &BillItem,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Current claim status
    async fn get_claim_status(
        &self,
        claim_ref: ClaimRef,
        metadata: Option<OperationMetadata>,
    ) -> Result<ClaimStatus, PortError>;

    /// Tells the collaborator about a workflow decision
    async fn set_claim_status(
        &self,
        claim_ref: ClaimRef,
        status: ClaimStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Supporting documents, surfaced read-only
    async fn get_claim_documents(
        &self,
        claim_ref: ClaimRef,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimDocument>, PortError>;
}

/// In-memory implementations of the workflow ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, HealthCheckResult};

    #[derive(Debug, Default)]
    struct StoreState {
        requests: HashMap<SanctionRequestId, SanctionRequest>,
        ledger: HashMap<SanctionRequestId, Vec<ApprovalLogEntry>>,
    }

    /// In-memory request store
    ///
    /// Request state and ledger live behind one lock so a commit is atomic.
    #[derive(Debug, Default, Clone)]
    pub struct InMemorySanctionStore {
        state: Arc<RwLock<StoreState>>,
    }

    impl InMemorySanctionStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Total ledger entries across every request
        pub async fn ledger_size(&self) -> usize {
            self.state.read().await.ledger.values().map(Vec::len).sum()
        }
    }

    impl DomainPort for InMemorySanctionStore {}

    #[async_trait]
    impl HealthCheckable for InMemorySanctionStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-sanction-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl SanctionStore for InMemorySanctionStore {
        async fn insert_request(&self, request: &SanctionRequest) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.requests.values().any(|r| r.claim_ref == request.claim_ref) {
                return Err(PortError::conflict(format!(
                    "claim {} already has a sanction request",
                    request.claim_ref
                )));
            }
            state.requests.insert(request.id, request.clone());
            state.ledger.entry(request.id).or_default();
            Ok(())
        }

        async fn get_request(&self, id: SanctionRequestId) -> Result<SanctionRequest, PortError> {
            self.state
                .read()
                .await
                .requests
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("SanctionRequest", id))
        }

        async fn find_by_claim(&self, claim_ref: ClaimRef) -> Result<Option<SanctionRequest>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .requests
                .values()
                .find(|r| r.claim_ref == claim_ref)
                .cloned())
        }

        async fn find_requests(&self, query: RequestQuery) -> Result<Vec<SanctionRequest>, PortError> {
            let state = self.state.read().await;
            let mut results: Vec<_> = state
                .requests
                .values()
                .filter(|r| query.matches(r))
                .cloned()
                .collect();
            results.sort_by_key(|r| r.created_at);
            Ok(results)
        }

        async fn ledger_entries(&self, id: SanctionRequestId) -> Result<Vec<ApprovalLogEntry>, PortError> {
            let state = self.state.read().await;
            if !state.requests.contains_key(&id) {
                return Err(PortError::not_found("SanctionRequest", id));
            }
            Ok(state.ledger.get(&id).cloned().unwrap_or_default())
        }

        async fn commit(&self, commit: ActionCommit) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let id = commit.request.id;
            let stored = state
                .requests
                .get(&id)
                .ok_or_else(|| PortError::not_found("SanctionRequest", id))?;

            if stored.version != commit.expected_version {
                return Err(PortError::conflict(format!(
                    "sanction request {} is at version {}, expected {}",
                    id, stored.version, commit.expected_version
                )));
            }

            state.requests.insert(id, commit.request);
            state.ledger.entry(id).or_default().push(commit.entry);
            Ok(())
        }

        async fn repair_claimed_amount(
            &self,
            id: SanctionRequestId,
            claimed_amount: Decimal,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let request = state
                .requests
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("SanctionRequest", id))?;
            request.claimed_amount = claimed_amount;
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    struct MockClaim {
        items: Vec<BillItem>,
        documents: Vec<ClaimDocument>,
        status: ClaimStatus,
        status_updates: Vec<ClaimStatus>,
    }

    /// In-memory bill/claim collaborator
    #[derive(Debug, Default, Clone)]
    pub struct MockClaimPort {
        claims: Arc<RwLock<HashMap<ClaimRef, MockClaim>>>,
        fail_status_updates: Arc<AtomicBool>,
        fail_item_saves: Arc<AtomicBool>,
    }

    impl MockClaimPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a submitted claim with its items and documents
        pub async fn insert_claim(
            &self,
            claim_ref: ClaimRef,
            items: Vec<BillItem>,
            documents: Vec<ClaimDocument>,
        ) {
            self.claims.write().await.insert(
                claim_ref,
                MockClaim {
                    items,
                    documents,
                    status: ClaimStatus::Submitted,
                    status_updates: Vec::new(),
                },
            );
        }

        /// Makes every subsequent `set_claim_status` call fail
        pub fn fail_status_updates(&self, fail: bool) {
            self.fail_status_updates.store(fail, Ordering::SeqCst);
        }

        /// Makes every subsequent `save_claim_item` call fail
        pub fn fail_item_saves(&self, fail: bool) {
            self.fail_item_saves.store(fail, Ordering::SeqCst);
        }

        /// Every status the engine has set on the claim, oldest first
        pub async fn status_updates(&self, claim_ref: ClaimRef) -> Vec<ClaimStatus> {
            self.claims
                .read()
                .await
                .get(&claim_ref)
                .map(|c| c.status_updates.clone())
                .unwrap_or_default()
        }

        fn missing(claim_ref: ClaimRef) -> PortError {
            PortError::not_found("Claim", claim_ref)
        }
    }

    impl DomainPort for MockClaimPort {}

    #[async_trait]
    impl ClaimPort for MockClaimPort {
        async fn get_claim_amount(
            &self,
            claim_ref: ClaimRef,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Decimal, PortError> {
            let claims = self.claims.read().await;
            let claim = claims.get(&claim_ref).ok_or_else(|| Self::missing(claim_ref))?;
            Ok(claim.items.iter().map(|i| i.claimed_amount).sum())
        }

        async fn get_claim_items(
            &self,
            claim_ref: ClaimRef,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<BillItem>, PortError> {
            let claims = self.claims.read().await;
            let claim = claims.get(&claim_ref).ok_or_else(|| Self::missing(claim_ref))?;
            Ok(claim.items.clone())
        }

        async fn save_claim_item(
            &self,
            item: &BillItem,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            if self.fail_item_saves.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "bill-items".to_string(),
                });
            }
            let mut claims = self.claims.write().await;
            let claim = claims
                .get_mut(&item.claim_ref)
                .ok_or_else(|| Self::missing(item.claim_ref))?;
            let stored = claim
                .items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| PortError::not_found("BillItem", item.id))?;
            *stored = item.clone();
            Ok(())
        }

        async fn get_claim_status(
            &self,
            claim_ref: ClaimRef,
            _metadata: Option<OperationMetadata>,
        ) -> Result<ClaimStatus, PortError> {
            let claims = self.claims.read().await;
            let claim = claims.get(&claim_ref).ok_or_else(|| Self::missing(claim_ref))?;
            Ok(claim.status)
        }

        async fn set_claim_status(
            &self,
            claim_ref: ClaimRef,
            status: ClaimStatus,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            if self.fail_status_updates.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "claim-status".to_string(),
                });
            }
            let mut claims = self.claims.write().await;
            let claim = claims.get_mut(&claim_ref).ok_or_else(|| Self::missing(claim_ref))?;
            claim.status = status;
            claim.status_updates.push(status);
            Ok(())
        }

        async fn get_claim_documents(
            &self,
            claim_ref: ClaimRef,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<ClaimDocument>, PortError> {
            let claims = self.claims.read().await;
            let claim = claims.get(&claim_ref).ok_or_else(|| Self::missing(claim_ref))?;
            Ok(claim.documents.clone())
        }
    }
}
