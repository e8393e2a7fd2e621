//! End-to-end workflow scenarios over the in-memory ports
//!
//! # Test Organization
//!
//! - `full_chain` - seven-step approval, carry-forward and claim notification
//! - `terminal` - decided requests are immutable
//! - `routing` - clarification, rejection recommendation, allocation
//! - `concurrency` - per-request serialisation and optimistic versioning
//! - `properties` - generated action sequences keep the ledger consistent

use rust_decimal_macros::dec;

use domain_workflow::{
    ApprovalAction, ClaimStatus, DocumentType, ItemUpdate, ProcessCommand, RequestStatus,
    SanctionStore, WorkflowError,
};
use test_utils::{
    action_strategy, assert_amount, assert_forward_chain, assert_ledger_consistent,
    assert_terminal, non_terminal_action_strategy, stated_amount_strategy, BillFixtures,
    ReviewerFixtures, StepFixtures, TestBillBuilder, TestEngineBuilder,
};

mod full_chain {
    use super::*;

    #[tokio::test]
    async fn seven_steps_end_in_approval_with_carried_amounts() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Surgery", dec!(10000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        assert_eq!(request.claimed_amount, dec!(10000));

        let reviewers = ReviewerFixtures::standard_chain();
        let stated = [dec!(9000), dec!(8500), dec!(8400), dec!(8300), dec!(8200), dec!(8100)];
        let mut expected_suggestion = dec!(10000);

        for (reviewer, amount) in reviewers.iter().zip(stated) {
            let detail = harness.engine.get_request_detail(request.id).await.unwrap();
            assert_eq!(detail.suggested_amount, expected_suggestion);
            assert_eq!(detail.current_step.unwrap().role_name, reviewer.role);

            harness
                .engine
                .process_request(
                    ProcessCommand::new(request.id, reviewer.clone(), ApprovalAction::Forward)
                        .with_amount(amount),
                )
                .await
                .unwrap();
            expected_suggestion = amount;
        }

        let director = reviewers.last().unwrap();
        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.suggested_amount, dec!(8100));

        let outcome = harness
            .engine
            .process_request(
                ProcessCommand::new(request.id, director.clone(), ApprovalAction::Approve)
                    .with_amount(dec!(8000))
                    .with_comments("Sanctioned"),
            )
            .await
            .unwrap();

        assert_terminal(&outcome.request, RequestStatus::Approved);
        assert_amount(outcome.request.sanctioned_amount, dec!(8000));

        let ledger = harness.store.ledger_entries(request.id).await.unwrap();
        assert_eq!(ledger.len(), 7);
        assert_ledger_consistent(&outcome.request, &ledger);
        assert_forward_chain(&ledger, &harness.registry);

        assert_eq!(
            harness.claims.status_updates(claim_ref).await,
            vec![ClaimStatus::UnderReview, ClaimStatus::Approved]
        );
    }

    #[tokio::test]
    async fn item_revisions_and_warnings_travel_with_the_action() {
        let harness = TestEngineBuilder::new().build();
        let builder = TestBillBuilder::new();
        let claim_ref = builder.claim_ref();
        let items = BillFixtures::standard_items(claim_ref);
        let (pharmacy_id, scan_id) = (items[3].id, items[1].id);
        harness.claims.insert_claim(claim_ref, items, vec![]).await;

        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        let jpo = ReviewerFixtures::jpo();

        let outcome = harness
            .engine
            .process_request(
                ProcessCommand::new(request.id, jpo, ApprovalAction::Forward)
                    .with_amount(dec!(9200))
                    .with_item_update(
                        ItemUpdate::for_item(scan_id)
                            .approved_rate("5200")
                            .approved_quantity("1")
                            .comments("Capped at panel rate"),
                    )
                    .with_item_update(ItemUpdate::for_item(pharmacy_id).approved_amount("twelve")),
            )
            .await
            .unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].item_id, pharmacy_id);

        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        let scan = detail.items.iter().find(|v| v.item.id == scan_id).unwrap();
        assert_eq!(scan.item.approved_amount, Some(dec!(5200)));
        assert_eq!(scan.item.comments, "Capped at panel rate");

        let pharmacy = detail.items.iter().find(|v| v.item.id == pharmacy_id).unwrap();
        assert_eq!(pharmacy.item.approved_amount, None);
        assert_eq!(pharmacy.display_rate, dec!(400));
        assert_eq!(detail.total_claimed_amount, BillFixtures::STANDARD_TOTAL);
    }

    #[tokio::test]
    async fn detail_surfaces_documents_and_progress() {
        let harness = TestEngineBuilder::new().build();
        let builder = TestBillBuilder::new();
        let claim_ref = builder.claim_ref();
        harness
            .claims
            .insert_claim(
                claim_ref,
                BillFixtures::standard_items(claim_ref),
                BillFixtures::standard_documents(claim_ref),
            )
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();

        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.documents.len(), 3);
        assert_eq!(detail.steps.len(), 7);
        assert_eq!(detail.current_step.unwrap().order, 1);
        assert_eq!(detail.suggested_amount, BillFixtures::STANDARD_TOTAL);

        let extra = TestBillBuilder::new()
            .with_item("Room rent", dec!(1500), 3)
            .with_document(DocumentType::Pharmacy)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(extra).await.unwrap();
        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.documents[0].document_type, DocumentType::Pharmacy);
    }
}

mod terminal {
    use super::*;

    #[tokio::test]
    async fn decided_requests_accept_no_further_actions() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Angioplasty", dec!(50000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();

        let reviewers = ReviewerFixtures::standard_chain();
        for reviewer in &reviewers[..6] {
            harness
                .engine
                .process_request(ProcessCommand::new(request.id, reviewer.clone(), ApprovalAction::Forward))
                .await
                .unwrap();
        }
        let director = &reviewers[6];
        harness
            .engine
            .process_request(ProcessCommand::new(request.id, director.clone(), ApprovalAction::Reject))
            .await
            .unwrap();

        let ledger_before = harness.store.ledger_size().await;
        for action in [
            ApprovalAction::Approve,
            ApprovalAction::Reject,
            ApprovalAction::Forward,
            ApprovalAction::Clarify,
        ] {
            let err = harness
                .engine
                .process_request(
                    ProcessCommand::new(request.id, director.clone(), action).with_amount(dec!(1)),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::AlreadyTerminal(_, RequestStatus::Rejected)));
        }

        let admin = ReviewerFixtures::admin();
        let err = harness
            .engine
            .allocate(request.id, director, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyTerminal(..)));

        assert_eq!(harness.store.ledger_size().await, ledger_before);
        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_terminal(&detail.request, RequestStatus::Rejected);
        assert_eq!(detail.request.version, 7);
        assert_eq!(detail.request.sanctioned_amount, None);
    }
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn forwarding_skips_gaps_in_step_orders() {
        let harness = TestEngineBuilder::new()
            .with_registry(StepFixtures::sparse_registry())
            .build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Appendectomy", dec!(42000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        assert_eq!(request.current_step, 10);

        for role in ["JPO", "PO"] {
            harness
                .engine
                .process_request(ProcessCommand::new(
                    request.id,
                    ReviewerFixtures::with_role(role),
                    ApprovalAction::Forward,
                ))
                .await
                .unwrap();
        }

        let director = ReviewerFixtures::director();
        let queue = harness.engine.pending_for_actor(&director).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].current_step, 40);

        let err = harness
            .engine
            .process_request(ProcessCommand::new(request.id, director, ApprovalAction::Forward))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoNextStep(40)));

        let ledger = harness.store.ledger_entries(request.id).await.unwrap();
        assert_eq!(ledger.iter().map(|e| e.step_order).collect::<Vec<_>>(), vec![10, 20, 40]);
        assert_forward_chain(&ledger[..2], &harness.registry);
    }

    #[tokio::test]
    async fn refused_decisions_are_still_on_record() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Knee replacement", dec!(180000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        let jpo = ReviewerFixtures::jpo();

        for action in [ApprovalAction::Approve, ApprovalAction::Reject] {
            let err = harness
                .engine
                .process_request(
                    ProcessCommand::new(request.id, jpo.clone(), action).with_amount(dec!(150000)),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Unauthorized(_)));
        }

        // Wrong role leaves no trace
        let err = harness
            .engine
            .process_request(ProcessCommand::new(request.id, ReviewerFixtures::director(), ApprovalAction::Approve))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.request.status, RequestStatus::Pending);
        assert_eq!(detail.request.current_step, 1);
        assert_eq!(detail.request.sanctioned_amount, None);
        assert_eq!(
            detail.ledger.iter().map(|e| e.action).collect::<Vec<_>>(),
            vec![ApprovalAction::Approve, ApprovalAction::Reject]
        );
        assert_ledger_consistent(&detail.request, &detail.ledger);
        // The refused entry still carries the latest stated amount
        assert_eq!(detail.suggested_amount, dec!(150000));
        assert!(harness.claims.status_updates(claim_ref).await.is_empty());
    }

    #[tokio::test]
    async fn clarification_leaves_the_reviewer_queue() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_random_items(3)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        let jpo = ReviewerFixtures::jpo();

        harness
            .engine
            .process_request(
                ProcessCommand::new(request.id, jpo.clone(), ApprovalAction::Clarify)
                    .with_comments("Discharge summary missing"),
            )
            .await
            .unwrap();

        assert!(harness.engine.pending_for_actor(&jpo).await.unwrap().is_empty());
        assert_eq!(harness.engine.open_requests().await.unwrap().len(), 1);
        assert_eq!(
            harness.claims.status_updates(claim_ref).await,
            vec![ClaimStatus::Clarification]
        );

        let outcome = harness
            .engine
            .process_request(ProcessCommand::new(request.id, jpo, ApprovalAction::Forward))
            .await
            .unwrap();
        assert_eq!(outcome.request.status, RequestStatus::InProgress);
        assert_eq!(outcome.request.current_step, 2);
    }

    #[tokio::test]
    async fn rejection_recommendation_forwards_to_rejecting_step() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Cosmetic procedure", dec!(20000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        let reviewers = ReviewerFixtures::standard_chain();

        for reviewer in &reviewers[..5] {
            harness
                .engine
                .process_request(ProcessCommand::new(
                    request.id,
                    reviewer.clone(),
                    ApprovalAction::RejectRecommended,
                ))
                .await
                .unwrap();
        }

        let outcome = harness
            .engine
            .process_request(
                ProcessCommand::new(request.id, reviewers[5].clone(), ApprovalAction::Reject)
                    .with_comments("Not reimbursable"),
            )
            .await
            .unwrap();

        assert_terminal(&outcome.request, RequestStatus::Rejected);
        assert_eq!(outcome.request.current_step, 6);
        assert_eq!(
            harness.claims.status_updates(claim_ref).await,
            vec![ClaimStatus::UnderReview, ClaimStatus::Rejected]
        );
    }

    #[tokio::test]
    async fn allocation_narrows_the_request_to_one_reviewer() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Dialysis", dec!(3000), 4)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();

        let assignee = ReviewerFixtures::jpo();
        let other = ReviewerFixtures::jpo();
        let allocation = harness
            .engine
            .allocate(request.id, &assignee, &ReviewerFixtures::admin())
            .await
            .unwrap();
        assert_eq!(allocation.request.assigned_to, Some(assignee.id));
        assert_eq!(allocation.entry.approved_amount_at_stage, None);
        assert!(allocation.entry.comments.ends_with("by CUSTOMER_ADMIN."));

        assert!(harness.engine.pending_for_actor(&other).await.unwrap().is_empty());
        assert_eq!(harness.engine.pending_for_actor(&assignee).await.unwrap().len(), 1);

        let err = harness
            .engine
            .process_request(ProcessCommand::new(request.id, other, ApprovalAction::Forward))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let outcome = harness
            .engine
            .process_request(ProcessCommand::new(request.id, assignee, ApprovalAction::Forward))
            .await
            .unwrap();
        assert_eq!(outcome.request.assigned_to, None);
        assert_eq!(harness.store.ledger_size().await, 2);
    }

    #[tokio::test]
    async fn allocation_follows_the_configured_role() {
        let harness = TestEngineBuilder::new().with_allocator_role("DIRECTOR").build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Cataract surgery", dec!(25000), 1)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();
        let assignee = ReviewerFixtures::jpo();

        let err = harness
            .engine
            .allocate(request.id, &assignee, &ReviewerFixtures::admin())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let allocation = harness
            .engine
            .allocate(request.id, &assignee, &ReviewerFixtures::director())
            .await
            .unwrap();
        assert_eq!(allocation.request.assigned_to, Some(assignee.id));
    }
}

mod concurrency {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use core_kernel::{
        ClaimRef, DomainPort, HealthCheckResult, HealthCheckable, PortError, ReviewerId,
        SanctionRequestId,
    };
    use domain_workflow::{
        ActionCommit, ApprovalLogEntry, ClaimPort, InMemorySanctionStore, MockClaimPort,
        RequestQuery, RoleName, SanctionEngine, SanctionRequest,
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_forwards_on_one_request_are_serialised() {
        let harness = TestEngineBuilder::new().build();
        let claim_ref = TestBillBuilder::new()
            .with_item("Chemotherapy", dec!(15000), 2)
            .seed(&harness.claims)
            .await;
        let request = harness.engine.submit_claim(claim_ref).await.unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let engine = harness.engine.clone();
                let reviewer = ReviewerFixtures::jpo();
                tokio::spawn(async move {
                    engine
                        .process_request(ProcessCommand::new(request.id, reviewer, ApprovalAction::Forward))
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(outcome) => {
                    succeeded += 1;
                    assert_eq!(outcome.request.current_step, 2);
                }
                Err(err) => assert!(matches!(err, WorkflowError::Unauthorized(_))),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(harness.store.ledger_size().await, 1);
        let detail = harness.engine.get_request_detail(request.id).await.unwrap();
        assert_eq!(detail.request.current_step, 2);
        assert_eq!(detail.request.version, 1);
    }

    /// Store that lets another writer commit between the engine's read and
    /// its commit, once
    struct RacingStore {
        inner: InMemorySanctionStore,
        raced: AtomicBool,
    }

    impl DomainPort for RacingStore {}

    #[async_trait]
    impl HealthCheckable for RacingStore {
        async fn health_check(&self) -> HealthCheckResult {
            self.inner.health_check().await
        }
    }

    #[async_trait]
    impl SanctionStore for RacingStore {
        async fn insert_request(&self, request: &SanctionRequest) -> Result<(), PortError> {
            self.inner.insert_request(request).await
        }

        async fn get_request(&self, id: SanctionRequestId) -> Result<SanctionRequest, PortError> {
            let snapshot = self.inner.get_request(id).await?;
            if !self.raced.swap(true, Ordering::SeqCst) {
                let mut other = snapshot.clone();
                other.version += 1;
                let entry = ApprovalLogEntry::record(
                    &other,
                    other.current_step,
                    ReviewerId::new(),
                    ApprovalAction::Clarify,
                    "concurrent writer",
                    None,
                );
                self.inner
                    .commit(ActionCommit {
                        request: other,
                        expected_version: snapshot.version,
                        entry,
                    })
                    .await?;
            }
            Ok(snapshot)
        }

        async fn find_by_claim(&self, claim_ref: ClaimRef) -> Result<Option<SanctionRequest>, PortError> {
            self.inner.find_by_claim(claim_ref).await
        }

        async fn find_requests(&self, query: RequestQuery) -> Result<Vec<SanctionRequest>, PortError> {
            self.inner.find_requests(query).await
        }

        async fn ledger_entries(&self, id: SanctionRequestId) -> Result<Vec<ApprovalLogEntry>, PortError> {
            self.inner.ledger_entries(id).await
        }

        async fn commit(&self, commit: ActionCommit) -> Result<(), PortError> {
            self.inner.commit(commit).await
        }

        async fn repair_claimed_amount(&self, id: SanctionRequestId, amount: Decimal) -> Result<(), PortError> {
            self.inner.repair_claimed_amount(id, amount).await
        }
    }

    struct RacingHarness {
        engine: SanctionEngine,
        store: Arc<RacingStore>,
        inner: InMemorySanctionStore,
        claims: MockClaimPort,
    }

    impl RacingHarness {
        fn new() -> Self {
            let inner = InMemorySanctionStore::new();
            let store = Arc::new(RacingStore {
                inner: inner.clone(),
                raced: AtomicBool::new(true),
            });
            let claims = MockClaimPort::new();
            let engine = SanctionEngine::new(
                StepFixtures::standard_registry(),
                store.clone(),
                Arc::new(claims.clone()),
                RoleName::new("CUSTOMER_ADMIN"),
            );
            Self {
                engine,
                store,
                inner,
                claims,
            }
        }
    }

    #[tokio::test]
    async fn stale_read_fails_with_concurrent_modification() {
        let race = RacingHarness::new();
        let claim_ref = TestBillBuilder::new()
            .with_item("Physiotherapy", dec!(800), 10)
            .seed(&race.claims)
            .await;
        let request = race.engine.submit_claim(claim_ref).await.unwrap();

        race.store.raced.store(false, Ordering::SeqCst);
        let err = race
            .engine
            .process_request(
                ProcessCommand::new(request.id, ReviewerFixtures::jpo(), ApprovalAction::Forward)
                    .with_amount(dec!(7000)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConcurrentModification(id) if id == request.id));

        // Only the competing writer's entry landed
        let ledger = race.inner.ledger_entries(request.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].action, ApprovalAction::Clarify);
        assert!(race.claims.status_updates(claim_ref).await.is_empty());
    }

    #[tokio::test]
    async fn stale_read_leaves_item_revisions_unsaved() {
        let race = RacingHarness::new();
        let claim_ref = TestBillBuilder::new()
            .with_item("Physiotherapy", dec!(800), 10)
            .seed(&race.claims)
            .await;
        let request = race.engine.submit_claim(claim_ref).await.unwrap();
        let item_id = race.claims.get_claim_items(claim_ref, None).await.unwrap()[0].id;

        race.store.raced.store(false, Ordering::SeqCst);
        let err = race
            .engine
            .process_request(
                ProcessCommand::new(request.id, ReviewerFixtures::jpo(), ApprovalAction::Forward)
                    .with_item_update(ItemUpdate::for_item(item_id).approved_amount("1").comments("cut")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConcurrentModification(_)));

        let items = race.claims.get_claim_items(claim_ref, None).await.unwrap();
        assert_eq!(items[0].approved_amount, None);
        assert!(items[0].comments.is_empty());

        // The same revision lands once the action commits
        race.engine
            .process_request(
                ProcessCommand::new(request.id, ReviewerFixtures::jpo(), ApprovalAction::Forward)
                    .with_item_update(ItemUpdate::for_item(item_id).approved_amount("1").comments("cut")),
            )
            .await
            .unwrap();
        let items = race.claims.get_claim_items(claim_ref, None).await.unwrap();
        assert_eq!(items[0].approved_amount, Some(dec!(1)));
        assert_eq!(items[0].comments, "cut");
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn ledger_stays_consistent_under_any_non_terminal_sequence(
            actions in prop::collection::vec(
                (non_terminal_action_strategy(), stated_amount_strategy()),
                1..12,
            ),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let harness = TestEngineBuilder::new().build();
                let claim_ref = TestBillBuilder::new()
                    .with_item("Inpatient stay", dec!(12000), 1)
                    .seed(&harness.claims)
                    .await;
                let request = harness.engine.submit_claim(claim_ref).await.unwrap();

                for (action, amount) in actions {
                    let current = harness.engine.get_request_detail(request.id).await.unwrap();
                    let role = current.current_step.unwrap().role_name;
                    let mut command = ProcessCommand::new(
                        request.id,
                        ReviewerFixtures::with_role(role.as_str()),
                        action,
                    );
                    if let Some(amount) = amount {
                        command = command.with_amount(amount);
                    }
                    match harness.engine.process_request(command).await {
                        Ok(outcome) => assert!(!outcome.request.is_terminal()),
                        Err(err) => assert!(matches!(err, WorkflowError::NoNextStep(7))),
                    }
                }

                let detail = harness.engine.get_request_detail(request.id).await.unwrap();
                assert_ledger_consistent(&detail.request, &detail.ledger);
                // Refused forwards from the last step stay at that step
                let progressed: Vec<_> = detail
                    .ledger
                    .iter()
                    .filter(|e| e.step_order < 7)
                    .cloned()
                    .collect();
                assert_forward_chain(&progressed, &harness.registry);
                let latest = detail.ledger.iter().rev().find_map(|e| e.approved_amount_at_stage);
                assert_eq!(detail.suggested_amount, latest.unwrap_or(dec!(12000)));
            });
        }

        #[test]
        fn decided_requests_refuse_every_action(action in action_strategy()) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let harness = TestEngineBuilder::new()
                    .with_registry(StepFixtures::sparse_registry())
                    .build();
                let claim_ref = TestBillBuilder::new()
                    .with_item("Bypass surgery", dec!(300000), 1)
                    .seed(&harness.claims)
                    .await;
                let request = harness.engine.submit_claim(claim_ref).await.unwrap();
                for role in ["JPO", "PO"] {
                    harness
                        .engine
                        .process_request(ProcessCommand::new(
                            request.id,
                            ReviewerFixtures::with_role(role),
                            ApprovalAction::Forward,
                        ))
                        .await
                        .unwrap();
                }
                let director = ReviewerFixtures::director();
                harness
                    .engine
                    .process_request(
                        ProcessCommand::new(request.id, director.clone(), ApprovalAction::Approve)
                            .with_amount(dec!(280000)),
                    )
                    .await
                    .unwrap();

                let err = harness
                    .engine
                    .process_request(ProcessCommand::new(request.id, director, action))
                    .await
                    .unwrap_err();
                assert!(matches!(err, WorkflowError::AlreadyTerminal(_, RequestStatus::Approved)));
                assert_eq!(harness.store.ledger_size().await, 3);
            });
        }
    }
}
