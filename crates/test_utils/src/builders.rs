//! Test Data Builders
//!
//! Builders for bills and for fully wired engines over the in-memory ports,
//! so tests state only what matters to them.

use std::sync::Arc;

use chrono::Utc;
use fake::faker::lorem::en::Words;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{ClaimRef, DocumentId};
use domain_workflow::{
    BillItem, ClaimDocument, DocumentType, InMemorySanctionStore, MockClaimPort, RoleName,
    SanctionEngine, WorkflowStepRegistry,
};
use infra_db::repositories::BillRepository;
use infra_db::adapters::claims::{document_to_row, item_to_row};
use infra_db::DatabaseError;

use crate::fixtures::{StepFixtures, ALLOCATOR_ROLE};

/// Builder for a claim's bill
pub struct TestBillBuilder {
    claim_ref: ClaimRef,
    items: Vec<BillItem>,
    documents: Vec<ClaimDocument>,
}

impl Default for TestBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBillBuilder {
    pub fn new() -> Self {
        Self {
            claim_ref: ClaimRef::new(),
            items: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub fn claim_ref(&self) -> ClaimRef {
        self.claim_ref
    }

    /// Adds an item priced as `rate × quantity`
    pub fn with_item(mut self, description: &str, rate: Decimal, quantity: u32) -> Self {
        self.items
            .push(BillItem::new(self.claim_ref, description, rate, quantity, None));
        self
    }

    /// Adds an item entered as a total only, with a zero rate
    pub fn with_total_only(mut self, description: &str, quantity: u32, amount: Decimal) -> Self {
        self.items.push(BillItem::new(
            self.claim_ref,
            description,
            Decimal::ZERO,
            quantity,
            Some(amount),
        ));
        self
    }

    /// Adds `count` items with random descriptions and whole-unit prices
    pub fn with_random_items(mut self, count: usize) -> Self {
        for _ in 0..count {
            let words: Vec<String> = Words(1..4).fake();
            let rate = Decimal::from((10u32..5_000).fake::<u32>());
            let quantity = (1u32..6).fake::<u32>();
            self.items
                .push(BillItem::new(self.claim_ref, words.join(" "), rate, quantity, None));
        }
        self
    }

    pub fn with_document(mut self, document_type: DocumentType) -> Self {
        self.documents.push(ClaimDocument {
            id: DocumentId::new(),
            claim_ref: self.claim_ref,
            document_type,
            file_name: format!("{}.pdf", document_type.as_str().to_lowercase()),
            uploaded_at: Utc::now(),
        });
        self
    }

    /// Sum of the claimed amounts added so far
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|i| i.claimed_amount).sum()
    }

    pub fn build(self) -> (ClaimRef, Vec<BillItem>, Vec<ClaimDocument>) {
        (self.claim_ref, self.items, self.documents)
    }

    /// Registers the bill with the in-memory claim port
    pub async fn seed(self, claims: &MockClaimPort) -> ClaimRef {
        let (claim_ref, items, documents) = self.build();
        claims.insert_claim(claim_ref, items, documents).await;
        claim_ref
    }

    /// Writes the bill into the PostgreSQL bill tables as `SUBMITTED`
    pub async fn seed_postgres(self, bills: &BillRepository) -> Result<ClaimRef, DatabaseError> {
        let (claim_ref, items, documents) = self.build();
        bills.create_bill(*claim_ref.as_uuid(), "SUBMITTED").await?;
        for item in &items {
            bills.insert_item(&item_to_row(item)?).await?;
        }
        for document in &documents {
            bills.insert_document(&document_to_row(document)).await?;
        }
        Ok(claim_ref)
    }
}

/// An engine wired to in-memory ports, with handles on both
pub struct TestEngine {
    pub engine: SanctionEngine,
    pub store: InMemorySanctionStore,
    pub claims: MockClaimPort,
    pub registry: Arc<WorkflowStepRegistry>,
}

/// Builder for [`TestEngine`]
pub struct TestEngineBuilder {
    registry: Arc<WorkflowStepRegistry>,
    allocator_role: String,
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngineBuilder {
    /// Standard seven-step registry and allocator role
    pub fn new() -> Self {
        Self {
            registry: StepFixtures::standard_registry(),
            allocator_role: ALLOCATOR_ROLE.to_string(),
        }
    }

    pub fn with_registry(mut self, registry: WorkflowStepRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_allocator_role(mut self, role: impl Into<String>) -> Self {
        self.allocator_role = role.into();
        self
    }

    pub fn build(self) -> TestEngine {
        let store = InMemorySanctionStore::new();
        let claims = MockClaimPort::new();
        let engine = SanctionEngine::new(
            self.registry.clone(),
            Arc::new(store.clone()),
            Arc::new(claims.clone()),
            RoleName::new(self.allocator_role),
        );

        TestEngine {
            engine,
            store,
            claims,
            registry: self.registry,
        }
    }
}
