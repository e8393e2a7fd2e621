//! Pre-built Test Fixtures
//!
//! The standard registry mirrors `config/workflow.toml`: seven steps from
//! JPO scrutiny to Director verification, where only the last two may
//! reject and only the Director may approve.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClaimRef, DocumentId, ReviewerId};
use domain_workflow::{
    BillItem, ClaimDocument, DocumentType, ReviewerRef, RoleName, WorkflowStep,
    WorkflowStepRegistry,
};

/// Role allowed to allocate requests in the standard configuration
pub const ALLOCATOR_ROLE: &str = "CUSTOMER_ADMIN";

/// Roles of the standard steps, in order
pub const STANDARD_ROLES: [&str; 7] = ["JPO", "PO", "AS", "GMM", "CGM", "JS", "DIRECTOR"];

static STANDARD_REGISTRY: Lazy<Arc<WorkflowStepRegistry>> =
    Lazy::new(|| Arc::new(StepFixtures::build_standard()));

/// Fixtures for workflow step registries
pub struct StepFixtures;

impl StepFixtures {
    /// The shared seven-step registry
    pub fn standard_registry() -> Arc<WorkflowStepRegistry> {
        STANDARD_REGISTRY.clone()
    }

    fn build_standard() -> WorkflowStepRegistry {
        let names = [
            "JPO Review",
            "APO Review",
            "DPO Review",
            "FA & CAO Review",
            "DE Technical Review",
            "SE Final Review",
            "Director Verification",
        ];

        let steps = names
            .iter()
            .zip(STANDARD_ROLES.iter())
            .enumerate()
            .map(|(i, (name, role))| {
                let step = WorkflowStep::new(i as u32 + 1, *name, *role);
                match *role {
                    "JS" => step.with_reject(),
                    "DIRECTOR" => step.with_reject().with_final_approval(),
                    _ => step,
                }
            })
            .collect();

        WorkflowStepRegistry::new(steps).expect("standard registry is valid")
    }

    /// A registry with gaps in its step orders
    pub fn sparse_registry() -> WorkflowStepRegistry {
        WorkflowStepRegistry::new(vec![
            WorkflowStep::new(10, "Scrutiny", "JPO"),
            WorkflowStep::new(20, "Review", "PO").with_reject(),
            WorkflowStep::new(40, "Sanction", "DIRECTOR")
                .with_reject()
                .with_final_approval(),
        ])
        .expect("sparse registry is valid")
    }
}

/// Fixtures for reviewers
pub struct ReviewerFixtures;

impl ReviewerFixtures {
    /// A fresh reviewer acting under `role`
    pub fn with_role(role: &str) -> ReviewerRef {
        ReviewerRef::new(ReviewerId::new(), RoleName::new(role))
    }

    pub fn jpo() -> ReviewerRef {
        Self::with_role("JPO")
    }

    pub fn js() -> ReviewerRef {
        Self::with_role("JS")
    }

    pub fn director() -> ReviewerRef {
        Self::with_role("DIRECTOR")
    }

    pub fn admin() -> ReviewerRef {
        Self::with_role(ALLOCATOR_ROLE)
    }

    /// One reviewer per standard step, in step order
    pub fn standard_chain() -> Vec<ReviewerRef> {
        STANDARD_ROLES.iter().map(|role| Self::with_role(role)).collect()
    }
}

/// Fixtures for bills
pub struct BillFixtures;

impl BillFixtures {
    /// Claimed total of [`BillFixtures::standard_items`]
    pub const STANDARD_TOTAL: Decimal = dec!(10000);

    /// Four items totalling 10,000, one entered as a total only
    pub fn standard_items(claim_ref: ClaimRef) -> Vec<BillItem> {
        vec![
            BillItem::new(claim_ref, "Consultation", dec!(500), 2, None),
            BillItem::new(claim_ref, "MRI scan", dec!(6000), 1, None),
            BillItem::new(claim_ref, "Ward charges", dec!(700), 2, None),
            BillItem::new(claim_ref, "Pharmacy", Decimal::ZERO, 4, Some(dec!(1600))),
        ]
    }

    pub fn standard_documents(claim_ref: ClaimRef) -> Vec<ClaimDocument> {
        [DocumentType::FinalBill, DocumentType::Discharge, DocumentType::IdCard]
            .into_iter()
            .map(|document_type| ClaimDocument {
                id: DocumentId::new(),
                claim_ref,
                document_type,
                file_name: format!("{}.pdf", document_type.as_str().to_lowercase()),
                uploaded_at: Utc::now(),
            })
            .collect()
    }
}
