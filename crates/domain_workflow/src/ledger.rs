//! Append-only approval ledger
//!
//! Every action taken on a request leaves exactly one entry. Entries are
//! never edited or removed; the ledger is the source of truth for history
//! and for the amount each reviewer starts from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{LogEntryId, ReviewerId, SanctionRequestId};

use crate::request::SanctionRequest;

/// Action recorded against a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Forward,
    Approve,
    Reject,
    RejectRecommended,
    Clarify,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Forward => "FORWARD",
            ApprovalAction::Approve => "APPROVE",
            ApprovalAction::Reject => "REJECT",
            ApprovalAction::RejectRecommended => "REJECT_RECOMMENDED",
            ApprovalAction::Clarify => "CLARIFY",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FORWARD" => Ok(ApprovalAction::Forward),
            "APPROVE" => Ok(ApprovalAction::Approve),
            "REJECT" => Ok(ApprovalAction::Reject),
            "REJECT_RECOMMENDED" => Ok(ApprovalAction::RejectRecommended),
            "CLARIFY" => Ok(ApprovalAction::Clarify),
            other => Err(format!("unknown approval action '{}'", other)),
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalLogEntry {
    pub id: LogEntryId,
    pub request_id: SanctionRequestId,
    /// Position within the request's ledger, starting at 1
    pub sequence: u64,
    /// Step active when the action was taken
    pub step_order: u32,
    pub actor: ReviewerId,
    pub action: ApprovalAction,
    pub comments: String,
    /// The reviewer's stated amount for this stage
    pub approved_amount_at_stage: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl ApprovalLogEntry {
    /// Records an action against the request's current step
    ///
    /// `request` must already carry the version this entry commits with.
    pub fn record(
        request: &SanctionRequest,
        step_order: u32,
        actor: ReviewerId,
        action: ApprovalAction,
        comments: impl Into<String>,
        approved_amount_at_stage: Option<Decimal>,
    ) -> Self {
        Self {
            id: LogEntryId::new_v7(),
            request_id: request.id,
            sequence: request.version,
            step_order,
            actor,
            action,
            comments: comments.into(),
            approved_amount_at_stage,
            timestamp: Utc::now(),
        }
    }
}

/// Read view over one request's entries, ordered oldest first
#[derive(Debug, Clone, Default)]
pub struct ApprovalLedger {
    entries: Vec<ApprovalLogEntry>,
}

impl ApprovalLedger {
    /// Builds the view, ordering by timestamp then sequence
    pub fn from_entries(mut entries: Vec<ApprovalLogEntry>) -> Self {
        entries.sort_by(|a, b| (a.timestamp, a.sequence).cmp(&(b.timestamp, b.sequence)));
        Self { entries }
    }

    pub fn entries(&self) -> &[ApprovalLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ApprovalLogEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry carrying a stated amount
    pub fn latest_stated(&self) -> Option<&ApprovalLogEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.approved_amount_at_stage.is_some())
    }

    /// Entries taken at a given step
    pub fn at_step(&self, step_order: u32) -> impl Iterator<Item = &ApprovalLogEntry> {
        self.entries.iter().filter(move |e| e.step_order == step_order)
    }
}
