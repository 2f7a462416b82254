//! Shared test doubles for the vault workflow
//!
//! Each double counts its calls so tests can assert that rejected operations
//! never reach an external collaborator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use viq_vault::models::{AssetRecord, AttachedFile, CandidateFile, FileVerdict, Session, TokenMetadata};
use viq_vault::services::{
    AssetDirectory, DirectoryError, LedgerError, LedgerWriter, MintReceipt, PendingRef,
    SimulatedLedger, VerificationContext, VerificationError, VerificationReport,
    VerificationService,
};
use viq_vault::workflow::WorkflowEngine;

pub const WALLET: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

/// Verification Service answering from a per-file script
///
/// Files without a script entry are accepted with score 90. With a gate, every
/// call waits for a permit before answering.
#[derive(Default)]
pub struct ScriptedVerifier {
    script: Mutex<HashMap<String, Result<(FileVerdict, u8), String>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn respond(&self, file_name: &str, verdict: FileVerdict, score: u8) {
        self.script
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Ok((verdict, score)));
    }

    pub fn fail(&self, file_name: &str, message: &str) {
        self.script
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationService for ScriptedVerifier {
    async fn verify(
        &self,
        file: &AttachedFile,
        _context: &VerificationContext,
    ) -> Result<VerificationReport, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        match &self.gate {
            Some(gate) => {
                let permit = gate.acquire().await.expect("gate closed");
                permit.forget();
            }
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().get(&file.display_name).cloned();
        match scripted {
            Some(Ok((status, score))) => Ok(VerificationReport { status, score }),
            Some(Err(message)) => Err(VerificationError::Request(message)),
            None => Ok(VerificationReport {
                status: FileVerdict::Accepted,
                score: 90,
            }),
        }
    }
}

/// Simulated ledger with call counters and switchable failures
///
/// With a gate, confirmation waits for a permit.
#[derive(Default)]
pub struct RecordingLedger {
    inner: SimulatedLedger,
    confirm_gate: Option<Arc<Semaphore>>,
    pub submits: AtomicUsize,
    pub confirms: AtomicUsize,
    pub fail_submit: AtomicBool,
    pub fail_confirm: AtomicBool,
}

impl RecordingLedger {
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            confirm_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn confirms(&self) -> usize {
        self.confirms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerWriter for RecordingLedger {
    async fn submit(&self, record: &TokenMetadata) -> Result<PendingRef, LedgerError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(LedgerError::Rejected("insufficient gas".to_string()));
        }
        self.inner.submit(record).await
    }

    async fn confirm(&self, pending: &PendingRef) -> Result<MintReceipt, LedgerError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.confirm_gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        if self.fail_confirm.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("confirmation timed out".to_string()));
        }
        self.inner.confirm(pending).await
    }
}

/// In-memory Asset Directory
#[derive(Default)]
pub struct RecordingDirectory {
    pub records: Mutex<Vec<AssetRecord>>,
    pub fail: AtomicBool,
}

impl RecordingDirectory {
    pub fn records(&self) -> Vec<AssetRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetDirectory for RecordingDirectory {
    async fn create(&self, record: &AssetRecord) -> Result<(), DirectoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::Status(500));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError> {
        let mut records: Vec<AssetRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| owner.map_or(true, |o| r.owner == o))
            .cloned()
            .collect();
        records.reverse();
        Ok(records)
    }
}

/// Engine plus handles to its doubles
pub struct Harness {
    pub engine: Arc<WorkflowEngine>,
    pub verifier: Arc<ScriptedVerifier>,
    pub ledger: Arc<RecordingLedger>,
    pub directory: Arc<RecordingDirectory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_verifier(ScriptedVerifier::new())
    }

    pub fn with_verifier(verifier: ScriptedVerifier) -> Self {
        Self::with_doubles(verifier, RecordingLedger::default())
    }

    pub fn with_doubles(verifier: ScriptedVerifier, ledger: RecordingLedger) -> Self {
        let verifier = Arc::new(verifier);
        let ledger = Arc::new(ledger);
        let directory = Arc::new(RecordingDirectory::default());
        let engine = Arc::new(WorkflowEngine::new(
            verifier.clone(),
            ledger.clone(),
            directory.clone(),
        ));
        Self {
            engine,
            verifier,
            ledger,
            directory,
        }
    }
}

pub fn image(name: &str) -> CandidateFile {
    CandidateFile::new(name, "image/jpeg", vec![0u8; 64])
}

pub fn pdf(name: &str) -> CandidateFile {
    CandidateFile::new(name, "application/pdf", vec![0u8; 64])
}

/// Fill valid details and advance to EVIDENCE
pub async fn to_evidence(engine: &WorkflowEngine) -> Session {
    use viq_vault::models::DetailField;

    engine
        .update_details(DetailField::AssetType, "real-estate".to_string())
        .await
        .unwrap();
    engine
        .update_details(DetailField::Name, "Manhattan Apartment".to_string())
        .await
        .unwrap();
    engine
        .update_details(DetailField::Description, "Two bedrooms, Upper West Side".to_string())
        .await
        .unwrap();
    engine.next().await.unwrap()
}

/// Details, evidence and a successful verification: session at REVIEW
pub async fn to_review(engine: &WorkflowEngine, files: Vec<CandidateFile>) -> Session {
    to_evidence(engine).await;
    engine.add_files(files).await.unwrap();
    engine.verify().await.unwrap()
}

/// Poll until the session reports `busy`
pub async fn wait_until_busy(engine: &WorkflowEngine) {
    for _ in 0..200 {
        if engine.snapshot().await.busy {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never became busy");
}

/// Poll until no asynchronous transition is outstanding
pub async fn wait_until_idle(engine: &WorkflowEngine) {
    for _ in 0..200 {
        if !engine.is_busy().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never left busy");
}
