//! Multipart upload planning and session state
//!
//! [`PartPlan`] splits an object into parts; [`MultipartUploadSession`]
//! tracks one upload from initiation to completion or abort.

use std::fmt;

use crate::storage::CompletedPart;

/// Highest part number S3 accepts
pub const MAX_PART_COUNT: u64 = 10_000;

/// Partitioning of one object into fixed-size parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    object_size: u64,
    part_size: u64,
}

impl PartPlan {
    /// `part_size` must be non-zero; validation rejects zero before a plan is built.
    pub fn new(object_size: u64, part_size: u64) -> Self {
        Self {
            object_size,
            part_size: part_size.max(1),
        }
    }

    pub fn object_size(&self) -> u64 {
        self.object_size
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// `ceil(object_size / part_size)`, 0 for an empty object
    pub fn part_count(&self) -> u64 {
        self.object_size.div_ceil(self.part_size)
    }

    /// Size of 1-indexed part `part_number`, 0 outside the plan
    pub fn part_len(&self, part_number: u64) -> u64 {
        let count = self.part_count();
        if part_number == 0 || part_number > count {
            return 0;
        }
        if part_number < count {
            self.part_size
        } else {
            self.object_size - self.part_size * (count - 1)
        }
    }

    /// Largest single part in the plan
    pub fn max_part_len(&self) -> u64 {
        self.part_size.min(self.object_size)
    }

    /// `(part_number, length)` for every part in ascending order
    pub fn parts(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        (1..=self.part_count()).map(move |n| (n as i32, self.part_len(n)))
    }
}

/// How one PUT reaches the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPath {
    Single,
    Multipart(PartPlan),
}

impl UploadPath {
    /// Single PUT when multipart is off, the object is empty, or it fits in one part
    pub fn choose(object_size: u64, part_size: u64, multipart: bool) -> Self {
        if !multipart || object_size == 0 || object_size <= part_size {
            UploadPath::Single
        } else {
            UploadPath::Multipart(PartPlan::new(object_size, part_size))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Initiated,
    PartsInFlight,
    Completed,
    Aborted,
}

/// Rejected session transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError(String);

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SessionError {}

/// State of one multipart PUT. Owned by the call that created it and
/// consumed by completion or abort.
#[derive(Debug)]
pub struct MultipartUploadSession {
    plan: PartPlan,
    state: SessionState,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
}

impl MultipartUploadSession {
    pub fn new(plan: PartPlan) -> Self {
        Self {
            plan,
            state: SessionState::NotStarted,
            upload_id: None,
            parts: Vec::with_capacity(plan.part_count() as usize),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn plan(&self) -> &PartPlan {
        &self.plan
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn parts_expected(&self) -> u64 {
        self.plan.part_count()
    }

    pub fn parts_completed(&self) -> usize {
        self.parts.len()
    }

    /// Record the upload id returned by initiation
    pub fn initiated(&mut self, upload_id: String) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError(format!("cannot initiate from {:?}", self.state)));
        }
        self.upload_id = Some(upload_id);
        self.state = SessionState::Initiated;
        Ok(())
    }

    /// Append an acknowledged part. Part numbers must arrive as 1, 2, 3, ...
    pub fn record_part(&mut self, part_number: i32, e_tag: String) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Initiated | SessionState::PartsInFlight) {
            return Err(SessionError(format!("cannot record a part in {:?}", self.state)));
        }
        let expected = self.parts.len() as i32 + 1;
        if part_number != expected || part_number as u64 > self.plan.part_count() {
            return Err(SessionError(format!(
                "part {} out of sequence, expected {}",
                part_number, expected
            )));
        }
        self.parts.push(CompletedPart { part_number, e_tag });
        self.state = SessionState::PartsInFlight;
        Ok(())
    }

    /// Sorted completion list, available only once every part is recorded
    pub fn completion_parts(&self) -> Result<&[CompletedPart], SessionError> {
        if self.state != SessionState::PartsInFlight
            || self.parts.len() as u64 != self.plan.part_count()
        {
            return Err(SessionError(format!(
                "{} of {} parts recorded",
                self.parts.len(),
                self.plan.part_count()
            )));
        }
        Ok(&self.parts)
    }

    pub fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }

    pub fn mark_aborted(&mut self) {
        self.state = SessionState::Aborted;
    }
}
