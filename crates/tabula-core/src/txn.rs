//! Module: txn
//! Responsibility: best-effort transaction grouping across several
//! resources.
//! Does not own: atomicity — each resource's transaction commits
//! independently, and a failure between commits leaves earlier commits
//! permanent.

use crate::error::Result;

///
/// Transactional
///
/// The transaction face of an engine (or anything engine-like) as seen by
/// the scope. Rollback is infallible by contract: implementations log
/// secondary failures instead of raising them.
///

pub trait Transactional {
    fn identity(&self) -> String;
    fn in_transaction(&self) -> bool;
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self);
}

///
/// TransactionScope
///
/// Begins a transaction on every participant not already inside one and
/// remembers which it personally started. `commit` commits exactly those,
/// in argument order. If the scope is dropped before `commit`, every
/// self-started transaction is rolled back.
///

pub struct TransactionScope<'a> {
    participants: Vec<&'a mut dyn Transactional>,
    started: Vec<bool>,
}

impl<'a> TransactionScope<'a> {
    /// Open the scope.
    ///
    /// If a begin fails partway, transactions already started by this scope
    /// are rolled back before the error is returned.
    pub fn begin(participants: Vec<&'a mut dyn Transactional>) -> Result<Self> {
        let started = vec![false; participants.len()];
        let mut scope = Self {
            participants,
            started,
        };

        for index in 0..scope.participants.len() {
            if scope.participants[index].in_transaction() {
                continue;
            }
            if let Err(err) = scope.participants[index].begin() {
                // Drop unwinds the ones already started.
                return Err(err);
            }
            scope.started[index] = true;
        }

        Ok(scope)
    }

    /// Commit every self-started transaction, in argument order.
    ///
    /// A commit failure surfaces immediately; participants not yet
    /// committed are rolled back as the scope unwinds. Participants already
    /// committed stay committed — the scope is best-effort, not atomic.
    pub fn commit(mut self) -> Result<()> {
        for index in 0..self.participants.len() {
            if !self.started[index] {
                continue;
            }
            self.participants[index].commit()?;
            self.started[index] = false;
        }
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        for index in 0..self.participants.len() {
            if self.started[index] {
                tracing::warn!(
                    resource = %self.participants[index].identity(),
                    "transaction scope dropped without commit; rolling back"
                );
                self.participants[index].rollback();
            }
        }
    }
}
