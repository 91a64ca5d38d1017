//! Lifecycle state markers
//!
//! Every state after begin carries the transaction id, so steps that need it
//! can only be called once it exists.

use crate::types::TransactionId;

/// No transaction yet
#[derive(Debug, Clone, Copy, Default)]
pub struct Init;

/// Begin succeeded
#[derive(Debug, Clone)]
pub struct Begun(pub(crate) TransactionId);

/// Status confirmed AVAILABLE
#[derive(Debug, Clone)]
pub struct StatusChecked(pub(crate) TransactionId);

/// At least one dump succeeded
#[derive(Debug, Clone)]
pub struct Dumped(pub(crate) TransactionId);

/// Every dumped file has been retrieved
#[derive(Debug, Clone)]
pub struct Downloaded(pub(crate) TransactionId);

/// At least one load succeeded
#[derive(Debug, Clone)]
pub struct Loaded(pub(crate) TransactionId);

/// Transaction committed (terminal)
#[derive(Debug, Clone)]
pub struct Committed(pub(crate) TransactionId);

/// Transaction rolled back (terminal)
#[derive(Debug, Clone)]
pub struct RolledBack(pub(crate) TransactionId);

mod sealed {
    pub trait Sealed {}
}

/// States in which a transaction exists
pub trait Started: sealed::Sealed {
    /// The transaction id assigned by begin
    fn transaction_id(&self) -> &TransactionId;
}

/// States from which no further step can be taken
pub trait Finished: Started {}

macro_rules! started_state {
    ($($state:ident),+ $(,)?) => {
        $(
            impl sealed::Sealed for $state {}

            impl Started for $state {
                fn transaction_id(&self) -> &TransactionId {
                    &self.0
                }
            }
        )+
    };
}

started_state!(
    Begun,
    StatusChecked,
    Dumped,
    Downloaded,
    Loaded,
    Committed,
    RolledBack
);

impl Finished for Committed {}
impl Finished for RolledBack {}
