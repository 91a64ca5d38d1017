//! Per-step response contracts of the stateful transaction API

use super::{Expect, StepContract};
use crate::types::{DumpFormat, FinishType, Step, TransactionId, TransactionStatus, TransactionType};

/// Format reported by the server for uploaded files
pub const LOAD_FORMAT_DETECT_BY_EXT: &str = "detect_by_ext";

/// `POST /transaction/begin`: a fresh AVAILABLE transaction with any id
pub fn begin(transaction_type: TransactionType) -> StepContract {
    StepContract::ok(
        Step::Begin,
        open_transaction(transaction_type, Expect::AnyString),
    )
}

/// `GET /transaction/status/{id}`: same shape as begin, id unchanged
pub fn status(transaction_type: TransactionType, id: &TransactionId) -> StepContract {
    StepContract::ok(
        Step::Status,
        open_transaction(transaction_type, Expect::exact(id.as_str())),
    )
}

/// `POST /transaction/dump/{id}/{table}`: echo of the request plus download paths
pub fn dump(id: &TransactionId, table: &str, format: DumpFormat) -> StepContract {
    StepContract::ok(
        Step::Dump(format),
        Expect::object([
            ("transactionId", Expect::exact(id.as_str())),
            ("table", Expect::exact(table)),
            ("format", Expect::exact(format.as_str())),
            ("downloadPathList", Expect::NonEmptyArray),
        ]),
    )
}

/// `POST /transaction/load/{id}/{table}`: the upload lands at `{id}/{file_name}`
pub fn load(id: &TransactionId, table: &str, file_name: &str) -> StepContract {
    StepContract::ok(
        Step::Load,
        Expect::object([
            ("transactionId", Expect::exact(id.as_str())),
            (
                "dumpFiles",
                Expect::Array(vec![Expect::exact(format!("{}/{}", id, file_name))]),
            ),
            ("format", Expect::exact(LOAD_FORMAT_DETECT_BY_EXT)),
            ("table", Expect::exact(table)),
        ]),
    )
}

/// `POST /transaction/{commit|rollback}/{id}`: finished transaction, id unchanged
pub fn finish(
    transaction_type: TransactionType,
    id: &TransactionId,
    finish: FinishType,
) -> StepContract {
    StepContract::ok(
        Step::from(finish),
        Expect::object([
            ("type", Expect::exact(transaction_type.as_str())),
            ("transactionId", Expect::exact(id.as_str())),
            ("status", Expect::exact(finish.expected_status().as_str())),
            ("startTime", Expect::NullOrString),
            ("endTime", Expect::NullOrString),
        ]),
    )
}

fn open_transaction(transaction_type: TransactionType, id: Expect) -> Expect {
    Expect::object([
        ("type", Expect::exact(transaction_type.as_str())),
        ("transactionId", id),
        ("status", Expect::exact(TransactionStatus::Available.as_str())),
        ("startTime", Expect::NullOrString),
        ("endTime", Expect::Null),
    ])
}
