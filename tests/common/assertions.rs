//! Custom assertions for lifecycle runs

use belayer_e2e::{Error, RunReport, Step, TransactionStatus};

use super::fixtures::{TX_ID, local_name};

/// Assert that `err` is a verification failure of `step`
pub fn assert_verification_failure(err: &Error, step: Step) {
    match err {
        Error::Verification { step: failed, .. } => {
            assert_eq!(*failed, step, "verification failed at the wrong step: {}", err)
        }
        other => panic!("expected verification failure at {}, got: {}", step, other),
    }
}

/// Assert that `err` is a malformed-response failure of `step`
pub fn assert_malformed(err: &Error, step: Step) {
    match err {
        Error::MalformedResponse { step: failed, .. } => {
            assert_eq!(*failed, step, "malformed response at the wrong step: {}", err)
        }
        other => panic!("expected malformed response at {}, got: {}", step, other),
    }
}

/// Assert that a report describes a finished run of the fixture transaction
pub fn assert_finished(report: &RunReport, status: TransactionStatus) {
    assert_eq!(report.transaction_id.as_str(), TX_ID);
    assert_eq!(report.final_transaction.transaction_id.as_str(), TX_ID);
    assert_eq!(report.final_transaction.status, status);
    assert!(
        report.final_transaction.end_time.is_some(),
        "finished transaction should carry an end time"
    );
    assert_eq!(
        report.session.transaction_id().map(|id| id.as_str()),
        Some(TX_ID)
    );
}

/// Assert every download path of the report was written where expected
pub fn assert_downloads_on_disk(report: &RunReport, download_dir: &std::path::Path) {
    assert_eq!(
        report.record.downloads.len(),
        report.session.download_paths().len(),
        "every accumulated path should be downloaded exactly once"
    );
    for artifact in &report.record.downloads {
        let expected = local_name(download_dir, &artifact.server_path);
        assert_eq!(artifact.local_path, expected);
        assert!(
            expected.exists(),
            "downloaded file missing: {}",
            expected.display()
        );
        let on_disk = std::fs::metadata(&expected).expect("stat downloaded file").len();
        assert_eq!(on_disk, artifact.bytes);
    }
}
