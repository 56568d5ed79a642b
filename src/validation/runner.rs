use super::DaoValidator;
use crate::report::{IssueKind, ReportIssue, ReportSink};
use gtfs_store::IndexedReadOnlyDao;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Runs one validator; an error or a panic becomes an internal error issue
fn run_one(validator: &dyn DaoValidator, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
    let start = Instant::now();
    let failure = match catch_unwind(AssertUnwindSafe(|| validator.validate(dao, report))) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{:#}", e)),
        Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
    };
    match failure {
        None => log::debug!(
            "validator {} done in {:.2}s",
            validator.name(),
            start.elapsed().as_secs_f32()
        ),
        Some(failure) => {
            log::error!("validator {} failed: {}", validator.name(), failure);
            report.report(
                ReportIssue::new(
                    IssueKind::InternalError,
                    format!("validator {} failed", validator.name()),
                )
                .value(failure),
            );
        }
    }
}

/// Runs the validators on `num_threads` workers, each one taking its share of the validators
///
/// The validators are dealt round-robin, so that two runs with the same validators and number of
/// threads share them the same way.
pub fn run_dao_validators(
    validators: &[Box<dyn DaoValidator>],
    dao: &dyn IndexedReadOnlyDao,
    report: &dyn ReportSink,
    num_threads: usize,
) {
    let num_threads = num_threads.clamp(1, validators.len().max(1));
    if num_threads == 1 {
        for validator in validators {
            run_one(validator.as_ref(), dao, report);
        }
        return;
    }

    let mut buckets: Vec<Vec<&dyn DaoValidator>> = vec![Vec::new(); num_threads];
    for (i, validator) in validators.iter().enumerate() {
        buckets[i % num_threads].push(validator.as_ref());
    }
    std::thread::scope(|scope| {
        for bucket in buckets {
            scope.spawn(move || {
                for validator in bucket {
                    run_one(validator, dao, report);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::InMemoryReport;
    use gtfs_store::{AppendableDao, InMemoryDao};

    struct Failing;

    impl DaoValidator for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn validate(&self, _: &dyn IndexedReadOnlyDao, _: &dyn ReportSink) -> anyhow::Result<()> {
            anyhow::bail!("no luck")
        }
    }

    struct Panicking;

    impl DaoValidator for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn validate(&self, _: &dyn IndexedReadOnlyDao, _: &dyn ReportSink) -> anyhow::Result<()> {
            panic!("out of range")
        }
    }

    struct Counting(usize);

    impl DaoValidator for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn validate(&self, _: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) -> anyhow::Result<()> {
            for _ in 0..self.0 {
                report.report(ReportIssue::new(IssueKind::UnusedObject, "counted"));
            }
            Ok(())
        }
    }

    #[test]
    fn faults_are_isolated() {
        let mut dao = InMemoryDao::default();
        dao.close();
        for num_threads in [1, 3] {
            let report = InMemoryReport::new();
            let validators: Vec<Box<dyn DaoValidator>> = vec![
                Box::new(Counting(2)),
                Box::new(Panicking),
                Box::new(Failing),
                Box::new(Counting(3)),
            ];
            run_dao_validators(&validators, &dao, &report, num_threads);
            assert_eq!(5, report.count(IssueKind::UnusedObject));
            assert_eq!(2, report.count(IssueKind::InternalError));
            let mut failures: Vec<_> = report
                .issues()
                .into_iter()
                .filter(|i| i.kind == IssueKind::InternalError)
                .map(|i| i.value.unwrap_or_default())
                .collect();
            failures.sort();
            assert_eq!(vec!["no luck", "panicked: out of range"], failures);
        }
    }
}
