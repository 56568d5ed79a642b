//! A complete validation run: load with the streaming validators, close, then the DAO validators
use crate::configuration::ValidatorConfig;
use crate::loader::load_feed;
use crate::report::{InMemoryReport, IssueKind, ReportIssue, ReportSink};
use crate::validation::{dao_validators, run_dao_validators, DaoValidator, StreamingValidators};
use gtfs_model::FeedSource;
use gtfs_store::{AppendableDao, DaoOptions, InMemoryDao};
use log::info;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Closing,
    BatchValidating,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Phase::Loading => "loading",
            Phase::Closing => "closing",
            Phase::BatchValidating => "batch validating",
            Phase::Done => "done",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration: Duration,
}

/// What a run leaves behind
pub struct ValidationOutcome {
    pub report: InMemoryReport,
    /// The closed DAO, `None` when the feed could not be opened
    pub dao: Option<InMemoryDao>,
    pub timings: Vec<PhaseTiming>,
    pub sha256: Option<String>,
}

impl ValidationOutcome {
    /// The last phase reached
    pub fn phase(&self) -> Phase {
        self.timings.last().map_or(Phase::Loading, |t| t.phase)
    }
}

/// Settings of a run
pub struct FeedValidation {
    config: ValidatorConfig,
    dao_options: DaoOptions,
    num_threads: usize,
    max_issues_per_category: Option<usize>,
    streaming: StreamingValidators,
    dao_validators: Vec<Box<dyn DaoValidator>>,
}

impl FeedValidation {
    /// Every validator, configured from `config`
    pub fn new(config: ValidatorConfig) -> Self {
        let streaming = StreamingValidators::new(&config);
        let dao_validators = dao_validators(&config);
        Self {
            dao_options: config.dao_options(false),
            config,
            num_threads: 1,
            max_issues_per_category: None,
            streaming,
            dao_validators,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    pub fn with_dao_options(mut self, dao_options: DaoOptions) -> Self {
        self.dao_options = dao_options;
        self
    }

    pub fn with_max_issues_per_category(mut self, max: Option<usize>) -> Self {
        self.max_issues_per_category = max;
        self
    }

    pub fn with_dao_validator(mut self, validator: Box<dyn DaoValidator>) -> Self {
        self.dao_validators.push(validator);
        self
    }

    /// Replaces the validators run while loading
    pub fn with_streaming_validators(mut self, streaming: StreamingValidators) -> Self {
        self.streaming = streaming;
        self
    }

    /// Replaces the DAO validators
    pub fn with_dao_validators(mut self, validators: Vec<Box<dyn DaoValidator>>) -> Self {
        self.dao_validators = validators;
        self
    }

    /// Validates the feed at `path`, a directory or a zip archive
    ///
    /// Only an unreadable feed stops the run early; its report then holds a single critical issue.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> ValidationOutcome {
        let path = path.as_ref();
        let report = match self.max_issues_per_category {
            Some(max) => InMemoryReport::with_limit(max),
            None => InMemoryReport::new(),
        };
        let mut timings = Vec::new();

        let start = Instant::now();
        info!("validating {}", path.display());
        let mut source = match FeedSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                report.report(
                    ReportIssue::new(IssueKind::UnreadableFeed, e.to_string())
                        .value(path.display().to_string()),
                );
                return ValidationOutcome {
                    report,
                    dao: None,
                    timings,
                    sha256: None,
                };
            }
        };
        let sha256 = source.sha256().map(str::to_owned);

        let mut dao = InMemoryDao::new(self.dao_options);
        let summary = load_feed(&mut source, &mut dao, &self.streaming, &report);
        let rows: usize = summary.tables.iter().map(|(_, count)| count).sum();
        timings.push(PhaseTiming {
            phase: Phase::Loading,
            duration: start.elapsed(),
        });
        info!(
            "{} rows of {} tables loaded in {:.2}s",
            rows,
            summary.tables.len(),
            start.elapsed().as_secs_f32()
        );

        let start = Instant::now();
        dao.close();
        timings.push(PhaseTiming {
            phase: Phase::Closing,
            duration: start.elapsed(),
        });

        let start = Instant::now();
        info!(
            "running {} validators on {} threads",
            self.dao_validators.len(),
            self.num_threads
        );
        run_dao_validators(&self.dao_validators, &dao, &report, self.num_threads);
        timings.push(PhaseTiming {
            phase: Phase::BatchValidating,
            duration: start.elapsed(),
        });
        timings.push(PhaseTiming {
            phase: Phase::Done,
            duration: Duration::ZERO,
        });
        for timing in &timings {
            log::debug!("{}: {:.2}s", timing.phase, timing.duration.as_secs_f32());
        }

        ValidationOutcome {
            report,
            dao: Some(dao),
            timings,
            sha256,
        }
    }
}
