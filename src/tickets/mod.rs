mod source;
pub(crate) use self::source::{SourceError, SqliteSource, TicketSource};
use crate::window::DateRange;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use time::{Date, PrimitiveDateTime, Time};

/// A single ticket as stored in the ticket table
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct TicketRecord {
    pub(crate) open_date: PrimitiveDateTime,
    pub(crate) checked_in: bool,
    pub(crate) checked_out: Option<PrimitiveDateTime>,
}

/// Ticket counts for one calendar day
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) struct DaySummary {
    pub(crate) checked_in: u32,
    pub(crate) total: u32,
    /// Number of tickets closed on this day
    pub(crate) closed: u32,
    /// Number of the tickets in `total` that have been closed, whichever day
    /// they were closed on
    pub(crate) resolved: u32,
    pub(crate) complete: bool,
}

impl DaySummary {
    fn count(&mut self, record: &TicketRecord) {
        self.count_opened(record);
        if record.checked_out.is_some() {
            self.closed += 1;
        }
    }

    fn count_opened(&mut self, record: &TicketRecord) {
        self.total += 1;
        if record.checked_in {
            self.checked_in += 1;
        }
        if record.checked_out.is_some() {
            self.resolved += 1;
        }
    }
}

/// Per-day summaries; days without any tickets have no entry.
pub(crate) type DaySummaries = BTreeMap<Date, DaySummary>;

/// Decides whether a day's tickets are all taken care of.
pub(crate) trait Completion {
    fn is_complete(&self, summary: &DaySummary) -> bool;
}

impl<F: Fn(&DaySummary) -> bool> Completion for F {
    fn is_complete(&self, summary: &DaySummary) -> bool {
        self(summary)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum CompletionPolicy {
    /// Every ticket counted on the day has been checked in
    #[default]
    AllCheckedIn,
    /// At least one ticket counted on the day has been closed
    AnyClosed,
    /// Every ticket counted on the day has been closed
    AllClosed,
}

impl Completion for CompletionPolicy {
    fn is_complete(&self, summary: &DaySummary) -> bool {
        summary.total > 0
            && match self {
                CompletionPolicy::AllCheckedIn => summary.checked_in == summary.total,
                CompletionPolicy::AnyClosed => summary.resolved > 0,
                CompletionPolicy::AllClosed => summary.resolved == summary.total,
            }
    }
}

impl FromStr for CompletionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<CompletionPolicy, ParsePolicyError> {
        match s {
            "all-checked-in" => Ok(CompletionPolicy::AllCheckedIn),
            "any-closed" => Ok(CompletionPolicy::AnyClosed),
            "all-closed" => Ok(CompletionPolicy::AllClosed),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

/// Which day (or days) a ticket is counted on
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum Bucketing {
    /// Count each ticket on the day it was opened.
    #[default]
    OpenDate,
    /// Count closed tickets on the day they were closed and tickets that are
    /// checked in but still open on the current day.  Tickets that are
    /// neither are not counted.  A closed ticket adds to `checked_in` only if
    /// its check-in flag is set.
    CloseDate,
    /// Count each ticket on the day it was opened, and count its closing
    /// separately (in `closed` only) on the day it was closed.
    Both,
}

impl FromStr for Bucketing {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Bucketing, ParsePolicyError> {
        match s {
            "open" => Ok(Bucketing::OpenDate),
            "close" => Ok(Bucketing::CloseDate),
            "both" => Ok(Bucketing::Both),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown policy: {0:?}")]
pub(crate) struct ParsePolicyError(String);

/// Folds ticket records into per-day summaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Aggregator<C = CompletionPolicy> {
    bucketing: Bucketing,
    completion: C,
    /// The day on which still-open tickets are counted under
    /// `Bucketing::CloseDate`
    today: Date,
}

impl<C: Completion> Aggregator<C> {
    pub(crate) fn new(bucketing: Bucketing, completion: C, today: Date) -> Self {
        Aggregator {
            bucketing,
            completion,
            today,
        }
    }

    pub(crate) fn aggregate(&self, range: DateRange, records: &[TicketRecord]) -> DaySummaries {
        let mut summaries = DaySummaries::new();
        for record in records {
            match self.bucketing {
                Bucketing::OpenDate => {
                    if let Some(s) = bucket(&mut summaries, range, record.open_date.date()) {
                        s.count(record);
                    }
                }
                Bucketing::CloseDate => {
                    let day = match record.checked_out {
                        Some(closed) => closed.date(),
                        None if record.checked_in => self.today,
                        None => continue,
                    };
                    if let Some(s) = bucket(&mut summaries, range, day) {
                        s.count(record);
                    }
                }
                Bucketing::Both => {
                    if let Some(s) = bucket(&mut summaries, range, record.open_date.date()) {
                        s.count_opened(record);
                    }
                    if let Some(closed) = record.checked_out {
                        if let Some(s) = bucket(&mut summaries, range, closed.date()) {
                            s.closed += 1;
                        }
                    }
                }
            }
        }
        for summary in summaries.values_mut() {
            summary.complete = self.completion.is_complete(summary);
        }
        summaries
    }
}

fn bucket(summaries: &mut DaySummaries, range: DateRange, date: Date) -> Option<&mut DaySummary> {
    if !range.contains(date) {
        return None;
    }
    Some(summaries.entry(date).or_default())
}

/// Loads the tickets for a range of days from a source and summarizes them
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct TicketAggregator<S, C = CompletionPolicy> {
    source: S,
    aggregator: Aggregator<C>,
}

impl<S: TicketSource, C: Completion> TicketAggregator<S, C> {
    pub(crate) fn new(source: S, aggregator: Aggregator<C>) -> Self {
        TicketAggregator { source, aggregator }
    }

    pub(crate) fn summarize(&self, range: DateRange) -> Result<DaySummaries, SourceError> {
        let start = range.start().midnight();
        let end = PrimitiveDateTime::new(range.end(), END_OF_DAY);
        let records = self.source.find_records_in_range(start, end)?;
        log::debug!(
            "fetched {} ticket records between {} and {}",
            records.len(),
            range.start(),
            range.end()
        );
        Ok(self.aggregator.aggregate(range, &records))
    }

    /// Changes the day on which still-open tickets are counted under
    /// `Bucketing::CloseDate`
    pub(crate) fn set_today(&mut self, today: Date) {
        self.aggregator.today = today;
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }
}

const END_OF_DAY: Time = time::macros::time!(23:59:59);

#[cfg(test)]
mod tests {
    use super::source::MemorySource;
    use super::*;
    use time::macros::{date, datetime};

    fn september() -> DateRange {
        DateRange::new(date!(2025 - 09 - 01), date!(2025 - 09 - 30)).unwrap()
    }

    fn ticket(
        open_date: PrimitiveDateTime,
        checked_in: bool,
        checked_out: Option<PrimitiveDateTime>,
    ) -> TicketRecord {
        TicketRecord {
            open_date,
            checked_in,
            checked_out,
        }
    }

    fn aggregator(bucketing: Bucketing) -> Aggregator {
        Aggregator::new(
            bucketing,
            CompletionPolicy::AllCheckedIn,
            date!(2025 - 09 - 17),
        )
    }

    #[test]
    fn test_open_date_counts() {
        let records = [
            ticket(datetime!(2025-09-15 09:00), true, None),
            ticket(datetime!(2025-09-15 10:30), false, None),
        ];
        let summaries = aggregator(Bucketing::OpenDate).aggregate(september(), &records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[&date!(2025 - 09 - 15)],
            DaySummary {
                checked_in: 1,
                total: 2,
                closed: 0,
                resolved: 0,
                complete: false,
            }
        );
    }

    #[test]
    fn test_empty() {
        let summaries = aggregator(Bucketing::OpenDate).aggregate(september(), &[]);
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_sparse_and_bounded() {
        let records = [
            ticket(datetime!(2025-08-31 23:59:59), true, None),
            ticket(datetime!(2025-09-01 00:00), true, None),
            ticket(datetime!(2025-09-30 23:59:59), true, None),
            ticket(datetime!(2025-10-01 00:00), true, None),
        ];
        let summaries = aggregator(Bucketing::OpenDate).aggregate(september(), &records);
        assert_eq!(
            summaries.keys().copied().collect::<Vec<_>>(),
            [date!(2025 - 09 - 01), date!(2025 - 09 - 30)]
        );
        assert!(summaries.values().all(|s| s.complete));
        assert!(!summaries.contains_key(&date!(2025 - 09 - 02)));
    }

    #[test]
    fn test_idempotent() {
        let records = [
            ticket(datetime!(2025-09-03 08:00), true, Some(datetime!(2025-09-04 12:00))),
            ticket(datetime!(2025-09-03 09:00), false, None),
            ticket(datetime!(2025-09-10 09:00), true, None),
        ];
        for bucketing in [Bucketing::OpenDate, Bucketing::CloseDate, Bucketing::Both] {
            let agg = aggregator(bucketing);
            assert_eq!(
                agg.aggregate(september(), &records),
                agg.aggregate(september(), &records)
            );
        }
    }

    #[test]
    fn test_close_date() {
        let records = [
            ticket(datetime!(2025-09-01 08:00), true, Some(datetime!(2025-09-04 12:00))),
            ticket(datetime!(2025-08-20 08:00), false, Some(datetime!(2025-09-04 13:00))),
            ticket(datetime!(2025-09-02 08:00), true, None),
            ticket(datetime!(2025-09-02 09:00), false, None),
        ];
        let summaries = aggregator(Bucketing::CloseDate).aggregate(september(), &records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(
            summaries[&date!(2025 - 09 - 04)],
            DaySummary {
                checked_in: 1,
                total: 2,
                closed: 2,
                resolved: 2,
                complete: false,
            }
        );
        // Still open but checked in: counted on the current day
        assert_eq!(
            summaries[&date!(2025 - 09 - 17)],
            DaySummary {
                checked_in: 1,
                total: 1,
                closed: 0,
                resolved: 0,
                complete: true,
            }
        );
    }

    #[test]
    fn test_both() {
        let records = [
            ticket(datetime!(2025-09-01 08:00), true, Some(datetime!(2025-09-04 12:00))),
            ticket(datetime!(2025-09-04 08:00), true, Some(datetime!(2025-09-04 18:00))),
            ticket(datetime!(2025-08-28 08:00), true, Some(datetime!(2025-09-02 12:00))),
        ];
        let summaries = aggregator(Bucketing::Both).aggregate(september(), &records);
        assert_eq!(
            summaries[&date!(2025 - 09 - 01)],
            DaySummary {
                checked_in: 1,
                total: 1,
                closed: 0,
                resolved: 1,
                complete: true,
            }
        );
        assert_eq!(
            summaries[&date!(2025 - 09 - 02)],
            DaySummary {
                checked_in: 0,
                total: 0,
                closed: 1,
                resolved: 0,
                complete: false,
            }
        );
        assert_eq!(
            summaries[&date!(2025 - 09 - 04)],
            DaySummary {
                checked_in: 1,
                total: 1,
                closed: 2,
                resolved: 1,
                complete: true,
            }
        );
    }

    #[test]
    fn test_both_all_closed_ignores_other_days_closings() {
        let records = [
            ticket(datetime!(2025-09-04 08:00), false, None),
            ticket(datetime!(2025-09-01 08:00), true, Some(datetime!(2025-09-04 12:00))),
        ];
        let agg = Aggregator::new(
            Bucketing::Both,
            CompletionPolicy::AllClosed,
            date!(2025 - 09 - 17),
        );
        let summaries = agg.aggregate(september(), &records);
        assert_eq!(
            summaries[&date!(2025 - 09 - 04)],
            DaySummary {
                checked_in: 0,
                total: 1,
                closed: 1,
                resolved: 0,
                complete: false,
            }
        );
        assert!(summaries[&date!(2025 - 09 - 01)].complete);
    }

    #[test]
    fn test_checked_in_never_exceeds_total() {
        let records = [
            ticket(datetime!(2025-09-05 08:00), true, Some(datetime!(2025-09-06 12:00))),
            ticket(datetime!(2025-09-05 09:00), false, Some(datetime!(2025-09-05 12:00))),
            ticket(datetime!(2025-09-06 09:00), true, None),
            ticket(datetime!(2025-09-06 10:00), false, None),
        ];
        for bucketing in [Bucketing::OpenDate, Bucketing::CloseDate, Bucketing::Both] {
            let summaries = aggregator(bucketing).aggregate(september(), &records);
            assert!(summaries.values().all(|s| s.checked_in <= s.total));
        }
    }

    #[test]
    fn test_completion_policies() {
        let summary = DaySummary {
            checked_in: 2,
            total: 3,
            closed: 1,
            resolved: 1,
            complete: false,
        };
        assert!(!CompletionPolicy::AllCheckedIn.is_complete(&summary));
        assert!(CompletionPolicy::AnyClosed.is_complete(&summary));
        assert!(!CompletionPolicy::AllClosed.is_complete(&summary));
        let empty = DaySummary::default();
        assert!(!CompletionPolicy::AllCheckedIn.is_complete(&empty));
        assert!(!CompletionPolicy::AllClosed.is_complete(&empty));
    }

    #[test]
    fn test_custom_completion() {
        let records = [
            ticket(datetime!(2025-09-15 09:00), true, None),
            ticket(datetime!(2025-09-15 10:00), false, None),
        ];
        let agg = Aggregator::new(
            Bucketing::OpenDate,
            |s: &DaySummary| s.checked_in * 2 >= s.total,
            date!(2025 - 09 - 17),
        );
        let summaries = agg.aggregate(september(), &records);
        assert!(summaries[&date!(2025 - 09 - 15)].complete);
    }

    #[test]
    fn test_parse_policies() {
        assert_eq!("close".parse::<Bucketing>(), Ok(Bucketing::CloseDate));
        assert_eq!(
            "any-closed".parse::<CompletionPolicy>(),
            Ok(CompletionPolicy::AnyClosed)
        );
        assert!("sometimes".parse::<CompletionPolicy>().is_err());
    }

    #[test]
    fn test_summarize_from_source() {
        let source = MemorySource::new([
            ticket(datetime!(2025-09-15 09:00), true, None),
            ticket(datetime!(2025-09-15 10:30), false, None),
            ticket(datetime!(2025-09-22 10:30), false, None),
        ]);
        let tickets = TicketAggregator::new(source, aggregator(Bucketing::OpenDate));
        let week = DateRange::new(date!(2025 - 09 - 14), date!(2025 - 09 - 20)).unwrap();
        let summaries = tickets.summarize(week).unwrap();
        assert_eq!(
            summaries.into_iter().collect::<Vec<_>>(),
            [(
                date!(2025 - 09 - 15),
                DaySummary {
                    checked_in: 1,
                    total: 2,
                    closed: 0,
                    resolved: 0,
                    complete: false,
                }
            )]
        );
    }

    #[test]
    fn test_set_today_moves_open_tickets() {
        let source = MemorySource::new([ticket(datetime!(2025-09-15 09:00), true, None)]);
        let mut tickets = TicketAggregator::new(source, aggregator(Bucketing::CloseDate));
        let summaries = tickets.summarize(september()).unwrap();
        assert_eq!(
            summaries.keys().copied().collect::<Vec<_>>(),
            [date!(2025 - 09 - 17)]
        );
        tickets.set_today(date!(2025 - 09 - 18));
        let summaries = tickets.summarize(september()).unwrap();
        assert_eq!(
            summaries.keys().copied().collect::<Vec<_>>(),
            [date!(2025 - 09 - 18)]
        );
    }
}
