//! Discrete-event scheduler
//!
//! Owns simulated time and the queue of pending activities. Time only moves
//! when `execute_until` pops an activity or reaches its bound, and it never
//! moves backward.
//!
//! Activities at equal times run in submission order. With
//! [`TieBreak::Shuffled`] work is keyed by a draw from a seeded `ChaCha8Rng`.
//! One draw covers everything scheduled for a target time between two pops,
//! so work from different activities is permuted reproducibly while the
//! steps of a single activity keep their order.
//!
//! There is no cancellation. An activity that should no longer apply checks
//! its own guard when it runs.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, error};
use types::errors::SimError;
use types::time::TimeStamp;

/// Ordering of activities scheduled for the same time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    Fifo,
    Shuffled,
}

/// What `execute_until` does when an activity returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure, drop the activity and keep going
    #[default]
    Isolate,
    /// Stop and hand the error to the caller
    Abort,
}

/// Runs activities popped from a [`Scheduler`].
pub trait Execute<A> {
    fn execute(&mut self, activity: A, scheduler: &mut Scheduler<A>) -> Result<(), SimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    time: TimeStamp,
    tie: u64,
    sequence: u64,
}

/// Counters exposed for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub executed: u64,
    pub failed: u64,
    pub pending: usize,
}

pub struct Scheduler<A> {
    now: TimeStamp,
    immediate: VecDeque<A>,
    pending: BTreeMap<EventKey, A>,
    sequence: u64,
    tie_break: TieBreak,
    error_policy: ErrorPolicy,
    rng: ChaCha8Rng,
    /// Shuffle keys drawn since the last pop, by target time
    ties: BTreeMap<TimeStamp, u64>,
    executed: u64,
    failed: u64,
}

impl<A> fmt::Debug for Scheduler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("immediate", &self.immediate.len())
            .field("pending", &self.pending.len())
            .field("tie_break", &self.tie_break)
            .field("error_policy", &self.error_policy)
            .finish()
    }
}

impl<A> Scheduler<A> {
    pub fn new(tie_break: TieBreak, error_policy: ErrorPolicy, seed: u64) -> Self {
        Self {
            now: TimeStamp::ZERO,
            immediate: VecDeque::new(),
            pending: BTreeMap::new(),
            sequence: 0,
            tie_break,
            error_policy,
            rng: ChaCha8Rng::seed_from_u64(seed),
            ties: BTreeMap::new(),
            executed: 0,
            failed: 0,
        }
    }

    /// FIFO scheduler that isolates failing activities
    pub fn fifo() -> Self {
        Self::new(TieBreak::Fifo, ErrorPolicy::Isolate, 0)
    }

    pub fn current_time(&self) -> TimeStamp {
        self.now
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Schedule `activity` at `current_time() + delay`.
    ///
    /// The delay must be a non-negative tick count; `TimeStamp::IMMEDIATE`
    /// is rejected here and must go through [`Scheduler::schedule_immediate`].
    pub fn schedule_in(&mut self, delay: TimeStamp, activity: A) -> Result<(), SimError> {
        if !delay.is_valid_delay() {
            return Err(SimError::InvalidSchedule {
                reason: format!("delay must be non-negative, got {}", delay),
            });
        }
        let at = self.now + delay;
        self.schedule_activities(at, [activity]);
        Ok(())
    }

    /// Schedule a batch at an absolute time, keeping the batch's order.
    ///
    /// `TimeStamp::IMMEDIATE` queues the batch to run before the clock
    /// advances again.
    pub fn schedule_activities<I>(&mut self, time: TimeStamp, activities: I)
    where
        I: IntoIterator<Item = A>,
    {
        if time.is_immediate() {
            self.immediate.extend(activities);
            return;
        }
        let tie = self.tie_for(time);
        for activity in activities {
            let key = EventKey {
                time,
                tie,
                sequence: self.sequence,
            };
            self.sequence += 1;
            self.pending.insert(key, activity);
        }
    }

    fn tie_for(&mut self, time: TimeStamp) -> u64 {
        match self.tie_break {
            TieBreak::Fifo => 0,
            TieBreak::Shuffled => {
                let rng = &mut self.rng;
                *self.ties.entry(time).or_insert_with(|| rng.next_u64())
            }
        }
    }

    pub fn schedule_immediate(&mut self, activity: A) {
        self.immediate.push_back(activity);
    }

    /// Time of the next activity, if any
    pub fn next_time(&self) -> Option<TimeStamp> {
        if !self.immediate.is_empty() {
            return Some(self.now);
        }
        self.pending.keys().next().map(|key| key.time.max(self.now))
    }

    pub fn pending(&self) -> usize {
        self.immediate.len() + self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            executed: self.executed,
            failed: self.failed,
            pending: self.pending(),
        }
    }

    fn pop_until(&mut self, until: TimeStamp) -> Option<A> {
        if let Some(activity) = self.immediate.pop_front() {
            self.ties.clear();
            return Some(activity);
        }
        let (key, _) = self.pending.first_key_value()?;
        if key.time > until {
            return None;
        }
        let (key, activity) = self.pending.pop_first()?;
        self.ties.clear();
        self.now = self.now.max(key.time);
        Some(activity)
    }

    /// Run every activity whose time is at most `until`.
    ///
    /// Work scheduled by a running activity is visible to the very next pop,
    /// including work for the current time. When the queue is drained up to
    /// the bound the clock is advanced to `until`.
    pub fn execute_until<E>(&mut self, until: TimeStamp, executor: &mut E) -> Result<(), SimError>
    where
        E: Execute<A>,
    {
        debug!(from = %self.now, until = %until, pending = self.pending(), "executing");
        while let Some(activity) = self.pop_until(until) {
            match executor.execute(activity, self) {
                Ok(()) => self.executed += 1,
                Err(err) => {
                    self.failed += 1;
                    match self.error_policy {
                        ErrorPolicy::Isolate => {
                            error!(time = %self.now, error = %err, "activity failed, continuing");
                        }
                        ErrorPolicy::Abort => {
                            error!(time = %self.now, error = %err, "activity failed, aborting");
                            return Err(err);
                        }
                    }
                }
            }
        }
        self.now = self.now.max(until);
        Ok(())
    }
}
