use crate::{
    ConfigError, Dataset, RevealOptions, RevealState, VisibilityTransition, WindowRange,
};

/// Proof that a batch load was started, handed back on completion or failure.
///
/// Tickets from before a [`Revealer::reset`] or [`Revealer::dispose`] are stale and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchTicket {
    generation: u64,
    range: WindowRange,
}

impl BatchTicket {
    /// Indexes this batch is expected to materialize.
    pub fn range(&self) -> WindowRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// What a "load more" control should show for the current reveal state.
///
/// The manual button is the fallback whenever visibility-driven loading is unsupported or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadMoreAffordance {
    /// Everything is revealed (or the session was disposed).
    Hidden,
    Button,
    Loading,
    /// The last batch failed; the button retries it.
    Retry,
    /// Retries are used up. Only starting the list over recovers.
    Reload,
}

/// Progressive reveal over a bounded or streamed dataset.
///
/// `revealed_count` only grows and never exceeds the known total. At most one batch is in flight:
/// a load request while loading is dropped, never queued.
#[derive(Clone, Debug)]
pub struct Revealer {
    options: RevealOptions,
    total: Option<usize>,
    revealed_count: usize,
    in_flight: Option<BatchTicket>,
    end_reached: bool,
    last_failed: bool,
    generation: u64,
    disposed: bool,
}

impl Revealer {
    /// `total` is `None` for streamed sources whose length is unknown.
    pub fn new(total: Option<usize>, options: RevealOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let revealed_count = match total {
            Some(total) => options.initial_count.min(total),
            None => options.initial_count,
        };
        pdebug!(?total, batch_size = options.batch_size, revealed_count, "Revealer::new");
        Ok(Self {
            options,
            total,
            revealed_count,
            in_flight: None,
            end_reached: false,
            last_failed: false,
            generation: 0,
            disposed: false,
        })
    }

    pub fn options(&self) -> &RevealOptions {
        &self.options
    }

    pub fn state(&self) -> RevealState {
        RevealState {
            revealed_count: self.revealed_count,
            is_loading_more: self.in_flight.is_some(),
        }
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed_count
    }

    pub fn is_loading_more(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn has_more(&self) -> bool {
        if self.end_reached {
            return false;
        }
        match self.total {
            Some(total) => self.revealed_count < total,
            None => true,
        }
    }

    pub fn visible_range(&self) -> WindowRange {
        WindowRange::new(0, self.revealed_count)
    }

    pub fn visible_items<'a, D: Dataset + ?Sized>(&self, dataset: &'a D) -> &'a [D::Item] {
        dataset.slice(self.visible_range().as_range())
    }

    /// Starts a batch load.
    ///
    /// Returns `None` (a no-op) while a batch is in flight, once everything is revealed, or after
    /// disposal.
    pub fn begin_load_more(&mut self) -> Option<BatchTicket> {
        if self.disposed {
            return None;
        }
        if self.in_flight.is_some() {
            ptrace!(revealed = self.revealed_count, "begin_load_more: already loading");
            return None;
        }
        if !self.has_more() {
            ptrace!(revealed = self.revealed_count, "begin_load_more: nothing left");
            return None;
        }
        let start = self.revealed_count;
        let mut end = start.saturating_add(self.options.batch_size);
        if let Some(total) = self.total {
            end = end.min(total);
        }
        let ticket = BatchTicket {
            generation: self.generation,
            range: WindowRange::new(start, end),
        };
        pdebug!(start, end, "begin_load_more");
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Starts a batch when the sentinel boundary becomes visible.
    ///
    /// Only `Hidden -> Visible` transitions load; the reverse transition is ignored.
    pub fn on_visibility(&mut self, transition: VisibilityTransition) -> Option<BatchTicket> {
        if !transition.became_visible() {
            return None;
        }
        self.begin_load_more()
    }

    /// Finishes a batch that materialized `delivered` items.
    ///
    /// A short batch from a streamed source marks the end of the data. Returns `false` for stale
    /// tickets, which leave the state untouched.
    pub fn complete(&mut self, ticket: &BatchTicket, delivered: usize) -> bool {
        if !self.owns(ticket) {
            pwarn!(?ticket, "Revealer::complete: stale ticket ignored");
            return false;
        }
        self.in_flight = None;
        self.last_failed = false;

        let delivered = delivered.min(ticket.len());
        let mut next = self.revealed_count.saturating_add(delivered);
        if let Some(total) = self.total {
            next = next.min(total);
        } else if delivered < ticket.len() {
            self.end_reached = true;
        }
        self.revealed_count = next.max(self.revealed_count);
        pdebug!(
            delivered,
            revealed = self.revealed_count,
            end_reached = self.end_reached,
            "Revealer::complete"
        );
        true
    }

    /// Abandons a failed batch. `revealed_count` is left where it was so the batch can be retried.
    pub fn fail(&mut self, ticket: &BatchTicket) -> bool {
        if !self.owns(ticket) {
            pwarn!(?ticket, "Revealer::fail: stale ticket ignored");
            return false;
        }
        pdebug!(revealed = self.revealed_count, "Revealer::fail");
        self.in_flight = None;
        self.last_failed = true;
        true
    }

    /// Applies a new batch size to future batches (e.g. after a policy update).
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ConfigError> {
        let next = RevealOptions {
            batch_size,
            ..self.options
        };
        next.validate()?;
        self.options = next;
        Ok(())
    }

    /// Records a length learned after construction. The total never drops below what is
    /// already revealed.
    pub fn set_total(&mut self, total: Option<usize>) {
        self.total = total.map(|t| t.max(self.revealed_count));
    }

    /// Marks a streamed source as finished.
    pub fn mark_end_reached(&mut self) {
        self.end_reached = true;
    }

    pub fn affordance(&self) -> LoadMoreAffordance {
        if self.disposed || !self.has_more() {
            return LoadMoreAffordance::Hidden;
        }
        if self.in_flight.is_some() {
            return LoadMoreAffordance::Loading;
        }
        if self.last_failed {
            return LoadMoreAffordance::Retry;
        }
        LoadMoreAffordance::Button
    }

    /// Starts a new list session (dataset identity change). Outstanding tickets become stale.
    pub fn reset(&mut self, total: Option<usize>) {
        pdebug!(?total, "Revealer::reset");
        self.generation = self.generation.wrapping_add(1);
        self.total = total;
        self.revealed_count = match total {
            Some(total) => self.options.initial_count.min(total),
            None => self.options.initial_count,
        };
        self.in_flight = None;
        self.end_reached = false;
        self.last_failed = false;
        self.disposed = false;
    }

    /// Tears the session down. No ticket issued before this call can change state afterwards.
    pub fn dispose(&mut self) {
        pdebug!("Revealer::dispose");
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
        self.disposed = true;
    }

    fn owns(&self, ticket: &BatchTicket) -> bool {
        !self.disposed
            && ticket.generation == self.generation
            && self.in_flight.as_ref() == Some(ticket)
    }
}
