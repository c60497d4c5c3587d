//! Cron-driven trigger for the daily digest.
//!
//! - Standard 5-field cron syntax (min hour dom mon dow), evaluated in a fixed
//!   UTC offset so the trigger does not depend on the host timezone
//! - One job loop; runs are awaited in sequence and never overlap
//! - Stopped through a `CancellationToken`

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{digest::DigestJob, domain::Destination, Error, Result};

#[derive(Clone)]
pub struct DigestScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    expr: CronExpr,
    job: DigestJob,
    dest: Destination,
    state: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    handle: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl DigestScheduler {
    pub fn new(expr: CronExpr, job: DigestJob, dest: Destination) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                expr,
                job,
                dest,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Spawn the job loop. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let mut st = self.inner.state.lock().await;
        if st.handle.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let scheduler = self.clone();
        let token = cancel.clone();
        st.handle = Some(tokio::spawn(async move {
            scheduler.job_loop(token).await;
        }));
        st.cancel = Some(cancel);

        match self.next_run() {
            Some(next) => tracing::info!(%next, dest = %self.inner.dest, "digest scheduler started"),
            None => tracing::warn!("digest schedule never fires"),
        }
    }

    pub async fn stop(&self) {
        let mut st = self.inner.state.lock().await;
        if let Some(tok) = st.cancel.take() {
            tok.cancel();
        }
        if let Some(handle) = st.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn next_run(&self) -> Option<DateTime<FixedOffset>> {
        self.inner.expr.next_after(Utc::now())
    }

    /// Current calendar date in the schedule's offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.inner.expr.offset).date_naive()
    }

    async fn job_loop(&self, cancel: CancellationToken) {
        let mut after = Utc::now();
        loop {
            let Some(next) = self.inner.expr.next_after(after) else {
                tracing::error!("digest schedule has no next run (stopping)");
                break;
            };

            let dur = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            tracing::debug!(%next, "next digest run");

            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = sleep(dur) => {
                let outcome = self.inner.job.run_for_date(&self.inner.dest, next.date_naive()).await;
                tracing::info!(?outcome, "scheduled digest finished");
              }
            }

            after = following_from(next, Utc::now());
        }
    }
}

/// Instant to search the next slot from once `fired` has run.
///
/// Never earlier than the slot itself, so a wall clock behind the sleep timer
/// cannot select the same slot again.
fn following_from(fired: DateTime<FixedOffset>, now: DateTime<Utc>) -> DateTime<Utc> {
    fired.with_timezone(&Utc).max(now)
}

// === Cron expression engine ===

#[derive(Clone, Debug)]
pub struct CronExpr {
    min: Field,
    hour: Field,
    dom: Field,
    mon: Field,
    dow: Field,
    offset: FixedOffset,
}

#[derive(Clone, Debug)]
struct Field {
    min: u32,
    max: u32,
    any: bool,
    allowed: Vec<bool>, // index = value
}

impl CronExpr {
    pub fn parse(expr: &str, offset: FixedOffset) -> Result<Self> {
        let parts = expr.split_whitespace().collect::<Vec<_>>();
        if parts.len() != 5 {
            return Err(Error::Config(format!(
                "expected 5 cron fields, got {}",
                parts.len()
            )));
        }

        Ok(Self {
            min: Field::parse(parts[0], 0, 59, false)?,
            hour: Field::parse(parts[1], 0, 23, false)?,
            dom: Field::parse(parts[2], 1, 31, false)?,
            mon: Field::parse(parts[3], 1, 12, false)?,
            dow: Field::parse(parts[4], 0, 6, true)?,
            offset,
        })
    }

    pub fn matches(&self, dt: DateTime<FixedOffset>) -> bool {
        if !self.min.contains(dt.minute())
            || !self.hour.contains(dt.hour())
            || !self.mon.contains(dt.month())
        {
            return false;
        }

        // Standard cron semantics: if both DOM and DOW are restricted, match when EITHER matches.
        let dom_match = self.dom.contains(dt.day());
        let dow_match = self.dow.contains(dt.weekday().num_days_from_sunday());

        match (self.dom.any, self.dow.any) {
            (true, true) => true,
            (true, false) => dow_match,
            (false, true) => dom_match,
            (false, false) => dom_match || dow_match,
        }
    }

    /// First matching minute strictly after `now`, in the schedule's offset.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let mut t = now.with_timezone(&self.offset) + chrono::Duration::minutes(1);
        t = t.with_second(0)?.with_nanosecond(0)?;

        // Hard cap to avoid infinite loops for impossible expressions.
        let max_iters = 366usize * 24 * 60;
        for _ in 0..max_iters {
            if self.matches(t) {
                return Some(t);
            }
            t += chrono::Duration::minutes(1);
        }
        None
    }
}

/// Parse `+08:00`, `-05:30`, `+8` or `0` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let s = raw.trim();
    let invalid = || Error::Config(format!("invalid UTC offset: {raw}"));

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        Some(_) => (1, s),
        None => return Err(invalid()),
    };
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = h.trim().parse().map_err(|_| invalid())?;
    let minutes: i32 = m.trim().parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl Field {
    fn parse(raw: &str, min: u32, max: u32, allow_7_as_0: bool) -> Result<Self> {
        let raw = raw.trim();
        let mut allowed = vec![false; (max + 1) as usize];

        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (base, step) = match part.split_once('/') {
                Some((a, b)) => {
                    let step: u32 = b
                        .trim()
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid step: {b}")))?;
                    if step == 0 {
                        return Err(Error::Config("step must be > 0".to_string()));
                    }
                    (a.trim(), Some(step))
                }
                None => (part, None),
            };

            let (start, end) = if base == "*" {
                (min, max)
            } else if let Some((a, b)) = base.split_once('-') {
                (
                    parse_u32(a.trim(), allow_7_as_0)?,
                    parse_u32(b.trim(), allow_7_as_0)?,
                )
            } else {
                let a = parse_u32(base, allow_7_as_0)?;
                if step.is_some() {
                    (a, max)
                } else {
                    (a, a)
                }
            };

            let start = start.max(min);
            let end = end.min(max);
            if start > end {
                return Err(Error::Config(format!("invalid range: {base}")));
            }

            let mut v = start;
            while v <= end {
                allowed[v as usize] = true;
                v = v.saturating_add(step.unwrap_or(1));
            }
        }

        let any = (min..=max).all(|v| allowed[v as usize]);
        Ok(Self {
            min,
            max,
            any,
            allowed,
        })
    }

    fn contains(&self, v: u32) -> bool {
        if v < self.min || v > self.max {
            return false;
        }
        self.allowed.get(v as usize).copied().unwrap_or(false)
    }
}

fn parse_u32(s: &str, allow_7_as_0: bool) -> Result<u32> {
    let v: u32 = s
        .parse()
        .map_err(|_| Error::Config(format!("invalid number: {s}")))?;
    Ok(if allow_7_as_0 && v == 7 { 0 } else { v })
}
