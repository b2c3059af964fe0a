//! Coordinator — quiet-period batching and jittered per-token redispatch.
//!
//! A single dispatcher task owns the batch buffer and the idle timer. Every
//! submission resets the timer; when it fires the buffer is closed as one
//! batch, shuffled, and each token gets its own redispatch timer. A fired
//! timer publishes the token on the outbound channel and wakes the caller
//! registered for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mockserve_core::{Error, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::types::*;

/// Capacity of the outbound broadcast channel. Lagging subscribers skip
/// tokens; waiters are unaffected.
const OUTBOUND_CAPACITY: usize = 1024;

/// Handle to a batch dispatch coordinator. Cheap to clone; all clones share
/// the same buffer, timers and waiters.
#[derive(Clone)]
pub struct Coordinator {
    inbound: mpsc::UnboundedSender<Token>,
    shared: Arc<Shared>,
}

struct Shared {
    waiters: Mutex<HashMap<Token, Waiter>>,
    outbound: broadcast::Sender<Token>,
    next_waiter_id: AtomicU64,
    buffered: AtomicUsize,
    in_flight: AtomicUsize,
    batches_closed: AtomicU64,
    submitted: AtomicU64,
    redispatched: AtomicU64,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Token>,
}

impl Coordinator {
    /// Create a coordinator and spawn its dispatcher task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;

        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);

        let shared = Arc::new(Shared {
            waiters: Mutex::new(HashMap::new()),
            outbound,
            next_waiter_id: AtomicU64::new(1),
            buffered: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            batches_closed: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            redispatched: AtomicU64::new(0),
        });

        info!(
            "Batch coordinator started: quiet={:?}, jitter={:?}..={:?}",
            config.quiet_period, config.jitter_min, config.jitter_max
        );

        tokio::spawn(run_dispatcher(inbound_rx, Arc::clone(&shared), config));

        Ok(Self { inbound, shared })
    }

    /// Append a token to the inbound stream and restart the idle timer.
    pub fn submit(&self, token: impl Into<Token>) {
        let token = token.into();
        debug!(token = %token, "Token submitted");

        self.shared.buffered.fetch_add(1, Ordering::SeqCst);
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.inbound.send(token) {
            self.shared.buffered.fetch_sub(1, Ordering::SeqCst);
            error!("Batch dispatcher is gone, dropping token {}", e.0);
        }
    }

    /// Suspend until `token` is redispatched, then return it.
    ///
    /// Never resolves if the token is never submitted. Fails with
    /// [`Error::DuplicateWait`] if another caller is already waiting on the
    /// same token.
    pub async fn await_completion(&self, token: impl Into<Token>) -> Result<Token> {
        self.register(token.into())?.resolve().await
    }

    /// Like [`Coordinator::await_completion`], giving up after `timeout`.
    ///
    /// Expiry only removes this caller's wait; the token itself stays in its
    /// batch and is still redispatched.
    pub async fn await_completion_timeout(
        &self,
        token: impl Into<Token>,
        timeout: Duration,
    ) -> Result<Token> {
        self.register(token.into())?.resolve_within(timeout).await
    }

    /// Register a wait for `token`, submit it, and wait for its redispatch.
    ///
    /// The wait is registered before submission, so a duplicate in-flight
    /// token is rejected without entering a batch.
    pub async fn submit_and_wait(
        &self,
        token: impl Into<Token>,
        timeout: Option<Duration>,
    ) -> Result<Token> {
        let token = token.into();
        let pending = self.register(token.clone())?;
        self.submit(token);
        match timeout {
            Some(timeout) => pending.resolve_within(timeout).await,
            None => pending.resolve().await,
        }
    }

    /// Observe every redispatched token, waited on or not.
    pub fn subscribe(&self) -> broadcast::Receiver<Token> {
        self.shared.outbound.subscribe()
    }

    /// Snapshot of current counters.
    pub fn stats(&self) -> CoordinatorStats {
        let buffered = self.shared.buffered.load(Ordering::SeqCst);
        let in_flight = self.shared.in_flight.load(Ordering::SeqCst);
        CoordinatorStats {
            phase: Phase::derive(buffered, in_flight),
            buffered,
            in_flight,
            pending_waits: self.shared.waiters.lock().len(),
            batches_closed: self.shared.batches_closed.load(Ordering::Relaxed),
            tokens_submitted: self.shared.submitted.load(Ordering::Relaxed),
            tokens_redispatched: self.shared.redispatched.load(Ordering::Relaxed),
        }
    }

    fn register(&self, token: Token) -> Result<PendingWait> {
        let mut waiters = self.shared.waiters.lock();
        if waiters.contains_key(&token) {
            warn!(token = %token, "Rejected duplicate wait");
            return Err(Error::DuplicateWait(token));
        }

        let id = self.shared.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        waiters.insert(token.clone(), Waiter { id, tx });

        Ok(PendingWait {
            rx,
            token,
            id,
            shared: Arc::clone(&self.shared),
        })
    }
}

impl Shared {
    fn publish(&self, token: Token) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.redispatched.fetch_add(1, Ordering::Relaxed);

        // No subscribers is not an error.
        let _ = self.outbound.send(token.clone());

        let waiter = self.waiters.lock().remove(&token);
        match waiter {
            Some(waiter) => {
                debug!(token = %token, "Token redispatched to waiter");
                let _ = waiter.tx.send(token);
            }
            None => debug!(token = %token, "Token redispatched with no waiter"),
        }
    }
}

/// A registered wait. Dropping it before it resolves deregisters the wait.
struct PendingWait {
    rx: oneshot::Receiver<Token>,
    token: Token,
    id: u64,
    shared: Arc<Shared>,
}

impl PendingWait {
    async fn resolve(mut self) -> Result<Token> {
        (&mut self.rx)
            .await
            .map_err(|_| Error::Closed(self.token.clone()))
    }

    async fn resolve_within(mut self, timeout: Duration) -> Result<Token> {
        match time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(_)) => Err(Error::Closed(self.token.clone())),
            Err(_) => {
                warn!(token = %self.token, "Wait timed out after {:?}", timeout);
                Err(Error::Timeout {
                    token: self.token.clone(),
                    elapsed: timeout,
                })
            }
        }
    }
}

impl Drop for PendingWait {
    fn drop(&mut self) {
        let mut waiters = self.shared.waiters.lock();
        // The slot may already be consumed, or reused by a later caller.
        if waiters.get(&self.token).is_some_and(|w| w.id == self.id) {
            waiters.remove(&self.token);
        }
    }
}

async fn run_dispatcher(
    mut inbound: mpsc::UnboundedReceiver<Token>,
    shared: Arc<Shared>,
    config: BatchConfig,
) {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut buffer: Vec<Token> = Vec::new();

    let idle = time::sleep(config.quiet_period);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // A submission that is already queued wins over a timer that is
            // due at the same moment.
            biased;

            received = inbound.recv() => match received {
                Some(token) => {
                    buffer.push(token);
                    idle.as_mut().reset(Instant::now() + config.quiet_period);
                }
                None => {
                    if !buffer.is_empty() {
                        debug!("Coordinator dropped, discarding {} buffered token(s)", buffer.len());
                    }
                    break;
                }
            },

            () = &mut idle, if !buffer.is_empty() => {
                let batch = std::mem::take(&mut buffer);
                shared.buffered.fetch_sub(batch.len(), Ordering::SeqCst);
                close_batch(batch, &shared, &config, &mut rng);
            }
        }
    }
}

fn close_batch(
    mut batch: Vec<Token>,
    shared: &Arc<Shared>,
    config: &BatchConfig,
    rng: &mut StdRng,
) {
    batch.shuffle(rng);
    let batch_no = shared.batches_closed.fetch_add(1, Ordering::Relaxed) + 1;
    info!("Batch {} closed with {} token(s)", batch_no, batch.len());

    for token in batch {
        let delay = rng.gen_range(config.jitter_min..=config.jitter_max);
        debug!(token = %token, "Redispatch in {}ms", delay.as_millis());

        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            time::sleep(delay).await;
            shared.publish(token);
        });
    }
}
