//! Live games: timer scheduling, event fan-out and the in-memory registry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::content::ContentBank;
use crate::error::GameError;
use crate::game::{
    Effect, Effects, GameRules, GameSession, GameSnapshot, TimerControl, TimerMode, TimerSlot,
    TimerSpec,
};
use crate::metrics::{GAMES_ACTIVE, GAMES_TOTAL};
use crate::models::events::GameEvent;
use crate::services::leaderboard::LeaderboardService;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns one [`GameSession`] and carries out the effects it asks for.
///
/// Always used behind `Arc<Mutex<_>>`; timer tasks hold a weak handle to it so
/// an evicted game stops its own timers.
pub struct GameRuntime {
    session: GameSession,
    timers: HashMap<TimerSlot, JoinHandle<()>>,
    events: broadcast::Sender<GameEvent>,
    leaderboard: Arc<LeaderboardService>,
    last_active: Instant,
    this: Weak<Mutex<GameRuntime>>,
}

impl GameRuntime {
    pub fn spawn(session: GameSession, leaderboard: Arc<LeaderboardService>) -> Arc<Mutex<Self>> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                session,
                timers: HashMap::new(),
                events,
                leaderboard,
                last_active: Instant::now(),
                this: this.clone(),
            })
        })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Slots with a scheduled timer that has not yet run to completion.
    pub fn active_timers(&self) -> Vec<TimerSlot> {
        self.timers
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(slot, _)| *slot)
            .collect()
    }

    /// Runs a player action against the session and applies its effects.
    pub fn act<T>(
        &mut self,
        action: impl FnOnce(&mut GameSession, &mut Effects) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        self.last_active = Instant::now();
        let mut fx = Effects::new();
        let result = action(&mut self.session, &mut fx);
        self.apply(fx);
        result
    }

    fn on_timer(&mut self, slot: TimerSlot, epoch: u64) -> TimerControl {
        let mut fx = Effects::new();
        let control = self.session.on_timer(slot, epoch, &mut fx);
        self.apply(fx);
        control
    }

    fn apply(&mut self, fx: Effects) {
        for effect in fx.into_vec() {
            match effect {
                Effect::StartTimer(spec) => self.start_timer(spec),
                Effect::CancelTimer(slot) => {
                    if let Some(handle) = self.timers.remove(&slot) {
                        handle.abort();
                    }
                }
                Effect::CancelAllTimers => self.cancel_all(),
                Effect::SubmitResult(record) => {
                    GAMES_TOTAL.with_label_values(&["finished"]).inc();
                    let leaderboard = self.leaderboard.clone();
                    tokio::spawn(async move {
                        leaderboard.submit(record).await;
                    });
                }
                Effect::Notify(event) => {
                    // No subscribers is fine
                    let _ = self.events.send(event);
                }
            }
        }
    }

    fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    fn start_timer(&mut self, spec: TimerSpec) {
        if let Some(previous) = self.timers.remove(&spec.slot) {
            previous.abort();
        }

        let epoch = self.session.epoch();
        let runtime = self.this.clone();
        tracing::debug!(
            "Game {} timer {} scheduled every {:?} ({:?}, epoch {})",
            self.session.id(),
            spec.slot.as_str(),
            spec.period,
            spec.mode,
            epoch
        );

        let handle = tokio::spawn(async move {
            match spec.mode {
                TimerMode::Once => {
                    tokio::time::sleep(spec.period).await;
                    fire(&runtime, spec.slot, epoch).await;
                }
                TimerMode::Repeat => {
                    let mut ticks =
                        tokio::time::interval_at(Instant::now() + spec.period, spec.period);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticks.tick().await;
                        if fire(&runtime, spec.slot, epoch).await == TimerControl::Stop {
                            break;
                        }
                    }
                }
            }
        });
        self.timers.insert(spec.slot, handle);
    }
}

async fn fire(runtime: &Weak<Mutex<GameRuntime>>, slot: TimerSlot, epoch: u64) -> TimerControl {
    let Some(runtime) = runtime.upgrade() else {
        return TimerControl::Stop;
    };
    let mut runtime = runtime.lock().await;
    runtime.on_timer(slot, epoch)
}

impl Drop for GameRuntime {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Registry of live games.
pub struct GameService {
    games: RwLock<HashMap<Uuid, Arc<Mutex<GameRuntime>>>>,
    bank: Arc<ContentBank>,
    rules: Arc<GameRules>,
    leaderboard: Arc<LeaderboardService>,
    idle_ttl: Duration,
}

impl GameService {
    pub fn new(
        bank: Arc<ContentBank>,
        rules: Arc<GameRules>,
        leaderboard: Arc<LeaderboardService>,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            bank,
            rules,
            leaderboard,
            idle_ttl,
        }
    }

    pub async fn create(&self) -> (Uuid, Arc<Mutex<GameRuntime>>) {
        let id = Uuid::new_v4();
        let session = GameSession::new(
            id,
            self.bank.clone(),
            self.rules.clone(),
            StdRng::from_os_rng(),
        );
        let runtime = GameRuntime::spawn(session, self.leaderboard.clone());

        self.games.write().await.insert(id, runtime.clone());
        GAMES_TOTAL.with_label_values(&["created"]).inc();
        GAMES_ACTIVE.inc();
        tracing::info!("Game created: {}", id);

        (id, runtime)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<GameRuntime>>, GameError> {
        self.games
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(GameError::GameNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops games nobody has acted on for longer than the idle TTL.
    pub async fn evict_idle(&self) -> usize {
        let candidates: Vec<(Uuid, Arc<Mutex<GameRuntime>>)> = self
            .games
            .read()
            .await
            .iter()
            .map(|(id, runtime)| (*id, runtime.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, runtime) in candidates {
            if runtime.lock().await.idle_for() >= self.idle_ttl {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut games = self.games.write().await;
        let mut evicted = 0;
        for id in expired {
            if games.remove(&id).is_some() {
                evicted += 1;
                GAMES_TOTAL.with_label_values(&["evicted"]).inc();
                GAMES_ACTIVE.dec();
            }
        }
        tracing::info!("Evicted {} idle games, {} remaining", evicted, games.len());
        evicted
    }

    /// Background task evicting idle games every `interval`.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                self.evict_idle().await;
            }
        })
    }
}
